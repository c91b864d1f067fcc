use clap::Parser;
use delve::{Catacombs, CatacombsConfig, DrawMode, mask};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// Catacombs generation configuration.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// YAML generator settings; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for a reproducible layout.
    #[arg(short, long)]
    seed: Option<u64>,

    #[clap(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> CatacombsConfig {
    match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path).expect("Failed to read config file");
            serde_yaml::from_str(&data).expect("Failed to parse config file")
        }
        None => CatacombsConfig::default(),
    }
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());

    if args.verbose {
        println!("Seed              : {seed}");
        println!("Grid              : {}x{}", config.width, config.height);
        println!("Rooms requested   : {}", config.room_count);
        println!("Halls per room    : {}", config.halls_per_room);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut dungeon = Catacombs::new(config).expect("Invalid catacombs configuration");
    let placed = dungeon.gen_rooms(&mut rng, true, None);
    dungeon.gen_halls(&mut rng, true);

    if args.verbose {
        println!("{dungeon}");
        println!("Rooms placed      : {placed}");
        println!("Hall segments     : {}", dungeon.halls().len());
        let layers = dungeon.image_data();
        println!("Wall cells        : {}", mask::count_nonzero(&layers.wall));
        println!("Door cells        : {}", mask::count_nonzero(&layers.door));
    }

    print!("{}", mask::to_ascii(&dungeon.draw(DrawMode::default())));
}
