use clap::Parser;
use delve::{Caves, CavesConfig, DrawMode, mask};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// Cave generation configuration.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// YAML generator settings; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for a reproducible layout.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Skip the carving pass.
    #[arg(long)]
    no_carves: bool,

    #[clap(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> CavesConfig {
    match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path).expect("Failed to read config file");
            serde_yaml::from_str(&data).expect("Failed to parse config file")
        }
        None => CavesConfig::default(),
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
        println!("Tunnels per room  : {}", config.tunnels_per_room);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut caves = Caves::new(config).expect("Invalid caves configuration");
    let placed = caves.gen_rooms(&mut rng, true, None);
    if !args.no_carves {
        caves.gen_carves(&mut rng, true, None);
    }
    caves.gen_halls(&mut rng, true);

    if args.verbose {
        println!("{caves}");
        println!("Rooms placed      : {placed}");
        println!("Tunnel segments   : {}", caves.halls().len());
        let layers = caves.image_data();
        println!("Carve floor cells : {}", mask::count_nonzero(&layers.floor_carve));
        println!("Wall cells        : {}", mask::count_nonzero(&layers.wall));
    }

    print!("{}", mask::to_ascii(&caves.draw(DrawMode::default())));
}
