use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

use crate::circle::Circle;
use crate::layers::{DrawMode, Layers};
use crate::mask::{self, Mask};
use crate::point::{Frame, Point};
use crate::shape::Shape;

/// Smallest room radius the placement sampler will accept.
const MIN_ROOM_RADIUS: i32 = 2;
/// Bounded retries when resampling a tunnel segment radius for bounds.
const RADIUS_RESAMPLES: usize = 8;

/// Tuning knobs for a [`Caves`] level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CavesConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Rooms to attempt to place.
    pub room_count: usize,
    /// Average room area as a fraction of the grid area, in (0, 1).
    pub room_area_fraction: f64,
    /// Uniform noise applied to sampled room radii.
    pub radius_variance: i32,
    /// Minimum clearance kept around each room.
    pub padding: i32,
    /// Tunnel connections each room should end up with.
    pub tunnels_per_room: usize,
    /// Base tunnel segment radius in cells.
    pub tunnel_radius: i32,
    /// Uniform noise applied per segment to the tunnel radius.
    pub tunnel_radius_variance: i32,
    /// Angular jitter in degrees applied to each tunnel advance.
    pub tunnel_jitter: f64,
    /// Chance a carve adds floor rather than removing it, in [0, 1].
    pub carve_probability: f64,
    /// Carve attempts made per room.
    pub carve_attempts: usize,
    /// Carve radius as a divisor of the room radius.
    pub carve_radius_quotient: f64,
    /// Uniform noise applied to sampled carve radii.
    pub carve_radius_variance: i32,
}

impl Default for CavesConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            room_count: 5,
            room_area_fraction: 0.02,
            radius_variance: 1,
            padding: 2,
            tunnels_per_room: 1,
            tunnel_radius: 2,
            tunnel_radius_variance: 1,
            tunnel_jitter: 15.0,
            carve_probability: 0.7,
            carve_attempts: 4,
            carve_radius_quotient: 2.0,
            carve_radius_variance: 1,
        }
    }
}

impl CavesConfig {
    fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            bail!(
                "Grid dimensions must be positive, got {}x{}",
                self.width,
                self.height
            );
        }
        if self.room_area_fraction <= 0.0 || self.room_area_fraction >= 1.0 {
            bail!(
                "Room area fraction must lie in (0, 1), got {}",
                self.room_area_fraction
            );
        }
        if self.room_count as f64 * self.room_area_fraction >= 1.0 {
            bail!(
                "{} rooms at area fraction {} would cover the whole grid",
                self.room_count,
                self.room_area_fraction
            );
        }
        if self.radius_variance < 0
            || self.padding < 0
            || self.tunnel_radius_variance < 0
            || self.carve_radius_variance < 0
        {
            bail!("Variance and padding settings must be non-negative");
        }
        if self.tunnel_radius < 1 {
            bail!("Tunnel radius must be at least 1, got {}", self.tunnel_radius);
        }
        if self.tunnel_jitter < 0.0 {
            bail!("Tunnel jitter must be non-negative, got {}", self.tunnel_jitter);
        }
        if !(0.0..=1.0).contains(&self.carve_probability) {
            bail!(
                "Carve probability must lie in [0, 1], got {}",
                self.carve_probability
            );
        }
        if self.carve_radius_quotient <= 0.0 {
            bail!(
                "Carve radius quotient must be positive, got {}",
                self.carve_radius_quotient
            );
        }
        let reach = 2 * (MIN_ROOM_RADIUS + self.padding) + 1;
        if self.width < reach || self.height < reach {
            bail!(
                "A padded radius-{MIN_ROOM_RADIUS} room cannot fit a {}x{} grid",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

/// Organic cave level: circular rooms reshaped by edge carves and joined by
/// chains of tunnel circles.
///
/// Generation passes run in dependency order: [`Caves::gen_rooms`], then
/// [`Caves::gen_carves`], then [`Caves::gen_halls`]; each pass fully replaces
/// its own and all downstream state when `reset` is set.
#[derive(Clone, Debug)]
pub struct Caves {
    config: CavesConfig,
    size: Frame,
    room_avg_radius: i32,
    rooms: Vec<Circle>,
    carves: Vec<Vec<Circle>>,
    carve_polarity: Vec<Vec<bool>>,
    halls: Vec<Circle>,
    hall_counts: Vec<usize>,
}

impl Caves {
    /// Creates a generator, failing fast on inconsistent or impossible
    /// configurations.
    pub fn new(config: CavesConfig) -> Result<Self> {
        config.validate()?;
        let size = Frame::new(config.width, config.height);
        let grid_area = f64::from(config.width) * f64::from(config.height);
        let room_avg_radius =
            ((config.room_area_fraction * grid_area / PI).sqrt() as i32).max(MIN_ROOM_RADIUS);
        Ok(Self {
            config,
            size,
            room_avg_radius,
            rooms: Vec::new(),
            carves: Vec::new(),
            carve_polarity: Vec::new(),
            halls: Vec::new(),
            hall_counts: Vec::new(),
        })
    }

    /// The configuration this generator was built from.
    pub const fn config(&self) -> &CavesConfig {
        &self.config
    }

    /// Grid frame of the level.
    pub const fn size(&self) -> Frame {
        self.size
    }

    /// Rooms placed by the last [`Caves::gen_rooms`] pass.
    pub fn rooms(&self) -> &[Circle] {
        &self.rooms
    }

    /// Per-room carve circles, parallel to `rooms`.
    pub fn carves(&self) -> &[Vec<Circle>] {
        &self.carves
    }

    /// Per-room carve polarities, parallel to `carves`; true adds floor.
    pub fn carve_polarity(&self) -> &[Vec<bool>] {
        &self.carve_polarity
    }

    /// Tunnel segments dug by the last [`Caves::gen_halls`] pass.
    pub fn halls(&self) -> &[Circle] {
        &self.halls
    }

    /// Per-room tunnel connection counters, parallel to `rooms`.
    pub fn hall_counts(&self) -> &[usize] {
        &self.hall_counts
    }

    // Same closed form as catacombs room placement: denser or more-padded
    // configurations earn more tries.
    fn max_attempts(&self) -> usize {
        let density = self.config.room_count as f64 * self.config.room_area_fraction;
        let pad_area = f64::from((self.config.padding * self.config.padding).max(1));
        (self.config.room_count as f64
            * pad_area
            * 10_f64.powf(-(1.0 - density).ln())
            * std::f64::consts::E.powf(1.0 + density))
        .round() as usize
    }

    /// Randomly places circular rooms by rejection sampling.
    ///
    /// No-op unless `reset` is set; otherwise replaces rooms, carves, tunnels
    /// and counters. A candidate is kept when it clears every prior room's
    /// padded circle. Placement stops at the attempt ceiling (closed-form, or
    /// `attempts_override`) with a warning and a partial level. Returns the
    /// number of rooms placed.
    pub fn gen_rooms(
        &mut self,
        rng: &mut impl Rng,
        reset: bool,
        attempts_override: Option<usize>,
    ) -> usize {
        if !reset {
            return self.rooms.len();
        }
        self.rooms.clear();
        self.carves.clear();
        self.carve_polarity.clear();
        self.halls.clear();
        self.hall_counts.clear();

        let max_attempts = attempts_override.unwrap_or_else(|| self.max_attempts());
        let pb = ProgressBar::new(self.config.room_count as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rooms")
                .unwrap()
                .progress_chars("##-"),
        );

        let mut padded: Vec<Circle> = Vec::new();
        let mut attempts = 0;
        while self.rooms.len() < self.config.room_count {
            attempts += 1;
            if attempts > max_attempts {
                pb.println(format!(
                    "Warning: room placement exhausted after {max_attempts} attempts; placed {} of {} rooms",
                    self.rooms.len(),
                    self.config.room_count
                ));
                break;
            }

            let noise = rng.random_range(-self.config.radius_variance..=self.config.radius_variance);
            let radius = (self.room_avg_radius + noise).max(MIN_ROOM_RADIUS);
            let reach = radius + self.config.padding;
            if self.size.x - reach <= reach || self.size.y - reach <= reach {
                continue;
            }
            let origin = Point::new(
                rng.random_range(reach..self.size.x - reach),
                rng.random_range(reach..self.size.y - reach),
            );
            let room = Circle::new(origin, radius);

            if padded.iter().all(|prior| !room.overlaps(prior)) {
                padded.push(Circle::new(origin, reach));
                self.rooms.push(room);
                pb.inc(1);
            }
        }
        pb.finish_and_clear();

        self.carves = vec![Vec::new(); self.rooms.len()];
        self.carve_polarity = vec![Vec::new(); self.rooms.len()];
        self.hall_counts = vec![0; self.rooms.len()];
        self.rooms.len()
    }

    /// Attempts edge carves on every room.
    ///
    /// No-op unless `reset` is set; otherwise replaces carves and tunnels.
    /// Each attempt anchors a circle on the room's edge ring at a uniform
    /// bearing; candidates leaving the grid or touching an accepted carve of
    /// the same room are rejected, and survivors draw a probability-weighted
    /// polarity. The per-room attempt count is `attempts_override` when given.
    pub fn gen_carves(&mut self, rng: &mut impl Rng, reset: bool, attempts_override: Option<usize>) {
        if !reset {
            return;
        }
        self.halls.clear();
        let attempts = attempts_override.unwrap_or(self.config.carve_attempts);
        let quotient = self.config.carve_radius_quotient;
        let variance = self.config.carve_radius_variance;

        let pb = ProgressBar::new(self.rooms.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rooms carved")
                .unwrap()
                .progress_chars("##-"),
        );

        for (index, room) in self.rooms.iter().enumerate() {
            self.carves[index].clear();
            self.carve_polarity[index].clear();
            let base_radius = ((f64::from(room.radius()) / quotient).round() as i32).max(1);

            for _ in 0..attempts {
                let bearing = rng.random_range(0.0..360.0);
                let anchor = room.angled_edge_cell(bearing);
                let radius = (base_radius + rng.random_range(-variance..=variance)).max(1);
                let fits = anchor.x - radius >= 0
                    && anchor.y - radius >= 0
                    && anchor.x + radius < self.size.x
                    && anchor.y + radius < self.size.y;
                if !fits {
                    continue;
                }
                let carve = Circle::new(anchor, radius);
                if self.carves[index].iter().any(|prior| carve.overlaps(prior)) {
                    continue;
                }
                self.carve_polarity[index].push(rng.random_bool(self.config.carve_probability));
                self.carves[index].push(carve);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    /// Digs tunnels between nearest-neighbour rooms until every room meets
    /// its mutual connection quota.
    ///
    /// No-op unless `reset` is set. A lone room (or an empty level) digs
    /// nothing: there is no partner to connect to.
    pub fn gen_halls(&mut self, rng: &mut impl Rng, reset: bool) {
        if !reset {
            return;
        }
        self.halls.clear();
        for count in &mut self.hall_counts {
            *count = 0;
        }
        if self.rooms.len() < 2 {
            return;
        }

        for i in 0..self.rooms.len() {
            let centroid = self.rooms[i].centroid();
            let mut order: Vec<(usize, i32)> = self
                .rooms
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, room)| (j, centroid.manhattan_distance(room.centroid())))
                .collect();
            order.sort_by_key(|&(j, distance)| (distance, j));

            let mut next = 0;
            while self.hall_counts[i] < self.config.tunnels_per_room {
                let partner = order[next].0;
                self.dig_tunnel(rng, i, partner);
                self.hall_counts[i] += 1;
                self.hall_counts[partner] += 1;
                next = (next + 1) % order.len();
            }
        }
    }

    // Grows a chain of circles from the target room's edge toward the source
    // room, stopping when a segment bites into the source's carved floor.
    // The segment count is capped so a jittery chain cannot wander forever.
    fn dig_tunnel(&mut self, rng: &mut impl Rng, source: usize, target: usize) {
        let source_mask = self.composite_mask(source);
        let source_centroid = self.rooms[source].centroid();
        let target_room = &self.rooms[target];

        let approach = (source_centroid - target_room.centroid()).azimuth();
        let mut current = target_room.angled_edge_cell(approach);

        let max_segments = self.max_tunnel_segments();
        for _ in 0..max_segments {
            let segment = self.tunnel_circle(rng, current);
            if mask::intersects(&segment.mask_fill(self.size), &source_mask) {
                self.halls.push(segment);
                return;
            }
            let bearing = (source_centroid - segment.centroid()).azimuth();
            let jitter =
                rng.random_range(-self.config.tunnel_jitter..=self.config.tunnel_jitter);
            current = segment.angled_edge_cell((bearing + jitter).rem_euclid(360.0));
            self.halls.push(segment);
        }
        println!(
            "Warning: tunnel from room {target} toward room {source} abandoned after {max_segments} segments"
        );
    }

    // Samples a segment radius, retrying a bounded number of times for one
    // that stays inside the grid, then clamping to whatever fits.
    fn tunnel_circle(&self, rng: &mut impl Rng, center: Point) -> Circle {
        let variance = self.config.tunnel_radius_variance;
        for _ in 0..RADIUS_RESAMPLES {
            let radius = (self.config.tunnel_radius + rng.random_range(-variance..=variance)).max(1);
            if self.circle_fits(center, radius) {
                return Circle::new(center, radius);
            }
        }
        let limit = center
            .x
            .min(center.y)
            .min(self.size.x - 1 - center.x)
            .min(self.size.y - 1 - center.y)
            .clamp(0, self.config.tunnel_radius);
        Circle::new(center, limit)
    }

    const fn circle_fits(&self, center: Point, radius: i32) -> bool {
        center.x - radius >= 0
            && center.y - radius >= 0
            && center.x + radius < self.size.x
            && center.y + radius < self.size.y
    }

    // Worst case a tunnel crosses the whole grid one radius at a time, with
    // jitter roughly doubling the path.
    fn max_tunnel_segments(&self) -> usize {
        ((self.size.x + self.size.y) / self.config.tunnel_radius.max(1)) as usize * 2 + 8
    }

    // Room floor after carving: fill plus additive carves, minus removals.
    fn composite_mask(&self, index: usize) -> Mask {
        let mut composite = self.rooms[index].mask_fill(self.size);
        let paired = self.carves[index].iter().zip(&self.carve_polarity[index]);
        for (carve, &adds) in paired.clone() {
            if adds {
                mask::merge(&mut composite, &carve.mask_fill(self.size));
            }
        }
        for (carve, &adds) in paired {
            if !adds {
                composite = mask::difference(&composite, &carve.mask_fill(self.size));
            }
        }
        composite
    }

    /// Builds the named layer stack for the renderer from the current rooms,
    /// carves and tunnels, as a pure function of the collections.
    pub fn image_data(&self) -> Layers {
        let frame = self.size;
        let mut base = mask::empty(frame);
        let mut carved = mask::empty(frame);
        for index in 0..self.rooms.len() {
            mask::merge(&mut base, &self.rooms[index].mask_fill(frame));
            mask::merge(&mut carved, &self.composite_mask(index));
        }
        let mut hall = mask::empty(frame);
        for segment in &self.halls {
            mask::merge(&mut hall, &segment.mask_fill(frame));
        }

        let everything = mask::union(&carved, &hall);
        let wall = mask::boundary(&everything);
        let door = mask::difference(
            &mask::intersection(&mask::boundary(&carved), &hall),
            &wall,
        );
        let solid = mask::union(&wall, &door);
        Layers {
            floor_room: mask::difference(&mask::intersection(&carved, &base), &solid),
            floor_carve: mask::difference(&mask::difference(&carved, &base), &solid),
            floor_hall: mask::difference(&mask::difference(&hall, &carved), &wall),
            wall,
            door,
            all: everything,
        }
    }

    /// Renders the level to a single boolean grid.
    pub fn draw(&self, mode: DrawMode) -> Mask {
        self.image_data().select(mode)
    }
}

impl Display for Caves {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let carve_count: usize = self.carves.iter().map(Vec::len).sum();
        write!(
            f,
            "a {} by {} cave system of {} rooms at about {:.0}% area each, \
             averaging {} tunnels out of each room ({} placed, {} carves, {} tunnel segments)",
            self.config.width,
            self.config.height,
            self.config.room_count,
            self.config.room_area_fraction * 100.0,
            self.config.tunnels_per_room,
            self.rooms.len(),
            carve_count,
            self.halls.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_config() -> CavesConfig {
        CavesConfig {
            width: 56,
            height: 56,
            room_count: 4,
            room_area_fraction: 0.02,
            padding: 2,
            ..CavesConfig::default()
        }
    }

    #[test]
    fn invalid_configurations_fail_fast() {
        let mut negative = CavesConfig::default();
        negative.padding = -1;
        assert!(Caves::new(negative).is_err());

        let mut chance = CavesConfig::default();
        chance.carve_probability = 1.5;
        assert!(Caves::new(chance).is_err());

        let mut cramped = CavesConfig::default();
        cramped.width = 6;
        assert!(Caves::new(cramped).is_err());
    }

    #[test]
    fn padded_rooms_clear_every_other_room() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut caves = Caves::new(test_config()).unwrap();
        let placed = caves.gen_rooms(&mut rng, true, Some(4000));
        assert!(placed >= 2, "expected at least two rooms, placed {placed}");

        let padding = caves.config().padding;
        for (i, room) in caves.rooms().iter().enumerate() {
            let padded = Circle::new(room.origin(), room.radius() + padding);
            for (j, other) in caves.rooms().iter().enumerate() {
                if i != j {
                    assert!(!padded.overlaps(other), "rooms {i} and {j} violate padding");
                }
            }
        }
    }

    #[test]
    fn rooms_stay_clear_of_the_grid_border() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut caves = Caves::new(test_config()).unwrap();
        caves.gen_rooms(&mut rng, true, Some(4000));
        for room in caves.rooms() {
            let origin = room.origin();
            let reach = room.radius() + caves.config().padding;
            assert!(origin.x - reach >= 0 && origin.y - reach >= 0);
            assert!(origin.x + reach < caves.size().x);
            assert!(origin.y + reach < caves.size().y);
        }
    }

    #[test]
    fn carves_track_their_polarity_lists() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut caves = Caves::new(test_config()).unwrap();
        caves.gen_rooms(&mut rng, true, Some(4000));
        caves.gen_carves(&mut rng, true, None);

        assert_eq!(caves.carves().len(), caves.rooms().len());
        for (carves, polarity) in caves.carves().iter().zip(caves.carve_polarity()) {
            assert_eq!(carves.len(), polarity.len());
            assert!(carves.len() <= caves.config().carve_attempts);
        }
    }

    #[test]
    fn carves_of_one_room_never_overlap_each_other() {
        let mut rng = StdRng::seed_from_u64(37);
        let mut caves = Caves::new(test_config()).unwrap();
        caves.gen_rooms(&mut rng, true, Some(4000));
        caves.gen_carves(&mut rng, true, Some(12));

        for carves in caves.carves() {
            for (a, first) in carves.iter().enumerate() {
                for second in &carves[a + 1..] {
                    assert!(!first.overlaps(second));
                }
            }
        }
    }

    #[test]
    fn tunnels_terminate_and_meet_quotas() {
        let mut rng = StdRng::seed_from_u64(41);
        let mut caves = Caves::new(test_config()).unwrap();
        let placed = caves.gen_rooms(&mut rng, true, Some(4000));
        assert!(placed >= 2);
        caves.gen_carves(&mut rng, true, None);
        caves.gen_halls(&mut rng, true);

        for &count in caves.hall_counts() {
            assert!(count >= caves.config().tunnels_per_room);
        }
        assert!(!caves.halls().is_empty());
        // Every segment was kept inside the grid by the radius resampler.
        for segment in caves.halls() {
            let origin = segment.origin();
            let radius = segment.radius();
            assert!(origin.x - radius >= 0 && origin.y - radius >= 0);
            assert!(origin.x + radius < caves.size().x);
            assert!(origin.y + radius < caves.size().y);
        }
    }

    #[test]
    fn negative_carves_remove_floor_from_the_composite() {
        let config = CavesConfig {
            width: 32,
            height: 32,
            ..CavesConfig::default()
        };
        let mut caves = Caves::new(config).unwrap();
        caves.rooms.push(Circle::new(Point::new(15, 15), 6));
        let anchor = caves.rooms[0].angled_edge_cell(90.0);
        caves.carves.push(vec![Circle::new(anchor, 2)]);
        caves.carve_polarity.push(vec![false]);
        caves.hall_counts.push(0);

        let plain = caves.rooms[0].mask_fill(caves.size());
        let composite = caves.composite_mask(0);
        assert!(mask::count_nonzero(&composite) < mask::count_nonzero(&plain));
        assert!(!mask::get(&composite, anchor));
    }

    #[test]
    fn layers_partition_consistently() {
        let mut rng = StdRng::seed_from_u64(43);
        let mut caves = Caves::new(test_config()).unwrap();
        caves.gen_rooms(&mut rng, true, Some(4000));
        caves.gen_carves(&mut rng, true, None);
        caves.gen_halls(&mut rng, true);
        let layers = caves.image_data();

        assert!(!mask::intersects(&layers.door, &layers.wall));
        assert!(!mask::intersects(&layers.floor_room, &layers.floor_carve));
        assert!(!mask::intersects(&layers.floor_room, &layers.floor_hall));
        let nonsolid = layers.select(DrawMode::NonSolid);
        assert_eq!(mask::intersection(&nonsolid, &layers.all), nonsolid);
    }
}
