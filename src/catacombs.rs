use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::layers::{DrawMode, Layers};
use crate::line::{AzimuthMode, Line, Orientation};
use crate::mask::{self, Mask};
use crate::point::{Frame, Point};
use crate::rectangle::Rectangle;
use crate::shape::Shape;

/// Smallest room dimension the placement sampler will accept.
const MIN_ROOM_DIM: i32 = 4;

/// Tuning knobs for a [`Catacombs`] level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CatacombsConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Rooms to attempt to place.
    pub room_count: usize,
    /// Average room area as a fraction of the grid area, in (0, 1).
    pub room_area_fraction: f64,
    /// Uniform noise applied to sampled room widths.
    pub variance_x: i32,
    /// Uniform noise applied to sampled room heights.
    pub variance_y: i32,
    /// Minimum east-west clearance kept around each room.
    pub padding_x: i32,
    /// Minimum north-south clearance kept around each room.
    pub padding_y: i32,
    /// Hallway connections each room should end up with.
    pub halls_per_room: usize,
    /// Base hallway width in cells.
    pub hall_thickness: i32,
    /// Uniform noise applied per connection to the hallway width.
    pub hall_thickness_variance: i32,
    /// Randomly slide the bend of S-shaped hallways within the padding.
    pub shift_halls: bool,
}

impl Default for CatacombsConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            room_count: 6,
            room_area_fraction: 0.02,
            variance_x: 2,
            variance_y: 2,
            padding_x: 1,
            padding_y: 1,
            halls_per_room: 2,
            hall_thickness: 1,
            hall_thickness_variance: 0,
            shift_halls: false,
        }
    }
}

impl CatacombsConfig {
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
        if self.variance_x < 0
            || self.variance_y < 0
            || self.padding_x < 0
            || self.padding_y < 0
            || self.hall_thickness_variance < 0
        {
            bail!("Variance and padding settings must be non-negative");
        }
        if self.hall_thickness < 1 {
            bail!("Hall thickness must be at least 1, got {}", self.hall_thickness);
        }
        if self.width <= MIN_ROOM_DIM || self.height <= MIN_ROOM_DIM {
            bail!(
                "A {MIN_ROOM_DIM}-cell room cannot fit a {}x{} grid",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

/// Nethack-style level: rectangular rooms joined by routed hallways.
///
/// Construct with a validated config, then call [`Catacombs::gen_rooms`] and
/// [`Catacombs::gen_halls`] in that order; each pass fully replaces its own
/// and all downstream state when `reset` is set.
#[derive(Clone, Debug)]
pub struct Catacombs {
    config: CatacombsConfig,
    size: Frame,
    room_avg_dim: Point,
    rooms: Vec<Rectangle>,
    halls: Vec<Line>,
    hall_counts: Vec<usize>,
}

impl Catacombs {
    /// Creates a generator, failing fast on inconsistent or impossible
    /// configurations.
    pub fn new(config: CatacombsConfig) -> Result<Self> {
        config.validate()?;
        let size = Frame::new(config.width, config.height);
        let scale = config.room_area_fraction.sqrt();
        let room_avg_dim = Point::new(
            (f64::from(config.width) * scale) as i32,
            (f64::from(config.height) * scale) as i32,
        );
        Ok(Self {
            config,
            size,
            room_avg_dim,
            rooms: Vec::new(),
            halls: Vec::new(),
            hall_counts: Vec::new(),
        })
    }

    /// The configuration this generator was built from.
    pub const fn config(&self) -> &CatacombsConfig {
        &self.config
    }

    /// Grid frame of the level.
    pub const fn size(&self) -> Frame {
        self.size
    }

    /// Rooms placed by the last [`Catacombs::gen_rooms`] pass.
    pub fn rooms(&self) -> &[Rectangle] {
        &self.rooms
    }

    /// Hallway segments routed by the last [`Catacombs::gen_halls`] pass.
    pub fn halls(&self) -> &[Line] {
        &self.halls
    }

    /// Per-room hallway connection counters, parallel to `rooms`.
    pub fn hall_counts(&self) -> &[usize] {
        &self.hall_counts
    }

    // Closed-form attempt ceiling: denser or more-padded configurations get
    // proportionally more tries before placement settles for a partial level.
    fn max_attempts(&self) -> usize {
        let density = self.config.room_count as f64 * self.config.room_area_fraction;
        let pad_area = f64::from((self.config.padding_x * self.config.padding_y).max(1));
        (self.config.room_count as f64
            * pad_area
            * 10_f64.powf(-(1.0 - density).ln())
            * std::f64::consts::E.powf(1.0 + density))
        .round() as usize
    }

    /// Randomly places rooms by rejection sampling.
    ///
    /// No-op unless `reset` is set; otherwise replaces rooms, halls and
    /// counters. A candidate is kept when its padded footprint clears every
    /// previously accepted room. Placement stops at the attempt ceiling
    /// (closed-form, or `attempts_override`) with a warning and a partial
    /// level. Returns the number of rooms placed.
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
        self.halls.clear();
        self.hall_counts.clear();

        let max_attempts = attempts_override.unwrap_or_else(|| self.max_attempts());
        let pb = ProgressBar::new(self.config.room_count as u64);
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rooms")
                .unwrap()
                .progress_chars("##-"),
        );

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

            let noise = Point::new(
                rng.random_range(-self.config.variance_x..=self.config.variance_x),
                rng.random_range(-self.config.variance_y..=self.config.variance_y),
            );
            let size = Point::new(
                (self.room_avg_dim.x + noise.x).max(MIN_ROOM_DIM),
                (self.room_avg_dim.y + noise.y).max(MIN_ROOM_DIM),
            );
            let space = self.size - size;
            if space.x < 1 || space.y < 1 {
                continue;
            }
            let origin = Point::new(
                rng.random_range(0..space.x),
                rng.random_range(0..space.y),
            );
            let room = Rectangle::new(origin, size.x, size.y);
            let padded = Rectangle::new(
                Point::new(
                    (origin.x - self.config.padding_x).max(0),
                    (origin.y - self.config.padding_y).max(0),
                ),
                size.x + 2 * self.config.padding_x,
                size.y + 2 * self.config.padding_y,
            );

            if self.rooms.iter().all(|placed| !padded.overlaps(placed)) {
                self.rooms.push(room);
                pb.inc(1);
            }
        }
        pb.finish_and_clear();

        self.hall_counts = vec![0; self.rooms.len()];
        self.rooms.len()
    }

    /// Routes hallways between nearest-neighbour rooms until every room meets
    /// its mutual connection quota.
    ///
    /// No-op unless `reset` is set. A lone room (or an empty level) routes
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

            // Cyclic walk of the nearest-first order; connections are mutual,
            // so rooms visited late often arrive already satisfied.
            let mut next = 0;
            while self.hall_counts[i] < self.config.halls_per_room {
                let partner = order[next].0;
                self.route_hall(rng, i, partner);
                self.hall_counts[i] += 1;
                self.hall_counts[partner] += 1;
                next = (next + 1) % order.len();
            }
        }
    }

    fn route_hall(&mut self, rng: &mut impl Rng, i: usize, k: usize) {
        let room = &self.rooms[i];
        let other = &self.rooms[k];
        let (room_orient, room_wall) = room.nearest_wall(other);
        let (other_orient, other_wall) = other.nearest_wall(room);
        debug_assert!(
            !room_wall.is_empty() && !other_wall.is_empty(),
            "minimum-size rooms always hold doorway candidates"
        );

        let doorway = room_wall[rng.random_range(0..room_wall.len())];
        let doorway_other = other_wall[rng.random_range(0..other_wall.len())];

        let variance = self.config.hall_thickness_variance;
        let thickness =
            (self.config.hall_thickness + rng.random_range(-variance..=variance)).max(1);

        let segments = if room_orient.is_horizontal() == other_orient.is_horizontal() {
            let pad_along = if room_orient.is_horizontal() {
                self.config.padding_x
            } else {
                self.config.padding_y
            };
            let shift_budget = if self.config.shift_halls {
                (pad_along - thickness).max(0)
            } else {
                0
            };
            route_parallel(
                rng,
                doorway,
                room_orient,
                doorway_other,
                other_orient,
                thickness,
                shift_budget,
            )
        } else {
            route_perpendicular(doorway, room_orient, doorway_other, other_orient, thickness)
        };
        self.halls.extend(segments);
    }

    /// Builds the named layer stack for the renderer from the current rooms
    /// and halls, as a pure function of the collections.
    pub fn image_data(&self) -> Layers {
        let frame = self.size;
        let mut room_fill = mask::empty(frame);
        let mut room_edge = mask::empty(frame);
        for room in &self.rooms {
            mask::merge(&mut room_fill, &room.mask_fill(frame));
            mask::merge(&mut room_edge, &room.mask_edge(frame));
        }
        let mut hall = mask::empty(frame);
        for line in &self.halls {
            mask::merge(&mut hall, &line.mask_fill(frame));
        }

        let door = mask::intersection(&room_edge, &hall);
        Layers {
            floor_room: mask::difference(&room_fill, &room_edge),
            floor_hall: mask::difference(&hall, &room_fill),
            floor_carve: mask::empty(frame),
            wall: mask::difference(&room_edge, &door),
            door,
            all: mask::union(&room_fill, &hall),
        }
    }

    /// Renders the level to a single boolean grid.
    pub fn draw(&self, mode: DrawMode) -> Mask {
        self.image_data().select(mode)
    }
}

impl Display for Catacombs {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "a {} by {} catacombs of {} rooms at about {:.0}% area each, \
             averaging {} hallways out of each room ({} placed, {} hall segments)",
            self.config.width,
            self.config.height,
            self.config.room_count,
            self.config.room_area_fraction * 100.0,
            self.config.halls_per_room,
            self.rooms.len(),
            self.halls.len()
        )
    }
}

// Offset sequence +1, -1, +2, -2, ... used for hallway thickness copies.
fn zigzag(count: i32) -> impl Iterator<Item = i32> {
    (1..)
        .flat_map(|magnitude| [magnitude, -magnitude])
        .take(count.max(0) as usize)
}

/// Builds the three-segment S-hall joining two doorways on parallel walls,
/// plus offset copies for thickness.
///
/// The along-axis run splits between the two stubs, remainder to the first;
/// when shifting is enabled the split slides by a uniform draw within the
/// padding-minus-thickness budget. Each thickness copy steps one cell clear
/// of the walls (keeping both doorways a single cell wide) and carries the
/// split point with its offset, so the copies wind past each other as a
/// staircase; every copy's connector is recomputed from that copy's own stub
/// endpoints.
fn route_parallel(
    rng: &mut impl Rng,
    start_a: Point,
    orient_a: Orientation,
    start_b: Point,
    orient_b: Orientation,
    thickness: i32,
    shift_budget: i32,
) -> Vec<Line> {
    let delta = start_a - start_b;
    let (along, across) = if orient_a.is_horizontal() {
        (delta.x.abs(), delta.y.abs())
    } else {
        (delta.y.abs(), delta.x.abs())
    };

    let mut stub_a_len = along / 2 + 1 + along % 2;
    let mut stub_b_len = along / 2 + 1;
    if shift_budget > 0 {
        let shift = rng.random_range(-shift_budget..=shift_budget);
        if stub_a_len + shift >= 1 && stub_b_len - shift >= 1 {
            stub_a_len += shift;
            stub_b_len -= shift;
        }
    }

    let stub_a = Line::new(start_a, stub_a_len, orient_a);
    let stub_b = Line::new(start_b, stub_b_len, orient_b);
    let connector_orient = stub_a.nearest_orientation(&stub_b, AzimuthMode::Endpoint);
    let connector = Line::new(stub_a.endpoint(), across + 1, connector_orient);

    let mut segments = vec![stub_a, stub_b, connector];

    let lateral = orient_a.perpendicular();
    for offset in zigzag(thickness - 1) {
        let copy_a_len = stub_a_len - 1 + offset;
        let copy_b_len = stub_b_len - 1 - offset;
        if copy_a_len < 1 || copy_b_len < 1 {
            continue;
        }
        let copy_a = Line::new(
            start_a + orient_a.delta() + lateral * offset,
            copy_a_len,
            orient_a,
        );
        let copy_b = Line::new(
            start_b + orient_b.delta() + lateral * offset,
            copy_b_len,
            orient_b,
        );
        let copy_orient = copy_a.nearest_orientation(&copy_b, AzimuthMode::Endpoint);
        let copy_delta = copy_b.endpoint() - copy_a.endpoint();
        let copy_span = if copy_orient.is_horizontal() {
            copy_delta.x.abs()
        } else {
            copy_delta.y.abs()
        };
        let copy_connector = Line::new(copy_a.endpoint(), copy_span + 1, copy_orient);
        segments.push(copy_a);
        segments.push(copy_b);
        segments.push(copy_connector);
    }
    segments
}

/// Builds the two-segment L-hall joining doorways on perpendicular walls.
///
/// Each leg spans the full delta along its own wall's axis and the two meet
/// at the corner. Thickness copies step one cell clear of the walls with
/// mirrored offset signs, so they always stack into the interior of the turn
/// and shorten just enough to keep the corner covered.
fn route_perpendicular(
    start_a: Point,
    orient_a: Orientation,
    start_b: Point,
    orient_b: Orientation,
    thickness: i32,
) -> Vec<Line> {
    let delta = start_a - start_b;
    let span = |orient: Orientation| {
        if orient.is_horizontal() {
            delta.x.abs()
        } else {
            delta.y.abs()
        }
    };
    let leg_a = span(orient_a);
    let leg_b = span(orient_b);

    let mut segments = vec![
        Line::new(start_a, leg_a + 1, orient_a),
        Line::new(start_b, leg_b + 1, orient_b),
    ];

    // The interior of the elbow lies opposite each leg's partner direction.
    let inward_a = orient_b.opposite().delta();
    let inward_b = orient_a.opposite().delta();
    for step in 1..thickness {
        let copy_a_len = leg_a - step;
        let copy_b_len = leg_b - step;
        if copy_a_len < 1 || copy_b_len < 1 {
            break;
        }
        segments.push(Line::new(
            start_a + orient_a.delta() + inward_a * step,
            copy_a_len,
            orient_a,
        ));
        segments.push(Line::new(
            start_b + orient_b.delta() + inward_b * step,
            copy_b_len,
            orient_b,
        ));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_config() -> CatacombsConfig {
        CatacombsConfig {
            width: 48,
            height: 48,
            room_count: 5,
            room_area_fraction: 0.02,
            variance_x: 2,
            variance_y: 2,
            padding_x: 2,
            padding_y: 2,
            halls_per_room: 1,
            ..CatacombsConfig::default()
        }
    }

    #[test]
    fn invalid_configurations_fail_fast() {
        let mut zero = CatacombsConfig::default();
        zero.width = 0;
        assert!(Catacombs::new(zero).is_err());

        let mut saturated = CatacombsConfig::default();
        saturated.room_area_fraction = 0.3;
        saturated.room_count = 4;
        assert!(Catacombs::new(saturated).is_err());

        let mut cramped = CatacombsConfig::default();
        cramped.width = 4;
        assert!(Catacombs::new(cramped).is_err());
    }

    #[test]
    fn padded_rooms_clear_every_other_room() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut dungeon = Catacombs::new(test_config()).unwrap();
        let placed = dungeon.gen_rooms(&mut rng, true, Some(4000));
        assert!(placed >= 2, "expected at least two rooms, placed {placed}");

        let config = dungeon.config().clone();
        for (i, room) in dungeon.rooms().iter().enumerate() {
            let padded = Rectangle::new(
                Point::new(
                    (room.origin().x - config.padding_x).max(0),
                    (room.origin().y - config.padding_y).max(0),
                ),
                room.width() + 2 * config.padding_x,
                room.height() + 2 * config.padding_y,
            );
            for (j, other) in dungeon.rooms().iter().enumerate() {
                if i != j {
                    assert!(!padded.overlaps(other), "rooms {i} and {j} violate padding");
                }
            }
        }
    }

    #[test]
    fn rooms_stay_inside_the_grid() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut dungeon = Catacombs::new(test_config()).unwrap();
        dungeon.gen_rooms(&mut rng, true, Some(4000));
        for room in dungeon.rooms() {
            assert!(room.is_in_bounds(dungeon.size()));
        }
    }

    #[test]
    fn exhausted_placement_reports_a_partial_level() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = CatacombsConfig {
            width: 24,
            height: 24,
            room_count: 30,
            room_area_fraction: 0.03,
            ..CatacombsConfig::default()
        };
        let mut dungeon = Catacombs::new(config).unwrap();
        let placed = dungeon.gen_rooms(&mut rng, true, Some(50));
        assert!(placed < 30);
        assert_eq!(dungeon.hall_counts().len(), placed);
    }

    #[test]
    fn every_room_meets_its_hall_quota() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut dungeon = Catacombs::new(test_config()).unwrap();
        let placed = dungeon.gen_rooms(&mut rng, true, Some(4000));
        assert!(placed >= 2);
        dungeon.gen_halls(&mut rng, true);
        for &count in dungeon.hall_counts() {
            assert!(count >= dungeon.config().halls_per_room);
        }
        assert!(!dungeon.halls().is_empty());
    }

    #[test]
    fn parallel_route_stubs_meet_their_connector() {
        let mut rng = StdRng::seed_from_u64(0);
        // Facing east/west walls, doorways offset both ways.
        let segments = route_parallel(
            &mut rng,
            Point::new(10, 10),
            Orientation::East,
            Point::new(20, 16),
            Orientation::West,
            1,
            0,
        );
        assert_eq!(segments.len(), 3);
        let stub_a = segments[0];
        let stub_b = segments[1];
        let connector = segments[2];
        // Both stubs end on the connector's column.
        assert_eq!(stub_a.endpoint().x, stub_b.endpoint().x);
        assert_eq!(connector.origin(), stub_a.endpoint());
        assert_eq!(connector.endpoint(), stub_b.endpoint());
    }

    #[test]
    fn thick_parallel_routes_keep_single_cell_doorways() {
        let mut rng = StdRng::seed_from_u64(0);
        let start_a = Point::new(10, 10);
        let start_b = Point::new(21, 15);
        let segments = route_parallel(
            &mut rng,
            start_a,
            Orientation::East,
            start_b,
            Orientation::West,
            3,
            0,
        );
        assert_eq!(segments.len(), 9);

        let frame = Frame::new(40, 40);
        let mut covered = mask::empty(frame);
        for segment in &segments {
            mask::merge(&mut covered, &segment.mask_fill(frame));
        }
        // Offset copies never touch the wall columns beside the doorways.
        for lateral in [-2, -1, 1, 2] {
            assert!(!mask::get(&covered, Point::new(start_a.x, start_a.y + lateral)));
            assert!(!mask::get(&covered, Point::new(start_b.x, start_b.y + lateral)));
        }
        assert!(mask::get(&covered, start_a));
        assert!(mask::get(&covered, start_b));
    }

    #[test]
    fn perpendicular_route_legs_share_the_corner() {
        let segments = route_perpendicular(
            Point::new(5, 8),
            Orientation::East,
            Point::new(15, 2),
            Orientation::South,
            1,
        );
        assert_eq!(segments.len(), 2);
        let corner = segments[0].endpoint();
        assert_eq!(corner, Point::new(15, 8));
        assert_eq!(segments[1].endpoint(), corner);
    }

    #[test]
    fn thick_perpendicular_copies_bias_into_the_elbow() {
        let segments = route_perpendicular(
            Point::new(5, 8),
            Orientation::East,
            Point::new(15, 2),
            Orientation::South,
            3,
        );
        assert_eq!(segments.len(), 6);
        // Copies sit north/west of the base legs: inside the turn.
        assert_eq!(segments[2].origin(), Point::new(6, 7));
        assert_eq!(segments[3].origin(), Point::new(14, 3));
        assert_eq!(segments[2].endpoint(), Point::new(14, 7));
        assert_eq!(segments[3].endpoint(), Point::new(14, 7));
    }

    #[test]
    fn zigzag_alternates_and_grows() {
        let offsets: Vec<i32> = zigzag(5).collect();
        assert_eq!(offsets, vec![1, -1, 2, -2, 3]);
        assert_eq!(zigzag(0).count(), 0);
    }

    #[test]
    fn layers_partition_consistently() {
        let mut rng = StdRng::seed_from_u64(77);
        let mut dungeon = Catacombs::new(test_config()).unwrap();
        dungeon.gen_rooms(&mut rng, true, Some(4000));
        dungeon.gen_halls(&mut rng, true);
        let layers = dungeon.image_data();

        // Doors are hall cells on walls; they never appear in the wall layer.
        assert!(!mask::intersects(&layers.door, &layers.wall));
        // Room floor and hall floor are disjoint.
        assert!(!mask::intersects(&layers.floor_room, &layers.floor_hall));
        // Everything drawn is accounted for in the composite.
        let outline = dungeon.draw(DrawMode::Outline);
        assert_eq!(mask::intersection(&outline, &layers.all), outline);
    }
}
