// Board entities and placement rules: difficulty tiers, food, rocks, and the
// player color palette.

use rand::Rng;

use crate::domain::grid::Coordinates;
use crate::domain::player::Player;

pub const FOOD_COLOR: &str = "#f84242";
pub const OBSTACLE_COLOR: &str = "#999999";

/// Rocks generated once per session at the Nightmare tier.
pub const OBSTACLE_COUNT: usize = 5;

/// Cap on rejection-sampling draws before placement gives up, so a packed
/// board fails loudly instead of hanging.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// Handed to a joining player when the palette has been exhausted. Colors
/// are never returned to the pool.
pub const FALLBACK_COLOR: &str = "#008000";

/// Ordinal difficulty of a session. Hazards accumulate with severity: walls
/// become fatal from `Hard`, rocks appear at `Nightmare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Difficulty::Easy),
            1 => Some(Difficulty::Hard),
            2 => Some(Difficulty::Nightmare),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Hard => 1,
            Difficulty::Nightmare => 2,
        }
    }

    /// Out-of-bounds kills instead of wrapping.
    pub fn walls_are_fatal(self) -> bool {
        self >= Difficulty::Hard
    }

    /// Rock hazards exist and are fatal.
    pub fn has_rocks(self) -> bool {
        self >= Difficulty::Nightmare
    }
}

/// The single food item of a session; relocated each time it is eaten.
#[derive(Debug, Clone)]
pub struct Food {
    pub position: Coordinates,
    pub color: String,
}

impl Food {
    pub fn new() -> Self {
        Self {
            position: Coordinates::new(0, 0),
            color: FOOD_COLOR.to_string(),
        }
    }
}

impl Default for Food {
    fn default() -> Self {
        Self::new()
    }
}

/// Immovable rock hazard, fixed for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub position: Coordinates,
    pub color: String,
}

impl Obstacle {
    pub fn new(position: Coordinates) -> Self {
        Self {
            position,
            color: OBSTACLE_COLOR.to_string(),
        }
    }
}

/// No free cell was found within the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementExhausted;

impl std::fmt::Display for PlacementExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no free board cell found within the placement budget")
    }
}

impl std::error::Error for PlacementExhausted {}

/// Draws a food cell that overlaps neither a rock (when the tier has rocks)
/// nor any snake segment.
pub fn place_food<'a, R, P>(
    rng: &mut R,
    grid_size: i32,
    difficulty: Difficulty,
    obstacles: &[Obstacle],
    players: P,
) -> Result<Coordinates, PlacementExhausted>
where
    R: Rng,
    P: Iterator<Item = &'a Player> + Clone,
{
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let candidate = Coordinates::new(
            rng.gen_range(0..grid_size),
            rng.gen_range(0..grid_size),
        );

        let on_rock = difficulty.has_rocks()
            && obstacles.iter().any(|rock| rock.position == candidate);
        let on_snake = players
            .clone()
            .any(|player| player.snake.occupies(candidate));

        if !on_rock && !on_snake {
            return Ok(candidate);
        }
    }
    Err(PlacementExhausted)
}

/// Generates the fixed rock set for a new session. Runs before food or any
/// snake exists, so only rock-on-rock overlap is rejected. A starved draw
/// ends generation early with however many rocks were placed.
pub fn generate_obstacles<R: Rng>(rng: &mut R, grid_size: i32) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(OBSTACLE_COUNT);
    'outer: for _ in 0..OBSTACLE_COUNT {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let candidate = Coordinates::new(
                rng.gen_range(0..grid_size),
                rng.gen_range(0..grid_size),
            );
            if !obstacles.iter().any(|rock| rock.position == candidate) {
                obstacles.push(Obstacle::new(candidate));
                continue 'outer;
            }
        }
        tracing::warn!(
            placed = obstacles.len(),
            wanted = OBSTACLE_COUNT,
            "obstacle placement starved; continuing with partial set"
        );
        break;
    }
    obstacles
}

/// Finite palette handed out to joining players. Colors are drawn at random
/// without replacement and never returned; once empty, every later join gets
/// the fallback color.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<&'static str>,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self {
            colors: vec!["#008000", "#425ff8", "#f8ec42", "#42eef8", "#bc42f8"],
        }
    }

    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> String {
        if self.colors.is_empty() {
            return FALLBACK_COLOR.to_string();
        }
        let index = rng.gen_range(0..self.colors.len());
        self.colors.swap_remove(index).to_string()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}
