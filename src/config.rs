// All tunable simulation constants in one place.

// Simulation
pub const FIXED_DT: f32 = 1.0 / 25.0;
pub const DEFAULT_FRAMES: u32 = 250;

// Spatial hash
pub const SPATIAL_CELL_SIZE: f32 = 4.0;
/// Squared distances of points behind a biased query are scaled by this.
pub const BEHIND_DISTANCE_PENALTY: f32 = 10.0;

// Random tables
pub const FRAND_TABLE_SIZE: usize = 1024;
pub const FRAND_TABLE_SEED: u64 = 0x5eed_b01d;

// Rules
pub const FLOCK_NEIGHBORS: usize = 10;
pub const HEAD_ON_DOT: f32 = -0.99;
pub const COLLISION_TIME_HORIZON: f32 = 2.0;
pub const LEADER_STILL_SPEED_SQ: f32 = 0.01;
pub const LEADER_BLOCK_HORIZON: f32 = 3.0;
pub const FACING_DOT: f32 = 0.5;
pub const WANDER_HEADING_WEIGHT: f32 = 1.1;

// Locomotion
pub const GROUND_RAY_LENGTH: f32 = 2000.0;
pub const LIFTOFF_ALIGNMENT: f32 = 0.95;
pub const FALL_LAND_MARGIN: f32 = 1.01;
pub const LAND_FALL_MARGIN: f32 = 1.1;
pub const MIN_HEADING_SPEED: f32 = 0.1;
pub const DAMPING_SCALE: f32 = 0.2;

// Numerics
pub const EPSILON: f32 = 1.0e-6;

// Persistence
pub const SAVE_VERSION: u32 = 1;
