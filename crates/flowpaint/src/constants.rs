/// Encoded value of the zero flow vector in both channels.
pub const NEUTRAL_CHANNEL: f32 = 0.5;

/// Encoded texel of the zero flow vector.
pub const NEUTRAL_TEXEL: [f32; 2] = [NEUTRAL_CHANNEL, NEUTRAL_CHANNEL];

/// Tile size used for undo snapshots.
pub const DEFAULT_TILE_SIZE: u32 = 128;

/// Ray-triangle rejection epsilon (parallel rays and hits behind the origin).
pub const RAY_EPSILON: f32 = 1e-6;

/// UV determinant below which a triangle is excluded from tangent accumulation.
pub const UV_DET_EPSILON: f32 = 1e-8;

/// Length below which an accumulated tangent is considered degenerate.
pub const TANGENT_EPSILON: f32 = 1e-8;

/// Maximum number of commands kept by [`crate::History`].
pub const MAX_HISTORY: usize = 100;

/// Upper bound on stamps synthesized for a single input segment.
pub const MAX_INTERPOLATED_STAMPS: usize = 256;
