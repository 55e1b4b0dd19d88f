//! SIMD configuration shared by the workspace crates.

/// Lane count used for all vectorised loops.
pub const LANES: usize = 8;
