//! Floating-point comparison discipline for simulation times.
//!
//! These helpers are used for save-point scheduling and loop termination
//! only, never inside solver numerics.

/// "Small" for simulated-time comparisons.
pub const EPSILON: f64 = 1e-15;

/// Floor that tolerates values sitting a hair below an integer.
///
/// `x` is expected to be a non-negative time ratio; the integer part is
/// taken by truncation and bumped up when `x` is within [`EPSILON`] of the
/// next integer.
pub fn epsilon_floor(x: f64) -> i64 {
    let truncated = x as i64;
    let next = truncated.saturating_add(1);
    if next as f64 - x < EPSILON {
        next
    } else {
        truncated
    }
}

/// Whether two times are indistinguishable at simulation resolution.
pub fn epsilon_equals(x: f64, y: f64) -> bool {
    (x - y).abs() < EPSILON
}
