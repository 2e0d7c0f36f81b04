//! Deterministic lattice hashing.
//!
//! Every per-cell quantity (value, jitter direction) is a pure function of the
//! integer cell index and the world seed. There is no RNG state, so any thread
//! can recompute any cell at any time and get bit-identical results.

use glam::{IVec2, Vec2};

const X_PRIME: i32 = 1619;
const Y_PRIME: i32 = 31337;
const HASH_MULTIPLIER: i32 = 60493;

/// Seed offset used for the jitter direction so it is decorrelated from
/// [`cell_value`].
const JITTER_SEED_OFFSET: i32 = 0x2545_F491;

/// 2^24: cell values keep the top 24 bits of the hash, which is exactly the
/// mantissa width of `f32`.
const VALUE_SCALE: f32 = 16_777_216.0;

/// Multiplicative hash of a lattice index.
///
/// All arithmetic wraps; the result covers the whole `i32` range.
#[inline]
pub fn hash2(seed: i32, index: IVec2) -> i32 {
    let mut h = seed;
    h ^= X_PRIME.wrapping_mul(index.x);
    h ^= Y_PRIME.wrapping_mul(index.y);
    h = h.wrapping_mul(h).wrapping_mul(h).wrapping_mul(HASH_MULTIPLIER);
    (h >> 13) ^ h
}

/// Deterministic value in `[0, 1)` for a cell index.
#[inline]
pub fn cell_value(seed: i32, index: IVec2) -> f32 {
    ((hash2(seed, index) as u32) >> 8) as f32 / VALUE_SCALE
}

/// Hashed unit vector used to jitter a cell's centroid away from its lattice
/// point.
///
/// Uses `libm` trigonometry so the direction is bit-exact across platforms.
#[inline]
pub fn cell_unit_vector(seed: i32, index: IVec2) -> Vec2 {
    let h = hash2(seed.wrapping_add(JITTER_SEED_OFFSET), index) as u32;
    let angle = (h >> 16) as f32 / 65_536.0 * std::f32::consts::TAU;
    Vec2::new(libm::cosf(angle), libm::sinf(angle))
}

/// Jittered lattice position of a cell in *frequency space* (before dividing
/// by the cell frequency).
#[inline]
pub fn jittered_lattice_point(seed: i32, jitter: f32, index: IVec2) -> Vec2 {
    index.as_vec2() + cell_unit_vector(seed, index) * jitter
}
