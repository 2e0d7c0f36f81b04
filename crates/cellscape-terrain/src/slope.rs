//! Deterministic placement of slopes on cell boundaries.
//!
//! For every pair of neighbouring cells two of the eight compass octants are
//! chosen as "sloped". A boundary whose direction (centroid to centroid) falls
//! on one of them gets a ramp; any other boundary with a height change is a
//! cliff. Neighbouring regions evaluate this independently, so the answer has
//! to be identical no matter which cell of the pair asks.

use std::cmp::Ordering;

use cellscape_noise::{CellRef, FractalNoise, FractalParams, FractalType};
use glam::Vec2;

/// One of the eight compass directions, counter-clockwise from +X.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Octant(u8);

impl Octant {
    /// Wrap a raw octant number.
    ///
    /// # Panics
    ///
    /// Panics if `value >= 8`; callers only construct octants from bounded
    /// rounding, so anything else is a logic error.
    pub fn new(value: u8) -> Self {
        assert!(value < 8, "octant index {value} out of range 0..8");
        Self(value)
    }

    /// Raw octant number in `0..8`.
    pub fn get(self) -> u8 {
        self.0
    }

    /// The octant pointing the other way.
    pub fn opposite(self) -> Self {
        Self((self.0 + 4) % 8)
    }

    /// Octant closest to the direction of `d`.
    pub fn from_direction(d: Vec2) -> Self {
        let angle = libm::atan2f(d.y, d.x);
        let steps = libm::roundf(angle / std::f32::consts::FRAC_PI_4) as i32;
        Self::new(steps.rem_euclid(8) as u8)
    }

    /// Octant for a `[0, 1]` parameter: `round(lerp(0, 7, t))`.
    fn from_unit(t: f32) -> Self {
        let raw = libm::roundf(7.0 * t);
        if !(0.0..=7.0).contains(&raw) {
            panic!("octant parameter {t} produced out-of-range octant {raw}");
        }
        Self::new(raw as u8)
    }
}

/// Total order of cells used to decide which side of a pair is "lower".
fn cell_order(a: &CellRef, b: &CellRef) -> Ordering {
    a.value
        .total_cmp(&b.value)
        .then(a.index.x.cmp(&b.index.x))
        .then(a.index.y.cmp(&b.index.y))
}

/// Chooses sloped sides for cell pairs.
#[derive(Clone, Debug)]
pub struct SlopeSelector {
    noise: FractalNoise,
}

impl SlopeSelector {
    /// Sampling scale applied to cell values before the pair noise lookup.
    const PAIR_NOISE_SCALE: f64 = 57.31;

    /// Create a selector whose second candidate comes from noise seeded
    /// with `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            noise: FractalNoise::new(FractalParams {
                seed,
                frequency: Self::PAIR_NOISE_SCALE,
                octaves: 1,
                fractal_type: FractalType::None,
                ..Default::default()
            }),
        }
    }

    /// Pair noise in `[0, 1]`, symmetric in its arguments.
    fn pair_noise(&self, a: f32, b: f32) -> f32 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.noise.sample01(lo as f64, hi as f64) as f32
    }

    /// The two sloped octants of the pair, as seen from `current`.
    pub fn sloped_octants(&self, current: &CellRef, adjacent: &CellRef) -> [Octant; 2] {
        let mean = (current.value + adjacent.value) * 0.5;
        let a = Octant::from_unit(mean);
        let b = Octant::from_unit(self.pair_noise(current.value, adjacent.value));
        if cell_order(current, adjacent) == Ordering::Greater {
            [a.opposite(), b.opposite()]
        } else {
            [a, b]
        }
    }

    /// Direction of the boundary as seen from `current`.
    ///
    /// Always derived from the lower cell's view and rotated for the upper
    /// one, so both cells of a pair see exactly opposite octants.
    pub fn boundary_octant(&self, current: &CellRef, adjacent: &CellRef) -> Octant {
        if cell_order(current, adjacent) == Ordering::Greater {
            Octant::from_direction(current.position - adjacent.position).opposite()
        } else {
            Octant::from_direction(adjacent.position - current.position)
        }
    }

    /// Whether the boundary between the two cells carries a slope.
    pub fn is_sloped(&self, current: &CellRef, adjacent: &CellRef) -> bool {
        if current.index == adjacent.index {
            return false;
        }
        let direction = self.boundary_octant(current, adjacent);
        self.sloped_octants(current, adjacent).contains(&direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn cell(x: i32, y: i32, value: f32) -> CellRef {
        CellRef {
            position: Vec2::new(x as f32 * 10.0, y as f32 * 10.0),
            index: IVec2::new(x, y),
            value,
        }
    }

    #[test]
    fn test_octant_from_direction() {
        assert_eq!(Octant::from_direction(Vec2::X), Octant::new(0));
        assert_eq!(Octant::from_direction(Vec2::new(1.0, 1.0)), Octant::new(1));
        assert_eq!(Octant::from_direction(Vec2::Y), Octant::new(2));
        assert_eq!(Octant::from_direction(-Vec2::X), Octant::new(4));
        assert_eq!(Octant::from_direction(-Vec2::Y), Octant::new(6));
        assert_eq!(Octant::from_direction(Vec2::new(1.0, -1.0)), Octant::new(7));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_octant_out_of_range_panics() {
        let _ = Octant::new(8);
    }

    #[test]
    fn test_opposite_is_involution() {
        for i in 0..8 {
            let o = Octant::new(i);
            assert_eq!(o.opposite().opposite(), o);
            assert_ne!(o.opposite(), o);
        }
    }

    #[test]
    fn test_mean_candidate_matches_formula() {
        let selector = SlopeSelector::new(3);
        let low = cell(0, 0, 0.2);
        let high = cell(1, 0, 0.6);
        // round(lerp(0, 7, 0.4)) = round(2.8) = 3
        assert_eq!(selector.sloped_octants(&low, &high)[0], Octant::new(3));
        // Seen from the higher cell, rotated by 180 degrees.
        assert_eq!(selector.sloped_octants(&high, &low)[0], Octant::new(7));
    }

    #[test]
    fn test_both_sides_agree() {
        let selector = SlopeSelector::new(77);
        let mut sloped = 0;
        for i in 0..500 {
            let a = cell(i % 23, i / 23, (i as f32 * 0.618_034).fract());
            let b = cell(i % 23 + (i % 3) - 1, i / 23 + 1, (i as f32 * 0.414_214).fract());
            let ab = selector.is_sloped(&a, &b);
            let ba = selector.is_sloped(&b, &a);
            assert_eq!(ab, ba, "pair {i} disagrees");
            assert_eq!(
                selector.boundary_octant(&a, &b),
                selector.boundary_octant(&b, &a).opposite()
            );
            sloped += ab as usize;
        }
        assert!(sloped > 0, "some boundaries should be sloped");
        assert!(sloped < 500, "not every boundary should be sloped");
    }

    #[test]
    fn test_same_cell_is_never_sloped() {
        let selector = SlopeSelector::new(1);
        let a = cell(4, 4, 0.5);
        assert!(!selector.is_sloped(&a, &a));
    }
}
