//! Dense square buffer with a movable, resizable origin.
//!
//! Slots are addressed by world position: `round((world - root) / item_world_size)`
//! gives the 2D index, `y * width + x` the flat index. Writes outside the
//! current bounds grow the buffer first; reads outside the bounds are simply
//! "not set". Whether a slot holds data is tracked only by the parallel
//! presence array, so a default-valued `T` is never mistaken for real data.

use glam::{IVec2, Vec2};

/// Extra lines added beyond the overflow on every growth step.
pub const DEFAULT_GROWTH_PADDING: usize = 8;

/// Growth decision for one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AxisPlan {
    /// Added to an old index to obtain its new index.
    shift: i32,
    /// Width this axis needs after growth.
    needed: i32,
}

/// Plan growth along one axis so that index `target` fits.
///
/// `empty_lo`/`empty_hi` are the number of leading/trailing lines that hold no
/// data. Overflow below zero shifts everything up and consumes trailing empty
/// lines before widening; overflow past the end first reuses leading empty
/// lines by shifting down.
fn plan_axis(target: i32, width: i32, empty_lo: i32, empty_hi: i32, padding: i32) -> AxisPlan {
    if target < 0 {
        let overflow = -target;
        AxisPlan {
            shift: overflow + padding,
            needed: width + (overflow - empty_hi).max(0) + padding,
        }
    } else if target >= width {
        let overflow = target - (width - 1);
        let reuse = empty_lo.min(overflow);
        AxisPlan {
            shift: -reuse,
            needed: width + (overflow - empty_lo).max(0) + padding,
        }
    } else {
        AxisPlan {
            shift: 0,
            needed: width,
        }
    }
}

#[inline]
fn round_up_to_odd(width: usize) -> usize {
    if width % 2 == 0 { width + 1 } else { width }
}

/// Growable square grid of `T` keyed by world position.
#[derive(Clone, Debug)]
pub struct SparseGrid<T> {
    backing: Vec<T>,
    presence: Vec<bool>,
    width: usize,
    root: Vec2,
    item_world_size: f32,
    padding: usize,
    len: usize,
}

impl<T: Clone + Default> SparseGrid<T> {
    /// Create an empty grid of `initial_width` (rounded up to odd) slots per
    /// side, centred on `center`.
    pub fn new(center: Vec2, initial_width: usize, item_world_size: f32) -> Self {
        let width = round_up_to_odd(initial_width.max(1));
        let half = ((width - 1) / 2) as f32;
        Self {
            backing: vec![T::default(); width * width],
            presence: vec![false; width * width],
            width,
            root: center - Vec2::splat(half * item_world_size),
            item_world_size,
            padding: DEFAULT_GROWTH_PADDING,
            len: 0,
        }
    }

    /// Override the padding added on every growth step.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Store `item` at `world`, growing the grid first if needed.
    pub fn set(&mut self, item: T, world: Vec2) {
        let mut index = self.index_of(world);
        if !self.in_bounds(index) {
            self.grow_to_include(index);
            index = self.index_of(world);
        }
        let Some(flat) = self.flat(index) else {
            tracing::error!(?world, ?index, "sparse grid growth did not cover target");
            return;
        };
        if !self.presence[flat] {
            self.presence[flat] = true;
            self.len += 1;
        }
        self.backing[flat] = item;
    }

    /// Grow and re-root so that 2D index `target` (in current index space)
    /// lies inside the grid.
    fn grow_to_include(&mut self, target: IVec2) {
        let width = self.width as i32;
        let padding = self.padding as i32;
        let (lo_x, hi_x, lo_y, hi_y) = self.empty_margins();

        let plan_x = plan_axis(target.x, width, lo_x, hi_x, padding);
        let plan_y = plan_axis(target.y, width, lo_y, hi_y, padding);
        let new_width = round_up_to_odd(plan_x.needed.max(plan_y.needed).max(width) as usize);
        let shift = IVec2::new(plan_x.shift, plan_y.shift);

        let mut backing = vec![T::default(); new_width * new_width];
        let mut presence = vec![false; new_width * new_width];
        let old_backing = std::mem::take(&mut self.backing);
        let old_presence = std::mem::take(&mut self.presence);

        let mut dropped = 0usize;
        for (flat, (item, set)) in old_backing.into_iter().zip(old_presence).enumerate() {
            if !set {
                continue;
            }
            let old = IVec2::new((flat % self.width) as i32, (flat / self.width) as i32);
            let moved = old + shift;
            let bound = new_width as i32;
            if moved.x < 0 || moved.y < 0 || moved.x >= bound || moved.y >= bound {
                dropped += 1;
                continue;
            }
            let new_flat = moved.y as usize * new_width + moved.x as usize;
            backing[new_flat] = item;
            presence[new_flat] = true;
        }

        debug_assert_eq!(dropped, 0, "sparse grid growth dropped entries");
        if dropped > 0 {
            tracing::error!(dropped, "sparse grid growth dropped entries");
            self.len -= dropped;
        }

        tracing::trace!(
            old_width = self.width,
            new_width,
            shift_x = shift.x,
            shift_y = shift.y,
            "sparse grid grew"
        );

        self.root -= shift.as_vec2() * self.item_world_size;
        self.width = new_width;
        self.backing = backing;
        self.presence = presence;
    }

    /// Leading/trailing empty lines per axis: `(lo_x, hi_x, lo_y, hi_y)`.
    ///
    /// An empty grid reports the full width on every side.
    fn empty_margins(&self) -> (i32, i32, i32, i32) {
        let width = self.width as i32;
        let mut min = IVec2::splat(i32::MAX);
        let mut max = IVec2::splat(i32::MIN);
        for (flat, _) in self.presence.iter().enumerate().filter(|(_, set)| **set) {
            let index = IVec2::new((flat % self.width) as i32, (flat / self.width) as i32);
            min = min.min(index);
            max = max.max(index);
        }
        if self.len == 0 {
            return (width, width, width, width);
        }
        (min.x, width - 1 - max.x, min.y, width - 1 - max.y)
    }
}

impl<T> SparseGrid<T> {
    /// Slots per side.
    pub fn width(&self) -> usize {
        self.width
    }

    /// World position of index `(0, 0)`.
    pub fn root(&self) -> Vec2 {
        self.root
    }

    /// World distance between neighbouring slots.
    pub fn item_world_size(&self) -> f32 {
        self.item_world_size
    }

    /// Number of set slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot count (`width²`).
    pub fn capacity(&self) -> usize {
        self.backing.len()
    }

    /// 2D index of a world position, possibly outside the grid.
    #[inline]
    pub fn index_of(&self, world: Vec2) -> IVec2 {
        ((world - self.root) / self.item_world_size).round().as_ivec2()
    }

    /// World position of a 2D index.
    #[inline]
    pub fn world_position_of(&self, index: IVec2) -> Vec2 {
        self.root + index.as_vec2() * self.item_world_size
    }

    /// Flat index of a world position, or `None` when outside the grid.
    #[inline]
    pub fn flat_index(&self, world: Vec2) -> Option<usize> {
        self.flat(self.index_of(world))
    }

    /// Value at a world position, or `None` when unset or out of bounds.
    pub fn get(&self, world: Vec2) -> Option<&T> {
        self.get_index(self.index_of(world))
    }

    /// Value at a 2D index, or `None` when unset or out of bounds.
    pub fn get_index(&self, index: IVec2) -> Option<&T> {
        self.flat(index).and_then(|flat| self.get_flat(flat))
    }

    /// Value at a flat index, or `None` when unset or out of bounds.
    pub fn get_flat(&self, flat: usize) -> Option<&T> {
        match self.presence.get(flat) {
            Some(true) => self.backing.get(flat),
            _ => None,
        }
    }

    /// Whether a world position holds data.
    pub fn is_set(&self, world: Vec2) -> bool {
        self.is_set_index(self.index_of(world))
    }

    /// Whether a 2D index holds data.
    pub fn is_set_index(&self, index: IVec2) -> bool {
        self.flat(index).is_some_and(|flat| self.presence[flat])
    }

    /// Iterate over set slots as `(2D index, value)`, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &T)> + '_ {
        let width = self.width;
        self.presence
            .iter()
            .zip(&self.backing)
            .enumerate()
            .filter(|(_, (set, _))| **set)
            .map(move |(flat, (_, item))| {
                (IVec2::new((flat % width) as i32, (flat / width) as i32), item)
            })
    }

    #[inline]
    fn in_bounds(&self, index: IVec2) -> bool {
        let width = self.width as i32;
        index.x >= 0 && index.y >= 0 && index.x < width && index.y < width
    }

    #[inline]
    fn flat(&self, index: IVec2) -> Option<usize> {
        self.in_bounds(index)
            .then(|| index.y as usize * self.width + index.x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn assert_invariants<T>(grid: &SparseGrid<T>) {
        assert_eq!(grid.width % 2, 1, "width must stay odd");
        assert_eq!(grid.backing.len(), grid.width * grid.width);
        assert_eq!(grid.presence.len(), grid.backing.len());
        assert_eq!(grid.presence.iter().filter(|s| **s).count(), grid.len());
    }

    #[test]
    fn test_initial_width_is_odd_and_centred() {
        let grid = SparseGrid::<u32>::new(Vec2::new(10.0, -4.0), 4, 1.0);
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.root(), Vec2::new(8.0, -6.0));
        assert_eq!(grid.index_of(Vec2::new(10.0, -4.0)), IVec2::new(2, 2));
        assert_invariants(&grid);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 9, 1.0);
        grid.set(42_u32, Vec2::new(3.0, -2.0));
        assert_eq!(grid.get(Vec2::new(3.0, -2.0)), Some(&42));
        assert!(grid.is_set(Vec2::new(3.0, -2.0)));
        assert_eq!(grid.len(), 1);

        grid.set(7, Vec2::new(3.0, -2.0));
        assert_eq!(grid.get(Vec2::new(3.0, -2.0)), Some(&7));
        assert_eq!(grid.len(), 1, "overwrite must not double count");
    }

    #[test]
    fn test_unset_and_out_of_bounds_read_as_unset() {
        let grid = SparseGrid::<u32>::new(Vec2::ZERO, 9, 1.0);
        // Backing holds 0 here, but 0 is not data.
        assert_eq!(grid.get(Vec2::ZERO), None);
        assert!(!grid.is_set(Vec2::ZERO));
        assert_eq!(grid.get(Vec2::new(1_000.0, 0.0)), None);
        assert!(!grid.is_set(Vec2::new(-1_000.0, -1_000.0)));
        assert_eq!(grid.get_flat(usize::MAX), None);
    }

    #[test]
    fn test_growth_in_every_direction_preserves_values() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 5, 1.0);
        let positions = [
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(-20.0, 0.0),
            Vec2::new(0.0, 33.0),
            Vec2::new(0.0, -41.0),
            Vec2::new(57.0, -57.0),
            Vec2::new(-63.0, 64.0),
        ];
        for (i, p) in positions.iter().enumerate() {
            grid.set(i as u32 + 1, *p);
            assert_invariants(&grid);
            for (j, q) in positions.iter().enumerate().take(i + 1) {
                assert_eq!(grid.get(*q), Some(&(j as u32 + 1)), "lost {q} after writing {p}");
            }
        }
        assert_eq!(grid.len(), positions.len());
    }

    #[test]
    fn test_random_writes_survive_growth() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut grid = SparseGrid::new(Vec2::new(0.5, 0.5), 3, 0.5);
        let mut written = Vec::new();
        for i in 0..600_u32 {
            let p = Vec2::new(
                rng.random_range(-150..150) as f32 * 0.5,
                rng.random_range(-150..150) as f32 * 0.5,
            );
            grid.set(i, p);
            written.retain(|(q, _)| *q != p);
            written.push((p, i));
        }
        assert_invariants(&grid);
        assert_eq!(grid.len(), written.len());
        for (p, value) in &written {
            assert_eq!(grid.get(*p), Some(value));
        }
    }

    #[test]
    fn test_width_never_shrinks() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 11, 1.0).with_padding(0);
        let mut last = grid.width();
        for i in 0..40 {
            grid.set(i, Vec2::new(i as f32 * 3.0, -(i as f32) * 2.0));
            assert!(grid.width() >= last);
            last = grid.width();
        }
        assert!(grid.width() >= 11);
    }

    #[test]
    fn test_high_side_growth_reuses_empty_leading_lines() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 9, 1.0).with_padding(0);
        // Root at (-4, -4); the only entry sits on the last column.
        grid.set(1_u8, Vec2::new(4.0, 0.0));
        grid.set(2, Vec2::new(6.0, 0.0));
        assert_eq!(grid.width(), 9, "leading empty columns should absorb the overflow");
        assert_eq!(grid.root(), Vec2::new(-2.0, -4.0));
        assert_eq!(grid.get(Vec2::new(4.0, 0.0)), Some(&1));
        assert_eq!(grid.get(Vec2::new(6.0, 0.0)), Some(&2));
    }

    #[test]
    fn test_low_side_growth_consumes_trailing_empty_lines() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 9, 1.0).with_padding(0);
        grid.set(1_u8, Vec2::new(-4.0, 0.0));
        grid.set(2, Vec2::new(-6.0, 0.0));
        assert_eq!(grid.width(), 9);
        assert_eq!(grid.root(), Vec2::new(-6.0, -4.0));
        assert_eq!(grid.get(Vec2::new(-4.0, 0.0)), Some(&1));
    }

    #[test]
    fn test_padding_is_applied_on_growth() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 9, 1.0).with_padding(4);
        grid.set(1_u8, Vec2::new(-4.0, -4.0));
        grid.set(2, Vec2::new(4.0, 4.0));
        grid.set(3, Vec2::new(6.0, 0.0));
        // Overflow 2 with no empty columns, plus 4 padding -> 15.
        assert_eq!(grid.width(), 15);
        assert!(grid.is_set(Vec2::new(-4.0, -4.0)));
        assert!(grid.is_set(Vec2::new(4.0, 4.0)));
        assert!(grid.is_set(Vec2::new(6.0, 0.0)));
    }

    #[test]
    fn test_iter_yields_only_set_slots() {
        let mut grid = SparseGrid::new(Vec2::ZERO, 7, 1.0);
        grid.set('a', Vec2::new(-1.0, 0.0));
        grid.set('b', Vec2::new(2.0, 3.0));
        let mut seen: Vec<_> = grid
            .iter()
            .map(|(index, c)| (grid.world_position_of(index), *c))
            .collect();
        seen.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            seen,
            vec![(Vec2::new(-1.0, 0.0), 'a'), (Vec2::new(2.0, 3.0), 'b')]
        );
    }

    #[test]
    fn test_plan_axis_inside_is_noop() {
        assert_eq!(
            plan_axis(3, 9, 0, 0, 8),
            AxisPlan {
                shift: 0,
                needed: 9
            }
        );
    }
}
