//! Ring buffer of color-mapped display rows.
//!
//! Each incoming row is normalized against a dynamic range that only widens
//! upward (unless a release factor is configured), compressed with a quartic
//! curve and mapped through the gradient. The oldest slot is overwritten.

use super::gradient::{Gradient, Rgba};

/// Fixed-height history of rendered rows.
pub struct WaterfallStore {
    rows: Vec<Vec<Rgba>>,
    /// Next slot to overwrite; also the oldest row
    cursor: usize,
    width: usize,
    floor: f32,
    ceiling: f32,
    release: f32,
    gradient: Gradient,
}

impl WaterfallStore {
    /// Creates a black waterfall of `height` rows by `width` pixels.
    ///
    /// `release` in `[0, 1]` lets the range bounds move toward each new row
    /// before ratcheting; `0` keeps them latched.
    pub fn new(width: usize, height: usize, release: f32) -> Self {
        Self {
            rows: vec![vec![Rgba::opaque(0, 0, 0); width]; height.max(1)],
            cursor: 0,
            width,
            floor: f32::NEG_INFINITY,
            ceiling: f32::NEG_INFINITY,
            release: release.clamp(0.0, 1.0),
            gradient: Gradient::waterfall(),
        }
    }

    /// Normalizes, color-maps and stores one display row.
    pub fn add(&mut self, row: &[f32]) {
        let (row_min, row_max) = row
            .iter()
            .filter(|v| !v.is_nan())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        if row_min <= row_max {
            self.update_range(row_min, row_max);
        }

        let span = self.ceiling - self.floor;
        let degenerate = !(span > 0.0) || !span.is_finite();
        let floor = self.floor;

        let slot = &mut self.rows[self.cursor];
        for (pixel, &value) in slot.iter_mut().zip(row) {
            let t = if degenerate {
                0.5
            } else {
                ((value - floor) / span).clamp(0.0, 1.0)
            };
            *pixel = self.gradient.color_at(t.powi(4));
        }
        for pixel in slot.iter_mut().skip(row.len()) {
            *pixel = Rgba::opaque(0, 0, 0);
        }

        self.cursor = (self.cursor + 1) % self.rows.len();
    }

    fn update_range(&mut self, row_min: f32, row_max: f32) {
        if self.release > 0.0 && self.ceiling.is_finite() {
            if row_max < self.ceiling {
                self.ceiling -= self.release * (self.ceiling - row_max);
            }
            if row_min < self.floor {
                self.floor -= self.release * (self.floor - row_min);
            }
        }
        self.ceiling = self.ceiling.max(row_max);
        self.floor = self.floor.max(row_min);
    }

    /// Rows from oldest to newest.
    pub fn blit(&self) -> impl Iterator<Item = &[Rgba]> + '_ {
        self.rows[self.cursor..]
            .iter()
            .chain(&self.rows[..self.cursor])
            .map(Vec::as_slice)
    }

    /// Current `(floor, ceiling)`, or `None` before the first finite row.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.ceiling
            .is_finite()
            .then_some((self.floor, self.ceiling))
    }

    /// Forgets the learned range; the next row sets it afresh.
    pub fn reset_range(&mut self) {
        self.floor = f32::NEG_INFINITY;
        self.ceiling = f32::NEG_INFINITY;
        tracing::debug!("Waterfall range reset");
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_rows(count: usize, width: usize) -> Vec<Vec<f32>> {
        let mut state = 0x2545_f491_u32;
        (0..count)
            .map(|_| {
                (0..width)
                    .map(|_| {
                        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                        (state >> 8) as f32 / (1u32 << 24) as f32 * 200.0 - 100.0
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_range_ratchets_upward() {
        let mut store = WaterfallStore::new(16, 8, 0.0);
        let mut previous: Option<(f32, f32)> = None;
        for row in lcg_rows(50, 16) {
            store.add(&row);
            let (floor, ceiling) = store.range().unwrap();
            if let Some((prev_floor, prev_ceiling)) = previous {
                assert!(floor >= prev_floor);
                assert!(ceiling >= prev_ceiling);
            }
            assert!(floor <= ceiling);
            previous = Some((floor, ceiling));
        }
    }

    #[test]
    fn test_degenerate_row_renders_midpoint() {
        let mut store = WaterfallStore::new(8, 4, 0.0);
        store.add(&[0.0; 8]);
        store.add(&[0.0; 8]);
        assert_eq!(store.range(), Some((0.0, 0.0)));

        let midpoint = Gradient::waterfall().color_at(0.5f32.powi(4));
        let rows: Vec<&[Rgba]> = store.blit().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[2].iter().chain(rows[3]).all(|&p| p == midpoint));
        assert_eq!(midpoint, Rgba::opaque(0, 31, 0));
    }

    #[test]
    fn test_blit_returns_rows_oldest_first() {
        let gradient = Gradient::waterfall();
        let levels = [0.5f32, 0.7, 0.85, 1.0, 0.6, 0.9];
        let mut store = WaterfallStore::new(3, 4, 0.0);
        for level in levels {
            store.add(&[0.0, 1.0, level]);
        }
        assert_eq!(store.cursor(), 2);

        let column: Vec<Rgba> = store.blit().map(|row| row[2]).collect();
        let expected: Vec<Rgba> = levels[2..]
            .iter()
            .map(|level| gradient.color_at(level.powi(4)))
            .collect();
        assert_eq!(column, expected);
    }

    #[test]
    fn test_blit_does_not_mutate() {
        let mut store = WaterfallStore::new(2, 3, 0.0);
        store.add(&[1.0, 2.0]);
        let first: Vec<Vec<Rgba>> = store.blit().map(<[Rgba]>::to_vec).collect();
        let second: Vec<Vec<Rgba>> = store.blit().map(<[Rgba]>::to_vec).collect();
        assert_eq!(first, second);
        assert_eq!(store.cursor(), 1);
    }

    #[test]
    fn test_values_below_floor_clamp_to_black() {
        let mut store = WaterfallStore::new(2, 2, 0.0);
        store.add(&[5.0, 10.0]);
        store.add(&[-50.0, 10.0]);
        let newest = store.blit().last().unwrap().to_vec();
        assert_eq!(newest[0], Rgba::opaque(0, 0, 0));
        assert_eq!(newest[1], Rgba::opaque(255, 255, 255));
    }

    #[test]
    fn test_nan_and_empty_rows_do_not_panic() {
        let mut store = WaterfallStore::new(4, 2, 0.0);
        store.add(&[f32::NAN; 4]);
        store.add(&[]);
        store.add(&[1.0, f32::NAN, 3.0]);
        assert_eq!(store.range(), Some((1.0, 3.0)));
        assert_eq!(store.blit().count(), 2);
    }

    #[test]
    fn test_release_lets_ceiling_fall() {
        let mut store = WaterfallStore::new(2, 2, 0.5);
        store.add(&[0.0, 100.0]);
        store.add(&[0.0, 10.0]);
        assert_eq!(store.range(), Some((0.0, 55.0)));
    }

    #[test]
    fn test_reset_range() {
        let mut store = WaterfallStore::new(2, 2, 0.0);
        store.add(&[0.0, 100.0]);
        store.reset_range();
        assert_eq!(store.range(), None);
        store.add(&[1.0, 2.0]);
        assert_eq!(store.range(), Some((1.0, 2.0)));
    }
}
