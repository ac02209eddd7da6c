//! Color gradient used to map normalized intensity to pixels.

/// One RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Piecewise-linear gradient over evenly spaced color stops.
#[derive(Debug, Clone)]
pub struct Gradient {
    stops: Vec<Rgba>,
}

impl Gradient {
    /// Builds a gradient from at least two stops.
    pub fn new(stops: Vec<Rgba>) -> Self {
        assert!(stops.len() >= 2, "a gradient needs at least two stops");
        Self { stops }
    }

    /// Black, green, yellow, white.
    pub fn waterfall() -> Self {
        Self::new(vec![
            Rgba::opaque(0, 0, 0),
            Rgba::opaque(0, 255, 0),
            Rgba::opaque(255, 255, 0),
            Rgba::opaque(255, 255, 255),
        ])
    }

    /// Maps `v` to a color.
    ///
    /// Values at or above 1 take the last stop; NaN and negative values take
    /// the first. In between, `v * (stops - 2)` selects the pair of stops to
    /// blend.
    pub fn color_at(&self, v: f32) -> Rgba {
        let last = self.stops.len() - 1;
        let idx = if v >= 1.0 {
            last as f32
        } else if v >= 0.0 {
            ((last - 1) as f32 * v).min((last - 1) as f32)
        } else {
            0.0
        };

        let lower = idx as usize;
        let t = idx - lower as f32;
        let prev = self.stops[lower];
        let next = if lower == last {
            prev
        } else {
            self.stops[lower + 1]
        };

        Rgba::opaque(
            interpolate(t, prev.r, next.r),
            interpolate(t, prev.g, next.g),
            interpolate(t, prev.b, next.b),
        )
    }
}

fn interpolate(t: f32, a: u8, b: u8) -> u8 {
    (f32::from(a) * (1.0 - t) + f32::from(b) * t) as u8
}
