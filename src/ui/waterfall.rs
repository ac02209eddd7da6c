//! Ratatui widget that paints the waterfall with half-block cells.
//!
//! Each terminal cell shows two pixel rows: the upper one as the foreground
//! of `▀`, the lower one as the background. Store rows and buckets are
//! resampled to the area by nearest neighbour.

use crate::waterfall::{Rgba, WaterfallStore};
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

/// Amber used for vertical markers.
pub const MARKER_COLOR: Color = Color::Rgb(0xff, 0xd3, 0x00);

/// Borrowed view of the store plus marker buckets to overlay.
pub struct WaterfallView<'a> {
    store: &'a WaterfallStore,
    markers: &'a [usize],
}

impl<'a> WaterfallView<'a> {
    pub fn new(store: &'a WaterfallStore, markers: &'a [usize]) -> Self {
        Self { store, markers }
    }
}

impl Widget for WaterfallView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = self.store.width();
        if area.is_empty() || width == 0 {
            return;
        }

        let rows: Vec<&[Rgba]> = self.store.blit().collect();
        let pixel_rows = usize::from(area.height) * 2;
        let pixel = |y: usize, x: u16| -> Color {
            let row = rows[y * rows.len() / pixel_rows];
            let bucket = column_to_bucket(x, area.width, width);
            row.get(bucket).map_or(Color::Rgb(0, 0, 0), |p| Color::Rgb(p.r, p.g, p.b))
        };

        for cy in 0..area.height {
            for cx in 0..area.width {
                let top = pixel(usize::from(cy) * 2, cx);
                let bottom = pixel(usize::from(cy) * 2 + 1, cx);
                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_char('▀').set_fg(top).set_bg(bottom);
                }
            }
        }

        for &bucket in self.markers {
            let Some(cx) = bucket_to_column(bucket, area.width, width) else {
                continue;
            };
            for cy in 0..area.height {
                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_char('│').set_fg(MARKER_COLOR);
                }
            }
        }
    }
}

/// Bucket shown in terminal column `column` of an area `area_width` wide.
pub fn column_to_bucket(column: u16, area_width: u16, buckets: usize) -> usize {
    if area_width == 0 {
        return 0;
    }
    (usize::from(column) * buckets / usize::from(area_width)).min(buckets.saturating_sub(1))
}

/// Terminal column that displays `bucket`, if it is in range.
pub fn bucket_to_column(bucket: usize, area_width: u16, buckets: usize) -> Option<u16> {
    if bucket >= buckets {
        return None;
    }
    let column = bucket * usize::from(area_width) / buckets;
    u16::try_from(column).ok().filter(|&c| c < area_width)
}
