//! Power sparkline widget for inline visualization

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Block characters for different power levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A one-line sparkline of a power series
///
/// When the series is longer than the area is wide, adjacent samples are
/// averaged into one column.
pub struct PowerSparkline<'a> {
    /// Samples in time order
    values: &'a [f64],
    /// Value drawn as a full block
    max_value: f64,
    /// Style for the sparkline
    style: Style,
}

impl<'a> PowerSparkline<'a> {
    pub fn new(values: &'a [f64], max_value: f64) -> Self {
        Self {
            values,
            max_value,
            style: Style::default().fg(Color::Cyan),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn value_to_block(&self, value: f64) -> char {
        if self.max_value <= 0.0 {
            return BLOCKS[0];
        }
        let normalized = (value / self.max_value).clamp(0.0, 1.0);
        let index = ((normalized * 7.0).round() as usize).min(7);
        BLOCKS[index]
    }

    /// Averages the series down to at most `width` columns
    fn columns(&self, width: usize) -> Vec<f64> {
        if width == 0 || self.values.is_empty() {
            return Vec::new();
        }
        if self.values.len() <= width {
            return self.values.to_vec();
        }
        let per_column = self.values.len().div_ceil(width);
        self.values
            .chunks(per_column)
            .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
            .collect()
    }
}

impl<'a> Widget for PowerSparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for (i, value) in self.columns(area.width as usize).iter().enumerate() {
            let block = self.value_to_block(*value);
            let x = area.x + i as u16;
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(block).set_style(self.style);
            }
        }
    }
}
