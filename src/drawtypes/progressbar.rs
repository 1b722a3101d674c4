//! A fill/empty/indicator strip rendered at a given percentage (spec §3
//! "Progressbar"), grounded on
//! `examples/original_source/src/drawtypes/progressbar.cpp`'s `output()`
//! and `fill()` (bucket math preserved exactly; token replacement only,
//! not the builder plumbing it uses internally).

use crate::color::Color;
use crate::drawtypes::label::Label;

/// `{ width, fill, empty, indicator, colors, format, gradient }` (spec §3).
#[derive(Debug, Clone)]
pub struct Progressbar {
    /// Total number of fill+empty+indicator slots.
    pub width: u32,
    /// Repeated for each filled slot.
    pub fill: Label,
    /// Repeated for each empty slot.
    pub empty: Label,
    /// Drawn once, between fill and empty, if `Some`.
    pub indicator: Option<Label>,
    /// Colors applied to fill slots, either by gradient step or by bucket.
    pub colors: Vec<Color>,
    /// Template containing `%fill%`, `%indicator%`, `%empty%` tokens.
    pub format: String,
    /// `true`: advance one color every `width/len(colors)` fills. `false`:
    /// pick one color for the whole bar based on `p`.
    pub gradient: bool,
}

impl Progressbar {
    /// Render at percentage `p` (clamped to `0..=100`).
    pub fn output(&self, p: u32) -> String {
        let p = p.min(100);
        let fill_count = ((u64::from(p) * u64::from(self.width) + 50) / 100) as u32;
        let fill_count = fill_count.min(self.width);
        let indicator_slot = u32::from(self.indicator.is_some());
        let empty_count = self.width.saturating_sub(fill_count).saturating_sub(indicator_slot);

        let fill_str = self.render_fill(fill_count);
        let indicator_str = self.indicator.as_ref().map(|l| l.text.clone()).unwrap_or_default();
        let empty_str = self.empty.text.repeat(empty_count as usize);

        self.format
            .replace("%fill%", &fill_str)
            .replace("%indicator%", &indicator_str)
            .replace("%empty%", &empty_str)
    }

    fn render_fill(&self, fill_count: u32) -> String {
        self.fill.text.repeat(fill_count as usize)
    }

    /// The single color selected for the whole bar when `gradient == false`,
    /// the bucket whose range contains `p` (spec §3).
    pub fn bucket_color(&self, p: u32) -> Option<Color> {
        if self.colors.is_empty() {
            return None;
        }
        let p = p.min(100);
        let bucket = ((u64::from(p) * (self.colors.len() as u64 - 1)) / 100) as usize;
        self.colors.get(bucket.min(self.colors.len() - 1)).copied()
    }

    /// The color applied to the `i`th filled slot (0-indexed) when
    /// `gradient == true`: one step every `width/len(colors)` fills.
    pub fn gradient_color(&self, fill_index: u32) -> Option<Color> {
        if self.colors.is_empty() {
            return None;
        }
        let colorstep = (self.width / self.colors.len() as u32).max(1);
        let idx = ((fill_index / colorstep) as usize).min(self.colors.len() - 1);
        self.colors.get(idx).copied()
    }
}
