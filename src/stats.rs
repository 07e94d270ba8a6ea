//! Pie chart view model for the bucket counts the store computes.

use ratatui::style::Color;

use crate::config::Palette;
use crate::storage::BucketCounts;

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: u32,
    pub percent: u32,
    /// Cumulative percentage where this slice starts.
    pub start: u32,
    pub end: u32,
    pub color_name: &'static str,
    pub color: Color,
}

impl PieSlice {
    pub fn legend(&self) -> String {
        format!("{} ({})", self.label, self.count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieView {
    pub title: String,
    pub slices: Vec<PieSlice>,
    /// Conic-gradient style colour stops: `"<color> <start>%, <color> <end>%, ..."`.
    pub gradient: String,
    pub total: u32,
}

/// Each slice is rounded on its own, so the stops may not end at exactly 100%.
pub fn build_pie(title: impl Into<String>, buckets: &BucketCounts, palette: &Palette) -> PieView {
    let mut slices = Vec::with_capacity(buckets.counts.len());
    let mut sum = 0u32;
    for (idx, (label, count)) in buckets.counts.iter().enumerate() {
        let percent = percent_of(*count, buckets.total);
        let start = sum;
        sum += percent;
        let swatch = palette.get(idx);
        slices.push(PieSlice {
            label: label.clone(),
            count: *count,
            percent,
            start,
            end: sum,
            color_name: swatch.name,
            color: swatch.color,
        });
    }
    let gradient = slices
        .iter()
        .map(|slice| {
            format!(
                "{name} {start}%, {name} {end}%",
                name = slice.color_name,
                start = slice.start,
                end = slice.end
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    PieView {
        title: title.into(),
        slices,
        gradient,
        total: buckets.total,
    }
}

fn percent_of(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(count) * 100.0 / f64::from(total)).round() as u32
}
