//! Performance summary card: reported/due counts, percentage, fines, and
//! the shared font size that makes every card's headline fit.

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::api::models::Performance;

/// Below this viewport width cards stack and use fixed sizes.
pub const NARROW_VIEWPORT_PX: u32 = 768;
pub const NARROW_FONT_PX: u32 = 14;
pub const MIN_HEADER_PX: u32 = 19;
/// Horizontal padding inside each card.
const CARD_GUTTER_PX: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for FontBounds {
    fn default() -> Self {
        Self { min: 10, max: 150 }
    }
}

/// Rendered width of `text` at a font size, in pixels.
pub trait Measure {
    fn width(&self, text: &str, font_px: u32) -> f64;
}

/// Every glyph advances by a fixed fraction of the font size, scaled by
/// its terminal column width.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    pub advance: f64,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl Measure for FixedAdvance {
    fn width(&self, text: &str, font_px: u32) -> f64 {
        UnicodeWidthStr::width(text) as f64 * font_px as f64 * self.advance
    }
}

/// `reported / due` as a percentage rounded to one decimal, or `None` when
/// nothing is due.
pub fn percentage(reported: u64, due: u64) -> Option<f64> {
    if due == 0 {
        return None;
    }
    let pct = reported as f64 / due as f64 * 100.0;
    Some((pct * 10.0).round() / 10.0)
}

pub fn format_percentage(reported: u64, due: u64) -> Option<String> {
    percentage(reported, due).map(|p| format!("{p:.1}%"))
}

/// Largest font size in `bounds` at which `text` fits `container_px`.
/// Falls back to `bounds.min` when even that overflows.
pub fn fit_font_size(text: &str, container_px: f64, bounds: FontBounds, measure: &dyn Measure) -> u32 {
    let (mut lo, mut hi) = (bounds.min, bounds.max.max(bounds.min));
    if measure.width(text, lo) > container_px {
        return bounds.min;
    }
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if measure.width(text, mid) <= container_px {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardLayout {
    pub viewport_px: u32,
    pub font_px: u32,
    pub header_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub reported: u64,
    pub due: u64,
    pub percent: Option<String>,
    pub fines: Option<String>,
    pub layout: Option<CardLayout>,
}

impl SummaryCard {
    pub fn from_performance(perf: &Performance) -> Self {
        Self {
            reported: perf.reported,
            due: perf.due,
            percent: format_percentage(perf.reported, perf.due),
            fines: perf.fines_str.clone().filter(|s| !s.is_empty()),
            layout: None,
        }
    }

    /// Headline text of each card, in display order. Missing values render
    /// as empty cards.
    pub fn headlines(&self) -> Vec<String> {
        vec![
            format!("{}/{}", self.reported, self.due),
            self.percent.clone().unwrap_or_default(),
            self.fines.clone().unwrap_or_default(),
        ]
    }

    /// Fit the headlines to a viewport. Call again whenever the viewport
    /// changes; `header_heights` are the measured header heights per card.
    pub fn resize(
        &mut self,
        viewport_px: u32,
        header_heights: &[u32],
        bounds: FontBounds,
        measure: &dyn Measure,
    ) -> CardLayout {
        let layout = if viewport_px < NARROW_VIEWPORT_PX {
            CardLayout {
                viewport_px,
                font_px: NARROW_FONT_PX,
                header_px: MIN_HEADER_PX,
            }
        } else {
            let headlines = self.headlines();
            let card_px = (viewport_px / headlines.len() as u32).saturating_sub(CARD_GUTTER_PX);
            let font_px = headlines
                .iter()
                .filter(|h| !h.is_empty())
                .map(|h| fit_font_size(h, card_px as f64, bounds, measure))
                .min()
                .unwrap_or(bounds.max);
            let header_px = header_heights
                .iter()
                .copied()
                .fold(MIN_HEADER_PX, u32::max);
            CardLayout {
                viewport_px,
                font_px,
                header_px,
            }
        };
        self.layout = Some(layout);
        layout
    }
}
