use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Recognizer output below this confidence is noise for anchoring purposes.
pub const MIN_REGION_CONFIDENCE: f32 = 0.4;

/// A recognized piece of on-screen text, in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRegion {
    pub text: String,
    pub bounds: Rect,
    /// 0.0..=1.0
    pub confidence: f32,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, bounds: Rect, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounds,
            confidence,
        }
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn area(&self) -> f64 {
        self.bounds.area()
    }

    /// Trims recognizer output and drops low-confidence or blank regions.
    pub fn filter_detected(raw: Vec<TextRegion>) -> Vec<TextRegion> {
        raw.into_iter()
            .filter(|region| region.confidence >= MIN_REGION_CONFIDENCE)
            .filter_map(|region| {
                let trimmed = region.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                Some(TextRegion {
                    text: trimmed.to_string(),
                    ..region
                })
            })
            .collect()
    }
}
