//! Snapshot of what the user was looking at when a capture fired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::models::TextRegion;

const HINT_SAMPLE_COUNT: usize = 3;

/// Foreground application details as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundContext {
    pub app_name: Option<String>,
    pub bundle_id: Option<String>,
    pub window_title: Option<String>,
    pub window_bounds: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureContext {
    pub timestamp: DateTime<Utc>,
    pub cursor: Point,
    pub screen_size: Size,
    pub foreground: ForegroundContext,
    pub text_regions: Vec<TextRegion>,
}

impl CaptureContext {
    pub fn new(cursor: Point, screen_size: Size, foreground: ForegroundContext) -> Self {
        Self {
            timestamp: Utc::now(),
            cursor,
            screen_size,
            foreground,
            text_regions: Vec::new(),
        }
    }

    pub fn with_text_regions(self, text_regions: Vec<TextRegion>) -> Self {
        Self {
            text_regions,
            ..self
        }
    }

    pub fn focus_bounds(&self) -> Option<Rect> {
        self.foreground.window_bounds
    }

    /// Free-text hints for the analysis provider, one per line.
    pub fn contextual_hint(&self) -> Option<String> {
        let mut hints = Vec::new();

        if let Some(app_name) = &self.foreground.app_name {
            hints.push(format!("Hint - front app might be {app_name}."));
        }

        if let Some(title) = self
            .foreground
            .window_title
            .as_deref()
            .filter(|title| !title.is_empty())
        {
            hints.push(format!("Hint - window title shows \"{title}\"."));
        }

        if !self.text_regions.is_empty() {
            let samples = self
                .text_regions
                .iter()
                .take(HINT_SAMPLE_COUNT)
                .map(|region| format!("\"{}\"", region.text))
                .collect::<Vec<_>>()
                .join(", ");
            hints.push(format!("Hint - saw text: {samples}"));
        }

        if hints.is_empty() {
            None
        } else {
            Some(hints.join("\n"))
        }
    }
}
