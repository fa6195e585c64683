//! Boundaries to the host: everything that touches real devices, the
//! network or the UI lives behind these traits.

pub mod error;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureContext, ForegroundContext};
use crate::geometry::{Point, Rect, Size};
use crate::models::{InteractionMode, TextRegion, TokenUsage};
use crate::placement::DisplayLayout;

pub use error::AnalysisError;
pub use local::LocalAnalysisProvider;

/// Encoded capture of the region around the cursor.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub png_data: Arc<Vec<u8>>,
    pub pixel_size: Size,
    /// Screen-space rectangle the pixels were taken from.
    pub screen_rect: Rect,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: CapturedImage,
    pub context: CaptureContext,
    pub mode: InteractionMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStatus {
    pub screen_recording: bool,
    pub accessibility: bool,
}

impl PermissionStatus {
    pub const GRANTED: PermissionStatus = PermissionStatus {
        screen_recording: true,
        accessibility: true,
    };

    pub fn all_granted(&self) -> bool {
        self.screen_recording && self.accessibility
    }
}

/// Current pointer location, polled by the sampler.
pub trait PointerSource: Send + Sync {
    fn location(&self) -> Option<Point>;
}

pub trait ForegroundProvider: Send + Sync {
    fn foreground(&self) -> ForegroundContext;

    /// Cheap identity check, polled on every tick.
    fn foreground_app_id(&self) -> Option<String> {
        self.foreground().bundle_id
    }
}

pub trait DisplayProvider: Send + Sync {
    fn layout(&self) -> DisplayLayout;
}

pub trait ImageSource: Send + Sync {
    fn capture(&self, region: Rect) -> Result<CapturedImage, AnalysisError>;
}

pub trait TextRegionDetector: Send + Sync {
    fn detect(&self, image: &CapturedImage) -> Vec<TextRegion>;
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;

    /// Short human-readable label, e.g. "OpenAI (gpt-4o-mini)".
    fn describe(&self) -> String;
}

pub trait PermissionGate: Send + Sync {
    fn status(&self) -> PermissionStatus;

    /// Prompts for whatever is still missing and reports the result.
    fn request_missing(&self) -> PermissionStatus;

    fn show_reminder(&self, status: &PermissionStatus);
}

pub trait PresentationSurface: Send + Sync {
    /// Shows `text`; the surface measures its bubble and asks `place` for the
    /// origin.
    fn present(&self, text: &str, place: &mut dyn FnMut(Size) -> Point);

    fn hide(&self);
}

pub trait VoiceSink: Send + Sync {
    fn speak(&self, text: &str);
}

pub trait NotificationSink: Send + Sync {
    fn deliver(&self, body: &str);
}

/// Everything the session runtime needs from the host.
#[derive(Clone)]
pub struct Collaborators {
    pub pointer: Arc<dyn PointerSource>,
    pub foreground: Arc<dyn ForegroundProvider>,
    pub displays: Arc<dyn DisplayProvider>,
    pub images: Arc<dyn ImageSource>,
    pub detector: Arc<dyn TextRegionDetector>,
    pub analysis: Arc<dyn AnalysisProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub presentation: Arc<dyn PresentationSurface>,
    pub voice: Arc<dyn VoiceSink>,
    pub notifications: Arc<dyn NotificationSink>,
}
