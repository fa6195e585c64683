use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio::time::timeout;

use cursor_companion_lib::capture::{ForegroundContext, GateConfig, GateProfiles};
use cursor_companion_lib::collaborators::{
    AnalysisError, AnalysisProvider, AnalysisRequest, AnalysisResponse, CapturedImage,
    Collaborators, DisplayProvider, ForegroundProvider, ImageSource, NotificationSink,
    PermissionGate, PermissionStatus, PointerSource, PresentationSurface, TextRegionDetector,
    VoiceSink,
};
use cursor_companion_lib::geometry::{Point, Rect, Size};
use cursor_companion_lib::models::{InteractionMode, TextRegion, TokenUsage};
use cursor_companion_lib::placement::{Display, DisplayLayout, PlacementEngine};
use cursor_companion_lib::session::{CommentaryEvent, SessionHandle, SessionRuntime, SessionStatus};
use cursor_companion_lib::settings::CompanionSettings;

const SCREEN: Rect = Rect::new(0.0, 0.0, 1440.0, 900.0);
const BUBBLE: Size = Size::new(240.0, 90.0);

/// Walks right a little on every poll so movement never stalls.
struct WalkingPointer {
    polls: AtomicUsize,
}

impl PointerSource for WalkingPointer {
    fn location(&self) -> Option<Point> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        Some(Point::new(200.0 + (n % 800) as f64, 400.0))
    }
}

struct Editor;

impl ForegroundProvider for Editor {
    fn foreground(&self) -> ForegroundContext {
        ForegroundContext {
            app_name: Some("Editor".into()),
            bundle_id: Some("com.example.editor".into()),
            window_title: Some("main.rs".into()),
            window_bounds: Some(Rect::new(100.0, 100.0, 1000.0, 700.0)),
        }
    }
}

struct OneDisplay;

impl DisplayProvider for OneDisplay {
    fn layout(&self) -> DisplayLayout {
        DisplayLayout::single(Display::full(SCREEN))
    }
}

struct BlankImages;

impl ImageSource for BlankImages {
    fn capture(&self, region: Rect) -> Result<CapturedImage, AnalysisError> {
        Ok(CapturedImage {
            png_data: Arc::new(Vec::new()),
            pixel_size: region.size,
            screen_rect: region,
        })
    }
}

struct FixedText;

impl TextRegionDetector for FixedText {
    fn detect(&self, _image: &CapturedImage) -> Vec<TextRegion> {
        vec![
            TextRegion::new("fn main()", Rect::new(300.0, 300.0, 200.0, 30.0), 0.95),
            TextRegion::new("   ", Rect::new(600.0, 300.0, 200.0, 30.0), 0.99),
        ]
    }
}

#[derive(Clone, Copy)]
enum Reply {
    Text,
    Fail,
}

struct ScriptedAnalysis {
    reply: Reply,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen_regions: Mutex<Vec<usize>>,
}

impl ScriptedAnalysis {
    fn new(reply: Reply, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen_regions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedAnalysis {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen_regions
            .lock()
            .unwrap()
            .push(request.context.text_regions.len());

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.reply {
            Reply::Text => Ok(AnalysisResponse {
                text: "  Looks like a tidy main function.  ".into(),
                usage: Some(TokenUsage {
                    prompt_tokens: 90,
                    completion_tokens: 10,
                    total_tokens: 100,
                }),
            }),
            Reply::Fail => Err(AnalysisError::Http {
                status: 500,
                body: "boom".into(),
            }),
        }
    }

    fn describe(&self) -> String {
        "Scripted".into()
    }
}

struct Permissions {
    granted: bool,
    requests: AtomicUsize,
    reminders: AtomicUsize,
}

impl PermissionGate for Permissions {
    fn status(&self) -> PermissionStatus {
        PermissionStatus {
            screen_recording: self.granted,
            accessibility: true,
        }
    }

    fn request_missing(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.status()
    }

    fn show_reminder(&self, _status: &PermissionStatus) {
        self.reminders.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Surface {
    shown: Mutex<Vec<(String, Point)>>,
    hides: AtomicUsize,
}

impl PresentationSurface for Surface {
    fn present(&self, text: &str, place: &mut dyn FnMut(Size) -> Point) {
        let origin = place(BUBBLE);
        self.shown.lock().unwrap().push((text.to_string(), origin));
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl VoiceSink for Recorder {
    fn speak(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

impl NotificationSink for Recorder {
    fn deliver(&self, body: &str) {
        self.lines.lock().unwrap().push(body.to_string());
    }
}

struct Harness {
    handle: SessionHandle,
    join: tokio::task::JoinHandle<()>,
    analysis: Arc<ScriptedAnalysis>,
    permissions: Arc<Permissions>,
    surface: Arc<Surface>,
    voice: Arc<Recorder>,
    notifications: Arc<Recorder>,
}

fn eager_settings(mode: InteractionMode) -> CompanionSettings {
    CompanionSettings {
        interaction_mode: mode,
        poll_interval_ms: 5,
        gate_profiles: GateProfiles::uniform(GateConfig::new(Duration::ZERO, Duration::ZERO, 0.0)),
        ..CompanionSettings::default()
    }
}

fn harness(settings: CompanionSettings, reply: Reply, delay: Duration, granted: bool) -> Harness {
    let analysis = Arc::new(ScriptedAnalysis::new(reply, delay));
    let permissions = Arc::new(Permissions {
        granted,
        requests: AtomicUsize::new(0),
        reminders: AtomicUsize::new(0),
    });
    let surface = Arc::new(Surface::default());
    let voice = Arc::new(Recorder::default());
    let notifications = Arc::new(Recorder::default());

    let collaborators = Collaborators {
        pointer: Arc::new(WalkingPointer {
            polls: AtomicUsize::new(0),
        }),
        foreground: Arc::new(Editor),
        displays: Arc::new(OneDisplay),
        images: Arc::new(BlankImages),
        detector: Arc::new(FixedText),
        analysis: analysis.clone(),
        permissions: permissions.clone(),
        presentation: surface.clone(),
        voice: voice.clone(),
        notifications: notifications.clone(),
    };

    let placement = PlacementEngine::with_rng(StdRng::seed_from_u64(7), 0.0);
    let (handle, join) = SessionRuntime::spawn_with_placement(settings, collaborators, placement);

    Harness {
        handle,
        join,
        analysis,
        permissions,
        surface,
        voice,
        notifications,
    }
}

async fn next_event(events: &mut broadcast::Receiver<CommentaryEvent>) -> CommentaryEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for commentary")
        .expect("commentary channel closed")
}

#[tokio::test]
async fn only_one_analysis_request_is_ever_in_flight() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(60),
        true,
    );
    assert_eq!(h.handle.start().await.unwrap(), SessionStatus::Active);

    tokio::time::sleep(Duration::from_millis(400)).await;
    h.handle.stop().await.unwrap();

    assert!(h.analysis.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(h.analysis.max_in_flight.load(Ordering::SeqCst), 1);

    let metrics = h.handle.metrics().await;
    assert!(metrics.dropped_in_flight_count > 0);
    assert!(metrics.accepted_count >= metrics.dropped_in_flight_count);
}

#[tokio::test]
async fn commentary_is_placed_presented_and_counted() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(10),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();

    match next_event(&mut events).await {
        CommentaryEvent::Delivered { text, mode, origin } => {
            assert_eq!(text, "Looks like a tidy main function.");
            assert_eq!(mode, InteractionMode::Casual);
            let origin = origin.expect("overlay should have been placed");
            assert!(origin.x >= SCREEN.min_x() + 20.0);
            assert!(origin.x + BUBBLE.width <= SCREEN.max_x() - 20.0);
            assert!(origin.y >= SCREEN.min_y() + 20.0);
            assert!(origin.y + BUBBLE.height <= SCREEN.max_y() - 20.0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    h.handle.stop().await.unwrap();

    let shown = h.surface.shown.lock().unwrap().clone();
    assert!(!shown.is_empty());
    assert_eq!(shown[0].0, "Looks like a tidy main function.");
    assert!(!h.voice.lines.lock().unwrap().is_empty());
    assert!(!h.notifications.lines.lock().unwrap().is_empty());

    // Blank detections are filtered before they reach the provider.
    assert!(h.analysis.seen_regions.lock().unwrap().iter().all(|&n| n == 1));

    let usage = h.handle.usage_stats().expect("usage should be recorded");
    assert!(usage.total_tokens >= 100);
    assert_eq!(usage.total_tokens % 100, 0);
}

#[tokio::test]
async fn denied_permissions_keep_session_stopped_and_remind_once() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(10),
        false,
    );

    assert_eq!(h.handle.start().await.unwrap(), SessionStatus::Stopped);
    assert_eq!(h.handle.toggle().await.unwrap(), SessionStatus::Stopped);
    assert_eq!(h.handle.status(), SessionStatus::Stopped);

    assert_eq!(h.permissions.requests.load(Ordering::SeqCst), 2);
    assert_eq!(h.permissions.reminders.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.analysis.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mode_change_clears_usage() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(10),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();
    next_event(&mut events).await;
    h.handle.stop().await.unwrap();
    assert!(h.handle.usage_stats().is_some());

    assert!(h.handle.set_mode(InteractionMode::Focus).await.unwrap());
    assert_eq!(h.handle.mode(), InteractionMode::Focus);
    assert!(h.handle.usage_stats().is_none());

    assert!(!h.handle.set_mode(InteractionMode::Focus).await.unwrap());
}

#[tokio::test]
async fn focus_mode_only_uses_the_overlay() {
    let h = harness(
        eager_settings(InteractionMode::Focus),
        Reply::Text,
        Duration::from_millis(10),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();
    next_event(&mut events).await;
    h.handle.stop().await.unwrap();

    assert!(!h.surface.shown.lock().unwrap().is_empty());
    assert!(h.voice.lines.lock().unwrap().is_empty());
    assert!(h.notifications.lines.lock().unwrap().is_empty());
}

#[tokio::test]
async fn overlay_toggle_suppresses_placement() {
    let mut settings = eager_settings(InteractionMode::Casual);
    settings.overlay_enabled = false;
    let h = harness(settings, Reply::Text, Duration::from_millis(10), true);
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();

    match next_event(&mut events).await {
        CommentaryEvent::Delivered { origin, .. } => assert_eq!(origin, None),
        other => panic!("unexpected event: {other:?}"),
    }
    h.handle.stop().await.unwrap();
    assert!(h.surface.shown.lock().unwrap().is_empty());
    assert!(!h.voice.lines.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failures_are_reported_and_sampling_continues() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Fail,
        Duration::from_millis(5),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();

    for _ in 0..2 {
        match next_event(&mut events).await {
            CommentaryEvent::Failed { error } => {
                assert_eq!(error.to_string(), "HTTP 500: boom");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(h.handle.status(), SessionStatus::Active);
    h.handle.stop().await.unwrap();

    let notes = h.notifications.lines.lock().unwrap().clone();
    assert!(notes.iter().any(|n| n == "Commentary failed: HTTP 500: boom"));
    let shown = h.surface.shown.lock().unwrap().clone();
    assert!(shown.iter().any(|(text, _)| text == "Oops, I hit a snag: HTTP 500: boom"));
    assert!(h.handle.usage_stats().is_none());
    assert!(h.handle.metrics().await.failed_count >= 2);
}

#[tokio::test]
async fn failure_bubble_is_anchored_on_captured_text() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Fail,
        Duration::from_millis(5),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();
    next_event(&mut events).await;
    h.handle.stop().await.unwrap();

    let shown = h.surface.shown.lock().unwrap().clone();
    let (text, origin) = &shown[0];
    assert!(text.starts_with("Oops, I hit a snag"));
    // Centred on the "fn main()" region at (400, 315).
    let center = Point::new(origin.x + BUBBLE.width / 2.0, origin.y + BUBBLE.height / 2.0);
    assert_eq!(center, Point::new(400.0, 315.0));
}

#[tokio::test]
async fn result_from_before_a_restart_is_not_shown() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(300),
        true,
    );
    let mut events = h.handle.subscribe_commentary();
    h.handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.handle.stop().await.unwrap();
    assert_eq!(h.handle.start().await.unwrap(), SessionStatus::Active);

    // The first request returns around 300ms and must be swallowed; the next
    // one can only be issued after that.
    next_event(&mut events).await;
    assert!(h.analysis.calls.load(Ordering::SeqCst) >= 2);
    h.handle.stop().await.unwrap();
}

#[tokio::test]
async fn toggle_and_shutdown() {
    let h = harness(
        eager_settings(InteractionMode::Casual),
        Reply::Text,
        Duration::from_millis(10),
        true,
    );

    assert_eq!(h.handle.toggle().await.unwrap(), SessionStatus::Active);
    assert_eq!(h.handle.start().await.unwrap(), SessionStatus::Active);
    assert_eq!(h.handle.toggle().await.unwrap(), SessionStatus::Stopped);
    assert_eq!(h.surface.hides.load(Ordering::SeqCst), 1);
    assert_eq!(h.handle.stop().await.unwrap(), SessionStatus::Stopped);

    h.handle.toggle().await.unwrap();
    h.handle.shutdown();
    timeout(Duration::from_secs(2), h.join)
        .await
        .expect("runtime should exit after shutdown")
        .unwrap();
    assert_eq!(h.handle.status(), SessionStatus::Stopped);
    assert!(h.handle.start().await.is_err());
}
