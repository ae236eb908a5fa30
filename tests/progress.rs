//! Progress and cancellation integration tests.
//!
//! Render tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use hardsub::{
    CancellationToken, CaptionStyle, CaptionTrackBuilder, Compositor, HardsubError,
    ProgressCallback, ProgressInfo, RenderOptions, SourceVideo, srt,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn sample_track() -> Vec<hardsub::OverlayInstruction> {
    let records = srt::parse("1\n00:00:00,500 --> 00:00:01,500\nHello\n").unwrap();
    CaptionTrackBuilder::new(CaptionStyle::default()).build_track(&records)
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::default();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancelled_render_returns_error() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let token = CancellationToken::new();
    token.cancel();
    let options = RenderOptions::new().with_cancellation(token);

    let output = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    let mut source = SourceVideo::open(path).expect("Failed to open fixture");
    let result = Compositor::new(&mut source, options).render(&sample_track(), output.path());

    match result {
        Err(HardsubError::Cancelled) => {}
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
}

// ── ProgressInfo ───────────────────────────────────────────────────

#[derive(Default)]
struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

fn render_with_recorder(batch_size: u64) -> Option<Arc<RecordingProgress>> {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return None;
    }

    let recorder = Arc::new(RecordingProgress::default());
    let options = RenderOptions::new()
        .with_preset("ultrafast")
        .with_progress(recorder.clone())
        .with_batch_size(batch_size);

    let output = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    let mut source = SourceVideo::open(path).expect("Failed to open fixture");
    Compositor::new(&mut source, options)
        .render(&sample_track(), output.path())
        .expect("Failed to render");
    Some(recorder)
}

#[test]
fn progress_current_is_non_decreasing() {
    let Some(recorder) = render_with_recorder(1) else {
        return;
    };

    let infos = recorder.infos.lock().unwrap();
    assert!(!infos.is_empty(), "Expected progress callbacks");
    for window in infos.windows(2) {
        assert!(
            window[1].current >= window[0].current,
            "Progress current should be non-decreasing",
        );
    }
}

#[test]
fn progress_percentage_is_capped() {
    let Some(recorder) = render_with_recorder(10) else {
        return;
    };

    let infos = recorder.infos.lock().unwrap();
    for info in infos.iter() {
        if let Some(percentage) = info.percentage {
            assert!((0.0..=100.0).contains(&percentage));
        }
    }
    let last = infos.last().expect("Expected a final report");
    assert!(last.current > 0);
    assert!(last.elapsed.as_nanos() > 0);
}
