//! The end-to-end burn-in pipeline.
//!
//! [`burn_subtitles`] is the per-request transformation behind the HTTP
//! endpoint: uploaded video bytes and SRT text in, captioned MP4 bytes out.
//! FFmpeg needs a path to open, so the upload and the render target live in
//! [`tempfile::NamedTempFile`]s that are removed when they drop, on success
//! and on every error path alike.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{
    config::RenderOptions,
    error::HardsubError,
    overlay::CaptionTrackBuilder,
    render::Compositor,
    source::SourceVideo,
    srt,
    style::CaptionStyle,
};

/// Burn `srt_text` into `video` and return the encoded MP4.
///
/// # Errors
///
/// Returns [`HardsubError::TimestampParse`] for the one out-of-contract SRT
/// case, [`HardsubError::IoError`] if the temporary files cannot be created
/// or read, and any error from [`SourceVideo::open`] or
/// [`Compositor::render`].
///
/// # Example
///
/// ```no_run
/// use hardsub::{CaptionStyle, HardsubError, RenderOptions};
///
/// let video = std::fs::read("input.mp4")?;
/// let srt = std::fs::read_to_string("input.srt")?;
/// let output = hardsub::burn_subtitles(&video, &srt, &CaptionStyle::default(), &RenderOptions::default())?;
/// std::fs::write("subtitled_video.mp4", output)?;
/// # Ok::<(), HardsubError>(())
/// ```
pub fn burn_subtitles(
    video: &[u8],
    srt_text: &str,
    style: &CaptionStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>, HardsubError> {
    let records = srt::parse(srt_text)?;

    let mut input = scratch_file()?;
    input.write_all(video)?;
    input.flush()?;

    let output = scratch_file()?;
    render_records(input.path(), &records, output.path(), style, options)?;

    let bytes = std::fs::read(output.path())?;
    log::debug!(
        "Burned {} captions into {} input bytes, produced {} bytes",
        records.len(),
        video.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Burn the SRT file at `srt_path` into the video at `input`, writing to
/// `output`.
///
/// The SRT file must be UTF-8; a decoding failure surfaces as
/// [`HardsubError::IoError`].
pub fn burn_file<P1, P2, P3>(
    input: P1,
    srt_path: P2,
    output: P3,
    style: &CaptionStyle,
    options: &RenderOptions,
) -> Result<(), HardsubError>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
{
    let srt_text = std::fs::read_to_string(srt_path)?;
    let records = srt::parse(&srt_text)?;
    render_records(input.as_ref(), &records, output.as_ref(), style, options)
}

fn render_records(
    input: &Path,
    records: &[srt::CaptionRecord],
    output: &Path,
    style: &CaptionStyle,
    options: &RenderOptions,
) -> Result<(), HardsubError> {
    let mut source = SourceVideo::open(input)?;
    let track = CaptionTrackBuilder::new(style.clone()).build_track(records);
    Compositor::new(&mut source, options.clone()).render(&track, output)
}

/// The `.mp4` suffix lets FFmpeg infer the output container.
fn scratch_file() -> Result<NamedTempFile, HardsubError> {
    Ok(tempfile::Builder::new()
        .prefix("hardsub-")
        .suffix(".mp4")
        .tempfile()?)
}
