//! Opening source videos.
//!
//! [`SourceVideo`] wraps an FFmpeg demuxer together with the streams the
//! compositor needs: the best video stream (required) and the best audio
//! stream (optional, copied through unchanged).

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    error::HardsubError,
    metadata::{AudioMetadata, MediaMetadata, VideoMetadata},
};

/// An opened source video.
///
/// # Example
///
/// ```no_run
/// use hardsub::{HardsubError, SourceVideo};
///
/// let source = SourceVideo::open("input.mp4")?;
/// println!("{} fps", source.metadata().video.frames_per_second);
/// # Ok::<(), HardsubError>(())
/// ```
pub struct SourceVideo {
    pub(crate) input_context: Input,
    pub(crate) metadata: MediaMetadata,
    pub(crate) video_stream_index: usize,
    pub(crate) audio_stream_index: Option<usize>,
    pub(crate) file_path: PathBuf,
}

impl Debug for SourceVideo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SourceVideo")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("audio_stream_index", &self.audio_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl SourceVideo {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, selects the
    /// best video and audio streams and caches their metadata.
    ///
    /// # Errors
    ///
    /// - [`HardsubError::FileOpen`] if the file cannot be opened or its
    ///   codec parameters cannot be read.
    /// - [`HardsubError::NoVideoStream`] if there is nothing to draw on.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HardsubError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();
        let open_error = |reason: String| HardsubError::FileOpen {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening source video: {}", file_path.display());

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input_context.format().name().to_string();

        let video_stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(HardsubError::NoVideoStream)?;
        let video_stream_index = video_stream.index();

        let decoder_context = CodecContext::from_parameters(video_stream.parameters())
            .map_err(|error| open_error(format!("Failed to read video codec parameters: {error}")))?;
        let video_decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let frame_rate = video_stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = video_stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let video = VideoMetadata {
            width: video_decoder.width(),
            height: video_decoder.height(),
            frames_per_second,
            frame_count,
            codec: video_decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let audio_stream = input_context.streams().best(Type::Audio);
        let audio_stream_index = audio_stream.as_ref().map(|stream| stream.index());
        let audio = match audio_stream {
            Some(stream) => {
                let decoder_context = CodecContext::from_parameters(stream.parameters())
                    .map_err(|error| {
                        open_error(format!("Failed to read audio codec parameters: {error}"))
                    })?;
                let audio_decoder = decoder_context.decoder().audio().map_err(|error| {
                    open_error(format!("Failed to create audio decoder: {error}"))
                })?;
                Some(AudioMetadata {
                    sample_rate: audio_decoder.rate(),
                    channels: audio_decoder.channels(),
                    codec: audio_decoder
                        .codec()
                        .map(|codec| codec.name().to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    bit_rate: audio_decoder.bit_rate() as u64,
                })
            }
            None => None,
        };

        log::info!(
            "Opened {} ({}x{} @ {:.3} fps, audio: {})",
            file_path.display(),
            video.width,
            video.height,
            video.frames_per_second,
            audio.as_ref().map_or("none", |a| a.codec.as_str()),
        );

        let metadata = MediaMetadata {
            video,
            audio,
            duration,
            format,
        };

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            audio_stream_index,
            file_path,
        })
    }

    /// Cached metadata read at open time.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Frames per second of the video stream.
    pub fn frame_rate(&self) -> f64 {
        self.metadata.video.frames_per_second
    }

    /// Whether the source carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_stream_index.is_some()
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
