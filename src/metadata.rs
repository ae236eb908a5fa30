//! Media metadata types.
//!
//! Returned by [`SourceVideo::metadata`](crate::SourceVideo::metadata).
//! Metadata is read once when the source is opened and cached for its
//! lifetime.

use std::time::Duration;

/// Container-level metadata plus the selected video and audio streams.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    pub video: VideoMetadata,
    /// Present when the source has an audio stream.
    pub audio: Option<AudioMetadata>,
    /// Total duration of the container. Zero when FFmpeg cannot tell.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

/// Metadata for the video stream captions are burned into.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated total number of frames, from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
}

/// Metadata for an audio stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    pub sample_rate: u32,
    pub channels: u16,
    /// Codec name (e.g. `"aac"`, `"opus"`).
    pub codec: String,
    /// Bit rate in bits per second.
    pub bit_rate: u64,
}
