//! Render and server configuration.
//!
//! [`RenderOptions`] threads encoder settings, progress callbacks and
//! cancellation through the [`Compositor`](crate::Compositor) without
//! widening every signature. [`ServerConfig`] bundles what the HTTP service
//! needs on top of that.
//!
//! # Example
//!
//! ```
//! use hardsub::{CancellationToken, RenderOptions, VideoCodec};
//!
//! let token = CancellationToken::new();
//! let options = RenderOptions::new()
//!     .with_codec(VideoCodec::H265)
//!     .with_crf(28)
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::net::SocketAddr;
use std::sync::Arc;

use ffmpeg_next::codec::Id;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::style::CaptionStyle;

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC. The default.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2.
    Mpeg4,
}

impl VideoCodec {
    pub(crate) fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }

    /// Whether the encoder understands `crf` and `preset` options.
    pub(crate) fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

/// Settings for a single render.
#[derive(Clone)]
pub struct RenderOptions {
    pub(crate) codec: VideoCodec,
    /// Constant Rate Factor (0-51, lower is better).
    pub(crate) crf: u32,
    /// Encoder speed/size trade-off (`ultrafast` … `veryslow`).
    pub(crate) preset: String,
    /// Bitrate in bits per second. Overrides CRF when set.
    pub(crate) bitrate: Option<usize>,
    /// Carry the source audio into the output (copied or re-encoded as AAC).
    pub(crate) copy_audio: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    /// Fire the progress callback every N frames.
    pub(crate) batch_size: u64,
}

impl Debug for RenderOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RenderOptions")
            .field("codec", &self.codec)
            .field("crf", &self.crf)
            .field("preset", &self.preset)
            .field("bitrate", &self.bitrate)
            .field("copy_audio", &self.copy_audio)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderOptions {
    /// Defaults: H.264, CRF 23, `medium` preset, audio kept, no progress
    /// callback, no cancellation, batch size 1.
    pub fn new() -> Self {
        Self {
            codec: VideoCodec::H264,
            crf: 23,
            preset: "medium".to_string(),
            bitrate: None,
            copy_audio: true,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the CRF quality value, clamped to 51.
    #[must_use]
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(51);
        self
    }

    #[must_use]
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set a target bitrate in bits per second.
    #[must_use]
    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Drop the source audio from the output.
    #[must_use]
    pub fn without_audio(mut self) -> Self {
        self.copy_audio = false;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// When the token is cancelled the render stops and returns
    /// [`HardsubError::Cancelled`](crate::HardsubError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    pub fn crf(&self) -> u32 {
        self.crf
    }

    pub fn copies_audio(&self) -> bool {
        self.copy_audio
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    pub style: CaptionStyle,
    pub render: RenderOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_upload_bytes: 512 * 1024 * 1024,
            style: CaptionStyle::default(),
            render: RenderOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }
}
