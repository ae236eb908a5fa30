//! # hardsub
//!
//! Burn SRT subtitles into video frames, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! The core is a lenient SRT parser and a caption-track builder that turns
//! each cue into a drawing instruction with a fixed style and a bottom-centre
//! box. The instructions become an FFmpeg `drawbox`/`drawtext` filter chain,
//! the source video is decoded through it, and the result is re-encoded as
//! H.264, with the original audio copied across or re-encoded as AAC.
//!
//! ## Quick Start
//!
//! ### Parse an SRT file
//!
//! ```
//! let cues = hardsub::srt::parse("1\n00:00:01,000 --> 00:00:02,500\nHello\n").unwrap();
//! assert_eq!(cues[0].start_time, 1.0);
//! assert_eq!(cues[0].text, "Hello");
//! ```
//!
//! ### Build a caption track
//!
//! ```
//! use hardsub::{CaptionStyle, CaptionTrackBuilder};
//!
//! let cues = hardsub::srt::parse("00:00:01,000 --> 00:00:03,000\nHi\n").unwrap();
//! let track = CaptionTrackBuilder::new(CaptionStyle::default()).build_track(&cues);
//! assert_eq!(track[0].duration, 2.0);
//! ```
//!
//! ### Burn captions into a file
//!
//! ```no_run
//! use hardsub::{CaptionStyle, RenderOptions};
//!
//! hardsub::burn_file(
//!     "input.mp4",
//!     "input.srt",
//!     "subtitled_video.mp4",
//!     &CaptionStyle::default(),
//!     &RenderOptions::default(),
//! )
//! .unwrap();
//! ```
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `server` | `POST /add_subtitles` HTTP service built on axum (default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system, and the
//! linked FFmpeg must be built with `libfreetype` for `drawtext`.

mod audio;
pub mod config;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod layout;
pub mod metadata;
pub mod overlay;
pub mod pipeline;
pub mod progress;
pub mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod source;
pub mod srt;
pub mod style;

pub use config::{RenderOptions, ServerConfig, VideoCodec};
pub use error::HardsubError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use filter::{caption_filter_chain, caption_filter_chain_from};
pub use layout::{LayoutMode, TextLayout};
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use overlay::{Anchor, BoxPlacement, CaptionTrackBuilder, OverlayInstruction, Position};
pub use pipeline::{burn_file, burn_subtitles};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use render::Compositor;
pub use source::SourceVideo;
pub use srt::CaptionRecord;
pub use style::{CaptionStyle, Color};
