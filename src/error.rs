//! Error types for the `hardsub` crate.
//!
//! [`HardsubError`] is returned by every fallible operation, from timestamp
//! conversion in the SRT parser through to encoding the final video. Media
//! errors carry the path or FFmpeg message that caused them so the HTTP
//! layer can report them without extra logging.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `hardsub` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HardsubError {
    /// The source video could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path handed to [`SourceVideo::open`](crate::SourceVideo::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The composited video could not be encoded or muxed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// The caption filter graph could not be built or run.
    #[error("Filter graph error: {0}")]
    FilterGraphError(String),

    /// Copying the original audio packets into the output failed.
    #[error("Stream copy error: {0}")]
    StreamCopyError(String),

    /// A line matched the SRT time-range pattern but one of its fields could
    /// not be converted to an integer.
    #[error("Invalid SRT timestamp '{value}': {reason}")]
    TimestampParse {
        /// The timestamp text as it appeared in the file.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while handling temporary or output files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The render was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for HardsubError {
    fn from(error: FfmpegError) -> Self {
        HardsubError::FfmpegError(error.to_string())
    }
}
