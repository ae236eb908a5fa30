//! Caption track construction.
//!
//! [`CaptionTrackBuilder`] turns parsed [`CaptionRecord`]s into
//! [`OverlayInstruction`]s: the text, its on-screen window, the style it is
//! drawn with and where it is anchored. Building is pure; nothing is drawn
//! until the instructions reach the [`Compositor`](crate::Compositor).
//!
//! # Example
//!
//! ```
//! use hardsub::{CaptionStyle, CaptionTrackBuilder, srt};
//!
//! let records = srt::parse("00:00:04,000 --> 00:00:06,000\nSecond line\ncontinued\n")?;
//! let builder = CaptionTrackBuilder::new(CaptionStyle::default());
//! let overlay = builder.build_overlay(&records[0]);
//! assert_eq!(overlay.start_time, 4.0);
//! assert_eq!(overlay.duration, 2.0);
//! assert_eq!(overlay.text, "Second line continued");
//! # Ok::<(), hardsub::HardsubError>(())
//! ```

use crate::layout::{TextLayout, layout_text};
use crate::srt::CaptionRecord;
use crate::style::CaptionStyle;

/// Where a caption is anchored within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Horizontally centered, resting on the bottom margin.
    BottomCenter,
}

/// Anchor plus the transparent margin that separates it from the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Which edge of the frame the box rests against.
    pub anchor: Anchor,
    /// Gap between the box and the bottom of the frame, in pixels.
    pub bottom_margin: u32,
}

/// Top-left corner of a caption's background box, in frame pixels.
///
/// Coordinates may be negative when the frame is smaller than the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxPlacement {
    /// Distance from the left edge of the frame.
    pub x: i64,
    /// Distance from the top edge of the frame.
    pub y: i64,
}

/// One caption, ready to be composited.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInstruction {
    pub text: String,
    /// Seconds from the start of the video.
    pub start_time: f64,
    /// Seconds on screen. Not clamped; a value `<= 0` never shows.
    pub duration: f64,
    pub style: CaptionStyle,
    pub position: Position,
    pub layout: TextLayout,
}

impl OverlayInstruction {
    /// End of the on-screen window, in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the caption is on screen at `seconds`, using the half-open
    /// window `[start, end)`.
    pub fn is_active_at(&self, seconds: f64) -> bool {
        seconds >= self.start_time && seconds < self.end_time()
    }

    /// Compute the background box position for a frame of the given size.
    pub fn placement(&self, frame_width: u32, frame_height: u32) -> BoxPlacement {
        match self.position.anchor {
            Anchor::BottomCenter => BoxPlacement {
                x: (frame_width as i64 - self.style.box_width as i64) / 2,
                y: frame_height as i64
                    - self.position.bottom_margin as i64
                    - self.style.box_height as i64,
            },
        }
    }
}

/// Builds overlay instructions under a fixed [`CaptionStyle`].
#[derive(Debug, Clone, Default)]
pub struct CaptionTrackBuilder {
    style: CaptionStyle,
}

impl CaptionTrackBuilder {
    pub fn new(style: CaptionStyle) -> Self {
        Self { style }
    }

    /// The style every instruction is built with.
    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    /// Build the instruction for one record.
    ///
    /// `start_time` is copied from the record and `duration` is
    /// `end_time - start_time`, with no special handling for degenerate
    /// windows.
    pub fn build_overlay(&self, record: &CaptionRecord) -> OverlayInstruction {
        OverlayInstruction {
            text: record.text.clone(),
            start_time: record.start_time,
            duration: record.duration(),
            style: self.style.clone(),
            position: Position {
                anchor: Anchor::BottomCenter,
                bottom_margin: self.style.bottom_margin,
            },
            layout: layout_text(&record.text, &self.style),
        }
    }

    /// Build instructions for every record, preserving order.
    pub fn build_track(&self, records: &[CaptionRecord]) -> Vec<OverlayInstruction> {
        let track: Vec<OverlayInstruction> =
            records.iter().map(|record| self.build_overlay(record)).collect();
        let degenerate = track.iter().filter(|o| o.duration <= 0.0).count();
        if degenerate > 0 {
            log::warn!("{degenerate} caption(s) have a non-positive duration and will not show");
        }
        track
    }
}
