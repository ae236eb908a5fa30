//! Caption text layout.
//!
//! FFmpeg's `drawtext` draws whatever lines it is given and never wraps, so
//! the decision between a single natural line and wrapped "caption" lines is
//! made here. Widths are estimated from per-character advance classes for a
//! bold sans-serif face, scaled by the font size.

use crate::style::CaptionStyle;

/// How a caption's text is arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// The text fits on one line at its natural width.
    Natural,
    /// The text exceeded the width limit and was wrapped.
    Wrapped,
}

/// Laid-out caption text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub mode: LayoutMode,
    /// Lines to draw, top to bottom, each centered horizontally.
    pub lines: Vec<String>,
    /// Estimated width of the widest line.
    pub width: f32,
    /// Estimated height of the whole block.
    pub height: f32,
}

impl TextLayout {
    /// The lines joined with `\n`, as `drawtext` expects.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Lay out `text` under `style`.
///
/// The natural single-line width is used when it fits within
/// [`CaptionStyle::max_text_width`]; otherwise words are wrapped greedily so
/// that every line fits, except a single word longer than the limit, which
/// gets a line to itself.
///
/// Wrapped text keeps only as many lines as fit in
/// [`CaptionStyle::box_height`] (at least one); the rest are dropped.
pub fn layout_text(text: &str, style: &CaptionStyle) -> TextLayout {
    let limit = style.max_text_width as f32;
    let natural = measure(text, style);

    if natural <= limit {
        return TextLayout {
            mode: LayoutMode::Natural,
            lines: vec![text.to_string()],
            width: natural,
            height: style.line_height(),
        };
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate, style) <= limit {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let max_lines = max_lines(style);
    if lines.len() > max_lines {
        log::debug!(
            "Caption needs {} lines but the box holds {max_lines}; dropping the rest",
            lines.len(),
        );
        lines.truncate(max_lines);
    }

    let width = lines
        .iter()
        .map(|line| measure(line, style))
        .fold(0.0_f32, f32::max);
    let height = style.line_height() * lines.len() as f32;

    TextLayout {
        mode: LayoutMode::Wrapped,
        lines,
        width,
        height,
    }
}

/// Lines of `style.line_height()` that fit inside the caption box.
fn max_lines(style: &CaptionStyle) -> usize {
    let fit = (style.box_height as f32 / style.line_height()).floor();
    (fit as usize).max(1)
}

/// Estimated rendered width of a single line, outline included.
pub fn measure(line: &str, style: &CaptionStyle) -> f32 {
    let advance: f32 = line.chars().map(advance_em).sum();
    advance * style.font_size + 2.0 * style.stroke_width
}

/// Approximate advance of one character, in ems.
fn advance_em(c: char) -> f32 {
    match c {
        ' ' => 0.28,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.36,
        'm' | 'w' | 'M' | 'W' | '@' => 0.9,
        'A'..='Z' => 0.72,
        '0'..='9' => 0.56,
        c if c.is_ascii() => 0.58,
        c if is_wide(c) => 1.0,
        _ => 0.6,
    }
}

/// CJK ideographs, kana, hangul and fullwidth forms.
fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_keeps_natural_layout() {
        let style = CaptionStyle::default();
        let layout = layout_text("Hi there", &style);
        assert_eq!(layout.mode, LayoutMode::Natural);
        assert_eq!(layout.lines, vec!["Hi there"]);
        assert!(layout.width <= 600.0);
    }

    #[test]
    fn long_text_wraps_within_limit() {
        let style = CaptionStyle::default().box_size(650, 400);
        let text = "This caption is far too long to fit on a single line of the caption box";
        let layout = layout_text(text, &style);

        assert_eq!(layout.mode, LayoutMode::Wrapped);
        assert!(layout.lines.len() > 1);
        for line in &layout.lines {
            assert!(measure(line, &style) <= 600.0, "line too wide: {line}");
        }
        assert_eq!(layout.lines.join(" "), text);
        assert_eq!(layout.text().matches('\n').count(), layout.lines.len() - 1);
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let style = CaptionStyle::default().max_text_width(100).box_size(650, 400);
        let layout = layout_text("a Supercalifragilistic b", &style);
        assert_eq!(layout.lines, vec!["a", "Supercalifragilistic", "b"]);
    }

    #[test]
    fn wrapped_lines_never_overflow_the_box() {
        let style = CaptionStyle::default();
        let text = "one two three four five six seven eight nine ten eleven twelve \
                    thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty";
        let layout = layout_text(text, &style);

        assert_eq!(max_lines(&style), 2);
        assert_eq!(layout.lines.len(), 2);
        assert!(layout.height <= style.box_height as f32);
        assert!(text.starts_with(&layout.lines.join(" ")));
    }

    #[test]
    fn tiny_box_still_shows_one_line() {
        let style = CaptionStyle::default().box_size(650, 10).max_text_width(100);
        let layout = layout_text("first second third", &style);
        assert_eq!(layout.lines, vec!["first"]);
    }

    #[test]
    fn wide_characters_measure_as_one_em() {
        let style = CaptionStyle::default().stroke(crate::style::Color::BLACK, 0.0);
        assert_eq!(measure("日本", &style), 72.0);
    }
}
