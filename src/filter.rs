//! FFmpeg filter descriptions for burned-in captions.
//!
//! Each [`OverlayInstruction`] becomes a filled `drawbox` followed by a
//! `drawtext`, both switched on only inside the caption's window through the
//! timeline `enable` option. The chain always ends by converting to YUV420P
//! so the encoder sees one pixel format regardless of the source.

use std::fmt::Write;

use crate::overlay::OverlayInstruction;

/// Build the comma-separated filter chain for a caption track.
///
/// The chain is meant to sit between a `buffer` source and a `buffersink`,
/// as in [`Compositor`](crate::Compositor). An empty track produces only the
/// pixel-format conversion.
///
/// Caption windows are taken as seconds from the first frame. Use
/// [`caption_filter_chain_from`] when the source timestamps do not start at
/// zero.
pub fn caption_filter_chain(
    track: &[OverlayInstruction],
    frame_width: u32,
    frame_height: u32,
) -> String {
    caption_filter_chain_from(track, frame_width, frame_height, 0.0)
}

/// Like [`caption_filter_chain`], for a source whose timestamps start at
/// `timeline_start` seconds.
///
/// Every window is shifted by `timeline_start`, so a caption at 1.0 s shows
/// one second after the first frame whatever that frame's `t` is.
pub fn caption_filter_chain_from(
    track: &[OverlayInstruction],
    frame_width: u32,
    frame_height: u32,
    timeline_start: f64,
) -> String {
    let mut filters: Vec<String> = Vec::with_capacity(track.len() * 2 + 1);

    for overlay in track {
        let placement = overlay.placement(frame_width, frame_height);
        let enable = enable_expression(
            overlay.start_time + timeline_start,
            overlay.end_time() + timeline_start,
        );
        let style = &overlay.style;

        filters.push(filter(
            "drawbox",
            &[
                ("x", placement.x.to_string()),
                ("y", placement.y.to_string()),
                ("w", style.box_width.to_string()),
                ("h", style.box_height.to_string()),
                ("color", style.background_color.to_ffmpeg()),
                ("t", "fill".to_string()),
                ("enable", enable.clone()),
            ],
        ));

        let mut text_options = Vec::with_capacity(12);
        match &style.font_file {
            Some(path) => text_options.push(("fontfile", path.display().to_string())),
            None => text_options.push(("font", style.font_family.clone())),
        }
        text_options.extend([
            ("text", overlay.layout.text()),
            ("expansion", "none".to_string()),
            ("fontsize", format!("{}", style.font_size)),
            ("fontcolor", style.text_color.to_ffmpeg()),
            ("borderw", style.border_pixels().to_string()),
            ("bordercolor", style.stroke_color.to_ffmpeg()),
            ("text_align", "C".to_string()),
            ("x", format!("{}+({}-text_w)/2", placement.x, style.box_width)),
            ("y", format!("{}+({}-text_h)/2", placement.y, style.box_height)),
            ("enable", enable),
        ]);
        filters.push(filter("drawtext", &text_options));
    }

    filters.push("format=pix_fmts=yuv420p".to_string());
    filters.join(",")
}

/// Timeline expression that is non-zero for `start <= t < end`.
fn enable_expression(start: f64, end: f64) -> String {
    format!("gte(t,{start:.3})*lt(t,{end:.3})")
}

fn filter(name: &str, options: &[(&str, String)]) -> String {
    let mut args = String::new();
    for (i, (key, value)) in options.iter().enumerate() {
        if i > 0 {
            args.push(':');
        }
        let _ = write!(args, "{key}={}", escape_option_value(value));
    }
    format!("{name}={}", escape_graph(&args))
}

/// First escaping level: a single option value inside `key=value:...`.
fn escape_option_value(raw: &str) -> String {
    escape_chars(raw, &['\\', '\'', ':'])
}

/// Second escaping level: the whole argument string inside the graph.
fn escape_graph(raw: &str) -> String {
    escape_chars(raw, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
