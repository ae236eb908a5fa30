//! Caption track and style integration tests.

use hardsub::{
    Anchor, BoxPlacement, CaptionRecord, CaptionStyle, CaptionTrackBuilder, Color, LayoutMode,
    srt,
};

fn record(start_time: f64, end_time: f64, text: &str) -> CaptionRecord {
    CaptionRecord {
        start_time,
        end_time,
        text: text.to_string(),
    }
}

// ── Style defaults ─────────────────────────────────────────────────

#[test]
fn default_style_matches_house_style() {
    let style = CaptionStyle::default();
    assert_eq!(style.font_family, "Sans:style=Bold");
    assert!(style.font_file.is_none());
    assert_eq!(style.font_size, 36.0);
    assert_eq!(style.text_color, Color::WHITE);
    assert_eq!(style.stroke_color, Color::BLACK);
    assert_eq!(style.stroke_width, 0.5);
    assert_eq!(style.max_text_width, 600);
    assert_eq!((style.box_width, style.box_height), (650, 120));
    assert_eq!(style.background_color, Color::rgb(50, 50, 50));
    assert_eq!(style.bottom_margin, 50);
}

#[test]
fn style_builders_override_individual_values() {
    let style = CaptionStyle::new()
        .font_size(48.0)
        .box_size(800, 160)
        .bottom_margin(10)
        .text_color(Color::rgb(255, 255, 0).with_alpha(128));

    assert_eq!(style.font_size, 48.0);
    assert_eq!((style.box_width, style.box_height), (800, 160));
    assert_eq!(style.bottom_margin, 10);
    assert_eq!(style.text_color.alpha, 128);
    assert_eq!(style.max_text_width, 600);
}

#[test]
fn color_formats() {
    assert_eq!(Color::DARK_GREY.to_ffmpeg(), "0x323232@1.000");
    assert_eq!(Color::BLACK.with_alpha(0).to_ffmpeg(), "0x000000@0.000");
    assert_eq!(Color::WHITE.to_string(), "#ffffffff");
}

// ── build_overlay ──────────────────────────────────────────────────

#[test]
fn overlay_copies_start_and_computes_duration() {
    let builder = CaptionTrackBuilder::default();
    let overlay = builder.build_overlay(&record(1.0, 3.5, "Hi there"));

    assert_eq!(overlay.text, "Hi there");
    assert_eq!(overlay.start_time, 1.0);
    assert_eq!(overlay.duration, 2.5);
    assert_eq!(overlay.end_time(), 3.5);
    assert_eq!(overlay.position.anchor, Anchor::BottomCenter);
    assert_eq!(overlay.position.bottom_margin, 50);
    assert_eq!(overlay.style, CaptionStyle::default());
}

#[test]
fn overlay_is_deterministic() {
    let builder = CaptionTrackBuilder::new(CaptionStyle::default());
    let input = record(12.345, 14.0, "Same text every time");

    let first = builder.build_overlay(&input);
    for _ in 0..10 {
        assert_eq!(builder.build_overlay(&input), first);
    }
}

#[test]
fn degenerate_windows_pass_through_unclamped() {
    let builder = CaptionTrackBuilder::default();

    let zero = builder.build_overlay(&record(2.0, 2.0, "zero"));
    assert_eq!(zero.duration, 0.0);
    assert!(!zero.is_active_at(2.0));

    let negative = builder.build_overlay(&record(5.0, 3.0, "backwards"));
    assert_eq!(negative.duration, -2.0);
    assert!(!negative.is_active_at(4.0));
}

#[test]
fn active_window_is_half_open() {
    let overlay = CaptionTrackBuilder::default().build_overlay(&record(1.0, 3.5, "Hi"));
    assert!(!overlay.is_active_at(0.999));
    assert!(overlay.is_active_at(1.0));
    assert!(overlay.is_active_at(3.49));
    assert!(!overlay.is_active_at(3.5));
}

#[test]
fn placement_is_bottom_centred() {
    let overlay = CaptionTrackBuilder::default().build_overlay(&record(0.0, 1.0, "Hi"));
    assert_eq!(overlay.placement(1280, 720), BoxPlacement { x: 315, y: 550 });
    assert_eq!(overlay.placement(1920, 1080), BoxPlacement { x: 635, y: 910 });
}

#[test]
fn placement_goes_negative_on_small_frames() {
    let overlay = CaptionTrackBuilder::default().build_overlay(&record(0.0, 1.0, "Hi"));
    let placement = overlay.placement(320, 160);
    assert_eq!(placement, BoxPlacement { x: -165, y: -10 });
}

#[test]
fn long_text_is_wrapped() {
    let text = "A very long caption that certainly cannot fit inside six hundred pixels at this size";
    let overlay = CaptionTrackBuilder::default().build_overlay(&record(0.0, 1.0, text));

    assert_eq!(overlay.layout.mode, LayoutMode::Wrapped);
    assert!(overlay.layout.lines.len() >= 2);
    assert_eq!(overlay.text, text);
}

#[test]
fn wrapped_text_stays_inside_the_box() {
    let text = "Four or more wrapped lines at thirty six points would spill out of a box \
                that is only one hundred and twenty pixels tall, so the extra lines go";
    let style = CaptionStyle::default();
    let overlay = CaptionTrackBuilder::new(style.clone()).build_overlay(&record(0.0, 1.0, text));

    assert_eq!(overlay.layout.mode, LayoutMode::Wrapped);
    assert_eq!(overlay.layout.lines.len(), 2);
    assert!(overlay.layout.height <= style.box_height as f32);
}

// ── build_track ────────────────────────────────────────────────────

#[test]
fn track_preserves_parse_order() {
    let records = srt::parse(
        "00:00:04,000 --> 00:00:06,000\nlater\n00:00:01,000 --> 00:00:02,000\nearlier\n",
    )
    .unwrap();
    let track = CaptionTrackBuilder::default().build_track(&records);

    assert_eq!(track.len(), 2);
    assert_eq!(track[0].text, "later");
    assert_eq!(track[1].text, "earlier");
}

#[test]
fn empty_records_give_empty_track() {
    assert!(CaptionTrackBuilder::default().build_track(&[]).is_empty());
}

#[test]
fn custom_style_flows_into_every_instruction() {
    let style = CaptionStyle::default().bottom_margin(0).box_size(100, 20);
    let builder = CaptionTrackBuilder::new(style.clone());
    let track = builder.build_track(&[record(0.0, 1.0, "a"), record(1.0, 2.0, "b")]);

    for overlay in &track {
        assert_eq!(overlay.style, style);
        assert_eq!(overlay.position.bottom_margin, 0);
        assert_eq!(overlay.placement(200, 100), BoxPlacement { x: 50, y: 80 });
    }
}
