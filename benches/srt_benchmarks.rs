//! Benchmarks for parsing, track building and rendering.
//!
//! Run with: cargo bench
//!
//! The render benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{fmt::Write, hint::black_box, path::Path, time::Duration};

use criterion::Criterion;
use hardsub::{
    CaptionStyle, CaptionTrackBuilder, FfmpegLogLevel, RenderOptions, caption_filter_chain, srt,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn synthetic_srt(cues: usize) -> String {
    let mut text = String::new();
    for index in 0..cues {
        let start = Duration::from_millis(index as u64 * 2_000);
        let end = start + Duration::from_millis(1_500);
        let _ = write!(
            text,
            "{}\n{} --> {}\nCaption number {index}\nwith a second line of text\n\n",
            index + 1,
            srt::format_srt_timestamp(start),
            srt::format_srt_timestamp(end),
        );
    }
    text
}

fn benchmark_parsing(criterion: &mut Criterion) {
    let small = synthetic_srt(10);
    let large = synthetic_srt(2_000);

    criterion.bench_function("parse 10 cues", |bencher| {
        bencher.iter(|| srt::parse(black_box(&small)).unwrap());
    });

    criterion.bench_function("parse 2000 cues", |bencher| {
        bencher.iter(|| srt::parse(black_box(&large)).unwrap());
    });
}

fn benchmark_track(criterion: &mut Criterion) {
    let records = srt::parse(&synthetic_srt(500)).unwrap();
    let builder = CaptionTrackBuilder::new(CaptionStyle::default());

    criterion.bench_function("build track of 500 captions", |bencher| {
        bencher.iter(|| builder.build_track(black_box(&records)));
    });

    let track = builder.build_track(&records);
    criterion.bench_function("filter chain for 500 captions", |bencher| {
        bencher.iter(|| caption_filter_chain(black_box(&track), 1920, 1080));
    });
}

fn benchmark_render(criterion: &mut Criterion) {
    hardsub::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let video = std::fs::read(SAMPLE_VIDEO).unwrap();
    let subtitles = synthetic_srt(3);
    let style = CaptionStyle::default();
    let options = RenderOptions::new().with_preset("ultrafast");

    let mut group = criterion.benchmark_group("render");
    group.sample_size(10);
    group.bench_function("burn 3 captions into 5s clip", |bencher| {
        bencher.iter(|| hardsub::burn_subtitles(&video, &subtitles, &style, &options).unwrap());
    });
    group.finish();
}

criterion::criterion_group!(benches, benchmark_parsing, benchmark_track, benchmark_render);
criterion::criterion_main!(benches);
