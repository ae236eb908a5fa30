//! Compositing captions onto a video.
//!
//! [`Compositor`] decodes the source video stream, runs every frame through
//! an FFmpeg filter graph built from the caption track and encodes the
//! result. Source audio is copied through when the container takes it and
//! re-encoded as AAC otherwise.
//!
//! ```text
//! decoder → buffer → drawbox/drawtext … → format=yuv420p → buffersink → encoder
//! audio packets ──────────────────────────── (copy or AAC) ─────────────→ muxer
//! ```
//!
//! Caption windows count from the first frame. Sources whose timestamps
//! start late (MPEG-TS, edit lists) have their windows shifted by the video
//! stream's start time.
//!
//! # Example
//!
//! ```no_run
//! use hardsub::{CaptionStyle, CaptionTrackBuilder, Compositor, HardsubError, RenderOptions, SourceVideo, srt};
//!
//! let records = srt::parse(&std::fs::read_to_string("input.srt")?)?;
//! let track = CaptionTrackBuilder::new(CaptionStyle::default()).build_track(&records);
//!
//! let mut source = SourceVideo::open("input.mp4")?;
//! Compositor::new(&mut source, RenderOptions::default()).render(&track, "output.mp4")?;
//! # Ok::<(), HardsubError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    encoder::video::Encoder as VideoEncoder,
    filter::Graph as FilterGraph,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    picture,
};
use ffmpeg_sys_next::AVPixelFormat;

use crate::{
    audio::AudioTrack,
    config::RenderOptions,
    conversion::{frame_rate_rational, pts_to_duration, stream_start_seconds},
    error::HardsubError,
    filter::caption_filter_chain_from,
    overlay::OverlayInstruction,
    progress::ProgressTracker,
    source::SourceVideo,
};

/// Burns a caption track into a [`SourceVideo`].
pub struct Compositor<'a> {
    source: &'a mut SourceVideo,
    options: RenderOptions,
}

impl<'a> Compositor<'a> {
    pub fn new(source: &'a mut SourceVideo, options: RenderOptions) -> Self {
        Self { source, options }
    }

    /// Render the captioned video to `path`.
    ///
    /// The container is inferred from the file extension. The output keeps
    /// the source resolution and time base.
    ///
    /// # Errors
    ///
    /// - [`HardsubError::VideoEncodeError`] if the output or encoder cannot
    ///   be set up, or muxing fails.
    /// - [`HardsubError::VideoDecodeError`] if a source frame cannot be
    ///   decoded.
    /// - [`HardsubError::FilterGraphError`] if the caption filters are
    ///   rejected (for example when FFmpeg was built without `drawtext`).
    /// - [`HardsubError::StreamCopyError`] if the audio cannot be copied or
    ///   re-encoded.
    /// - [`HardsubError::Cancelled`] if the cancellation token fires.
    pub fn render<P: AsRef<Path>>(
        self,
        track: &[OverlayInstruction],
        path: P,
    ) -> Result<(), HardsubError> {
        let path = path.as_ref();
        let options = &self.options;
        let video_metadata = self.source.metadata.video.clone();
        let (width, height) = (video_metadata.width, video_metadata.height);

        log::info!(
            "Rendering {} captions onto {}x{} video to {:?} (codec={:?})",
            track.len(),
            width,
            height,
            path,
            options.codec,
        );

        let video_stream_index = self.source.video_stream_index;
        let input_stream = self
            .source
            .input_context
            .stream(video_stream_index)
            .ok_or(HardsubError::NoVideoStream)?;
        let input_time_base = input_stream.time_base();
        let start_pts = match input_stream.start_time() {
            ffmpeg_sys_next::AV_NOPTS_VALUE => 0,
            start => start,
        };
        let timeline_start = stream_start_seconds(start_pts, input_time_base);
        let decoder_context = CodecContext::from_parameters(input_stream.parameters())?;
        let mut decoder = decoder_context.decoder().video().map_err(|e| {
            HardsubError::VideoDecodeError(format!("cannot open video decoder: {e}"))
        })?;

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|e| HardsubError::VideoEncodeError(format!("cannot open output: {e}")))?;

        let mut encoder = open_encoder(
            &mut output,
            options,
            width,
            height,
            input_time_base,
            frame_rate_rational(video_metadata.frames_per_second),
        )?;

        let mut audio = match self.source.audio_stream_index {
            Some(index) if options.copy_audio => {
                let stream = self
                    .source
                    .input_context
                    .stream(index)
                    .ok_or_else(|| HardsubError::StreamCopyError("audio stream vanished".into()))?;
                Some(AudioTrack::open(&stream, &mut output)?)
            }
            _ => None,
        };

        output
            .write_header()
            .map_err(|e| HardsubError::VideoEncodeError(format!("cannot write header: {e}")))?;

        // The muxer may change stream time bases while writing the header.
        encoder.output_time_base = output_time_base(&output, encoder.output_index)?;
        if let Some(audio) = audio.as_mut() {
            audio.refresh_output_time_base(&output)?;
        }

        if timeline_start != 0.0 {
            log::debug!("Video timeline starts at {timeline_start:.3}s; shifting caption windows");
        }
        let chain = caption_filter_chain_from(track, width, height, timeline_start);
        log::debug!("Caption filter chain: {chain}");

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            Some(video_metadata.frame_count),
            options.batch_size,
        );
        let mut pipeline = FramePipeline {
            graph: None,
            chain,
            input_time_base,
            start_pts,
            decoded: VideoFrame::empty(),
            filtered: VideoFrame::empty(),
        };

        for (stream, packet) in self.source.input_context.packets() {
            if options.is_cancelled() {
                return Err(HardsubError::Cancelled);
            }

            let index = stream.index();
            if index == video_stream_index {
                decoder
                    .send_packet(&packet)
                    .map_err(|e| HardsubError::VideoDecodeError(e.to_string()))?;
                pipeline.drain_decoder(&mut decoder, &mut encoder, &mut output, &mut tracker)?;
            } else if let Some(audio) = audio.as_mut().filter(|a| a.input_index() == index) {
                audio.write(packet, &mut output)?;
            }
        }

        // Flush decoder, then filters, then encoder.
        decoder
            .send_eof()
            .map_err(|e| HardsubError::VideoDecodeError(e.to_string()))?;
        pipeline.drain_decoder(&mut decoder, &mut encoder, &mut output, &mut tracker)?;
        pipeline.flush_filters(&mut encoder, &mut output, &mut tracker)?;

        encoder
            .inner
            .send_eof()
            .map_err(|e| HardsubError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        encoder.write_packets(&mut output)?;
        if let Some(audio) = audio.as_mut() {
            audio.finish(&mut output)?;
        }

        output
            .write_trailer()
            .map_err(|e| HardsubError::VideoEncodeError(format!("cannot write trailer: {e}")))?;

        tracker.finish();
        log::info!("Rendered {} frames to {:?}", tracker.current(), path);
        Ok(())
    }
}

struct CaptionEncoder {
    inner: VideoEncoder,
    output_index: usize,
    time_base: Rational,
    output_time_base: Rational,
}

impl CaptionEncoder {
    fn send(&mut self, frame: &VideoFrame, output: &mut Output) -> Result<(), HardsubError> {
        self.inner
            .send_frame(frame)
            .map_err(|e| HardsubError::VideoEncodeError(format!("send_frame failed: {e}")))?;
        self.write_packets(output)
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        let mut packet = Packet::empty();
        while self.inner.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.output_index);
            packet.rescale_ts(self.time_base, self.output_time_base);
            packet.write_interleaved(output).map_err(|e| {
                HardsubError::VideoEncodeError(format!("write packet failed: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Decoded-frame path: lazily built filter graph plus reusable frames.
struct FramePipeline {
    graph: Option<FilterGraph>,
    chain: String,
    input_time_base: Rational,
    /// First PTS of the video stream; progress counts from here.
    start_pts: i64,
    decoded: VideoFrame,
    filtered: VideoFrame,
}

impl FramePipeline {
    fn drain_decoder(
        &mut self,
        decoder: &mut VideoDecoder,
        encoder: &mut CaptionEncoder,
        output: &mut Output,
        tracker: &mut ProgressTracker,
    ) -> Result<(), HardsubError> {
        while decoder.receive_frame(&mut self.decoded).is_ok() {
            let timestamp = self.decoded.timestamp();
            self.decoded.set_pts(timestamp);

            if self.graph.is_none() {
                // Build from the first real frame: decoders may report a
                // different pixel format up front than they actually emit.
                self.graph = Some(build_graph(
                    &self.decoded,
                    decoder.aspect_ratio(),
                    self.input_time_base,
                    &self.chain,
                )?);
            }
            let graph = self.graph.as_mut().ok_or_else(|| {
                HardsubError::FilterGraphError("filter graph missing".to_string())
            })?;

            graph
                .get("in")
                .ok_or_else(|| HardsubError::FilterGraphError("filter 'in' not found".into()))?
                .source()
                .add(&self.decoded)
                .map_err(|e| HardsubError::FilterGraphError(format!("failed to feed filter: {e}")))?;

            self.drain_sink(encoder, output, tracker)?;
        }
        Ok(())
    }

    fn flush_filters(
        &mut self,
        encoder: &mut CaptionEncoder,
        output: &mut Output,
        tracker: &mut ProgressTracker,
    ) -> Result<(), HardsubError> {
        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        graph
            .get("in")
            .ok_or_else(|| HardsubError::FilterGraphError("filter 'in' not found".into()))?
            .source()
            .flush()
            .map_err(|e| HardsubError::FilterGraphError(format!("failed to flush filter: {e}")))?;
        self.drain_sink(encoder, output, tracker)
    }

    fn drain_sink(
        &mut self,
        encoder: &mut CaptionEncoder,
        output: &mut Output,
        tracker: &mut ProgressTracker,
    ) -> Result<(), HardsubError> {
        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        loop {
            let received = graph
                .get("out")
                .ok_or_else(|| HardsubError::FilterGraphError("filter 'out' not found".into()))?
                .sink()
                .frame(&mut self.filtered)
                .is_ok();
            if !received {
                return Ok(());
            }

            self.filtered.set_kind(picture::Type::None);
            encoder.send(&self.filtered, output)?;
            tracker.advance(
                self.filtered
                    .pts()
                    .map(|pts| pts_to_duration(pts - self.start_pts, self.input_time_base)),
            );
        }
    }
}

fn output_time_base(output: &Output, index: usize) -> Result<Rational, HardsubError> {
    output
        .stream(index)
        .map(|stream| stream.time_base())
        .ok_or_else(|| HardsubError::VideoEncodeError(format!("output stream {index} missing")))
}

fn open_encoder(
    output: &mut Output,
    options: &RenderOptions,
    width: u32,
    height: u32,
    time_base: Rational,
    frame_rate: Rational,
) -> Result<CaptionEncoder, HardsubError> {
    let codec_id = options.codec.to_codec_id();

    // Read before add_stream borrows the context.
    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

    let encoder_codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
        HardsubError::VideoEncodeError(format!("codec {codec_id:?} not available"))
    })?;

    let mut stream = output
        .add_stream(encoder_codec)
        .map_err(|e| HardsubError::VideoEncodeError(format!("cannot add stream: {e}")))?;
    let output_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .map_err(|e| HardsubError::VideoEncodeError(format!("cannot create codec context: {e}")))?
        .encoder()
        .video()
        .map_err(|e| HardsubError::VideoEncodeError(format!("cannot open video encoder: {e}")))?;

    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(frame_rate));

    let mut encoder_options = Dictionary::new();
    match options.bitrate {
        Some(bitrate) => encoder.set_bit_rate(bitrate),
        None if options.codec.supports_crf() => {
            encoder_options.set("crf", &options.crf.to_string());
        }
        None => {}
    }
    if options.codec.supports_crf() {
        encoder_options.set("preset", &options.preset);
    }

    if needs_global_header {
        unsafe {
            (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }
    }

    let opened = encoder
        .open_as_with(encoder_codec, encoder_options)
        .map_err(|e| HardsubError::VideoEncodeError(format!("cannot open encoder: {e}")))?;
    stream.set_parameters(&opened);
    stream.set_time_base(time_base);

    Ok(CaptionEncoder {
        inner: opened,
        output_index,
        time_base,
        output_time_base: time_base,
    })
}

/// `buffer → <chain> → buffersink`, configured from a decoded frame.
fn build_graph(
    frame: &VideoFrame,
    aspect_ratio: Rational,
    time_base: Rational,
    chain: &str,
) -> Result<FilterGraph, HardsubError> {
    let graph_error = |stage: &str, e: ffmpeg_next::Error| {
        HardsubError::FilterGraphError(format!("{stage}: {e}"))
    };

    let pixel_format = AVPixelFormat::from(frame.format()) as i32;
    let aspect = if aspect_ratio.numerator() > 0 && aspect_ratio.denominator() > 0 {
        aspect_ratio
    } else {
        Rational::new(1, 1)
    };
    let buffer_args = format!(
        "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect={}/{}",
        frame.width(),
        frame.height(),
        pixel_format,
        time_base.numerator(),
        time_base.denominator(),
        aspect.numerator(),
        aspect.denominator(),
    );

    let mut graph = FilterGraph::new();
    let buffer = ffmpeg_next::filter::find("buffer")
        .ok_or_else(|| HardsubError::FilterGraphError("FFmpeg 'buffer' filter not found".into()))?;
    let buffersink = ffmpeg_next::filter::find("buffersink").ok_or_else(|| {
        HardsubError::FilterGraphError("FFmpeg 'buffersink' filter not found".into())
    })?;

    graph
        .add(&buffer, "in", &buffer_args)
        .map_err(|e| graph_error("failed to add buffer filter", e))?;
    graph
        .add(&buffersink, "out", "")
        .map_err(|e| graph_error("failed to add buffersink filter", e))?;

    graph
        .output("in", 0)
        .map_err(|e| graph_error("graph output", e))?
        .input("out", 0)
        .map_err(|e| graph_error("graph input", e))?
        .parse(chain)
        .map_err(|e| graph_error("cannot parse caption filters", e))?;
    graph
        .validate()
        .map_err(|e| graph_error("graph validation", e))?;

    Ok(graph)
}
