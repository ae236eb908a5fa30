//! Carrying the source audio into the output.
//!
//! Audio the output muxer can hold as-is is packet-copied. Anything else
//! (PCM from `.mov`/`.avi`, Vorbis from `.webm`) is decoded and re-encoded
//! as AAC:
//!
//! ```text
//! decoder → abuffer → aformat → abuffersink (encoder frame size) → AAC encoder
//! ```

use ffmpeg_next::{
    ChannelLayout, Packet, Rational, Rescale,
    codec::{Id, capabilities::Capabilities, context::Context as CodecContext},
    decoder::Audio as AudioDecoder,
    encoder::Audio as AudioEncoder,
    filter::Graph as FilterGraph,
    format::{Flags as FormatFlags, Sample, context::Output, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    Stream,
};

use crate::error::HardsubError;

const AAC_BIT_RATE: usize = 128_000;

/// How a source audio stream reaches the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AudioStrategy {
    Copy,
    EncodeAac,
}

impl AudioStrategy {
    /// AAC already matches the output codec pair and is copied when the muxer
    /// takes it. Every other codec is re-encoded.
    pub(crate) fn choose(codec: Id, muxer_accepts: bool) -> Self {
        if codec == Id::AAC && muxer_accepts {
            AudioStrategy::Copy
        } else {
            AudioStrategy::EncodeAac
        }
    }
}

/// Whether the output muxer can store `codec` without re-encoding.
fn muxer_accepts(output: &Output, codec: Id) -> bool {
    // SAFETY: the output format pointer is valid for the lifetime of
    // `output` and avformat_query_codec only reads from it.
    let accepted = unsafe {
        ffmpeg_sys_next::avformat_query_codec(
            output.format().as_ptr(),
            codec.into(),
            ffmpeg_sys_next::FF_COMPLIANCE_NORMAL as i32,
        )
    };
    accepted == 1
}

/// The audio half of a render: either a packet copy or an AAC transcode.
pub(crate) enum AudioTrack {
    Copy(AudioCopy),
    Encode(Box<AudioTranscode>),
}

impl AudioTrack {
    /// Add an output stream for `stream` to `output`.
    ///
    /// Must be called before the output header is written.
    pub(crate) fn open(stream: &Stream, output: &mut Output) -> Result<Self, HardsubError> {
        let parameters = stream.parameters();
        let codec = parameters.id();
        let strategy = AudioStrategy::choose(codec, muxer_accepts(output, codec));
        log::debug!("Audio stream {} ({codec:?}): {strategy:?}", stream.index());

        match strategy {
            AudioStrategy::Copy => AudioCopy::open(stream, output).map(AudioTrack::Copy),
            AudioStrategy::EncodeAac => {
                AudioTranscode::open(stream, output).map(|t| AudioTrack::Encode(Box::new(t)))
            }
        }
    }

    pub(crate) fn input_index(&self) -> usize {
        match self {
            AudioTrack::Copy(copy) => copy.input_index,
            AudioTrack::Encode(transcode) => transcode.input_index,
        }
    }

    /// Re-read the output time base, which the muxer may change in
    /// `write_header`.
    pub(crate) fn refresh_output_time_base(&mut self, output: &Output) -> Result<(), HardsubError> {
        let (index, slot) = match self {
            AudioTrack::Copy(copy) => (copy.output_index, &mut copy.output_time_base),
            AudioTrack::Encode(transcode) => {
                (transcode.output_index, &mut transcode.output_time_base)
            }
        };
        *slot = output
            .stream(index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| HardsubError::StreamCopyError(format!("output stream {index} missing")))?;
        Ok(())
    }

    pub(crate) fn write(&mut self, packet: Packet, output: &mut Output) -> Result<(), HardsubError> {
        match self {
            AudioTrack::Copy(copy) => copy.write(packet, output),
            AudioTrack::Encode(transcode) => transcode.write(&packet, output),
        }
    }

    /// Drain buffered audio at end of input.
    pub(crate) fn finish(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        match self {
            AudioTrack::Copy(_) => Ok(()),
            AudioTrack::Encode(transcode) => transcode.finish(output),
        }
    }
}

pub(crate) struct AudioCopy {
    input_index: usize,
    output_index: usize,
    input_time_base: Rational,
    output_time_base: Rational,
}

impl AudioCopy {
    fn open(stream: &Stream, output: &mut Output) -> Result<Self, HardsubError> {
        let input_time_base = stream.time_base();
        let mut out_stream = output
            .add_stream(ffmpeg_next::encoder::find(Id::None))
            .map_err(|e| HardsubError::StreamCopyError(format!("cannot add audio stream: {e}")))?;
        out_stream.set_parameters(stream.parameters());
        // Let the muxer pick a tag valid for the output container.
        unsafe {
            (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
        }
        Ok(Self {
            input_index: stream.index(),
            output_index: out_stream.index(),
            input_time_base,
            output_time_base: input_time_base,
        })
    }

    fn write(&self, mut packet: Packet, output: &mut Output) -> Result<(), HardsubError> {
        packet.rescale_ts(self.input_time_base, self.output_time_base);
        packet.set_stream(self.output_index);
        packet.set_position(-1);
        packet
            .write_interleaved(output)
            .map_err(|e| HardsubError::StreamCopyError(format!("write audio packet failed: {e}")))
    }
}

/// Decode, convert to the encoder's sample layout in fixed-size frames, and
/// encode as AAC.
pub(crate) struct AudioTranscode {
    input_index: usize,
    output_index: usize,
    input_time_base: Rational,
    /// `1/sample_rate`, shared by the filter graph and the encoder.
    sample_time_base: Rational,
    output_time_base: Rational,
    decoder: AudioDecoder,
    encoder: AudioEncoder,
    fixed_frame_size: Option<u32>,
    graph: Option<FilterGraph>,
    decoded: AudioFrame,
    filtered: AudioFrame,
}

impl AudioTranscode {
    fn open(stream: &Stream, output: &mut Output) -> Result<Self, HardsubError> {
        let encode_error = |stage: &str, e: ffmpeg_next::Error| {
            HardsubError::StreamCopyError(format!("{stage}: {e}"))
        };

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().audio())
            .map_err(|e| encode_error("cannot open audio decoder", e))?;

        let codec = ffmpeg_next::encoder::find(Id::AAC)
            .ok_or_else(|| HardsubError::StreamCopyError("AAC encoder not available".into()))?;
        let sample_format = codec
            .audio()
            .ok()
            .and_then(|audio_codec| audio_codec.formats())
            .and_then(|mut formats| formats.next())
            .unwrap_or(Sample::F32(SampleType::Planar));
        let sample_rate = decoder.rate();
        if sample_rate == 0 {
            return Err(HardsubError::StreamCopyError(
                "audio stream has no sample rate".into(),
            ));
        }
        let channel_layout = match decoder.channel_layout() {
            layout if layout.is_empty() => ChannelLayout::default(i32::from(decoder.channels())),
            layout => layout,
        };
        let sample_time_base = Rational::new(1, sample_rate as i32);

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);
        let mut out_stream = output
            .add_stream(codec)
            .map_err(|e| encode_error("cannot add audio stream", e))?;
        let output_index = out_stream.index();

        let mut encoder = CodecContext::new()
            .encoder()
            .audio()
            .map_err(|e| encode_error("cannot create audio encoder", e))?;
        encoder.set_rate(sample_rate as i32);
        encoder.set_channel_layout(channel_layout);
        encoder.set_format(sample_format);
        encoder.set_time_base(sample_time_base);
        encoder.set_bit_rate(AAC_BIT_RATE);
        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| encode_error("cannot open AAC encoder", e))?;
        out_stream.set_parameters(&encoder);
        out_stream.set_time_base(sample_time_base);

        let fixed_frame_size = (!codec.capabilities().contains(Capabilities::VARIABLE_FRAME_SIZE))
            .then(|| encoder.frame_size())
            .filter(|&size| size > 0);

        log::info!(
            "Re-encoding audio as AAC ({sample_rate} Hz, {sample_format:?}, {} kbit/s)",
            AAC_BIT_RATE / 1000,
        );

        Ok(Self {
            input_index: stream.index(),
            output_index,
            input_time_base: stream.time_base(),
            sample_time_base,
            output_time_base: sample_time_base,
            decoder,
            encoder,
            fixed_frame_size,
            graph: None,
            decoded: AudioFrame::empty(),
            filtered: AudioFrame::empty(),
        })
    }

    fn write(&mut self, packet: &Packet, output: &mut Output) -> Result<(), HardsubError> {
        self.decoder
            .send_packet(packet)
            .map_err(|e| HardsubError::StreamCopyError(format!("audio decode failed: {e}")))?;
        self.drain_decoder(output)
    }

    fn finish(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        self.decoder
            .send_eof()
            .map_err(|e| HardsubError::StreamCopyError(format!("audio decode failed: {e}")))?;
        self.drain_decoder(output)?;

        if let Some(graph) = self.graph.as_mut() {
            graph
                .get("in")
                .ok_or_else(|| HardsubError::StreamCopyError("filter 'in' not found".into()))?
                .source()
                .flush()
                .map_err(|e| HardsubError::StreamCopyError(format!("audio flush failed: {e}")))?;
            self.drain_sink(output)?;
        }

        self.encoder
            .send_eof()
            .map_err(|e| HardsubError::StreamCopyError(format!("audio send_eof failed: {e}")))?;
        self.write_packets(output)
    }

    fn drain_decoder(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            let pts = self
                .decoded
                .timestamp()
                .map(|pts| pts.rescale(self.input_time_base, self.sample_time_base));
            self.decoded.set_pts(pts);

            if self.graph.is_none() {
                self.graph = Some(self.build_graph()?);
            }
            let graph = self.graph.as_mut().ok_or_else(|| {
                HardsubError::StreamCopyError("audio filter graph missing".into())
            })?;
            graph
                .get("in")
                .ok_or_else(|| HardsubError::StreamCopyError("filter 'in' not found".into()))?
                .source()
                .add(&self.decoded)
                .map_err(|e| HardsubError::StreamCopyError(format!("failed to feed audio: {e}")))?;

            self.drain_sink(output)?;
        }
        Ok(())
    }

    fn drain_sink(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        loop {
            let received = graph
                .get("out")
                .ok_or_else(|| HardsubError::StreamCopyError("filter 'out' not found".into()))?
                .sink()
                .frame(&mut self.filtered)
                .is_ok();
            if !received {
                return Ok(());
            }
            self.encoder
                .send_frame(&self.filtered)
                .map_err(|e| HardsubError::StreamCopyError(format!("audio encode failed: {e}")))?;
            self.write_packets(output)?;
        }
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), HardsubError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.output_index);
            packet.rescale_ts(self.sample_time_base, self.output_time_base);
            packet.write_interleaved(output).map_err(|e| {
                HardsubError::StreamCopyError(format!("write audio packet failed: {e}"))
            })?;
        }
        Ok(())
    }

    /// `abuffer → aformat → abuffersink`, configured from the first decoded
    /// frame and converting to what the encoder was opened with.
    fn build_graph(&self) -> Result<FilterGraph, HardsubError> {
        let graph_error =
            |stage: &str, e: ffmpeg_next::Error| HardsubError::StreamCopyError(format!("{stage}: {e}"));

        let frame = &self.decoded;
        let frame_layout = match frame.channel_layout() {
            layout if layout.is_empty() => self.encoder.channel_layout(),
            layout => layout,
        };
        let source_args = format!(
            "time_base={}/{}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
            self.sample_time_base.numerator(),
            self.sample_time_base.denominator(),
            frame.rate(),
            frame.format().name(),
            frame_layout.bits(),
        );
        let conversion = format!(
            "aformat=sample_fmts={}:sample_rates={}:channel_layouts=0x{:x}",
            self.encoder.format().name(),
            self.encoder.rate(),
            self.encoder.channel_layout().bits(),
        );

        let abuffer = ffmpeg_next::filter::find("abuffer")
            .ok_or_else(|| HardsubError::StreamCopyError("FFmpeg 'abuffer' filter not found".into()))?;
        let abuffersink = ffmpeg_next::filter::find("abuffersink").ok_or_else(|| {
            HardsubError::StreamCopyError("FFmpeg 'abuffersink' filter not found".into())
        })?;

        let mut graph = FilterGraph::new();
        graph
            .add(&abuffer, "in", &source_args)
            .map_err(|e| graph_error("failed to add abuffer filter", e))?;
        graph
            .add(&abuffersink, "out", "")
            .map_err(|e| graph_error("failed to add abuffersink filter", e))?;
        graph
            .output("in", 0)
            .map_err(|e| graph_error("graph output", e))?
            .input("out", 0)
            .map_err(|e| graph_error("graph input", e))?
            .parse(&conversion)
            .map_err(|e| graph_error("cannot parse audio filters", e))?;
        graph
            .validate()
            .map_err(|e| graph_error("graph validation", e))?;

        if let Some(frame_size) = self.fixed_frame_size {
            graph
                .get("out")
                .ok_or_else(|| HardsubError::StreamCopyError("filter 'out' not found".into()))?
                .sink()
                .set_frame_size(frame_size);
        }

        Ok(graph)
    }
}
