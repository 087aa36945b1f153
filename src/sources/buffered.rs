//! Encoded audio (MP3/WAV) decoded into memory.
//!
//! The whole clip is decoded with symphonia on load and resampled to the
//! output rate. While playing, a pump task drains the buffer at real-time
//! pace into the output sink and reports the position every tick.

use super::{
    clamp_position, ensure_not_disposed, PassId, PoisonlessLock, Sample, SourceEventSender,
    SourceId,
};
use crate::{
    artifact::MimeKind,
    buffer::PlaybackBuffer,
    constants::{BUFFERED_TICK_INTERVAL, OUTPUT_SAMPLE_RATE},
    error::{Error, Result},
    output::OutputSink,
};
use anyhow::Context;
use itertools::Itertools;
use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

pub struct BufferedSource {
    buffer: Arc<Mutex<PlaybackBuffer>>,
    events: SourceEventSender,
    output: OutputSink,
    pump: Option<CancellationToken>,
    pass: PassId,
    disposed: bool,
}

impl BufferedSource {
    pub fn load(
        bytes: &[u8],
        kind: MimeKind,
        output: OutputSink,
        events: SourceEventSender,
    ) -> Result<Self> {
        let samples = decode(bytes, kind).map_err(|e| Error::DecodeFailed(format!("{e:#}")))?;

        let mut buffer = PlaybackBuffer::new(OUTPUT_SAMPLE_RATE);
        buffer.push_samples(samples);

        debug!(
            "Loaded buffered source {} ({:.2}s of {:?})",
            events.source_id(),
            buffer.duration_secs(),
            kind
        );

        Ok(BufferedSource {
            buffer: Arc::new(Mutex::new(buffer)),
            events,
            output,
            pump: None,
            pass: 0,
            disposed: false,
        })
    }

    pub fn id(&self) -> SourceId {
        self.events.source_id()
    }

    pub fn pass(&self) -> PassId {
        self.pass
    }

    pub fn play(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        self.stop_pump();
        self.buffer.plock().rewind();
        self.start_pump();

        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;
        self.stop_pump();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        if self.pump.is_none() {
            self.start_pump();
        }

        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        self.stop_pump();
        self.buffer.plock().rewind();
        self.pass += 1;

        Ok(())
    }

    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        {
            let mut buffer = self.buffer.plock();
            let target = clamp_position(seconds, buffer.duration_secs());
            buffer.seek_secs(target);
        }

        // Ticks queued before the jump must not move the position back
        if self.pump.is_some() {
            self.stop_pump();
            self.start_pump();
        } else {
            self.pass += 1;
        }

        Ok(())
    }

    pub fn current_time(&self) -> Result<f64> {
        ensure_not_disposed(self.disposed)?;
        Ok(self.buffer.plock().position_secs())
    }

    pub fn duration(&self) -> Result<f64> {
        ensure_not_disposed(self.disposed)?;
        Ok(self.buffer.plock().duration_secs())
    }

    pub fn dispose(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;
        self.teardown();
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn teardown(&mut self) {
        self.stop_pump();
        self.buffer.plock().clear();
        self.disposed = true;
        debug!("Disposed buffered source {}", self.id());
    }

    fn stop_pump(&mut self) {
        if let Some(token) = self.pump.take() {
            token.cancel();
        }
    }

    fn start_pump(&mut self) {
        let token = CancellationToken::new();
        self.pump = Some(token.clone());
        self.pass += 1;

        let buffer = self.buffer.clone();
        let events = self.events.for_pass(self.pass);
        let output = self.output.clone();

        tokio::spawn(async move {
            let mut last = Instant::now();
            let mut ticker = interval_at(last + BUFFERED_TICK_INTERVAL, BUFFERED_TICK_INTERVAL);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let frames =
                            ((now - last).as_secs_f64() * OUTPUT_SAMPLE_RATE as f64).round() as usize;
                        last = now;

                        let (chunk, position, finished) = {
                            let mut buffer = buffer.plock();
                            let chunk = buffer.pull_samples(frames);
                            (chunk, buffer.position_secs(), !buffer.has_data())
                        };

                        output.send_replace(chunk);
                        events.time_update(position);

                        if finished {
                            events.ended();
                            break;
                        }
                    }
                }
            }
        });
    }
}

impl Drop for BufferedSource {
    fn drop(&mut self) {
        if !self.disposed {
            self.teardown();
        }
    }
}

/// Decodes MP3/WAV bytes into interleaved stereo at the output rate.
pub fn decode(bytes: &[u8], kind: MimeKind) -> anyhow::Result<Vec<Sample>> {
    let source = Box::new(Cursor::new(bytes.to_vec()));
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    hint.with_extension(kind.extension());

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();
    let decoder_opts: DecoderOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .context("Unrecognised audio container")?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .context("Could not find any tracks in audio")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .context("Unsupported audio codec")?;

    let track_id = track.id;

    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut sample_rate = None;
    let mut sample_buf = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream is reported as UnexpectedEof
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *audio_buf.spec();
            sample_rate = Some(spec.rate);
            sample_buf = Some((
                SampleBuffer::<i16>::new(audio_buf.capacity() as u64, spec),
                spec.channels.count(),
            ));
        }

        if let Some((buf, channels)) = &mut sample_buf {
            buf.copy_interleaved_ref(audio_buf);

            match *channels {
                1 => {
                    left.extend_from_slice(buf.samples());
                    right.extend_from_slice(buf.samples());
                }
                2 => {
                    for (l, r) in buf.samples().iter().copied().tuples() {
                        left.push(l);
                        right.push(r);
                    }
                }
                n => {
                    // Keep the front pair of surround layouts
                    for frame in buf.samples().chunks_exact(n) {
                        left.push(frame[0]);
                        right.push(frame[1]);
                    }
                }
            }
        }
    }

    let sample_rate = sample_rate.context("Audio contained no decodable frames")?;

    if sample_rate == OUTPUT_SAMPLE_RATE {
        return Ok(left.into_iter().zip(right).collect());
    }

    resample(&[left, right], sample_rate)
}

/// Resample i16 stereo channels to the output rate.
fn resample(input: &[Vec<i16>; 2], input_rate: u32) -> anyhow::Result<Vec<Sample>> {
    let mut resampler = FftFixedIn::<f64>::new(
        input_rate as usize,
        OUTPUT_SAMPLE_RATE as usize,
        1024, // chunk size
        2,    // sub-chunks
        2,    // stereo
    )
    .context("Failed to create resampler")?;

    // Convert i16 to f64 normalized
    let input_f64: Vec<Vec<f64>> = input
        .iter()
        .map(|channel| channel.iter().map(|&s| s as f64 / 32768.0).collect())
        .collect();

    let frames = input_f64[0].len();
    let chunk_size = resampler.input_frames_max();
    let mut output = Vec::with_capacity(frames * OUTPUT_SAMPLE_RATE as usize / input_rate as usize);

    for chunk_start in (0..frames).step_by(chunk_size) {
        let chunk_end = (chunk_start + chunk_size).min(frames);

        // Pad last chunk if needed
        let chunk: Vec<Vec<f64>> = input_f64
            .iter()
            .map(|channel| {
                let mut chunk = channel[chunk_start..chunk_end].to_vec();
                chunk.resize(chunk_size, 0.0);
                chunk
            })
            .collect();

        let resampled = resampler
            .process(&chunk, None)
            .context("Resampling failed")?;

        let to_i16 = |s: f64| (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
        for (&l, &r) in resampled[0].iter().zip(&resampled[1]) {
            output.push((to_i16(l), to_i16(r)));
        }
    }

    // Drop the padding added to the final chunk
    let expected = (frames as u64 * OUTPUT_SAMPLE_RATE as u64 / input_rate as u64) as usize;
    output.truncate(expected);

    Ok(output)
}
