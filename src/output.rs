//! Audio output: the latest drained chunk of samples, streamed as WAV over TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use hound::{SampleFormat, WavSpec};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::constants::{BIT_DEPTH, CHANNELS, OUTPUT_SAMPLE_RATE};
use crate::sources::Sample;

/// Sources publish every chunk they play here.
pub type OutputSink = Arc<watch::Sender<Vec<Sample>>>;

pub fn sink() -> OutputSink {
    let (tx, _rx) = watch::channel(Vec::new());
    Arc::new(tx)
}

/// Binds `addr` and streams the sink to every client that connects.
/// Returns the bound address.
pub async fn serve(addr: &str, sink: OutputSink) -> Result<SocketAddr> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind audio output on {addr}"))?;
    let local_addr = listener.local_addr()?;

    info!("Streaming audio output on {local_addr}");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Accepted audio client {peer}");
                    let samples = sink.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = stream_to(stream, samples).await {
                            debug!("Audio client {peer} disconnected: {e:#}");
                        }
                    });
                }
                Err(e) => error!("Failed to accept audio client: {e}"),
            }
        }
    });

    Ok(local_addr)
}

fn wav_header() -> Vec<u8> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: OUTPUT_SAMPLE_RATE,
        bits_per_sample: BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };

    // Lets players recognise the stream as a never-ending wav file
    spec.into_header_for_infinite_file()
}

pub fn encode_samples(samples: &[Sample]) -> Vec<u8> {
    let mut wav_data: Vec<u8> = Vec::with_capacity(samples.len() * 4);

    for &(left, right) in samples {
        // Writing into a Vec cannot fail
        let _ = wav_data.write_i16::<LittleEndian>(left);
        let _ = wav_data.write_i16::<LittleEndian>(right);
    }

    wav_data
}

async fn stream_to(mut stream: TcpStream, mut samples: watch::Receiver<Vec<Sample>>) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    stream
        .write_all(&wav_header())
        .await
        .context("Failed to write wav header")?;

    // Ends when the sink is dropped
    while samples.changed().await.is_ok() {
        let chunk = encode_samples(&samples.borrow_and_update());
        stream
            .write_all(&chunk)
            .await
            .context("Failed to write samples")?;
    }

    Ok(())
}
