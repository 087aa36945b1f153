//! Integration tests for the audio source adapters.

mod common;

use common::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use yomiage::sources::{buffered, AudioSourceAdapter, SourceEventSender};

fn load(
    artifact: &AudioArtifact,
    engine: Arc<MockEngine>,
) -> (AudioSourceAdapter, mpsc::UnboundedReceiver<SourceEvent>, SourceContext) {
    let ctx = source_context(engine);
    let (tx, rx) = mpsc::unbounded_channel();
    let source = AudioSourceAdapter::load(artifact, &ctx, SourceEventSender::new(7, tx)).unwrap();
    (source, rx, ctx)
}

fn assert_all_disposed(source: &mut AudioSourceAdapter) {
    assert!(source.is_disposed());
    assert_eq!(source.play(), Err(Error::AdapterDisposed));
    assert_eq!(source.pause(), Err(Error::AdapterDisposed));
    assert_eq!(source.resume(), Err(Error::AdapterDisposed));
    assert_eq!(source.stop(), Err(Error::AdapterDisposed));
    assert_eq!(source.seek(1.0), Err(Error::AdapterDisposed));
    assert_eq!(source.current_time(), Err(Error::AdapterDisposed));
    assert_eq!(source.duration(), Err(Error::AdapterDisposed));
    assert_eq!(source.dispose(), Err(Error::AdapterDisposed));
}

#[tokio::test]
async fn test_load_selects_variant_by_bytes() {
    let engine = Arc::new(MockEngine::new());

    let (buffered, _rx, _ctx) = load(&AudioArtifact::wav(wav_bytes(0.5, 48000), "x"), engine.clone());
    assert!(matches!(buffered, AudioSourceAdapter::Buffered(_)));
    assert!(buffered.capabilities().exact_seek);
    assert!(buffered.capabilities().true_duration);

    let (live, _rx, _ctx) = load(&AudioArtifact::live("x"), engine);
    assert!(matches!(live, AudioSourceAdapter::Live(_)));
    assert!(!live.capabilities().exact_seek);
    assert_eq!(live.id(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_buffered_operations_after_dispose_fail() {
    let (mut source, _rx, _ctx) = load(
        &AudioArtifact::wav(wav_bytes(0.5, 48000), "x"),
        Arc::new(MockEngine::new()),
    );

    source.play().unwrap();
    source.dispose().unwrap();

    assert_all_disposed(&mut source);
}

#[tokio::test(start_paused = true)]
async fn test_live_operations_after_dispose_fail() {
    let engine = Arc::new(MockEngine::new());
    let (mut source, _rx, _ctx) = load(&AudioArtifact::live("テスト"), engine.clone());

    source.play().unwrap();
    assert!(engine.is_speaking());

    source.dispose().unwrap();
    assert!(!engine.is_speaking());

    assert_all_disposed(&mut source);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_events() {
    let engine = Arc::new(MockEngine::new());
    let (mut source, mut rx, _ctx) = load(&AudioArtifact::live("テスト"), engine.clone());

    source.play().unwrap();
    source.dispose().unwrap();
    engine.finish();

    tokio::time::advance(std::time::Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_true_duration_from_decoded_audio() {
    let (source, _rx, _ctx) = load(
        &AudioArtifact::wav(wav_bytes(1.5, 48000), "短い"),
        Arc::new(MockEngine::new()),
    );

    // Not the two second text estimate
    assert_eq!(source.duration(), Ok(1.5));
    assert_eq!(source.current_time(), Ok(0.0));
}

#[tokio::test]
async fn test_buffered_seek_clamps() {
    let (mut source, _rx, _ctx) = load(
        &AudioArtifact::wav(wav_bytes(1.0, 48000), "x"),
        Arc::new(MockEngine::new()),
    );

    source.seek(-5.0).unwrap();
    assert_eq!(source.current_time(), Ok(0.0));

    source.seek(1.0 + 100.0).unwrap();
    assert_eq!(source.current_time(), Ok(1.0));
}

#[test]
fn test_decode_resamples_to_output_rate() {
    let samples = buffered::decode(&wav_bytes(1.0, 24000), MimeKind::Wav).unwrap();
    assert_eq!(samples.len(), 48000);

    let samples = buffered::decode(&wav_bytes(0.5, 44100), MimeKind::Wav).unwrap();
    assert_eq!(samples.len(), 24000);
}

#[test]
fn test_decode_mono_is_duplicated() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in [100i16, -200, 300] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    let samples = buffered::decode(&cursor.into_inner(), MimeKind::Wav).unwrap();
    assert_eq!(samples, vec![(100, 100), (-200, -200), (300, 300)]);
}

#[tokio::test]
async fn test_garbage_bytes_fail_to_load() {
    let ctx = source_context(Arc::new(MockEngine::new()));
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = AudioSourceAdapter::load(
        &AudioArtifact::mp3(b"definitely not audio".to_vec(), "x"),
        &ctx,
        SourceEventSender::new(1, tx),
    );

    assert!(matches!(result, Err(Error::DecodeFailed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_buffered_playback_feeds_output_sink() {
    let (mut source, mut rx, ctx) = load(
        &AudioArtifact::wav(wav_bytes(1.0, 48000), "x"),
        Arc::new(MockEngine::new()),
    );
    let mut output = ctx.output.subscribe();

    source.play().unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.source_id, 7);
    assert_eq!(event.kind, SourceEventKind::TimeUpdate { position: 0.25 });

    output.changed().await.unwrap();
    assert_eq!(output.borrow_and_update().len(), 12000);
}

#[tokio::test(start_paused = true)]
async fn test_buffered_pause_and_resume_keep_position() {
    let (mut source, mut rx, _ctx) = load(
        &AudioArtifact::wav(wav_bytes(2.0, 48000), "x"),
        Arc::new(MockEngine::new()),
    );

    source.play().unwrap();
    rx.recv().await.unwrap();
    source.pause().unwrap();

    tokio::time::advance(std::time::Duration::from_secs(1)).await;
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(source.current_time(), Ok(0.25));

    source.resume().unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind, SourceEventKind::TimeUpdate { position: 0.5 });
}

#[tokio::test(start_paused = true)]
async fn test_buffered_ended_once_per_pass() {
    let (mut source, mut rx, _ctx) = load(
        &AudioArtifact::wav(wav_bytes(0.5, 48000), "x"),
        Arc::new(MockEngine::new()),
    );

    source.play().unwrap();

    let mut kinds = vec![];
    while let Ok(Some(event)) =
        tokio::time::timeout(std::time::Duration::from_secs(3), rx.recv()).await
    {
        kinds.push(event.kind);
    }

    assert_eq!(
        kinds,
        vec![
            SourceEventKind::TimeUpdate { position: 0.25 },
            SourceEventKind::TimeUpdate { position: 0.5 },
            SourceEventKind::Ended,
        ]
    );
}
