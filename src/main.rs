#[macro_use]
extern crate log;

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use yomiage::{
    config,
    event::{Event, EventBus},
    generation::{cloud::CloudBackend, local::LocalSynthesis, AudioGenerationService, SynthesisBackend},
    input::TextInput,
    output,
    playback::{self, PlaybackState, SharedPlayback},
    recent::RecentItemsStore,
    script::DialogueScript,
    sources::SourceContext,
    stdin::{self, Command, HELP},
    storage::JsonFileStore,
    synth,
};

const USAGE: &str = "usage: yomiage [--dialogue] [--file PATH | TEXT...]";

struct Args {
    dialogue: bool,
    file: Option<String>,
    text: String,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        dialogue: false,
        file: None,
        text: String::new(),
    };
    let mut words = vec![];

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--dialogue" => args.dialogue = true,
            "--file" => match argv.next() {
                Some(path) => args.file = Some(path),
                None => anyhow::bail!("--file needs a path\n{USAGE}"),
            },
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => words.push(arg),
        }
    }

    args.text = words.join(" ");
    Ok(args)
}

/// Prints state changes and progress as they happen.
fn print_progress(bus: &EventBus) {
    let mut bus = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = bus.recv().await {
            match event {
                Event::PlaybackState(PlaybackState::Ended) => println!("\n[ended]"),
                Event::PlaybackState(state) => println!("\n[{state}]"),
                Event::Progress(progress) => print!("\r{progress}   "),
                Event::Generating(true) => println!("Generating audio..."),
                _ => {}
            }
        }
    });
}

async fn load(playback: &SharedPlayback, artifact: Arc<yomiage::artifact::AudioArtifact>) {
    if let Err(e) = playback.write().await.load_artifact(artifact) {
        println!("Could not load audio: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = parse_args()?;
    let config = config::load().await?;

    let bus = EventBus::new();
    yomiage::event::debug(&bus);
    print_progress(&bus);

    let sink = output::sink();
    if let Err(e) = output::serve(&config.output_addr, sink.clone()).await {
        warn!("Audio output stream disabled: {e:#}");
    }

    let engine = synth::default_engine();
    if !engine.is_available() {
        info!("No local speech engine in this build");
    }

    let primary = match config.cloud.clone() {
        Some(cloud) => Some(Arc::new(CloudBackend::new(cloud)?) as Arc<dyn SynthesisBackend>),
        None => None,
    };
    let local = LocalSynthesis::new(engine.clone(), config.speech.clone());
    let service = AudioGenerationService::new(primary, local).with_bus(bus.clone());

    let store = Arc::new(JsonFileStore::new(&config.storage_dir));
    let mut recent = RecentItemsStore::open(store).await;

    let playback = playback::init(
        &bus,
        SourceContext {
            engine,
            speech: config.speech.clone(),
            output: sink,
        },
    );

    let mut input = TextInput::new(args.text);
    if let Some(path) = &args.file {
        input.load_file(path).await?;
    }

    if !input.text().trim().is_empty() {
        let text = input.validated()?.to_string();
        let speech_text = if args.dialogue {
            let script = DialogueScript::from_source_text(&text);
            println!("{}", script.render());
            script.to_speech_text()
        } else {
            text.clone()
        };

        match service.generate(&speech_text).await {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                if args.dialogue {
                    recent.add_dialogue(&text, Some(artifact.clone())).await;
                } else {
                    recent.add(&text, Some(artifact.clone())).await;
                }
                load(&playback, artifact).await;
            }
            Err(e) => println!("{e}"),
        }
    } else if recent.list().is_empty() {
        println!("{USAGE}");
    }

    println!("{HELP}");

    let (tx, mut rx) = mpsc::unbounded_channel();
    stdin::start(tx);

    while let Some(command) = rx.recv().await {
        match command {
            Command::Playback(action) => bus.send(Event::Playback(action)),
            Command::Download => {
                let file = playback.read().await.download(Utc::now());
                match file {
                    Ok(file) => match tokio::fs::write(&file.file_name, &file.bytes).await {
                        Ok(()) => println!("\nSaved {} ({})", file.file_name, file.mime),
                        Err(e) => println!("\nCould not save {}: {e}", file.file_name),
                    },
                    Err(e) => println!("\n{e}"),
                }
            }
            Command::ListRecent => {
                println!();
                for (i, item) in recent.list().iter().enumerate() {
                    let held = if item.artifact.is_some() { "*" } else { " " };
                    println!(
                        "{}{held} {} {}",
                        i + 1,
                        item.created_at.format("%Y-%m-%d %H:%M"),
                        item.label
                    );
                }
            }
            Command::ReplayRecent => {
                let Some(id) = recent.list().first().map(|item| item.id.clone()) else {
                    println!("\nNo recent items");
                    continue;
                };
                match recent.replay(&id, &service).await {
                    Ok(artifact) => load(&playback, artifact).await,
                    Err(e) => println!("\n{e}"),
                }
            }
            Command::Quit => break,
        }
    }

    playback.write().await.dispose();

    Ok(())
}
