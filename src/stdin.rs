//! Terminal transport controls, one command per line.

use crate::playback::PlaybackAction;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Seconds jumped by the forward/back commands.
pub const SEEK_STEP_SECS: f64 = 5.0;

#[derive(Clone, Debug)]
pub enum Command {
    Playback(PlaybackAction),

    /// Save the loaded artifact in the working directory
    Download,

    ListRecent,

    /// Load the most recent item again
    ReplayRecent,

    Quit,
}

pub const HELP: &str = "p play | space/t toggle | s stop | f/b seek +/-5s | d download | l recent | r replay | q quit";

/// An empty line or a lone space toggles play/pause.
pub fn parse_command(line: &str) -> Option<Command> {
    let command = match line.trim() {
        "" | "t" => Command::Playback(PlaybackAction::TogglePlayPause),
        "p" => Command::Playback(PlaybackAction::Play),
        "s" => Command::Playback(PlaybackAction::Stop),
        "f" => Command::Playback(PlaybackAction::SeekBy {
            delta: SEEK_STEP_SECS,
        }),
        "b" => Command::Playback(PlaybackAction::SeekBy {
            delta: -SEEK_STEP_SECS,
        }),
        "d" => Command::Download,
        "l" => Command::ListRecent,
        "r" => Command::ReplayRecent,
        "q" => Command::Quit,
        _ => return None,
    };

    Some(command)
}

/// Reads commands from stdin until it closes, then sends `Quit`.
pub fn start(tx: mpsc::UnboundedSender<Command>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => println!("{HELP}"),
                },
                Ok(None) => {
                    let _ = tx.send(Command::Quit);
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    let _ = tx.send(Command::Quit);
                    break;
                }
            }
        }
    });
}
