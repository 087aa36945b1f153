//! Unit tests for the stdin module

#[cfg(test)]
mod tests {
    use crate::playback::PlaybackAction;
    use crate::stdin::{parse_command, Command, SEEK_STEP_SECS};

    #[test]
    fn test_parse_transport_commands() {
        assert!(matches!(
            parse_command("p"),
            Some(Command::Playback(PlaybackAction::Play))
        ));
        assert!(matches!(
            parse_command("s"),
            Some(Command::Playback(PlaybackAction::Stop))
        ));
        assert!(matches!(
            parse_command("t"),
            Some(Command::Playback(PlaybackAction::TogglePlayPause))
        ));
    }

    #[test]
    fn test_space_and_empty_line_toggle() {
        for line in ["", " ", "  \r"] {
            assert!(
                matches!(
                    parse_command(line),
                    Some(Command::Playback(PlaybackAction::TogglePlayPause))
                ),
                "line {line:?}"
            );
        }
    }

    #[test]
    fn test_parse_seek_steps() {
        match parse_command("f") {
            Some(Command::Playback(PlaybackAction::SeekBy { delta })) => {
                assert_eq!(delta, SEEK_STEP_SECS)
            }
            other => panic!("Expected SeekBy, got {other:?}"),
        }

        match parse_command("b") {
            Some(Command::Playback(PlaybackAction::SeekBy { delta })) => {
                assert_eq!(delta, -SEEK_STEP_SECS)
            }
            other => panic!("Expected SeekBy, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_other_commands() {
        assert!(matches!(parse_command("d"), Some(Command::Download)));
        assert!(matches!(parse_command("l"), Some(Command::ListRecent)));
        assert!(matches!(parse_command("r"), Some(Command::ReplayRecent)));
        assert!(matches!(parse_command("q"), Some(Command::Quit)));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(parse_command("x").is_none());
        assert!(parse_command("play").is_none());
    }
}
