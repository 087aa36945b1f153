//! Senior/junior study dialogue built around a piece of technical text.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Characters of the source text quoted in the opening line.
const TOPIC_PREVIEW_CHARS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Senior,
    Junior,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Senior => "先輩",
            Speaker::Junior => "新人",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

impl Display for DialogueLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}：{}", self.speaker.label(), self.text)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DialogueScript {
    pub lines: Vec<DialogueLine>,
}

impl DialogueScript {
    pub fn from_source_text(source: &str) -> Self {
        let topic: String = source.chars().take(TOPIC_PREVIEW_CHARS).collect();

        let line = |speaker, text: String| DialogueLine { speaker, text };

        DialogueScript {
            lines: vec![
                line(
                    Speaker::Senior,
                    format!("今日は、「{topic}...」について説明しますね。"),
                ),
                line(
                    Speaker::Junior,
                    "はい、よろしくお願いします。この技術について詳しく教えてください。".to_string(),
                ),
                line(
                    Speaker::Senior,
                    "まず基本的な概念から始めましょう。この技術の核となる部分は...".to_string(),
                ),
                line(
                    Speaker::Junior,
                    "なるほど、とても興味深いですね。実際の実装ではどのような点に注意すべきでしょうか？"
                        .to_string(),
                ),
                line(
                    Speaker::Senior,
                    "良い質問ですね。実装時の重要なポイントは次の通りです...".to_string(),
                ),
            ],
        }
    }

    /// Single utterance text with speaker labels, sentences joined by `。`.
    pub fn to_speech_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join("。")
    }

    /// One line per speaker turn, for display and text downloads.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}
