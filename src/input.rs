//! Text input boundary: typed text or an uploaded UTF-8 file.

use crate::{
    constants::MAX_INPUT_FILE_BYTES,
    error::{Error, Result},
};
use std::path::Path;

/// Trims `text` and rejects it if nothing is left.
pub fn validate_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::EmptyText);
    }
    Ok(text)
}

/// Reads a UTF-8 text file, refusing anything over the size cap before
/// reading its contents.
pub async fn read_text_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::FileReadFailed(format!("{}: {e}", path.display())))?;

    if metadata.len() > MAX_INPUT_FILE_BYTES {
        return Err(Error::InputTooLarge {
            size: metadata.len(),
            limit: MAX_INPUT_FILE_BYTES,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::FileReadFailed(format!("{}: {e}", path.display())))?;

    String::from_utf8(bytes)
        .map_err(|e| Error::FileReadFailed(format!("{}: not valid UTF-8 ({e})", path.display())))
}

/// The text currently entered by the user.
#[derive(Clone, Debug, Default)]
pub struct TextInput {
    text: String,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replaces the text with the contents of `path`. On any error the
    /// current text is left untouched.
    pub async fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = read_text_file(path).await?;
        info!("Loaded text file {} ({} chars)", path.display(), text.chars().count());
        self.text = text;
        Ok(())
    }

    /// Text ready for generation.
    pub fn validated(&self) -> Result<&str> {
        validate_text(&self.text)
    }
}
