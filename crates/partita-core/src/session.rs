use partita_domain_notation::{NotationError, PartBook, Semitones};

/// Editing state for the selected part. Created when analysis lands, torn
/// down on upload and reset.
#[derive(Clone, Debug)]
pub struct EditSession {
    part: String,
    buffer: String,
    transpose: Semitones,
}

impl EditSession {
    pub fn open(book: &PartBook) -> Self {
        let part = book.default_part().to_string();
        let buffer = book.source(&part).unwrap_or_default().to_string();
        Self {
            part,
            buffer,
            transpose: Semitones::ZERO,
        }
    }

    /// Switching parts swaps the buffer and clears the transposition in one
    /// step. Edits to the previous part are dropped; the book keeps the
    /// analyzer's text.
    pub fn select(&mut self, book: &PartBook, name: &str) -> Result<(), NotationError> {
        let source = book
            .source(name)
            .ok_or_else(|| NotationError::UnknownPart(name.to_string()))?;
        self.part = name.to_string();
        self.buffer = source.to_string();
        self.transpose = Semitones::ZERO;
        Ok(())
    }

    pub fn edit(&mut self, text: String) {
        self.buffer = text;
    }

    pub fn transpose_by(&mut self, delta: i32) -> Semitones {
        self.transpose = self.transpose.shift(delta);
        self.transpose
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn transpose(&self) -> Semitones {
        self.transpose
    }
}
