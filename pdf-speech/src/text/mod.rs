//! Text processing for TTS: splitting document text into bounded chunks.

pub mod chunker;

pub use chunker::split_text;

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of this chunk in the document
    pub index: usize,
    /// The text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunk_creation() {
        let chunk = TextChunk::new(3, "Hello world".to_string());
        assert_eq!(chunk.index, 3);
        assert_eq!(chunk.text, "Hello world");
    }

    #[test]
    fn test_char_len_counts_characters() {
        let chunk = TextChunk::new(0, "café".to_string());
        assert_eq!(chunk.char_len(), 4);
        assert_eq!(chunk.text.len(), 5);
    }
}
