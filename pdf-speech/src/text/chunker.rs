//! Text chunking for TTS processing.

use super::TextChunk;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 1500;

/// Chunks whose trimmed length is at or below this many characters are noise.
pub const DEFAULT_MIN_CHARS: usize = 20;

/// Split text into chunks of at most `max_chars` characters.
///
/// Each chunk ends at the last period inside its window when one exists,
/// otherwise it is cut at exactly `max_chars`. Pieces whose trimmed length is
/// `min_chars` or less are dropped, including the final remainder.
///
/// Lengths are counted in characters, not bytes.
pub fn split_text(text: &str, max_chars: usize, min_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;

    // nth(max_chars) exists only while more than max_chars characters remain
    while let Some((window_end, _)) = rest.char_indices().nth(max_chars) {
        let window = &rest[..window_end];
        let cut = match window.rfind('.') {
            Some(period) => period + 1,
            None => window_end,
        };

        push_if_substantial(&mut pieces, &rest[..cut], min_chars);
        rest = &rest[cut..];
    }
    push_if_substantial(&mut pieces, rest, min_chars);

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk::new(index, text))
        .collect()
}

fn push_if_substantial(pieces: &mut Vec<String>, piece: &str, min_chars: usize) {
    let trimmed = piece.trim();
    if trimmed.chars().count() > min_chars {
        pieces.push(trimmed.to_string());
    }
}
