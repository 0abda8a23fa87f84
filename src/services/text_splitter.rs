//! Recursive, boundary-aware character splitter.
//!
//! Text is split on the coarsest separator present (paragraphs, then lines,
//! then words, then characters) and the pieces are greedily merged back into
//! chunks of at most `chunk_size` characters, each new chunk starting with
//! up to `chunk_overlap` characters carried over from the previous one.
//! Every chunk is a verbatim slice of the source, so its `start` offset is exact.

use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunk and the byte offset at which it starts in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub start: usize,
}

/// Byte range `[start, end)` in the source text
type Span = (usize, usize);

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        self.split_recursive(text, (0, text.len()), &SEPARATORS)
            .into_iter()
            .filter_map(|(start, end)| {
                let slice = &text[start..end];
                let trimmed = slice.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let start = start + (slice.len() - slice.trim_start().len());
                Some(TextChunk {
                    text: trimmed.to_string(),
                    start,
                })
            })
            .collect()
    }

    /// Character length of `text[start..end]`
    fn span_len(text: &str, start: usize, end: usize) -> usize {
        char_len(&text[start..end])
    }

    /// Byte spans of `text` within `span`, each at most `chunk_size`
    /// characters. Spans always cover the source verbatim, separators included.
    fn split_recursive(&self, text: &str, span: Span, separators: &[&str]) -> Vec<Span> {
        let (base, _) = span;
        let slice = &text[span.0..span.1];
        let (separator, remaining) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || slice.contains(**sep))
            .map(|(i, sep)| (*sep, &separators[i + 1..]))
            .unwrap_or(("", &[]));

        let pieces: Vec<Span> = if separator.is_empty() {
            slice
                .char_indices()
                .map(|(i, c)| (base + i, base + i + c.len_utf8()))
                .collect()
        } else {
            let mut pieces = Vec::new();
            let mut from = 0;
            for (i, _) in slice.match_indices(separator) {
                if i > from {
                    pieces.push((base + from, base + i));
                }
                from = i + separator.len();
            }
            if from < slice.len() {
                pieces.push((base + from, base + slice.len()));
            }
            pieces
        };

        let mut spans = Vec::new();
        let mut good: Vec<Span> = Vec::new();
        for piece in pieces {
            if Self::span_len(text, piece.0, piece.1) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                spans.extend(self.merge_splits(text, &good));
                good.clear();
            }
            if remaining.is_empty() {
                spans.push(piece);
            } else {
                spans.extend(self.split_recursive(text, piece, remaining));
            }
        }
        if !good.is_empty() {
            spans.extend(self.merge_splits(text, &good));
        }
        spans
    }

    /// Greedily merges adjacent pieces into spans of at most `chunk_size`
    /// characters, carrying up to `chunk_overlap` characters into the next span.
    fn merge_splits(&self, text: &str, splits: &[Span]) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut current: VecDeque<Span> = VecDeque::new();

        for &(start, end) in splits {
            if let (Some(&(first, _)), Some(&(_, last))) = (current.front(), current.back()) {
                if Self::span_len(text, first, end) > self.chunk_size {
                    spans.push((first, last));
                    // Drop from the front until only the overlap remains and the next piece fits
                    while let (Some(&(first, _)), Some(&(_, last))) = (current.front(), current.back()) {
                        if Self::span_len(text, first, last) > self.chunk_overlap
                            || Self::span_len(text, first, end) > self.chunk_size
                        {
                            current.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            current.push_back((start, end));
        }

        if let (Some(&(first, _)), Some(&(_, last))) = (current.front(), current.back()) {
            spans.push((first, last));
        }
        spans
    }
}
