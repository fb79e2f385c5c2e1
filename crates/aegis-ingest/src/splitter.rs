//! Recursive character splitter.
//!
//! Splits on the coarsest separator present (`"\n\n"`, then `"\n"`, then `" "`),
//! recursing into any piece that is still too long, and falls back to a hard
//! character cut for unbroken runs. Adjacent pieces are merged back up to
//! `chunk_size`, carrying up to `chunk_overlap` characters of trailing context
//! into the next chunk.

use std::collections::VecDeque;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    /// Overlap is clamped below `chunk_size`; a zero size is treated as 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn with_chunk_size(self, size: usize) -> Self {
        Self::new(size, self.chunk_overlap)
    }

    pub fn with_chunk_overlap(self, overlap: usize) -> Self {
        Self::new(self.chunk_size, overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks of at most `chunk_size` chars.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_with(text, &SEPARATORS)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(pos) = separators.iter().position(|s| text.contains(s)) else {
            return self.hard_split(text);
        };
        let sep = separators[pos];
        let finer = &separators[pos + 1..];

        let mut out = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for part in text.split(sep).filter(|p| !p.trim().is_empty()) {
            if char_len(part) <= self.chunk_size {
                pending.push(part);
                continue;
            }
            if !pending.is_empty() {
                out.extend(self.merge(&pending, sep));
                pending.clear();
            }
            out.extend(self.split_with(part, finer));
        }
        if !pending.is_empty() {
            out.extend(self.merge(&pending, sep));
        }
        out
    }

    /// Greedily pack `parts` (each already within bound) into windows.
    fn merge(&self, parts: &[&str], sep: &str) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        // chars in window, separators included
        let mut total = 0usize;

        for &part in parts {
            let len = char_len(part);
            let joint = if window.is_empty() { 0 } else { sep_len };

            if !window.is_empty() && total + joint + len > self.chunk_size {
                docs.push(join(&window, sep));

                while total > self.chunk_overlap
                    || (total > 0 && total + sep_len + len > self.chunk_size)
                {
                    let Some(first) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(first);
                    if !window.is_empty() {
                        total -= sep_len;
                    }
                }
            }

            let joint = if window.is_empty() { 0 } else { sep_len };
            window.push_back(part);
            total += joint + len;
        }

        if !window.is_empty() {
            docs.push(join(&window, sep));
        }
        docs
    }

    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = (self.chunk_size - self.chunk_overlap).max(1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        out
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(window: &VecDeque<&str>, sep: &str) -> String {
    window.iter().copied().collect::<Vec<_>>().join(sep)
}
