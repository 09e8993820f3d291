//! Line chunking: raw model text becomes break-free text pieces and explicit breaks.
//!
//! Downstream framing is line oriented, so no text piece may carry a line
//! break. `\r\n` counts as one break even when the two bytes arrive in
//! different raw chunks.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Break,
}

pub fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Stateful splitter for one model call. Start a new one for every attempt.
#[derive(Debug, Default)]
pub struct LineChunker {
    after_cr: bool,
}

impl LineChunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        for c in raw.chars() {
            if c == '\n' && self.after_cr {
                self.after_cr = false;
                continue;
            }
            self.after_cr = c == '\r';
            if is_line_break(c) {
                if !current.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut current)));
                }
                pieces.push(Piece::Break);
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            pieces.push(Piece::Text(current));
        }
        pieces
    }
}

/// Chunk a complete piece of text in one go.
pub fn chunk_text(raw: &str) -> Vec<Piece> {
    LineChunker::new().push(raw)
}

/// Text a piece sequence stands for, with every break written as `\n`.
pub fn render(pieces: &[Piece]) -> String {
    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Text(text) => text.as_str(),
            Piece::Break => "\n",
        })
        .collect()
}
