//! BPE detokenization: token ids back to words.

use crate::error::{ConfigError, ModelError, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// Piece reserved for the transducer blank symbol.
pub const BLANK_PIECE: &str = "<blk>";

/// Subword detokenizer backed by a BPE model.
pub struct BpeDetokenizer {
    tokenizer: Tokenizer,
    blank_id: u32,
}

impl BpeDetokenizer {
    /// Load a BPE model file.
    ///
    /// Fails if the file is unreadable or lacks the blank piece.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| ConfigError::BpeModel(format!("{}: {e}", path.display())))?;
        Self::new(tokenizer)
    }

    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let blank_id = tokenizer
            .token_to_id(BLANK_PIECE)
            .ok_or_else(|| ConfigError::BpeModel(format!("missing {BLANK_PIECE} piece")))?;
        Ok(Self {
            tokenizer,
            blank_id,
        })
    }

    /// Id of the blank symbol.
    pub fn blank_id(&self) -> u32 {
        self.blank_id
    }

    /// Symbol-set size, including the blank.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Map a token-id sequence back to words.
    ///
    /// Pieces carry SentencePiece `▁` word boundaries; the blank never
    /// appears in search output and is not expected here.
    pub fn decode(&self, ids: &[u32]) -> Result<Vec<String>> {
        let mut text = String::new();
        for &id in ids {
            let piece = self
                .tokenizer
                .id_to_token(id)
                .ok_or(ModelError::InvalidTokenId(id))?;
            text.push_str(&piece.replace('▁', " "));
        }

        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}
