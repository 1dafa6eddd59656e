//! Tokenizers split text into tokens.
//!
//! The tokenizer is the first stage of the analysis pipeline; filters then
//! normalize or drop the tokens it produces.

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod regex;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
