//! Token filters transform or drop tokens after tokenization.

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod lowercase;
pub mod stop;
pub mod strip;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}
