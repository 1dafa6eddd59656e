//! Text analysis shared by index building and searching.
//!
//! An [`Analyzer`](analyzer::Analyzer) turns text into the words that are
//! counted at build time and looked up at query time. Both sides must use the
//! same analyzer configuration, otherwise a word indexed in one form is
//! searched in another and silently never matches.
//!
//! The standard pipeline is:
//!
//! 1. [`RegexTokenizer`](tokenizer::regex::RegexTokenizer) splits on runs of
//!    whitespace and the punctuation `, . ; : ! ? [ ] ( ) ' "`.
//! 2. [`StripFilter`](token_filter::strip::StripFilter) trims each token.
//! 3. [`LowercaseFilter`](token_filter::lowercase::LowercaseFilter) folds case.
//! 4. [`StopFilter`](token_filter::stop::StopFilter) drops configured stop words.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
