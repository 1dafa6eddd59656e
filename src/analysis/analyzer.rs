//! Analyzers combine a tokenizer with a chain of filters.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::{DEFAULT_ENGLISH_STOP_WORDS_SET, StopFilter};
use crate::analysis::token_filter::strip::StripFilter;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::Result;
use crate::util::hash::Hasher;

/// Trait for analyzers that turn text into index words.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text into a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;

    /// Collect the text of every token that survived the pipeline.
    fn words(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyze(text)?
            .filter(|token| !token.is_stopped())
            .map(|token| token.text)
            .collect())
    }
}

/// Stop-word settings of the standard analyzer.
///
/// ```
/// use folio::analysis::analyzer::AnalyzerConfig;
///
/// let config: AnalyzerConfig = serde_json::from_str(r#"{"stop_words": ["The", "a"]}"#).unwrap();
/// assert!(config.stop_word_set().contains("the"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Include the built-in English stop-word list.
    #[serde(default)]
    pub use_default_stop_words: bool,

    /// Additional stop words. They are normalized like indexed words.
    #[serde(default)]
    pub stop_words: Vec<String>,
}

impl AnalyzerConfig {
    /// Configuration with the given stop words and no default list.
    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnalyzerConfig {
            use_default_stop_words: false,
            stop_words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// The effective, normalized stop-word set.
    pub fn stop_word_set(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = self
            .stop_words
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        if self.use_default_stop_words {
            set.extend(DEFAULT_ENGLISH_STOP_WORDS_SET.iter().cloned());
        }
        set
    }

    /// A hash identifying how this configuration analyzes text.
    ///
    /// Index files record it so a reader built with different settings is
    /// refused.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.write(b"standard\0");
        for word in self.stop_word_set() {
            hasher.write(word.as_bytes());
            hasher.write(b"\0");
        }
        hasher.finish()
    }
}

/// The analyzer used for every index: split on whitespace and punctuation,
/// trim, lowercase, then drop stop words.
#[derive(Clone)]
pub struct StandardAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
    fingerprint: u32,
}

impl StandardAnalyzer {
    /// Create an analyzer without stop words.
    pub fn new() -> Result<Self> {
        Self::from_config(&AnalyzerConfig::default())
    }

    /// Create an analyzer for the given configuration.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        let mut filters: Vec<Arc<dyn Filter>> =
            vec![Arc::new(StripFilter::new()), Arc::new(LowercaseFilter::new())];

        let stop_words = config.stop_word_set();
        if !stop_words.is_empty() {
            filters.push(Arc::new(StopFilter::from_words(stop_words)));
        }

        Ok(StandardAnalyzer {
            tokenizer: Arc::new(RegexTokenizer::new()?),
            filters,
            fingerprint: config.fingerprint(),
        })
    }

    /// Fingerprint of the configuration this analyzer was built from.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }
}

impl std::fmt::Debug for StandardAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardAnalyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = self.tokenizer.tokenize(text)?;
        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }
        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}
