use super::pattern::PatternUsage;
use thiserror::Error;

/// Errors raised while turning filter text into executable filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Rule text does not have the `<+|->[assembly]class` shape, or the
    /// assembly segment is blank
    #[error("Unable to process the filter '{text}'. Please check your syntax against the usage guide and try again.")]
    Syntax { text: String },

    /// Wildcard text contains one of the reserved grammar delimiters
    #[error("Unable to process the filter '{text}' for the {usage}. Please check your syntax against the usage guide and try again.")]
    ReservedCharacter { text: String, usage: PatternUsage },

    /// Polarity symbol other than `+` or `-`
    #[error("Unknown filter type: {0}")]
    UnknownPolarity(String),

    /// Translated or literal expression is not a valid regular expression
    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
