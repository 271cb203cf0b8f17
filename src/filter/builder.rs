//! Filter builder: parses rule text into compiled filters
//!
//! Coverage rules have the shape `<+|->[assembly]class`, e.g. `+[MyApp]*` or
//! `-[System.*]Console`. Rules accumulate concurrently behind `&self` and are
//! snapshotted into an immutable [`Filter`] by [`FilterBuilder::build`].

use super::aggregate::Filter;
use super::coverage::{CoverageFilter, Polarity};
use super::error::{FilterError, Result};
use super::pattern::{translate_wildcard, Pattern, PatternUsage};
use crate::config::FilterConfig;
use regex::Regex;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Shared rule shape for wildcard and regex coverage rules
const RULE_SHAPE: &str = r"^(?P<polarity>[+-])\[(?P<assembly>.+)\](?P<class>.+)$";

/// Parenthesised regex rule shape: `+[(assembly)](class)`
const PAREN_RULE_SHAPE: &str = r"^(?P<polarity>[+-])\[\((?P<assembly>.+)\)\]\((?P<class>.+)\)$";

/// Platform runtime modules that are never instrumented by default
const DEFAULT_EXCLUSIONS: [&str; 5] = [
    "-[mscorlib]*",
    "-[mscorlib.*]*",
    "-[System]*",
    "-[System.*]*",
    "-[Microsoft.VisualBasic]*",
];

static RULE_MATCHER: OnceLock<Pattern> = OnceLock::new();
static PAREN_RULE_MATCHER: OnceLock<Pattern> = OnceLock::new();

fn rule_matcher() -> Result<&'static Regex> {
    RULE_MATCHER
        .get_or_init(|| Pattern::new(RULE_SHAPE, false))
        .matcher()
}

fn paren_rule_matcher() -> Result<&'static Regex> {
    PAREN_RULE_MATCHER
        .get_or_init(|| Pattern::new(PAREN_RULE_SHAPE, false))
        .matcher()
}

/// Parsed pieces of a coverage rule, before pattern translation
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleParts {
    polarity: Polarity,
    assembly: String,
    class: String,
}

/// Split rule text into polarity, assembly and class segments
fn parse_rule(text: &str, shape: &Regex) -> Result<Option<RuleParts>> {
    let Some(captures) = shape.captures(text) else {
        return Ok(None);
    };

    let assembly = captures.name("assembly").map_or("", |m| m.as_str());
    if assembly.trim().is_empty() {
        return Err(FilterError::Syntax {
            text: text.to_string(),
        });
    }

    let symbol = captures.name("polarity").map_or("", |m| m.as_str());
    let polarity =
        Polarity::from_symbol(symbol).ok_or_else(|| FilterError::UnknownPolarity(symbol.to_string()))?;

    Ok(Some(RuleParts {
        polarity,
        assembly: assembly.to_string(),
        class: captures
            .name("class")
            .map_or("", |m| m.as_str())
            .to_string(),
    }))
}

fn syntax_error(text: &str) -> FilterError {
    FilterError::Syntax {
        text: text.to_string(),
    }
}

/// Force compilation so invalid expressions fail at add time
fn compiled(pattern: Pattern) -> Result<Pattern> {
    pattern.matcher()?;
    Ok(pattern)
}

/// Accumulates filter rules and builds [`Filter`] snapshots
///
/// # Example
/// ```
/// use covscope::filter::FilterBuilder;
///
/// let builder = FilterBuilder::new();
/// builder
///     .add_default_filters()?
///     .add_wildcard_coverage_filter("+[*]*")?;
///
/// let filter = builder.build();
/// assert!(filter.should_cover_assembly("MyApp"));
/// assert!(!filter.should_cover_assembly("System.Core"));
/// # Ok::<(), covscope::filter::FilterError>(())
/// ```
#[derive(Debug, Default)]
pub struct FilterBuilder {
    coverage_filters: Mutex<Vec<Arc<CoverageFilter>>>,
    attribute_exclusions: Mutex<Vec<Arc<Pattern>>>,
    file_exclusions: Mutex<Vec<Arc<Pattern>>>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder populated from a configuration section
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let builder = Self::new();

        if config.default_filters {
            builder.add_default_filters()?;
        }
        for rule in &config.coverage {
            builder.add_wildcard_coverage_filter(rule)?;
        }
        for rule in &config.regex_coverage {
            builder.add_regex_coverage_filter(rule)?;
        }
        for pattern in &config.exclude_by_attribute {
            builder.add_wildcard_attribute_exclusion(pattern)?;
        }
        for pattern in &config.regex_exclude_by_attribute {
            builder.add_regex_attribute_exclusion(pattern)?;
        }
        for pattern in &config.exclude_by_file {
            builder.add_wildcard_file_exclusion(pattern)?;
        }
        for pattern in &config.regex_exclude_by_file {
            builder.add_regex_file_exclusion(pattern)?;
        }

        Ok(builder)
    }

    /// Exclude the platform runtime libraries from coverage
    pub fn add_default_filters(&self) -> Result<&Self> {
        for rule in DEFAULT_EXCLUSIONS {
            self.add_wildcard_coverage_filter(rule)?;
        }
        Ok(self)
    }

    /// Add a coverage rule written with `*` wildcards
    ///
    /// # Errors
    /// [`FilterError::Syntax`] for malformed rules and
    /// [`FilterError::ReservedCharacter`] if a segment contains `\`, `[` or `]`.
    pub fn add_wildcard_coverage_filter(&self, filter_text: &str) -> Result<&Self> {
        let parts = parse_rule(filter_text, rule_matcher()?)?
            .ok_or_else(|| syntax_error(filter_text))?;

        let assembly = translate_wildcard(&parts.assembly, PatternUsage::Assembly)?;
        let class = translate_wildcard(&parts.class, PatternUsage::Class)?;

        self.push_coverage(filter_text, parts.polarity, &assembly, &class)
    }

    /// Add a coverage rule whose segments are regular expressions
    ///
    /// Accepts `+[asm]cls` and the parenthesised `+[(asm)](cls)` form. The
    /// segments are used as-is, anchored.
    pub fn add_regex_coverage_filter(&self, filter_text: &str) -> Result<&Self> {
        let parts = match parse_rule(filter_text, paren_rule_matcher()?)? {
            Some(parts) => parts,
            None => parse_rule(filter_text, rule_matcher()?)?
                .ok_or_else(|| syntax_error(filter_text))?,
        };

        self.push_coverage(filter_text, parts.polarity, &parts.assembly, &parts.class)
    }

    /// Exclude members carrying an attribute matching wildcard text
    pub fn add_wildcard_attribute_exclusion(&self, filter_text: &str) -> Result<&Self> {
        let pattern = compiled(Pattern::wildcard(filter_text, PatternUsage::Attribute)?)?;
        push(&self.attribute_exclusions, pattern);
        tracing::debug!("Added attribute exclusion: {}", filter_text);
        Ok(self)
    }

    /// Exclude members carrying an attribute matching a regular expression
    pub fn add_regex_attribute_exclusion(&self, filter_text: &str) -> Result<&Self> {
        let pattern = compiled(Pattern::regex(filter_text))?;
        push(&self.attribute_exclusions, pattern);
        tracing::debug!("Added attribute exclusion: {}", filter_text);
        Ok(self)
    }

    /// Exclude source files matching wildcard text
    pub fn add_wildcard_file_exclusion(&self, filter_text: &str) -> Result<&Self> {
        let pattern = compiled(Pattern::wildcard(filter_text, PatternUsage::File)?)?;
        push(&self.file_exclusions, pattern);
        tracing::debug!("Added file exclusion: {}", filter_text);
        Ok(self)
    }

    /// Exclude source files matching a regular expression
    pub fn add_regex_file_exclusion(&self, filter_text: &str) -> Result<&Self> {
        let pattern = compiled(Pattern::regex(filter_text))?;
        push(&self.file_exclusions, pattern);
        tracing::debug!("Added file exclusion: {}", filter_text);
        Ok(self)
    }

    /// Snapshot every rule added so far into an immutable [`Filter`]
    pub fn build(&self) -> Filter {
        Filter::new(
            snapshot(&self.attribute_exclusions),
            snapshot(&self.file_exclusions),
            snapshot(&self.coverage_filters),
        )
    }

    fn push_coverage(
        &self,
        filter_text: &str,
        polarity: Polarity,
        assembly: &str,
        class: &str,
    ) -> Result<&Self> {
        let coverage = CoverageFilter::new(
            compiled(Pattern::regex(assembly))?,
            compiled(Pattern::regex(class))?,
            polarity,
        );
        tracing::debug!("Added coverage filter {} as {}", filter_text, coverage);
        push(&self.coverage_filters, coverage);
        Ok(self)
    }
}

fn push<T>(collection: &Mutex<Vec<Arc<T>>>, item: T) {
    collection
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::new(item));
}

fn snapshot<T>(collection: &Mutex<Vec<Arc<T>>>) -> Vec<Arc<T>> {
    collection
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
