//! Pattern compiler: wildcard and regex source text to anchored matchers
//!
//! Wildcard syntax only knows `*` ("any sequence of characters"). Backslashes
//! and dots are escaped, then every `*` becomes `.*`, so `System.*` turns into
//! `System\..*`. Regex compilation is deferred to the first match query and
//! cached for the lifetime of the pattern.

use super::error::{FilterError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// What a pattern is matched against, used in syntax error messages and to
/// pick the reserved character set for wildcard text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternUsage {
    /// Assembly / module name segment of a coverage rule
    Assembly,
    /// Class / type name segment of a coverage rule
    Class,
    /// Attribute exclusion pattern
    Attribute,
    /// File exclusion pattern
    File,
}

impl PatternUsage {
    /// Characters wildcard text may not contain for this usage
    ///
    /// `[` and `]` delimit the assembly segment of a coverage rule. Coverage
    /// segments additionally reserve `\`.
    pub fn reserved_chars(self) -> &'static [char] {
        match self {
            PatternUsage::Assembly | PatternUsage::Class => &['\\', '[', ']'],
            PatternUsage::Attribute | PatternUsage::File => &['[', ']'],
        }
    }
}

impl fmt::Display for PatternUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternUsage::Assembly => "assembly",
            PatternUsage::Class => "class/type",
            PatternUsage::Attribute => "attribute",
            PatternUsage::File => "file",
        };
        f.write_str(name)
    }
}

/// A matching rule over names, compiled on first use
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Regular expression source (already translated for wildcard input)
    expression: String,
    /// Whether the expression must match the whole name
    anchored: bool,
    /// Compiled matcher, populated by the first query
    compiled: OnceLock<std::result::Result<Regex, regex::Error>>,
}

impl Pattern {
    /// Create a pattern from a regular expression without validation
    pub fn new(expression: impl Into<String>, anchored: bool) -> Self {
        Self {
            expression: expression.into(),
            anchored,
            compiled: OnceLock::new(),
        }
    }

    /// Compile source text into an anchored pattern
    ///
    /// With `wildcard_syntax` the text is checked against the reserved
    /// characters of `usage` and translated to a regular expression. Otherwise
    /// it is taken as a literal regular expression.
    ///
    /// # Errors
    /// Returns [`FilterError::ReservedCharacter`] when wildcard text contains a
    /// reserved character.
    pub fn compile(source: &str, wildcard_syntax: bool, usage: PatternUsage) -> Result<Self> {
        let expression = if wildcard_syntax {
            translate_wildcard(source, usage)?
        } else {
            source.to_string()
        };

        Ok(Self::new(expression, true))
    }

    /// Compile wildcard text, see [`Pattern::compile`]
    pub fn wildcard(source: &str, usage: PatternUsage) -> Result<Self> {
        Self::compile(source, true, usage)
    }

    /// Wrap a literal regular expression, anchored
    pub fn regex(source: &str) -> Self {
        Self::new(source, true)
    }

    /// The regular expression source this pattern matches with
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Whether the regex has already been compiled
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Get the compiled matcher, compiling it on first call
    ///
    /// # Errors
    /// Returns [`FilterError::InvalidPattern`] if the expression is not a valid
    /// regular expression. The failure is cached like a success.
    pub fn matcher(&self) -> Result<&Regex> {
        self.compiled
            .get_or_init(|| {
                let source = if self.anchored {
                    format!("^(?:{})$", self.expression)
                } else {
                    self.expression.clone()
                };
                let compiled = Regex::new(&source);
                if let Err(e) = &compiled {
                    tracing::warn!("Filter pattern '{}' failed to compile: {}", self.expression, e);
                }
                compiled
            })
            .as_ref()
            .map_err(|e| FilterError::InvalidPattern {
                pattern: self.expression.clone(),
                reason: e.to_string(),
            })
    }

    /// Check if a name matches this pattern
    ///
    /// A pattern that fails to compile matches nothing.
    pub fn is_match(&self, name: &str) -> bool {
        self.matcher().map(|re| re.is_match(name)).unwrap_or(false)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Validate wildcard text and translate it to regular expression source
pub(crate) fn translate_wildcard(source: &str, usage: PatternUsage) -> Result<String> {
    if source.contains(usage.reserved_chars()) {
        return Err(FilterError::ReservedCharacter {
            text: source.to_string(),
            usage,
        });
    }

    Ok(source
        .replace('\\', r"\\")
        .replace('.', r"\.")
        .replace('*', ".*"))
}
