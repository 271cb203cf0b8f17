use super::pattern::Pattern;
use std::fmt;

/// Whether a coverage rule includes or excludes the names it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// `+` rules: cover names that match
    Inclusive,
    /// `-` rules: cover names that do not match
    Exclusive,
}

impl Polarity {
    /// Parse the polarity symbol of a rule
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Polarity::Inclusive),
            "-" => Some(Polarity::Exclusive),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Polarity::Inclusive => '+',
            Polarity::Exclusive => '-',
        }
    }

    /// Turn a match result into a coverage verdict
    fn apply(self, matched: bool) -> bool {
        match self {
            Polarity::Inclusive => matched,
            Polarity::Exclusive => !matched,
        }
    }
}

/// A coverage rule over an (assembly, class) pair
///
/// Both patterns are anchored and evaluated independently.
#[derive(Debug, Clone)]
pub struct CoverageFilter {
    assembly: Pattern,
    class: Pattern,
    polarity: Polarity,
}

impl CoverageFilter {
    pub fn new(assembly: Pattern, class: Pattern, polarity: Polarity) -> Self {
        Self {
            assembly,
            class,
            polarity,
        }
    }

    /// Pattern source for the assembly segment
    pub fn assembly_filter(&self) -> &str {
        self.assembly.as_str()
    }

    /// Pattern source for the class segment
    pub fn class_filter(&self) -> &str {
        self.class.as_str()
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn is_inclusive(&self) -> bool {
        self.polarity == Polarity::Inclusive
    }

    pub fn should_cover_assembly(&self, assembly_name: &str) -> bool {
        self.polarity.apply(self.assembly.is_match(assembly_name))
    }

    pub fn should_cover_class(&self, class_name: &str) -> bool {
        self.polarity.apply(self.class.is_match(class_name))
    }
}

impl fmt::Display for CoverageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]{}",
            self.polarity.symbol(),
            self.assembly,
            self.class
        )
    }
}
