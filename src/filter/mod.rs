//! Coverage filtering for assemblies, classes, attributes and files
//!
//! Rules are written as `<+|->[assembly]class` with `*` wildcards:
//! - `+[*]*` covers everything
//! - `-[System.*]*` excludes every module whose name starts with `System.`
//! - `+[MyApp*]MyApp.*` covers only the `MyApp` modules and classes
//!
//! A [`Filter`] covers a name only when every coverage rule agrees. There is no
//! "last rule wins" precedence: `-[mscorlib]*` followed by `+[*]*` still
//! excludes `mscorlib`, and a filter with no coverage rules covers nothing.

mod aggregate;
mod builder;
mod coverage;
mod error;
mod pattern;

pub use aggregate::Filter;
pub use builder::FilterBuilder;
pub use coverage::{CoverageFilter, Polarity};
pub use error::{FilterError, Result};
pub use pattern::{Pattern, PatternUsage};

#[cfg(test)]
mod tests;
