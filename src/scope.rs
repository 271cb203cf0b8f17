//! Per-module scope verdicts
//!
//! Joins discovery output with the coverage filter: a module is in scope when
//! its assembly name is covered and its file name is not excluded.

use crate::discovery::ModuleDescriptor;
use crate::filter::Filter;
use serde::Serialize;
use std::path::PathBuf;

/// Reason behind a module's scope verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeReason {
    Covered,
    AssemblyFiltered,
    FileExcluded,
}

/// Scope decision for one discovered module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleVerdict {
    pub name: String,
    pub assembly: String,
    pub path: PathBuf,
    pub digest: String,
    pub in_scope: bool,
    pub reason: ScopeReason,
}

impl ModuleVerdict {
    pub fn evaluate(filter: &Filter, module: &ModuleDescriptor) -> Self {
        let reason = if filter.should_exclude_by_file_name(module.name()) {
            ScopeReason::FileExcluded
        } else if !filter.should_cover_assembly(module.assembly_name()) {
            ScopeReason::AssemblyFiltered
        } else {
            ScopeReason::Covered
        };

        Self {
            name: module.name().to_string(),
            assembly: module.assembly_name().to_string(),
            path: module.path().to_path_buf(),
            digest: module.digest().to_hex(),
            in_scope: reason == ScopeReason::Covered,
            reason,
        }
    }

    /// One line of text output: `<+|-> <name> <digest> <path>`
    pub fn to_text_line(&self) -> String {
        format!(
            "{} {} {} {}",
            if self.in_scope { '+' } else { '-' },
            self.name,
            self.digest.get(..12).unwrap_or(&self.digest),
            self.path.display()
        )
    }
}
