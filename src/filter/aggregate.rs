use super::coverage::CoverageFilter;
use super::pattern::Pattern;
use std::sync::Arc;

/// Immutable set of coverage, attribute-exclusion and file-exclusion filters
///
/// Produced by [`FilterBuilder::build`](super::FilterBuilder::build). Every
/// query is a pure function of the snapshot, so a `Filter` can be shared across
/// threads without locking.
///
/// Coverage decisions need every coverage filter to agree (logical AND) and
/// fail closed when there are none. Exclusions veto when any pattern matches.
#[derive(Debug, Clone)]
pub struct Filter {
    attribute_filters: Arc<[Arc<Pattern>]>,
    file_filters: Arc<[Arc<Pattern>]>,
    coverage_filters: Arc<[Arc<CoverageFilter>]>,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

impl Filter {
    pub(crate) fn new(
        attribute_filters: Vec<Arc<Pattern>>,
        file_filters: Vec<Arc<Pattern>>,
        coverage_filters: Vec<Arc<CoverageFilter>>,
    ) -> Self {
        Self {
            attribute_filters: attribute_filters.into(),
            file_filters: file_filters.into(),
            coverage_filters: coverage_filters.into(),
        }
    }

    /// Attribute exclusion patterns, in the order they were added
    pub fn attribute_filters(&self) -> &[Arc<Pattern>] {
        &self.attribute_filters
    }

    /// File exclusion patterns, in the order they were added
    pub fn file_filters(&self) -> &[Arc<Pattern>] {
        &self.file_filters
    }

    /// Coverage filters, in the order they were added
    pub fn coverage_filters(&self) -> &[Arc<CoverageFilter>] {
        &self.coverage_filters
    }

    /// Check if an assembly is in scope for coverage
    pub fn should_cover_assembly(&self, assembly_name: &str) -> bool {
        !self.coverage_filters.is_empty()
            && self
                .coverage_filters
                .iter()
                .all(|f| f.should_cover_assembly(assembly_name))
    }

    /// Check if a class is in scope for coverage
    pub fn should_cover_class(&self, class_name: &str) -> bool {
        !self.coverage_filters.is_empty()
            && self
                .coverage_filters
                .iter()
                .all(|f| f.should_cover_class(class_name))
    }

    /// Check both halves of an (assembly, class) pair
    pub fn should_cover(&self, assembly_name: &str, class_name: &str) -> bool {
        self.should_cover_assembly(assembly_name) && self.should_cover_class(class_name)
    }

    pub fn should_exclude_by_attribute(&self, attribute_name: &str) -> bool {
        self.attribute_filters
            .iter()
            .any(|p| p.is_match(attribute_name))
    }

    pub fn should_exclude_by_file_name(&self, file_name: &str) -> bool {
        self.file_filters.iter().any(|p| p.is_match(file_name))
    }
}
