//! Case-insensitive repository reconciliation
//!
//! Repositories are compared by lowercase name. The source side is kept in an
//! insertion-ordered map from lowercase name to the name as GitHub reported
//! it: the first occurrence fixes a name's position, and a later occurrence
//! with different casing replaces the stored spelling.

use indexmap::IndexMap;

/// Insertion-ordered index of repository names keyed by lowercase name.
///
/// Built one page at a time while listing an organization.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    names: IndexMap<String, String>,
}

impl RepositoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one name. Returns `true` if its lowercase form was new.
    pub fn insert(&mut self, name: &str) -> bool {
        self.names
            .insert(name.to_lowercase(), name.to_string())
            .is_none()
    }

    /// Number of distinct names (case-insensitively).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_lowercase())
    }

    /// Stored names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    /// Names of this index absent from `other`, in this index's order.
    pub fn missing_from(&self, other: &RepositoryIndex) -> Vec<String> {
        self.names
            .iter()
            .filter(|(key, _)| !other.names.contains_key(key.as_str()))
            .map(|(_, name)| name.clone())
            .collect()
    }
}

impl<S: AsRef<str>> Extend<S> for RepositoryIndex {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for RepositoryIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

/// Names in `source` whose lowercase form is not among `target`'s.
///
/// Output follows first-seen source order with last-seen casing.
/// Runs in `O(|source| + |target|)`.
pub fn reconcile<S, T>(source: S, target: T) -> Vec<String>
where
    S: IntoIterator,
    S::Item: AsRef<str>,
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let source: RepositoryIndex = source.into_iter().collect();
    let target: RepositoryIndex = target.into_iter().collect();
    source.missing_from(&target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_case_insensitive_match() {
        assert!(reconcile(["Repo-A"], ["repo-a"]).is_empty());
        assert!(reconcile(["repo-a"], ["REPO-A"]).is_empty());
    }

    #[test]
    fn test_preserves_source_order_and_casing() {
        assert_eq!(reconcile(["Beta", "Alpha"], NONE), vec!["Beta", "Alpha"]);
    }

    #[test]
    fn test_duplicate_source_keeps_last_casing() {
        assert_eq!(reconcile(["repo", "REPO"], NONE), vec!["REPO"]);
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        assert_eq!(
            reconcile(["one", "Two", "ONE"], NONE),
            vec!["ONE", "Two"]
        );
    }

    #[test]
    fn test_only_source_names_reported() {
        let missing = reconcile(
            vec!["api".to_string(), "Web".to_string(), "docs".to_string()],
            vec!["WEB".to_string(), "extra".to_string()],
        );
        assert_eq!(missing, vec!["api", "docs"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(NONE, NONE).is_empty());
        assert!(reconcile(NONE, ["a"]).is_empty());
    }

    #[test]
    fn test_index_paged_build() {
        let mut source = RepositoryIndex::new();
        source.extend(["Alpha", "beta"]);
        source.extend(["ALPHA", "gamma"]);
        assert_eq!(source.len(), 3);
        assert!(source.contains("BETA"));
        assert_eq!(source.names().collect::<Vec<_>>(), ["ALPHA", "beta", "gamma"]);

        let target: RepositoryIndex = ["Gamma"].into_iter().collect();
        assert_eq!(source.missing_from(&target), vec!["ALPHA", "beta"]);
    }

    #[test]
    fn test_insert_reports_new_keys() {
        let mut index = RepositoryIndex::new();
        assert!(index.insert("Repo"));
        assert!(!index.insert("repo"));
        assert!(!index.is_empty());
    }
}
