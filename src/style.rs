use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// An ordered set of inline style names ("BOLD", "ITALIC", ...).
///
/// The set is shared structurally: cloning is O(1), and [`apply`]/[`remove`]
/// produce new sets without touching the original. Iteration order is the
/// lexical order of the names, which keeps every derived encoding
/// deterministic.
///
/// [`apply`]: StyleSet::apply
/// [`remove`]: StyleSet::remove
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleSet(Arc<BTreeSet<String>>);

impl StyleSet {
    pub fn empty() -> Self {
        Self(Arc::new(BTreeSet::new()))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(names.into_iter().map(Into::into).collect()))
    }

    pub fn of(name: impl Into<String>) -> Self {
        Self::from_names([name.into()])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns a set with `name` added, or a cheap copy if already present.
    pub fn apply(&self, name: &str) -> Self {
        if self.contains(name) {
            return self.clone();
        }
        let mut names = (*self.0).clone();
        names.insert(name.to_string());
        Self(Arc::new(names))
    }

    /// Returns a set with `name` removed, or a cheap copy if absent.
    pub fn remove(&self, name: &str) -> Self {
        if !self.contains(name) {
            return self.clone();
        }
        let mut names = (*self.0).clone();
        names.remove(name);
        Self(Arc::new(names))
    }

    /// True when both sets share the same backing allocation.
    pub fn ptr_eq(a: &StyleSet, b: &StyleSet) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for StyleSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for StyleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for StyleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}
