use std::cell::RefCell;
use std::collections::HashMap;

use crate::key::EntityKey;
use crate::style::StyleSet;

/// Per-character metadata: the inline styles covering the character and the
/// entity (if any) it belongs to.
///
/// Documents reuse a small alphabet of style/entity combinations, so
/// instances are interned in a thread-local pool: [`CharacterMetadata::new`]
/// returns the pooled instance for equal arguments, and repeated calls share
/// the same backing allocations. Pooling bounds memory; correctness never
/// depends on it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CharacterMetadata {
    style: StyleSet,
    entity: Option<EntityKey>,
}

thread_local! {
    static POOL: RefCell<HashMap<(StyleSet, Option<EntityKey>), CharacterMetadata>> =
        RefCell::new(HashMap::new());
}

impl CharacterMetadata {
    pub fn new(style: StyleSet, entity: Option<EntityKey>) -> Self {
        POOL.with(|pool| {
            pool.borrow_mut()
                .entry((style, entity))
                .or_insert_with_key(|(style, entity)| Self {
                    style: style.clone(),
                    entity: entity.clone(),
                })
                .clone()
        })
    }

    pub fn empty() -> Self {
        Self::new(StyleSet::empty(), None)
    }

    pub fn style(&self) -> &StyleSet {
        &self.style
    }

    pub fn entity(&self) -> Option<&EntityKey> {
        self.entity.as_ref()
    }

    pub fn has_style(&self, name: &str) -> bool {
        self.style.contains(name)
    }

    pub fn apply_style(&self, name: &str) -> Self {
        Self::new(self.style.apply(name), self.entity.clone())
    }

    pub fn remove_style(&self, name: &str) -> Self {
        Self::new(self.style.remove(name), self.entity.clone())
    }

    pub fn apply_entity(&self, entity: Option<EntityKey>) -> Self {
        Self::new(self.style.clone(), entity)
    }
}

impl Default for CharacterMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_arguments_return_the_pooled_instance() {
        let a = CharacterMetadata::new(StyleSet::from_names(["BOLD", "ITALIC"]), None);
        let b = CharacterMetadata::new(StyleSet::from_names(["ITALIC", "BOLD"]), None);
        assert_eq!(a, b);
        assert!(StyleSet::ptr_eq(a.style(), b.style()));
    }

    #[test]
    fn entity_distinguishes_pool_entries() {
        let plain = CharacterMetadata::new(StyleSet::empty(), None);
        let linked =
            CharacterMetadata::new(StyleSet::empty(), Some(EntityKey::from("1")));
        assert_ne!(plain, linked);
        assert_eq!(linked.entity(), Some(&EntityKey::from("1")));
    }

    #[test]
    fn apply_style_returns_a_new_value() {
        let plain = CharacterMetadata::empty();
        let bold = plain.apply_style("BOLD");
        assert!(bold.has_style("BOLD"));
        assert!(!plain.has_style("BOLD"));
        assert_eq!(bold.remove_style("BOLD"), plain);
    }
}
