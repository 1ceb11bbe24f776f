use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::DataMap;
use crate::key::EntityKey;

/// How an entity's characters react to partial deletion.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    /// Characters may be freely edited or partially removed.
    Mutable,
    /// Any partial removal removes the entity's whole contiguous range.
    Immutable,
    /// Partial removal expands to the nearest segment boundary.
    Segmented,
}

/// A typed, keyed annotation (link, mention, image, ...) attached to
/// character ranges. Entities are referenced by key from character metadata,
/// never embedded.
#[derive(Clone, PartialEq, Debug)]
pub struct Entity {
    entity_type: String,
    mutability: Mutability,
    data: DataMap,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, mutability: Mutability, data: DataMap) -> Self {
        Self {
            entity_type: entity_type.into(),
            mutability,
            data,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }
}

/// The entity registry of one document.
///
/// Owned by the document rather than held in process-wide state, so two
/// documents never alias mutable entity records. Keys are sequential and
/// opaque; iteration order is creation order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EntityMap {
    entities: IndexMap<EntityKey, Entity>,
    next_key: u64,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entity` under a fresh key, returning the updated map and the
    /// key.
    pub fn create(&self, entity: Entity) -> (EntityMap, EntityKey) {
        let mut next = self.clone();
        next.next_key += 1;
        let key = EntityKey::new(next.next_key.to_string());
        next.entities.insert(key.clone(), entity);
        (next, key)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Panics on an unknown key: a missing entity always means the caller is
    /// holding a stale key.
    pub fn expect(&self, key: &EntityKey) -> &Entity {
        self.get(key)
            .unwrap_or_else(|| panic!("unknown entity key `{key}`"))
    }

    /// Merges `data` into the entity's existing data. Panics on an unknown
    /// key.
    pub fn merge_data(&self, key: &EntityKey, data: &DataMap) -> EntityMap {
        let mut next = self.clone();
        let entity = next
            .entities
            .get_mut(key)
            .unwrap_or_else(|| panic!("unknown entity key `{key}`"));
        for (name, value) in data {
            entity.data.insert(name.clone(), value.clone());
        }
        next
    }

    /// Replaces the entity's data wholesale. Panics on an unknown key.
    pub fn replace_data(&self, key: &EntityKey, data: DataMap) -> EntityMap {
        let mut next = self.clone();
        let entity = next
            .entities
            .get_mut(key)
            .unwrap_or_else(|| panic!("unknown entity key `{key}`"));
        entity.data = data;
        next
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Inserts an entity under an externally supplied key, keeping the
    /// sequential counter ahead of any numeric key seen. Used when decoding
    /// persisted documents.
    pub(crate) fn insert_keyed(&mut self, key: EntityKey, entity: Entity) {
        if let Ok(numeric) = key.as_str().parse::<u64>() {
            self.next_key = self.next_key.max(numeric);
        }
        self.entities.insert(key, entity);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(pairs: &[(&str, serde_json::Value)]) -> DataMap {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn create_returns_fresh_sequential_keys() {
        let map = EntityMap::new();
        let (map, first) = map.create(Entity::new("LINK", Mutability::Mutable, DataMap::new()));
        let (map, second) = map.create(Entity::new("MENTION", Mutability::Segmented, DataMap::new()));
        assert_ne!(first, second);
        assert_eq!(map.expect(&first).entity_type(), "LINK");
        assert_eq!(map.expect(&second).mutability(), Mutability::Segmented);
    }

    #[test]
    fn create_leaves_the_original_map_untouched() {
        let map = EntityMap::new();
        let (updated, key) = map.create(Entity::new("LINK", Mutability::Mutable, DataMap::new()));
        assert!(map.get(&key).is_none());
        assert!(updated.get(&key).is_some());
    }

    #[test]
    fn merge_data_overlays_replace_data_swaps() {
        let (map, key) = EntityMap::new().create(Entity::new(
            "LINK",
            Mutability::Mutable,
            data(&[("url", json!("a")), ("rel", json!("nofollow"))]),
        ));
        let merged = map.merge_data(&key, &data(&[("url", json!("b"))]));
        assert_eq!(merged.expect(&key).data()["url"], json!("b"));
        assert_eq!(merged.expect(&key).data()["rel"], json!("nofollow"));

        let replaced = map.replace_data(&key, data(&[("url", json!("c"))]));
        assert_eq!(replaced.expect(&key).data()["url"], json!("c"));
        assert!(!replaced.expect(&key).data().contains_key("rel"));
    }

    #[test]
    #[should_panic(expected = "unknown entity key")]
    fn expect_panics_on_stale_keys() {
        EntityMap::new().expect(&EntityKey::from("99"));
    }

    #[test]
    fn keyed_inserts_keep_the_counter_ahead() {
        let mut map = EntityMap::new();
        map.insert_keyed(
            EntityKey::from("7"),
            Entity::new("LINK", Mutability::Mutable, DataMap::new()),
        );
        let (_, key) = map.create(Entity::new("LINK", Mutability::Mutable, DataMap::new()));
        assert_eq!(key.as_str(), "8");
    }
}
