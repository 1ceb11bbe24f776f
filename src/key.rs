use std::fmt;
use std::sync::Arc;

use rand::Rng;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
const KEY_LEN: usize = 8;

/// Identifies one block within a document.
///
/// Keys are opaque and cheap to clone. Keys generated with [`BlockKey::random`]
/// are unique for practical purposes; reusing a key across documents is only
/// valid when deliberately copying a block.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Arc<str>);

impl BlockKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn random() -> Self {
        Self(random_key().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockKey({:?})", &*self.0)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

/// References an entity record in a document's entity map.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(Arc<str>);

impl EntityKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({:?})", &*self.0)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

fn random_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LEN)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_keys_use_the_expected_alphabet() {
        for _ in 0..32 {
            let key = BlockKey::random();
            assert_eq!(key.as_str().chars().count(), KEY_LEN);
            assert!(
                key.as_str()
                    .bytes()
                    .all(|b| KEY_ALPHABET.contains(&b))
            );
        }
    }

    #[test]
    fn keys_compare_by_content() {
        assert_eq!(BlockKey::from("abc"), BlockKey::new("abc"));
        assert_ne!(BlockKey::from("abc"), BlockKey::from("abd"));
    }
}
