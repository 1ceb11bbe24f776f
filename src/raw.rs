//! The persisted interchange shape of a document.
//!
//! A raw document is a sequence of block records plus an entity map. All
//! offsets and lengths are counted in Unicode code points; the internal
//! model is indexed the same way, so conversion at this boundary is exact in
//! both directions.
//!
//! Nested-block documents can be written in two shapes: the flat shape,
//! where records appear as siblings and nesting is carried by `depth`, and
//! the nested shape, where container records hold a `children` array (and
//! carry no text or ranges of their own). [`flatten_blocks`] and
//! [`nest_blocks`] convert between the shapes and invert each other
//! exactly; in both, `depth` equals the record's nesting level.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DataMap;
use crate::block::{BlockType, CharList, ContentBlock, TreeLinks};
use crate::document::Document;
use crate::entity::{Entity, EntityMap, Mutability};
use crate::key::{BlockKey, EntityKey};
use crate::metadata::CharacterMetadata;
use crate::scan;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    #[serde(default, rename = "entityMap")]
    pub entity_map: BTreeMap<String, RawEntity>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub depth: usize,
    #[serde(default, rename = "inlineStyleRanges", skip_serializing_if = "Vec::is_empty")]
    pub inline_style_ranges: Vec<RawStyleRange>,
    #[serde(default, rename = "entityRanges", skip_serializing_if = "Vec::is_empty")]
    pub entity_ranges: Vec<RawEntityRange>,
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawBlock>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawEntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mutability: Mutability,
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
}

/// A malformed raw document. Decoding is the one fallible surface of the
/// engine: raw input may come from disk or the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawError {
    #[error("range {offset}+{length} exceeds block `{key}` of {len} characters")]
    RangeOutOfBounds {
        key: String,
        offset: usize,
        length: usize,
        len: usize,
    },
    #[error("block `{block}` references unknown entity `{entity}`")]
    UnknownEntity { block: String, entity: String },
    #[error("duplicate block key `{key}`")]
    DuplicateKey { key: String },
    #[error("non-leaf record `{key}` carries text or ranges")]
    NonLeafContent { key: String },
    #[error("record `{key}` is nested deeper than its predecessor allows")]
    DepthJump { key: String },
}

/// Encodes a document into the flat shape. For nested-block documents,
/// `depth` carries each block's nesting level so [`nest_blocks`] can
/// rebuild the nested shape.
pub fn encode(doc: &Document) -> RawDocument {
    let blocks = doc
        .blocks()
        .blocks()
        .map(|block| encode_block(block, doc))
        .collect();
    RawDocument {
        blocks,
        entity_map: encode_entities(doc.entity_map()),
    }
}

/// Encodes a nested-block document into the nested shape, container records
/// holding their children.
pub fn encode_tree(doc: &Document) -> Result<RawDocument, RawError> {
    let flat = encode(doc);
    Ok(RawDocument {
        blocks: nest_blocks(&flat.blocks)?,
        entity_map: flat.entity_map,
    })
}

/// Decodes either shape. Records carrying `children` arrays yield a
/// nested-block document; a flat record list yields a flat one.
pub fn decode(raw: &RawDocument) -> Result<Document, RawError> {
    let mut entities = EntityMap::new();
    for (key, entity) in &raw.entity_map {
        entities.insert_keyed(
            EntityKey::new(key.as_str()),
            Entity::new(
                entity.entity_type.clone(),
                entity.mutability,
                entity.data.clone(),
            ),
        );
    }

    let nested = raw.blocks.iter().any(|block| !block.children.is_empty());
    let blocks = if nested {
        decode_tree_blocks(&raw.blocks, &raw.entity_map)?
    } else {
        decode_flat_blocks(&raw.blocks, &raw.entity_map)?
    };

    let mut seen = HashSet::with_capacity(blocks.len());
    for block in &blocks {
        if !seen.insert(block.key().clone()) {
            return Err(RawError::DuplicateKey {
                key: block.key().to_string(),
            });
        }
    }

    Ok(Document::from_block_array(blocks).with_entity_map(entities))
}

/// Rebuilds the nested shape from flat records using their depths. Inverse
/// of [`flatten_blocks`].
pub fn nest_blocks(blocks: &[RawBlock]) -> Result<Vec<RawBlock>, RawError> {
    let mut idx = 0;
    let nested = nest_level(blocks, &mut idx, 0)?;
    debug_assert_eq!(idx, blocks.len());
    Ok(nested)
}

fn nest_level(
    blocks: &[RawBlock],
    idx: &mut usize,
    depth: usize,
) -> Result<Vec<RawBlock>, RawError> {
    let mut level = Vec::new();
    while *idx < blocks.len() {
        let record = &blocks[*idx];
        if record.depth < depth {
            break;
        }
        if record.depth > depth {
            return Err(RawError::DepthJump {
                key: record.key.clone(),
            });
        }
        *idx += 1;
        let mut node = record.clone();
        node.children = nest_level(blocks, idx, depth + 1)?;
        if !node.children.is_empty()
            && (!node.text.is_empty()
                || !node.inline_style_ranges.is_empty()
                || !node.entity_ranges.is_empty())
        {
            return Err(RawError::NonLeafContent {
                key: node.key.clone(),
            });
        }
        level.push(node);
    }
    Ok(level)
}

/// Flattens the nested shape into sibling records, writing each record's
/// nesting level into `depth`. Inverse of [`nest_blocks`].
pub fn flatten_blocks(blocks: &[RawBlock]) -> Vec<RawBlock> {
    let mut flat = Vec::new();
    flatten_level(blocks, 0, &mut flat);
    flat
}

fn flatten_level(blocks: &[RawBlock], depth: usize, flat: &mut Vec<RawBlock>) {
    for record in blocks {
        let mut node = record.clone();
        node.depth = depth;
        let children = std::mem::take(&mut node.children);
        flat.push(node);
        flatten_level(&children, depth + 1, flat);
    }
}

fn encode_block(block: &ContentBlock, doc: &Document) -> RawBlock {
    let mut style_names: BTreeSet<String> = BTreeSet::new();
    for meta in block.chars().iter() {
        for name in meta.style().iter() {
            style_names.insert(name.to_string());
        }
    }

    // One pass per style name over presence runs, so a style spanning
    // characters with differing other styles still encodes as one range.
    let mut inline_style_ranges = Vec::new();
    for name in &style_names {
        scan::find_ranges(
            block.chars().as_slice(),
            |a, b| a.has_style(name) == b.has_style(name),
            |meta| meta.has_style(name),
            |start, end| {
                inline_style_ranges.push(RawStyleRange {
                    offset: start,
                    length: end - start,
                    style: name.clone(),
                });
            },
        );
    }

    let mut entity_ranges = Vec::new();
    block.find_entity_ranges(
        |meta| meta.entity().is_some(),
        |start, end| {
            let key = block
                .entity_at(start)
                .expect("run filter guarantees an entity")
                .to_string();
            entity_ranges.push(RawEntityRange {
                offset: start,
                length: end - start,
                key,
            });
        },
    );

    let depth = if block.is_tree() {
        tree_depth(block, doc)
    } else {
        block.depth()
    };

    RawBlock {
        key: block.key().to_string(),
        text: block.text().to_string(),
        block_type: block.block_type().as_str().to_string(),
        depth,
        inline_style_ranges,
        entity_ranges,
        data: block.data().clone(),
        children: Vec::new(),
    }
}

fn tree_depth(block: &ContentBlock, doc: &Document) -> usize {
    let mut depth = 0;
    let mut parent = block.parent();
    while let Some(key) = parent {
        depth += 1;
        parent = doc.block_for_key(key).and_then(|block| block.parent());
    }
    depth
}

fn encode_entities(entities: &EntityMap) -> BTreeMap<String, RawEntity> {
    entities
        .iter()
        .map(|(key, entity)| {
            (
                key.to_string(),
                RawEntity {
                    entity_type: entity.entity_type().to_string(),
                    mutability: entity.mutability(),
                    data: entity.data().clone(),
                },
            )
        })
        .collect()
}

fn decode_flat_blocks(
    records: &[RawBlock],
    entity_map: &BTreeMap<String, RawEntity>,
) -> Result<Vec<ContentBlock>, RawError> {
    records
        .iter()
        .map(|record| {
            let key = record_key(record);
            decode_block(record, key, entity_map)
        })
        .collect()
}

fn decode_tree_blocks(
    records: &[RawBlock],
    entity_map: &BTreeMap<String, RawEntity>,
) -> Result<Vec<ContentBlock>, RawError> {
    let mut blocks = Vec::new();
    let keys: Vec<BlockKey> = records.iter().map(record_key).collect();
    decode_tree_level(records, &keys, None, entity_map, &mut blocks)?;
    Ok(blocks)
}

fn decode_tree_level(
    records: &[RawBlock],
    keys: &[BlockKey],
    parent: Option<&BlockKey>,
    entity_map: &BTreeMap<String, RawEntity>,
    blocks: &mut Vec<ContentBlock>,
) -> Result<(), RawError> {
    for (idx, record) in records.iter().enumerate() {
        if !record.children.is_empty()
            && (!record.text.is_empty()
                || !record.inline_style_ranges.is_empty()
                || !record.entity_ranges.is_empty())
        {
            return Err(RawError::NonLeafContent {
                key: record.key.clone(),
            });
        }
        let child_keys: Vec<BlockKey> = record.children.iter().map(record_key).collect();
        let block = decode_block(record, keys[idx].clone(), entity_map)?.with_links(TreeLinks {
            parent: parent.cloned(),
            children: child_keys.clone(),
            prev_sibling: idx.checked_sub(1).map(|i| keys[i].clone()),
            next_sibling: keys.get(idx + 1).cloned(),
        });
        blocks.push(block);
        decode_tree_level(&record.children, &child_keys, Some(&keys[idx]), entity_map, blocks)?;
    }
    Ok(())
}

/// Records without a key get a fresh random one.
fn record_key(record: &RawBlock) -> BlockKey {
    if record.key.is_empty() {
        BlockKey::random()
    } else {
        BlockKey::from(record.key.as_str())
    }
}

fn decode_block(
    record: &RawBlock,
    key: BlockKey,
    entity_map: &BTreeMap<String, RawEntity>,
) -> Result<ContentBlock, RawError> {
    let len = record.text.chars().count();
    let mut chars = vec![CharacterMetadata::empty(); len];

    for range in &record.inline_style_ranges {
        check_bounds(&record.key, range.offset, range.length, len)?;
        for meta in &mut chars[range.offset..range.offset + range.length] {
            *meta = meta.apply_style(&range.style);
        }
    }
    for range in &record.entity_ranges {
        check_bounds(&record.key, range.offset, range.length, len)?;
        if !entity_map.contains_key(&range.key) {
            return Err(RawError::UnknownEntity {
                block: record.key.clone(),
                entity: range.key.clone(),
            });
        }
        let entity_key = EntityKey::new(range.key.as_str());
        for meta in &mut chars[range.offset..range.offset + range.length] {
            *meta = meta.apply_entity(Some(entity_key.clone()));
        }
    }

    Ok(ContentBlock::new(key)
        .with_type(BlockType::from_name(&record.block_type))
        .with_text_and_chars(&record.text, CharList::new(chars))
        .with_depth(record.depth)
        .with_data(record.data.clone()))
}

fn check_bounds(key: &str, offset: usize, length: usize, len: usize) -> Result<(), RawError> {
    if offset + length > len {
        return Err(RawError::RangeOutOfBounds {
            key: key.to_string(),
            offset,
            length,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "raw_tests.rs"]
mod raw_tests;
