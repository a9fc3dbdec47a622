//! Value decoder registry
//!
//! Maps value type tags to the routine that reads the value body, so new
//! encodings plug in without touching the record state machine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

use super::{RecordRead, RecordValue, ValueType};

/// Upper bound on capacity reserved ahead of reading collection elements
const MAX_PREALLOC: usize = 1024;

/// Reads one value body of a registered type
pub trait ValueDecoder: Send + Sync {
    fn decode(&self, value_type: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue>;
}

impl<F> ValueDecoder for F
where
    F: Fn(ValueType, &mut dyn RecordRead) -> Result<RecordValue> + Send + Sync,
{
    fn decode(&self, value_type: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        (self)(value_type, reader)
    }
}

/// Tag to decoder table consulted for every entry
#[derive(Clone)]
pub struct ValueRegistry {
    decoders: HashMap<u8, Arc<dyn ValueDecoder>>,
}

impl ValueRegistry {
    /// Registry that recognises no value types
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Install `decoder` for `tag`, replacing any previous one
    pub fn register(&mut self, tag: u8, decoder: impl ValueDecoder + 'static) -> &mut Self {
        self.decoders.insert(tag, Arc::new(decoder));
        self
    }

    pub fn get(&self, tag: u8) -> Option<&dyn ValueDecoder> {
        self.decoders.get(&tag).map(|d| d.as_ref())
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.decoders.contains_key(&tag)
    }
}

impl Default for ValueRegistry {
    /// Registry with decoders for every built-in value type
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ValueType::String.tag(), StringValue)
            .register(ValueType::List.tag(), StringSequence)
            .register(ValueType::Set.tag(), StringSequence)
            .register(ValueType::SortedSet.tag(), ScoredMembers)
            .register(ValueType::Hash.tag(), FieldPairs);
        for packed in [
            ValueType::Zipmap,
            ValueType::Ziplist,
            ValueType::Intset,
            ValueType::SortedSetZiplist,
            ValueType::HashZiplist,
        ] {
            registry.register(packed.tag(), PackedBlob);
        }
        registry
    }
}

impl fmt::Debug for ValueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.decoders.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("ValueRegistry").field("tags", &tags).finish()
    }
}

// =============================================================================
// Built-in Decoders
// =============================================================================

/// A single string
#[derive(Debug, Clone, Copy)]
pub struct StringValue;

impl ValueDecoder for StringValue {
    fn decode(&self, _: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        Ok(RecordValue::String(reader.read_string()?))
    }
}

/// Count followed by that many strings (lists and sets)
#[derive(Debug, Clone, Copy)]
pub struct StringSequence;

impl ValueDecoder for StringSequence {
    fn decode(&self, value_type: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        let len = reader.read_plain_length()?;
        let mut items = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
        for _ in 0..len {
            items.push(reader.read_string()?);
        }
        Ok(match value_type {
            ValueType::Set => RecordValue::Set(items),
            _ => RecordValue::List(items),
        })
    }
}

/// Count followed by (member, score) pairs
#[derive(Debug, Clone, Copy)]
pub struct ScoredMembers;

impl ValueDecoder for ScoredMembers {
    fn decode(&self, _: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        let len = reader.read_plain_length()?;
        let mut members = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
        for _ in 0..len {
            let member = reader.read_string()?;
            let score = reader.read_double()?;
            members.push((member, score));
        }
        Ok(RecordValue::SortedSet(members))
    }
}

/// Count followed by (field, value) pairs
#[derive(Debug, Clone, Copy)]
pub struct FieldPairs;

impl ValueDecoder for FieldPairs {
    fn decode(&self, _: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        let len = reader.read_plain_length()?;
        let mut fields = Vec::with_capacity((len as usize).min(MAX_PREALLOC));
        for _ in 0..len {
            let field = reader.read_string()?;
            let value = reader.read_string()?;
            fields.push((field, value));
        }
        Ok(RecordValue::Hash(fields))
    }
}

/// One string holding a packed encoding, surfaced undecoded
#[derive(Debug, Clone, Copy)]
pub struct PackedBlob;

impl ValueDecoder for PackedBlob {
    fn decode(&self, _: ValueType, reader: &mut dyn RecordRead) -> Result<RecordValue> {
        Ok(RecordValue::Encoded(reader.read_string()?))
    }
}
