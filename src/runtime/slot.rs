//! Fixed-size indexed storage for static fields, locals and arguments

use super::{ReferenceCounter, RuntimeError, Value};

/// Fixed-length slot storage, every entry initialised to `Null`.
///
/// Writing an entry releases the reference held by the outgoing value and
/// acquires one for the incoming value. [`Slot::release`] drops every held
/// reference when the owning frame unwinds.
#[derive(Debug)]
pub struct Slot {
    items: Vec<Value>,
    references: ReferenceCounter,
}

impl Slot {
    pub fn new(count: usize, references: ReferenceCounter) -> Self {
        Slot {
            items: vec![Value::Null; count],
            references,
        }
    }

    /// A slot holding `values`, acquiring a reference for each
    pub fn from_values(values: Vec<Value>, references: ReferenceCounter) -> Self {
        for value in &values {
            references.add_reference(value);
        }
        Slot {
            items: values,
            references,
        }
    }

    pub fn get(&self, index: usize) -> Result<Value, RuntimeError> {
        self.items
            .get(index)
            .cloned()
            .ok_or(RuntimeError::SlotIndexOutOfRange {
                index,
                len: self.items.len(),
            })
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let len = self.items.len();
        let entry = self
            .items
            .get_mut(index)
            .ok_or(RuntimeError::SlotIndexOutOfRange { index, len })?;
        self.references.remove_reference(entry);
        self.references.add_reference(&value);
        *entry = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Release every held reference and reset all entries to `Null`
    pub fn release(&mut self) {
        for item in self.items.iter_mut() {
            self.references.remove_reference(item);
            *item = Value::Null;
        }
    }
}
