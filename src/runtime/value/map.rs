use super::{graph, CompoundType, StackItemType, Value, ValueError};
use crate::parser::limits::{MAX_ITEM_SIZE, MAX_KEY_SIZE};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Default)]
struct MapStorage {
    entries: IndexMap<Value, Value>,
    read_only: bool,
}

impl MapStorage {
    fn check_writable(&self) -> Result<(), ValueError> {
        if self.read_only {
            return Err(ValueError::ReadOnly(StackItemType::Map));
        }
        Ok(())
    }
}

impl Drop for MapStorage {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            graph::release(std::mem::take(&mut self.entries).into_values().collect());
        }
    }
}

/// Key-unique, insertion-ordered associative container with reference
/// semantics.
///
/// Keys must be primitive values whose canonical memory is at most
/// [`MAX_KEY_SIZE`] bytes. Every keyed operation validates the key before it
/// touches the entries.
#[derive(Clone, Default)]
pub struct Map(Rc<RefCell<MapStorage>>);

impl Map {
    pub fn new() -> Self {
        Map::default()
    }

    /// A map whose mutators all fail
    pub fn new_read_only(entries: impl IntoIterator<Item = (Value, Value)>) -> Result<Self, ValueError> {
        let map = Map::new();
        for (key, value) in entries {
            map.set(key, value)?;
        }
        map.0.borrow_mut().read_only = true;
        Ok(map)
    }

    pub fn count(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool, ValueError> {
        check_key(key)?;
        Ok(self.0.borrow().entries.contains_key(key))
    }

    pub fn try_get(&self, key: &Value) -> Result<Option<Value>, ValueError> {
        check_key(key)?;
        Ok(self.0.borrow().entries.get(key).cloned())
    }

    pub fn get(&self, key: &Value) -> Result<Value, ValueError> {
        self.try_get(key)?.ok_or(ValueError::KeyNotFound)
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn set(&self, key: Value, value: Value) -> Result<(), ValueError> {
        check_key(&key)?;
        if value.is_compound() && graph::reaches(&value, self.storage_ptr())? {
            return Err(ValueError::SelfReference(StackItemType::Map));
        }
        let mut storage = self.0.borrow_mut();
        storage.check_writable()?;
        storage.entries.insert(key, value);
        Ok(())
    }

    /// Remove an entry, preserving the order of the rest
    pub fn remove(&self, key: &Value) -> Result<Option<Value>, ValueError> {
        check_key(key)?;
        let mut storage = self.0.borrow_mut();
        storage.check_writable()?;
        Ok(storage.entries.shift_remove(key))
    }

    pub fn clear(&self) -> Result<(), ValueError> {
        let mut storage = self.0.borrow_mut();
        storage.check_writable()?;
        storage.entries.clear();
        Ok(())
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.borrow().entries.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().entries.values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_read_only(&self) -> bool {
        self.0.borrow().read_only
    }

    /// All keys' memory followed by all values' memory, in insertion order,
    /// bounded by [`MAX_ITEM_SIZE`]
    pub fn memory(&self) -> Result<Vec<u8>, ValueError> {
        graph::flatten(&Value::Map(self.clone()), MAX_ITEM_SIZE)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn storage_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// The values, if this is the last handle to the storage
    pub(super) fn into_unique_values(self) -> Option<Vec<Value>> {
        let cell = Rc::try_unwrap(self.0).ok()?;
        let mut storage = cell.into_inner();
        Some(std::mem::take(&mut storage.entries).into_values().collect())
    }
}

fn check_key(key: &Value) -> Result<(), ValueError> {
    if !key.is_null() && !key.item_type().is_primitive() {
        return Err(ValueError::InvalidKeyType(key.item_type()));
    }
    let size = key.size()?;
    if size > MAX_KEY_SIZE {
        return Err(ValueError::KeyTooLarge { size });
    }
    Ok(())
}

impl CompoundType for Map {
    fn compound_type(&self) -> StackItemType {
        StackItemType::Map
    }

    fn count(&self) -> usize {
        Map::count(self)
    }

    fn items(&self) -> Vec<Value> {
        self.values()
    }

    fn is_read_only(&self) -> bool {
        Map::is_read_only(self)
    }

    fn clear(&self) -> Result<(), ValueError> {
        Map::clear(self)
    }
}

// Equality and hashing ignore insertion order. Hashing covers the keys only,
// which are primitive.

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        graph::equals(&Value::Map(self.clone()), &Value::Map(other.clone()))
    }
}

impl Eq for Map {}

impl Hash for Map {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let storage = self.0.borrow();
        let mut combined: u64 = 0;
        for key in storage.entries.keys() {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        storage.entries.len().hash(state);
        combined.hash(state);
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(_) => graph::display(&Value::Map(self.clone()), f),
            Err(_) => write!(f, "Map(<borrowed>)"),
        }
    }
}
