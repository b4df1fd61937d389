use super::{graph, StackItemType, Value, ValueError};
use crate::parser::limits::{MAX_GRAPH_NODES, MAX_ITEM_SIZE};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Common view over container values
pub trait CompoundType {
    fn compound_type(&self) -> StackItemType;

    /// Number of elements, or entries for a map
    fn count(&self) -> usize;

    /// Elements in order; for a map, its values in insertion order
    fn items(&self) -> Vec<Value>;

    fn is_read_only(&self) -> bool;

    fn clear(&self) -> Result<(), ValueError>;
}

/// Ordered element storage shared by [`Array`] and [`Struct`]
#[derive(Default)]
pub(crate) struct Sequence {
    items: Vec<Value>,
    read_only: bool,
}

impl Sequence {
    fn check_writable(&self, item_type: StackItemType) -> Result<(), ValueError> {
        if self.read_only {
            return Err(ValueError::ReadOnly(item_type));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), ValueError> {
        if index >= self.items.len() {
            return Err(ValueError::IndexOutOfRange {
                index,
                count: self.items.len(),
            });
        }
        Ok(())
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            graph::release(std::mem::take(&mut self.items));
        }
    }
}

macro_rules! sequence_type {
    ($(#[$meta:meta])* $name:ident, $tag:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Rc<RefCell<Sequence>>);

        impl $name {
            pub fn new(items: Vec<Value>) -> Self {
                $name(Rc::new(RefCell::new(Sequence {
                    items,
                    read_only: false,
                })))
            }

            /// A container whose mutators all fail
            pub fn new_read_only(items: Vec<Value>) -> Self {
                $name(Rc::new(RefCell::new(Sequence {
                    items,
                    read_only: true,
                })))
            }

            pub fn count(&self) -> usize {
                self.0.borrow().items.len()
            }

            pub fn is_empty(&self) -> bool {
                self.count() == 0
            }

            pub fn get(&self, index: usize) -> Result<Value, ValueError> {
                let seq = self.0.borrow();
                seq.check_index(index)?;
                Ok(seq.items[index].clone())
            }

            pub fn set(&self, index: usize, value: Value) -> Result<(), ValueError> {
                self.check_acyclic(&value)?;
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.check_index(index)?;
                seq.items[index] = value;
                Ok(())
            }

            pub fn add(&self, value: Value) -> Result<(), ValueError> {
                self.check_acyclic(&value)?;
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.items.push(value);
                Ok(())
            }

            pub fn remove(&self, index: usize) -> Result<Value, ValueError> {
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.check_index(index)?;
                Ok(seq.items.remove(index))
            }

            /// Remove and return the last element
            pub fn pop(&self) -> Result<Value, ValueError> {
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.items
                    .pop()
                    .ok_or(ValueError::IndexOutOfRange { index: 0, count: 0 })
            }

            pub fn reverse(&self) -> Result<(), ValueError> {
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.items.reverse();
                Ok(())
            }

            pub fn clear(&self) -> Result<(), ValueError> {
                let mut seq = self.0.borrow_mut();
                seq.check_writable($tag)?;
                seq.items.clear();
                Ok(())
            }

            pub fn items(&self) -> Vec<Value> {
                self.0.borrow().items.clone()
            }

            pub fn is_read_only(&self) -> bool {
                self.0.borrow().read_only
            }

            /// Concatenation of every element's memory, bounded by
            /// [`MAX_ITEM_SIZE`]
            pub fn memory(&self) -> Result<Vec<u8>, ValueError> {
                graph::flatten(&Value::$name(self.clone()), MAX_ITEM_SIZE)
            }

            pub fn ptr_eq(&self, other: &Self) -> bool {
                Rc::ptr_eq(&self.0, &other.0)
            }

            /// Number of `Rc` handles to the underlying storage
            pub fn handle_count(&self) -> usize {
                Rc::strong_count(&self.0)
            }

            pub(crate) fn storage_ptr(&self) -> *const () {
                Rc::as_ptr(&self.0) as *const ()
            }

            /// Reject `value` if this container is reachable from it
            fn check_acyclic(&self, value: &Value) -> Result<(), ValueError> {
                if value.is_compound() && graph::reaches(value, self.storage_ptr())? {
                    return Err(ValueError::SelfReference($tag));
                }
                Ok(())
            }

            /// The elements, if this is the last handle to the storage
            pub(super) fn into_unique_items(self) -> Option<Vec<Value>> {
                let cell = Rc::try_unwrap(self.0).ok()?;
                let mut seq = cell.into_inner();
                Some(std::mem::take(&mut seq.items))
            }
        }

        impl CompoundType for $name {
            fn compound_type(&self) -> StackItemType {
                $tag
            }

            fn count(&self) -> usize {
                $name::count(self)
            }

            fn items(&self) -> Vec<Value> {
                $name::items(self)
            }

            fn is_read_only(&self) -> bool {
                $name::is_read_only(self)
            }

            fn clear(&self) -> Result<(), ValueError> {
                $name::clear(self)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                graph::equals(&Value::$name(self.clone()), &Value::$name(other.clone()))
            }
        }

        impl Eq for $name {}

        // Shallow: equal values always have equal lengths.
        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.count().hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0.try_borrow() {
                    Ok(_) => graph::display(&Value::$name(self.clone()), f),
                    Err(_) => write!(f, "{}(<borrowed>)", stringify!($name)),
                }
            }
        }
    };
}

sequence_type!(
    /// Ordered, mutable sequence with reference semantics
    Array,
    StackItemType::Array
);

sequence_type!(
    /// Ordered sequence with value semantics: stored copies are deep copies
    Struct,
    StackItemType::Struct
);

impl Struct {
    /// Copy this struct and every struct nested in it; other compound
    /// elements stay shared.
    ///
    /// Fails once more than [`MAX_GRAPH_NODES`] structs would be created.
    pub fn deep_clone(&self) -> Result<Struct, ValueError> {
        let root = Struct::new(Vec::new());
        let mut copies = 1usize;
        let mut pending = vec![(self.clone(), root.clone())];
        while let Some((source, target)) = pending.pop() {
            let mut items = Vec::with_capacity(source.count());
            for item in source.items() {
                match item {
                    Value::Struct(inner) => {
                        copies += 1;
                        if copies > MAX_GRAPH_NODES {
                            return Err(ValueError::TooManyContainers { limit: MAX_GRAPH_NODES });
                        }
                        let copy = Struct::new(Vec::new());
                        items.push(Value::Struct(copy.clone()));
                        pending.push((inner, copy));
                    }
                    other => items.push(other),
                }
            }
            target.0.borrow_mut().items = items;
        }
        Ok(root)
    }
}

impl From<Struct> for Array {
    fn from(value: Struct) -> Self {
        Array::new(value.items())
    }
}

impl From<Array> for Struct {
    fn from(value: Array) -> Self {
        Struct::new(value.items())
    }
}
