//! Evaluation stack implementation

use super::{ReferenceCounter, RuntimeError, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// The evaluation stack.
///
/// Positions given to `peek`, `insert`, `remove` and `reverse` count from the
/// top: index 0 is the most recently pushed value. Every compound value
/// entering or leaving the stack is recorded with the engine's
/// [`ReferenceCounter`].
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Value>,
    references: ReferenceCounter,
    /// Lowest depth reached since the last `mark`
    low_water: usize,
}

impl Stack {
    /// Create a new empty stack with its own reference counter
    pub fn new() -> Self {
        Stack::default()
    }

    /// Create a stack that records references in `references`
    pub fn with_references(references: ReferenceCounter) -> Self {
        Stack {
            values: Vec::new(),
            references,
            low_water: 0,
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Value) {
        self.references.add_reference(&value);
        self.values.push(value);
    }

    /// Push multiple values onto the stack
    pub fn push_all(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.push(value);
        }
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        let value = self.values.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.references.remove_reference(&value);
        self.low_water = self.low_water.min(self.values.len());
        Ok(value)
    }

    /// Pop a value and project it to an integer
    pub fn pop_integer(&mut self) -> Result<BigInt, RuntimeError> {
        Ok(self.pop()?.get_integer()?)
    }

    /// Pop a value and project it to a boolean
    pub fn pop_bool(&mut self) -> Result<bool, RuntimeError> {
        Ok(self.pop()?.get_boolean()?)
    }

    /// Pop a non-negative integer that fits in `usize`
    pub fn pop_usize(&mut self) -> Result<usize, RuntimeError> {
        let value = self.pop_integer()?;
        value
            .to_usize()
            .ok_or_else(|| RuntimeError::InvalidArgument(format!("{value} is not a valid count or index")))
    }

    /// Pop a value and return its canonical bytes, failing if a compound
    /// value's memory passes `limit`
    pub fn pop_bytes(&mut self, limit: usize) -> Result<Vec<u8>, RuntimeError> {
        Ok(self.pop()?.memory_within(limit)?.into_owned())
    }

    /// Peek at the value `index` positions below the top
    pub fn peek(&self, index: usize) -> Result<&Value, RuntimeError> {
        let len = self.values.len();
        if index >= len {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(&self.values[len - 1 - index])
    }

    /// Insert a value so that it ends up `index` positions below the top
    pub fn insert(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let len = self.values.len();
        if index > len {
            return Err(RuntimeError::StackUnderflow);
        }
        self.references.add_reference(&value);
        self.values.insert(len - index, value);
        self.low_water = self.low_water.min(len - index);
        Ok(())
    }

    /// Remove the value `index` positions below the top
    pub fn remove(&mut self, index: usize) -> Result<Value, RuntimeError> {
        let len = self.values.len();
        if index >= len {
            return Err(RuntimeError::StackUnderflow);
        }
        let value = self.values.remove(len - 1 - index);
        self.references.remove_reference(&value);
        self.low_water = self.low_water.min(len - 1 - index);
        Ok(value)
    }

    /// Reverse the order of the top `count` values
    pub fn reverse(&mut self, count: usize) -> Result<(), RuntimeError> {
        let len = self.values.len();
        if count > len {
            return Err(RuntimeError::StackUnderflow);
        }
        self.values[len - count..].reverse();
        self.low_water = self.low_water.min(len - count);
        Ok(())
    }

    /// Get the current stack depth
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clear the stack
    pub fn clear(&mut self) {
        for value in self.values.drain(..) {
            self.references.remove_reference(&value);
        }
        self.low_water = 0;
    }

    /// All values, bottom first
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Remember the current depth so `pushed_since_mark` can report what a
    /// single instruction produced
    pub(crate) fn mark(&mut self) {
        self.low_water = self.values.len();
    }

    /// Values that were added or rearranged since the last `mark`
    pub(crate) fn pushed_since_mark(&self) -> &[Value] {
        &self.values[self.low_water.min(self.values.len())..]
    }
}
