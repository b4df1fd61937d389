//! Reference accounting for compound values
//!
//! Lifetime of compound values is owned by `Rc`; this counter tallies how
//! many stack entries and slot entries currently hold a compound value, so a
//! host can observe sharing without walking the stack.

use super::Value;
use std::cell::Cell;
use std::rc::Rc;

/// Shared tally of compound references held by one engine's stack and slots
#[derive(Debug, Clone, Default)]
pub struct ReferenceCounter(Rc<Cell<usize>>);

impl ReferenceCounter {
    pub fn new() -> Self {
        ReferenceCounter::default()
    }

    /// Record that a stack entry or slot now holds `value`
    pub fn add_reference(&self, value: &Value) {
        if value.is_compound() {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Record that a stack entry or slot no longer holds `value`
    pub fn remove_reference(&self, value: &Value) {
        if value.is_compound() {
            self.0.set(self.0.get().saturating_sub(1));
        }
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }
}
