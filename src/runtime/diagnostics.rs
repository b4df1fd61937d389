//! Per-step execution events
//!
//! Every executed instruction produces one [`StepEvent`]. Events go to
//! `tracing` at `TRACE` level under the `stackvm::step` target, and to an
//! optional host [`DiagnosticSink`]. Handlers may attach notes describing
//! control transfers or slot writes; notes are only formatted when someone
//! is listening.

use super::Value;
use crate::parser::instruction::Instruction;
use crate::parser::opcode::OpCode;
use std::fmt;

/// What one executed instruction did
#[derive(Debug)]
pub struct StepEvent<'a> {
    pub position: usize,
    pub opcode: OpCode,
    /// Values the instruction left on top of the stack
    pub results: &'a [Value],
    pub notes: &'a [String],
}

impl fmt::Display for StepEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}: {}", self.position, self.opcode)?;
        if !self.results.is_empty() {
            write!(f, " ->")?;
            for value in self.results {
                write!(f, " {value}")?;
            }
        }
        for note in self.notes {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}

/// Host hook receiving every step event
pub trait DiagnosticSink {
    fn on_step(&mut self, event: &StepEvent<'_>);
}

#[derive(Default)]
pub struct Diagnostics {
    sink: Option<Box<dyn DiagnosticSink>>,
    notes: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn with_sink(sink: Box<dyn DiagnosticSink>) -> Self {
        Diagnostics {
            sink: Some(sink),
            notes: Vec::new(),
        }
    }

    /// Whether events are observed by a sink or a `TRACE` subscriber
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some() || tracing::enabled!(target: "stackvm::step", tracing::Level::TRACE)
    }

    /// Attach a note to the current step; `note` is only called when enabled
    pub fn note(&mut self, note: impl FnOnce() -> String) {
        if self.is_enabled() {
            self.notes.push(note());
        }
    }

    pub(crate) fn record(&mut self, instruction: &Instruction, results: &[Value]) {
        if self.is_enabled() {
            let event = StepEvent {
                position: instruction.position,
                opcode: instruction.opcode,
                results,
                notes: &self.notes,
            };
            tracing::trace!(target: "stackvm::step", "{event}");
            if let Some(sink) = self.sink.as_mut() {
                sink.on_step(&event);
            }
        }
        self.notes.clear();
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .field("notes", &self.notes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Collect(Rc<RefCell<Vec<String>>>);

    impl DiagnosticSink for Collect {
        fn on_step(&mut self, event: &StepEvent<'_>) {
            self.0.borrow_mut().push(event.to_string());
        }
    }

    #[test]
    fn sink_receives_formatted_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut diagnostics = Diagnostics::with_sink(Box::new(Collect(seen.clone())));
        let instruction = Instruction::decode(&[0x21, 0x9e], 1).unwrap();

        diagnostics.note(|| "checked".to_string());
        diagnostics.record(&instruction, &[Value::from_int(3)]);
        diagnostics.record(&instruction, &[]);

        assert_eq!(*seen.borrow(), vec!["0001: ADD -> 3 (checked)", "0001: ADD"]);
    }

    #[test]
    fn notes_skipped_without_listener() {
        let mut diagnostics = Diagnostics::new();
        let mut called = false;
        diagnostics.note(|| {
            called = true;
            String::new()
        });
        if !diagnostics.is_enabled() {
            assert!(!called);
        }
    }
}
