//! Bytecode execution engine
//!
//! The engine owns the evaluation stack, the instruction pointer, the
//! invocation frames and the run state. [`Engine::run`] repeats
//! [`Engine::step`] until the state is `Halt` or `Fault`. Errors raised by a
//! handler are caught at the step boundary and turn into `Fault`; the stack
//! is left exactly as the handler left it.

use super::diagnostics::Diagnostics;
use super::frame::Frame;
use super::jump_table::JumpTable;
use super::{ExecutionLimits, ReferenceCounter, RuntimeError, Slot, Stack, Value, VmState};
use crate::parser::instruction::{DecodeError, Instruction};
use crate::parser::script::Script;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Executes one decoded script
#[derive(Debug)]
pub struct Engine {
    script: Arc<Script>,
    table: Arc<JumpTable>,
    limits: ExecutionLimits,
    references: ReferenceCounter,
    stack: Stack,
    frames: Vec<Frame>,
    static_fields: Option<Slot>,
    ip: usize,
    /// Target set by a handler for the current step
    pending_jump: Option<usize>,
    state: VmState,
    error: Option<RuntimeError>,
    diagnostics: Diagnostics,
    cancellation: Option<Arc<AtomicBool>>,
    budget: Option<u64>,
    executed: u64,
}

impl Engine {
    /// Create an engine using the shared default dispatch table
    pub fn new(script: impl Into<Arc<Script>>) -> Self {
        Engine::with_table(script, JumpTable::shared())
    }

    /// Decode `bytes` and create an engine for them
    pub fn load(bytes: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        Ok(Engine::new(Script::new(bytes)?))
    }

    pub fn with_table(script: impl Into<Arc<Script>>, table: Arc<JumpTable>) -> Self {
        let references = ReferenceCounter::new();
        Engine {
            script: script.into(),
            table,
            limits: ExecutionLimits::default(),
            stack: Stack::with_references(references.clone()),
            references,
            frames: vec![Frame::entry()],
            static_fields: None,
            ip: 0,
            pending_jump: None,
            state: VmState::None,
            error: None,
            diagnostics: Diagnostics::default(),
            cancellation: None,
            budget: None,
            executed: 0,
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Fault with [`RuntimeError::Cancelled`] once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Fault before executing instruction number `budget + 1`
    pub fn with_instruction_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    // === Observers ===

    pub fn state(&self) -> VmState {
        self.state
    }

    /// The error that caused `Fault`
    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Compound values currently held by stack entries and slots
    pub fn reference_count(&self) -> usize {
        self.references.count()
    }

    /// Number of active frames, including the entry frame
    pub fn invocation_depth(&self) -> usize {
        self.frames.len()
    }

    /// Instructions executed so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    // === Execution ===

    /// Step until the state is `Halt` or `Fault`
    pub fn run(&mut self) -> VmState {
        while !self.state.is_terminal() {
            self.step();
        }
        self.state
    }

    /// Execute a single instruction
    pub fn step(&mut self) -> VmState {
        if self.state.is_terminal() {
            return self.state;
        }
        if let Err(error) = self.execute_next() {
            self.fault(error);
        }
        self.state
    }

    /// Force the engine into `Fault` with `error`
    pub fn fault(&mut self, error: RuntimeError) {
        tracing::debug!(
            position = self.ip,
            opcode = ?self.script.instruction_at(self.ip).map(|i| i.opcode),
            %error,
            "fault"
        );
        self.error = Some(error);
        self.state = VmState::Fault;
    }

    fn execute_next(&mut self) -> Result<(), RuntimeError> {
        if let Some(flag) = &self.cancellation {
            if flag.load(Ordering::Relaxed) {
                return Err(RuntimeError::Cancelled);
            }
        }
        if self.ip == self.script.len() {
            self.halt();
            return Ok(());
        }
        if let Some(budget) = self.budget {
            if self.executed >= budget {
                return Err(RuntimeError::InstructionBudgetExhausted);
            }
        }

        let script = Arc::clone(&self.script);
        let instruction = script
            .instruction_at(self.ip)
            .ok_or(RuntimeError::InvalidInstructionPointer(self.ip))?;
        let handler = self.table.handler(instruction.opcode.byte());

        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        self.stack.mark();
        let result = handler(self, instruction, &mut diagnostics);
        if result.is_ok() {
            diagnostics.record(instruction, self.stack.pushed_since_mark());
        }
        self.diagnostics = diagnostics;
        result?;
        self.executed += 1;

        if self.stack.depth() > self.limits.max_stack_size {
            return Err(RuntimeError::StackOverflow(self.stack.depth()));
        }
        if self.state == VmState::Halt {
            return Ok(());
        }
        self.ip = match self.pending_jump.take() {
            Some(target) => target,
            None => instruction.next_position(),
        };
        Ok(())
    }

    fn halt(&mut self) {
        while let Some(mut frame) = self.frames.pop() {
            frame.release();
        }
        if let Some(fields) = self.static_fields.as_mut() {
            fields.release();
        }
        tracing::debug!(executed = self.executed, depth = self.stack.depth(), "halt");
        self.state = VmState::Halt;
    }

    // === Handler support ===

    /// Resolve `offset` relative to `instruction` and jump there after this step
    pub fn jump_relative(&mut self, instruction: &Instruction, offset: i32) -> Result<usize, RuntimeError> {
        let target = self.resolve_target(instruction, offset)?;
        self.pending_jump = Some(target);
        Ok(target)
    }

    fn resolve_target(&self, instruction: &Instruction, offset: i32) -> Result<usize, RuntimeError> {
        let target = instruction.position as i64 + offset as i64;
        if target < 0 || !self.script.is_boundary(target as usize) {
            return Err(RuntimeError::InvalidJumpTarget(target));
        }
        Ok(target as usize)
    }

    /// Push a frame that returns after `instruction` and jump to `offset`
    pub fn call_relative(&mut self, instruction: &Instruction, offset: i32) -> Result<usize, RuntimeError> {
        if self.frames.len() >= self.limits.max_invocation_depth {
            return Err(RuntimeError::InvocationDepthExceeded(self.limits.max_invocation_depth));
        }
        let target = self.resolve_target(instruction, offset)?;
        self.frames.push(Frame::call(instruction.next_position()));
        self.pending_jump = Some(target);
        Ok(target)
    }

    /// Unwind the current frame; returning from the entry frame halts
    pub fn return_from_frame(&mut self) -> Result<(), RuntimeError> {
        let mut frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
        frame.release();
        match frame.return_address {
            Some(address) => self.pending_jump = Some(address),
            None => self.halt(),
        }
        Ok(())
    }

    pub fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames.last().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames.last_mut().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn static_fields(&self) -> Option<&Slot> {
        self.static_fields.as_ref()
    }

    pub fn static_fields_mut(&mut self) -> Option<&mut Slot> {
        self.static_fields.as_mut()
    }

    pub(crate) fn init_static_fields(&mut self, count: usize) -> Result<(), RuntimeError> {
        if self.static_fields.is_some() {
            return Err(RuntimeError::SlotAlreadyInitialised("static field"));
        }
        self.static_fields = Some(Slot::new(count, self.references.clone()));
        Ok(())
    }

    /// A new slot recording references with this engine's counter
    pub fn new_slot(&self, values: Vec<Value>) -> Slot {
        Slot::from_values(values, self.references.clone())
    }

    /// Fail when a produced item is larger than `max_item_size`
    pub fn check_item_size(&self, size: usize) -> Result<(), RuntimeError> {
        if size > self.limits.max_item_size {
            return Err(RuntimeError::ItemTooLarge {
                size,
                max: self.limits.max_item_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ScriptBuilder;
    use crate::parser::opcode::OpCode;

    fn engine(builder: ScriptBuilder) -> Engine {
        Engine::load(builder.build()).unwrap()
    }

    #[test]
    fn empty_script_halts() {
        let mut engine = Engine::load(Vec::new()).unwrap();
        assert_eq!(engine.run(), VmState::Halt);
        assert!(engine.stack().is_empty());
    }

    #[test]
    fn steps_advance_by_instruction_size() {
        let mut engine = engine(ScriptBuilder::new().push_int(1000).push_bytes(&[1, 2, 3]).emit(OpCode::Nop));
        assert_eq!(engine.step(), VmState::None);
        assert_eq!(engine.instruction_pointer(), 3);
        engine.step();
        assert_eq!(engine.instruction_pointer(), 8);
        engine.step();
        assert_eq!(engine.instruction_pointer(), 9);
        assert_eq!(engine.step(), VmState::Halt);
        assert_eq!(engine.executed(), 3);
    }

    #[test]
    fn handler_errors_fault_and_keep_stack() {
        let mut engine = engine(ScriptBuilder::new().push_int(1).emit(OpCode::Add).push_int(2));
        assert_eq!(engine.run(), VmState::Fault);
        assert_eq!(engine.error(), Some(&RuntimeError::StackUnderflow));
        assert!(engine.stack().is_empty());
        assert_eq!(engine.instruction_pointer(), 1);
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut engine = engine(ScriptBuilder::new().emit(OpCode::Abort).push_int(1));
        assert_eq!(engine.run(), VmState::Fault);
        assert_eq!(engine.step(), VmState::Fault);
        assert!(engine.stack().is_empty());
    }

    #[test]
    fn host_forced_fault() {
        let mut engine = engine(ScriptBuilder::new().push_int(1).push_int(2));
        engine.step();
        engine.fault(RuntimeError::Cancelled);
        assert_eq!(engine.run(), VmState::Fault);
        assert_eq!(engine.stack().depth(), 1);
    }

    #[test]
    fn stack_limit() {
        let limits = ExecutionLimits {
            max_stack_size: 2,
            ..ExecutionLimits::default()
        };
        let mut engine = engine(ScriptBuilder::new().push_int(1).push_int(2).push_int(3)).with_limits(limits);
        assert_eq!(engine.run(), VmState::Fault);
        assert_eq!(engine.error(), Some(&RuntimeError::StackOverflow(3)));
    }
}
