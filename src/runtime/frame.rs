//! Invocation frame
//!
//! One frame per active `CALL`, holding its local and argument slots.

use super::Slot;

#[derive(Debug, Default)]
pub struct Frame {
    /// Where `RET` resumes; `None` for the entry frame
    pub return_address: Option<usize>,
    pub locals: Option<Slot>,
    pub arguments: Option<Slot>,
}

impl Frame {
    pub fn entry() -> Self {
        Frame::default()
    }

    pub fn call(return_address: usize) -> Self {
        Frame {
            return_address: Some(return_address),
            ..Frame::default()
        }
    }

    /// Release the references held by this frame's slots
    pub fn release(&mut self) {
        if let Some(locals) = self.locals.as_mut() {
            locals.release();
        }
        if let Some(arguments) = self.arguments.as_mut() {
            arguments.release();
        }
    }
}
