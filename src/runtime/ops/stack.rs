//! Stack manipulation operations
//!
//! Positions count from the top of the stack: item 0 is the top.

use super::*;

/// DEPTH: push the number of items on the stack
pub fn depth(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let depth = engine.stack().depth() as i64;
    engine.stack_mut().push(Value::from_int(depth));
    Ok(())
}

/// DROP: remove the top item
pub fn drop(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().pop()?;
    Ok(())
}

/// NIP: remove the second-to-top item
pub fn nip(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().remove(1)?;
    Ok(())
}

/// XDROP: pop n, then remove item n
pub fn xdrop(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let n = stack.pop_usize()?;
    stack.remove(n)?;
    Ok(())
}

/// CLEAR: remove every item
pub fn clear(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().clear();
    Ok(())
}

/// DUP: copy the top item
pub fn dup(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    copy_to_top(engine, 0)
}

/// OVER: copy the second-to-top item
pub fn over(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    copy_to_top(engine, 1)
}

/// PICK: pop n, then copy item n to the top
pub fn pick(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let n = engine.stack_mut().pop_usize()?;
    copy_to_top(engine, n)
}

/// TUCK: copy the top item below the second-to-top item
pub fn tuck(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let top = stack.peek(0)?.clone();
    stack.insert(2, top)
}

/// SWAP: exchange the top two items
pub fn swap(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    move_to_top(engine, 1)
}

/// ROT: move item 2 to the top
pub fn rot(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    move_to_top(engine, 2)
}

/// ROLL: pop n, then move item n to the top
pub fn roll(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let n = engine.stack_mut().pop_usize()?;
    if n == 0 {
        return Ok(());
    }
    move_to_top(engine, n)
}

pub fn reverse3(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().reverse(3)
}

pub fn reverse4(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().reverse(4)
}

/// REVERSEN: pop n, then reverse the top n items
pub fn reverse_n(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let n = stack.pop_usize()?;
    stack.reverse(n)
}

fn copy_to_top(engine: &mut Engine, index: usize) -> HandlerResult {
    let stack = engine.stack_mut();
    let value = stack.peek(index)?.clone();
    stack.push(value);
    Ok(())
}

fn move_to_top(engine: &mut Engine, index: usize) -> HandlerResult {
    let stack = engine.stack_mut();
    let value = stack.remove(index)?;
    stack.push(value);
    Ok(())
}
