//! Byte string splicing operations
//!
//! Operands are taken through their canonical memory, so integers and
//! booleans splice as their byte encodings. Results are byte strings bounded
//! by the engine's item size limit.

use super::*;

fn push_bytes(engine: &mut Engine, bytes: Vec<u8>) -> HandlerResult {
    engine.check_item_size(bytes.len())?;
    engine.stack_mut().push(Value::from_bytes(bytes));
    Ok(())
}

fn out_of_bounds(what: &str, requested: usize, len: usize) -> RuntimeError {
    RuntimeError::InvalidArgument(format!("{what} {requested} is out of bounds for {len} bytes"))
}

/// CAT
/// 1. Pop x2, then x1
/// 2. Push x1 followed by x2
pub fn cat(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let limit = engine.limits().max_item_size;
    let x2 = engine.stack_mut().pop_bytes(limit)?;
    let mut x1 = engine.stack_mut().pop_bytes(limit)?;
    engine.check_item_size(x1.len() + x2.len())?;
    x1.extend_from_slice(&x2);
    push_bytes(engine, x1)
}

/// SUBSTR
/// 1. Pop count, then index, then x
/// 2. Fail unless index + count lies within x
/// 3. Push `count` bytes of x starting at `index`
pub fn substr(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let limit = engine.limits().max_item_size;
    let stack = engine.stack_mut();
    let count = stack.pop_usize()?;
    let index = stack.pop_usize()?;
    let x = stack.pop_bytes(limit)?;
    let end = index
        .checked_add(count)
        .filter(|end| *end <= x.len())
        .ok_or_else(|| out_of_bounds("range end", index.saturating_add(count), x.len()))?;
    push_bytes(engine, x[index..end].to_vec())
}

/// LEFT: pop count, then x; push the first `count` bytes of x
pub fn left(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let limit = engine.limits().max_item_size;
    let stack = engine.stack_mut();
    let count = stack.pop_usize()?;
    let x = stack.pop_bytes(limit)?;
    if count > x.len() {
        return Err(out_of_bounds("count", count, x.len()));
    }
    push_bytes(engine, x[..count].to_vec())
}

/// RIGHT: pop count, then x; push the last `count` bytes of x
pub fn right(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let limit = engine.limits().max_item_size;
    let stack = engine.stack_mut();
    let count = stack.pop_usize()?;
    let x = stack.pop_bytes(limit)?;
    if count > x.len() {
        return Err(out_of_bounds("count", count, x.len()));
    }
    push_bytes(engine, x[x.len() - count..].to_vec())
}
