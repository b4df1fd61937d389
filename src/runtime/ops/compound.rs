//! Compound value operations: arrays, structs and maps
//!
//! Values stored into a container go through [`Value::value_copy`], so a
//! struct is copied on the way in while arrays and maps stay shared.

use super::*;
use crate::runtime::value::{Array, CompoundType, Map, StackItemType, Struct, ValueError};

fn expected(value: &Value, to: StackItemType) -> RuntimeError {
    ValueError::InvalidCast {
        from: value.item_type(),
        to,
    }
    .into()
}

fn pop_items(engine: &mut Engine) -> Result<Vec<Value>, RuntimeError> {
    let stack = engine.stack_mut();
    let count = stack.pop_usize()?;
    if count > stack.depth() {
        return Err(RuntimeError::StackUnderflow);
    }
    (0..count).map(|_| stack.pop()).collect()
}

/// Pop a count for a new container of null elements, bounded by the stack size
fn pop_new_count(engine: &mut Engine) -> Result<usize, RuntimeError> {
    let max = engine.limits().max_stack_size;
    let count = engine.stack_mut().pop_usize()?;
    if count > max {
        return Err(RuntimeError::InvalidArgument(format!(
            "{count} elements exceeds the maximum of {max}"
        )));
    }
    Ok(count)
}

/// PACKMAP
/// 1. Pop the entry count n
/// 2. Pop n pairs: key first, then value
/// 3. Push a map of the pairs in the order they were popped
pub fn pack_map(engine: &mut Engine, _: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let count = stack.pop_usize()?;
    if count.saturating_mul(2) > stack.depth() {
        return Err(RuntimeError::StackUnderflow);
    }
    let map = Map::new();
    for _ in 0..count {
        let key = stack.pop()?;
        let value = stack.pop()?;
        map.set(key, value)?;
    }
    stack.push(Value::from_map(map));
    diagnostics.note(|| format!("{count} entries"));
    Ok(())
}

/// PACKSTRUCT: like PACK, producing a struct
pub fn pack_struct(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let items = pop_items(engine)?;
    engine.stack_mut().push(Value::from_struct(Struct::new(items)));
    Ok(())
}

/// PACK
/// 1. Pop the element count n
/// 2. Pop n values; the first popped becomes element 0
/// 3. Push an array of them
pub fn pack(engine: &mut Engine, _: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let items = pop_items(engine)?;
    let count = items.len();
    engine.stack_mut().push(Value::from_array(Array::new(items)));
    diagnostics.note(|| format!("{count} elements"));
    Ok(())
}

/// UNPACK
/// 1. Pop a compound value
/// 2. Push its elements from last to first (for a map: value, then key)
/// 3. Push the element count
pub fn unpack(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let count = match &x {
        Value::Map(map) => {
            let entries = map.entries();
            for (key, value) in entries.iter().rev() {
                stack.push(value.clone());
                stack.push(key.clone());
            }
            entries.len()
        }
        Value::Array(_) | Value::Struct(_) => {
            let items = x.as_compound().map(|c| c.items()).unwrap_or_default();
            for item in items.iter().rev() {
                stack.push(item.clone());
            }
            items.len()
        }
        other => return Err(expected(other, StackItemType::Array)),
    };
    stack.push(Value::from_int(count as i64));
    Ok(())
}

pub fn new_array0(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::from_array(Array::new(Vec::new())));
    Ok(())
}

/// NEWARRAY: pop n, push an array of n nulls
pub fn new_array(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let count = pop_new_count(engine)?;
    engine.stack_mut().push(Value::from_array(Array::new(vec![Value::Null; count])));
    Ok(())
}

/// NEWARRAY_T
/// 1. Read the element type from the operand
/// 2. Pop n
/// 3. Push an array of n default values: false, 0, empty bytes, else null
pub fn new_array_t(engine: &mut Engine, instruction: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let tag = instruction.operand.read_u8()?;
    let item_type = StackItemType::from_u8(tag)
        .ok_or_else(|| RuntimeError::InvalidArgument(format!("undefined item type 0x{tag:02x}")))?;
    let count = pop_new_count(engine)?;
    let default = match item_type {
        StackItemType::Boolean => Value::from_bool(false),
        StackItemType::Integer => Value::from_int(0),
        StackItemType::ByteString => Value::from_bytes(Vec::new()),
        _ => Value::Null,
    };
    engine.stack_mut().push(Value::from_array(Array::new(vec![default; count])));
    Ok(())
}

pub fn new_struct0(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::from_struct(Struct::new(Vec::new())));
    Ok(())
}

pub fn new_struct(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let count = pop_new_count(engine)?;
    engine.stack_mut().push(Value::from_struct(Struct::new(vec![Value::Null; count])));
    Ok(())
}

pub fn new_map(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    engine.stack_mut().push(Value::from_map(Map::new()));
    Ok(())
}

/// SIZE: element count of a compound, byte length of a primitive
pub fn size(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let size = match &x {
        Value::Null => return Err(expected(&x, StackItemType::ByteString)),
        other => match other.as_compound() {
            Some(compound) => compound.count(),
            None => other.size()?,
        },
    };
    stack.push(Value::from_int(size as i64));
    Ok(())
}

/// HASKEY
/// 1. Pop key, then x
/// 2. For arrays, structs and byte strings push whether key is a valid index
/// 3. For maps push whether the key is present
pub fn has_key(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let key = stack.pop()?;
    let x = stack.pop()?;
    let found = match &x {
        Value::Map(map) => map.contains_key(&key)?,
        Value::Array(_) | Value::Struct(_) | Value::ByteString(_) => {
            let index = index_of(&key)?;
            let len = match x.as_compound() {
                Some(compound) => compound.count(),
                None => x.size()?,
            };
            index < len
        }
        other => return Err(expected(other, StackItemType::Array)),
    };
    stack.push(Value::from_bool(found));
    Ok(())
}

fn index_of(key: &Value) -> Result<usize, RuntimeError> {
    let index = key.get_integer()?;
    num_traits::ToPrimitive::to_usize(&index)
        .ok_or_else(|| RuntimeError::InvalidArgument(format!("{index} is not a valid count or index")))
}

/// KEYS: pop a map, push an array of its keys
pub fn keys(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let map = x.as_map().ok_or_else(|| expected(&x, StackItemType::Map))?;
    stack.push(Value::from_array(Array::new(map.keys())));
    Ok(())
}

/// VALUES: pop a compound, push an array of copies of its elements
pub fn values(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let compound = x.as_compound().ok_or_else(|| expected(&x, StackItemType::Array))?;
    let items = compound.items().iter().map(Value::value_copy).collect::<Result<_, _>>()?;
    stack.push(Value::from_array(Array::new(items)));
    Ok(())
}

/// PICKITEM
/// 1. Pop key, then x
/// 2. Push the element at index key of an array or struct, or the map entry
/// 3. For primitives push the byte at index key of their memory
pub fn pick_item(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let key = stack.pop()?;
    let x = stack.pop()?;
    let item = match &x {
        Value::Array(a) => a.get(index_of(&key)?)?,
        Value::Struct(s) => s.get(index_of(&key)?)?,
        Value::Map(m) => m.get(&key)?,
        Value::Null => return Err(expected(&x, StackItemType::Array)),
        primitive => {
            let index = index_of(&key)?;
            let memory = primitive.memory()?;
            let byte = memory.get(index).ok_or(ValueError::IndexOutOfRange {
                index,
                count: memory.len(),
            })?;
            Value::from_int(i64::from(*byte))
        }
    };
    stack.push(item);
    Ok(())
}

/// APPEND: pop item, then an array or struct; add a copy of item to it
pub fn append(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let item = stack.pop()?.value_copy()?;
    let x = stack.pop()?;
    match &x {
        Value::Array(a) => a.add(item)?,
        Value::Struct(s) => s.add(item)?,
        other => return Err(expected(other, StackItemType::Array)),
    }
    Ok(())
}

/// SETITEM
/// 1. Pop value, key, then x
/// 2. Store a copy of value at index key of an array or struct, or under key
///    in a map
pub fn set_item(engine: &mut Engine, _: &Instruction, diagnostics: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let value = stack.pop()?.value_copy()?;
    let key = stack.pop()?;
    let x = stack.pop()?;
    match &x {
        Value::Array(a) => a.set(index_of(&key)?, value)?,
        Value::Struct(s) => s.set(index_of(&key)?, value)?,
        Value::Map(m) => m.set(key.clone(), value)?,
        other => return Err(expected(other, StackItemType::Array)),
    }
    diagnostics.note(|| format!("{} [{key}]", x.item_type()));
    Ok(())
}

pub fn reverse_items(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let x = engine.stack_mut().pop()?;
    match &x {
        Value::Array(a) => a.reverse()?,
        Value::Struct(s) => s.reverse()?,
        other => return Err(expected(other, StackItemType::Array)),
    }
    Ok(())
}

/// REMOVE
/// 1. Pop key, then x
/// 2. Remove the element at index key of an array or struct, or the map
///    entry for key; a missing map key is ignored
pub fn remove(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let key = stack.pop()?;
    let x = stack.pop()?;
    match &x {
        Value::Array(a) => {
            a.remove(index_of(&key)?)?;
        }
        Value::Struct(s) => {
            s.remove(index_of(&key)?)?;
        }
        Value::Map(m) => {
            m.remove(&key)?;
        }
        other => return Err(expected(other, StackItemType::Array)),
    }
    Ok(())
}

pub fn clear_items(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let x = engine.stack_mut().pop()?;
    let compound = x.as_compound().ok_or_else(|| expected(&x, StackItemType::Array))?;
    compound.clear()?;
    Ok(())
}

/// POPITEM: pop an array or struct, remove its last element and push it
pub fn pop_item(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop()?;
    let item = match &x {
        Value::Array(a) => a.pop()?,
        Value::Struct(s) => s.pop()?,
        other => return Err(expected(other, StackItemType::Array)),
    };
    stack.push(item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::opcode::OpCode;
    use crate::runtime::test_utils::test::EngineTest;
    use crate::runtime::value::{Array, Map, StackItemType, Struct, ValueError};
    use crate::runtime::{RuntimeError, Value};
    use rstest::rstest;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::from_int).collect()
    }

    fn array(values: &[i64]) -> Value {
        Value::from_array(Array::new(ints(values)))
    }

    #[test]
    fn pack_first_popped_is_element_zero() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .push_int(3)
            .push_int(3)
            .op(OpCode::Pack)
            .expect_stack(vec![array(&[3, 2, 1])]);
    }

    #[test]
    fn pack_struct() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .push_int(2)
            .op(OpCode::PackStruct)
            .expect_stack(vec![Value::from_struct(Struct::new(ints(&[2, 1])))]);
    }

    #[test]
    fn pack_more_than_the_stack_holds() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .op(OpCode::Pack)
            .expect_fault(RuntimeError::StackUnderflow);
    }

    #[test]
    fn pack_map_pops_key_then_value() {
        let expected = Map::new();
        expected.set(Value::from_int(1), Value::from_string("a")).unwrap();
        EngineTest::new()
            .push_string("a")
            .push_int(1)
            .push_int(1)
            .op(OpCode::PackMap)
            .expect_stack(vec![Value::from_map(expected)]);
    }

    #[test]
    fn unpack_array() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .push_int(2)
            .op(OpCode::Pack)
            .op(OpCode::Unpack)
            .expect_stack(ints(&[1, 2, 2]));
    }

    #[test]
    fn unpack_map_pushes_value_then_key() {
        EngineTest::new()
            .push_int(10)
            .push_int(1)
            .push_int(1)
            .op(OpCode::PackMap)
            .op(OpCode::Unpack)
            .expect_stack(ints(&[10, 1, 1]));
    }

    #[test]
    fn new_containers() {
        EngineTest::new()
            .op(OpCode::NewArray0)
            .push_int(2)
            .op(OpCode::NewArray)
            .op(OpCode::NewStruct0)
            .push_int(1)
            .op(OpCode::NewStruct)
            .op(OpCode::NewMap)
            .expect_stack(vec![
                Value::from_array(Array::new(Vec::new())),
                Value::from_array(Array::new(vec![Value::Null, Value::Null])),
                Value::from_struct(Struct::new(Vec::new())),
                Value::from_struct(Struct::new(vec![Value::Null])),
                Value::from_map(Map::new()),
            ]);
    }

    #[rstest]
    #[case(StackItemType::Boolean, Value::from_bool(false))]
    #[case(StackItemType::Integer, Value::from_int(0))]
    #[case(StackItemType::ByteString, Value::from_bytes(Vec::new()))]
    #[case(StackItemType::Array, Value::Null)]
    fn new_array_t_defaults(#[case] item_type: StackItemType, #[case] default: Value) {
        EngineTest::new()
            .push_int(2)
            .op_with(OpCode::NewArrayT, &[item_type as u8])
            .expect_stack(vec![Value::from_array(Array::new(vec![default.clone(), default]))]);
    }

    #[test]
    fn new_array_t_rejects_undefined_type() {
        EngineTest::new()
            .push_int(1)
            .op_with(OpCode::NewArrayT, &[0x99])
            .expect_error("undefined item type 0x99");
    }

    #[test]
    fn new_array_bounded_by_stack_size() {
        EngineTest::new()
            .push_int(2049)
            .op(OpCode::NewArray)
            .expect_error("exceeds the maximum of 2048");
    }

    #[test]
    fn size() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .push_int(2)
            .op(OpCode::Pack)
            .op(OpCode::Size)
            .push_string("hello")
            .op(OpCode::Size)
            .push_int(256)
            .op(OpCode::Size)
            .expect_stack(ints(&[2, 5, 2]));
        EngineTest::new()
            .op(OpCode::PushNull)
            .op(OpCode::Size)
            .expect_error("Invalid cast from Any");
    }

    #[test]
    fn has_key() {
        EngineTest::new()
            .push_int(7)
            .push_int(1)
            .op(OpCode::Pack)
            .op(OpCode::Dup)
            .push_int(0)
            .op(OpCode::HasKey)
            .op(OpCode::Swap)
            .push_int(1)
            .op(OpCode::HasKey)
            .push_string("ab")
            .push_int(1)
            .op(OpCode::HasKey)
            .expect_stack(vec![
                Value::from_bool(true),
                Value::from_bool(false),
                Value::from_bool(true),
            ]);
    }

    #[test]
    fn new_map_and_set_item() {
        let expected = Map::new();
        expected.set(Value::from_string("k"), Value::from_int(5)).unwrap();
        EngineTest::new()
            .op(OpCode::NewMap)
            .op(OpCode::Dup)
            .push_string("k")
            .push_int(5)
            .op(OpCode::SetItem)
            .op(OpCode::Dup)
            .push_string("k")
            .op(OpCode::HasKey)
            .op(OpCode::Swap)
            .op(OpCode::Dup)
            .push_string("k")
            .op(OpCode::PickItem)
            .expect_stack(vec![
                Value::from_bool(true),
                Value::from_map(expected),
                Value::from_int(5),
            ]);
    }

    #[test]
    fn keys_and_values() {
        EngineTest::new()
            .push_int(20)
            .push_int(2)
            .push_int(10)
            .push_int(1)
            .push_int(2)
            .op(OpCode::PackMap)
            .op(OpCode::Dup)
            .op(OpCode::Keys)
            .op(OpCode::Swap)
            .op(OpCode::Values)
            .expect_stack(vec![array(&[1, 2]), array(&[10, 20])]);
    }

    #[test]
    fn keys_requires_map() {
        EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::Keys)
            .expect_fault(RuntimeError::Value(ValueError::InvalidCast {
                from: StackItemType::Array,
                to: StackItemType::Map,
            }));
    }

    #[test]
    fn pick_item() {
        EngineTest::new()
            .push_int(5)
            .push_int(6)
            .push_int(2)
            .op(OpCode::Pack)
            .push_int(1)
            .op(OpCode::PickItem)
            .push_bytes(&[0x0a, 0x0b])
            .push_int(1)
            .op(OpCode::PickItem)
            .expect_stack(ints(&[5, 11]));
    }

    #[rstest]
    #[case(2)]
    #[case(-1)]
    fn pick_item_out_of_range(#[case] index: i64) {
        EngineTest::new()
            .push_int(5)
            .push_int(1)
            .op(OpCode::Pack)
            .push_int(index)
            .op(OpCode::PickItem)
            .expect_any_fault();
    }

    #[test]
    fn pick_item_missing_key() {
        EngineTest::new()
            .op(OpCode::NewMap)
            .push_int(1)
            .op(OpCode::PickItem)
            .expect_fault(RuntimeError::Value(ValueError::KeyNotFound));
    }

    #[test]
    fn append_and_pop_item() {
        EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::Dup)
            .push_int(1)
            .op(OpCode::Append)
            .op(OpCode::Dup)
            .push_int(2)
            .op(OpCode::Append)
            .op(OpCode::Dup)
            .op(OpCode::PopItem)
            .expect_stack(vec![array(&[1]), Value::from_int(2)]);
    }

    #[test]
    fn pop_item_on_empty_array_faults() {
        EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::PopItem)
            .expect_any_fault();
    }

    #[test]
    fn append_copies_structs() {
        // the struct is appended, then mutated; the stored copy is unchanged
        let engine = EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::NewStruct0)
            .op(OpCode::Over)
            .op(OpCode::Over)
            .op(OpCode::Append)
            .op(OpCode::Dup)
            .push_int(9)
            .op(OpCode::Append)
            .run();
        let values = engine.stack().values();
        let outer = values[0].as_array().unwrap();
        assert_eq!(outer.get(0).unwrap().as_struct().unwrap().count(), 0);
        assert_eq!(values[1].as_struct().unwrap().count(), 1);
    }

    #[test]
    fn append_shares_arrays() {
        let engine = EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::NewArray0)
            .op(OpCode::Over)
            .op(OpCode::Over)
            .op(OpCode::Append)
            .run();
        let values = engine.stack().values();
        let outer = values[0].as_array().unwrap();
        assert!(outer.get(0).unwrap().same_storage(&values[1]));
    }

    #[test]
    fn append_to_itself_faults() {
        EngineTest::new()
            .op(OpCode::NewArray0)
            .op(OpCode::Dup)
            .op(OpCode::Append)
            .expect_fault(RuntimeError::Value(ValueError::SelfReference(StackItemType::Array)));
    }

    #[test]
    fn set_item_in_array() {
        EngineTest::new()
            .push_int(1)
            .push_int(2)
            .push_int(2)
            .op(OpCode::Pack)
            .op(OpCode::Dup)
            .push_int(0)
            .push_int(9)
            .op(OpCode::SetItem)
            .expect_stack(vec![array(&[9, 1])]);
    }

    #[test]
    fn reverse_remove_clear() {
        EngineTest::new()
            .push_int(3)
            .push_int(2)
            .push_int(1)
            .push_int(3)
            .op(OpCode::Pack)
            .op(OpCode::Dup)
            .op(OpCode::ReverseItems)
            .op(OpCode::Dup)
            .push_int(0)
            .op(OpCode::Remove)
            .op(OpCode::Dup)
            .op(OpCode::Size)
            .op(OpCode::Swap)
            .op(OpCode::Dup)
            .op(OpCode::ClearItems)
            .expect_stack(vec![Value::from_int(2), array(&[])]);
    }

    #[test]
    fn remove_missing_map_key_is_ignored() {
        EngineTest::new()
            .op(OpCode::NewMap)
            .op(OpCode::Dup)
            .push_int(1)
            .op(OpCode::Remove)
            .expect_stack(vec![Value::from_map(Map::new())]);
    }

    #[test]
    fn compound_map_keys_are_rejected() {
        EngineTest::new()
            .op(OpCode::NewMap)
            .op(OpCode::NewArray0)
            .push_int(1)
            .op(OpCode::SetItem)
            .expect_fault(RuntimeError::Value(ValueError::InvalidKeyType(StackItemType::Array)));
    }
}
