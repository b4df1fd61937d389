//! Bitwise logic operations
//!
//! Integer operands behave as infinitely sign-extended two's complement.

use super::*;
use num_bigint::BigInt;

fn binary(engine: &mut Engine, op: fn(BigInt, BigInt) -> BigInt) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop_integer()?;
    let x1 = stack.pop_integer()?;
    stack.push(Value::try_from_bigint(op(x1, x2))?);
    Ok(())
}

/// INVERT: pop x, push its bitwise complement
pub fn invert(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop_integer()?;
    stack.push(Value::try_from_bigint(!x)?);
    Ok(())
}

pub fn and(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| a & b)
}

pub fn or(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| a | b)
}

pub fn xor(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| a ^ b)
}

/// EQUAL: pop x2, then x1; push whether they are equal values of the same type
pub fn equal(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop()?;
    let x1 = stack.pop()?;
    stack.push(Value::from_bool(x1 == x2));
    Ok(())
}

pub fn not_equal(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop()?;
    let x1 = stack.pop()?;
    stack.push(Value::from_bool(x1 != x2));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::opcode::OpCode;
    use crate::runtime::test_utils::test::EngineTest;
    use crate::runtime::Value;
    use rstest::rstest;

    #[rstest]
    #[case(OpCode::And, 12, 10, 8)]
    #[case(OpCode::Or, 12, 10, 14)]
    #[case(OpCode::Xor, 12, 10, 6)]
    #[case(OpCode::And, -1, 255, 255)]
    #[case(OpCode::Or, -8, 3, -5)]
    fn binary_ops(#[case] opcode: OpCode, #[case] x1: i64, #[case] x2: i64, #[case] expected: i64) {
        EngineTest::new()
            .push_int(x1)
            .push_int(x2)
            .op(opcode)
            .expect_stack(vec![Value::from_int(expected)]);
    }

    #[rstest]
    #[case(0, -1)]
    #[case(5, -6)]
    #[case(-1, 0)]
    fn invert(#[case] x: i64, #[case] expected: i64) {
        EngineTest::new()
            .push_int(x)
            .op(OpCode::Invert)
            .expect_stack(vec![Value::from_int(expected)]);
    }

    #[test]
    fn equal_compares_type_and_value() {
        EngineTest::new()
            .push_int(1)
            .push_int(1)
            .op(OpCode::Equal)
            .push_int(1)
            .op(OpCode::PushT)
            .op(OpCode::Equal)
            .push_string("a")
            .push_string("a")
            .op(OpCode::NotEqual)
            .expect_stack(vec![
                Value::from_bool(true),
                Value::from_bool(false),
                Value::from_bool(false),
            ]);
    }

    #[test]
    fn equal_structs_compare_by_content() {
        EngineTest::new()
            .op(OpCode::Push1)
            .op(OpCode::Push1)
            .op(OpCode::PackStruct)
            .op(OpCode::Push1)
            .op(OpCode::Push1)
            .op(OpCode::PackStruct)
            .op(OpCode::Equal)
            .expect_stack(vec![Value::from_bool(true)]);
    }
}
