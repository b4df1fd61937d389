//! Arithmetic operations
//!
//! All arithmetic is arbitrary precision; a result whose minimal encoding
//! exceeds 32 bytes faults instead of wrapping. Division truncates toward
//! zero and the remainder takes the sign of the dividend.

use super::*;
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

fn push_int(engine: &mut Engine, value: BigInt) -> HandlerResult {
    engine.stack_mut().push(Value::try_from_bigint(value)?);
    Ok(())
}

fn unary(engine: &mut Engine, op: fn(BigInt) -> BigInt) -> HandlerResult {
    let x = engine.stack_mut().pop_integer()?;
    push_int(engine, op(x))
}

fn binary(engine: &mut Engine, op: fn(BigInt, BigInt) -> Result<BigInt, RuntimeError>) -> HandlerResult {
    let x2 = engine.stack_mut().pop_integer()?;
    let x1 = engine.stack_mut().pop_integer()?;
    push_int(engine, op(x1, x2)?)
}

fn compare(engine: &mut Engine, op: fn(&BigInt, &BigInt) -> bool) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop()?;
    let x1 = stack.pop()?;
    let result = if x1.is_null() || x2.is_null() {
        false
    } else {
        op(&x1.get_integer()?, &x2.get_integer()?)
    };
    stack.push(Value::from_bool(result));
    Ok(())
}

fn non_zero(divisor: &BigInt) -> Result<(), RuntimeError> {
    if divisor.is_zero() {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(())
}

/// Pop an exponent or shift amount in `0..=max_shift`
fn pop_shift(engine: &mut Engine) -> Result<u32, RuntimeError> {
    let max = engine.limits().max_shift;
    let shift = engine.stack_mut().pop_integer()?;
    shift
        .to_u32()
        .filter(|s| *s <= max)
        .ok_or_else(|| RuntimeError::InvalidArgument(format!("{shift} is outside the range 0..={max}")))
}

/// SIGN: push -1, 0 or 1
pub fn sign(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    unary(engine, |x| x.signum())
}

pub fn abs(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    unary(engine, |x| x.abs())
}

pub fn negate(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    unary(engine, |x| -x)
}

pub fn inc(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    unary(engine, |x| x + 1)
}

pub fn dec(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    unary(engine, |x| x - 1)
}

/// ADD
/// 1. Pop x2, then x1
/// 2. Push x1 + x2, failing if the result exceeds 32 bytes
pub fn add(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| Ok(a + b))
}

pub fn sub(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| Ok(a - b))
}

pub fn mul(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| Ok(a * b))
}

/// DIV
/// 1. Pop x2, then x1
/// 2. Fail if x2 is zero
/// 3. Push x1 / x2, truncated toward zero
pub fn div(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| {
        non_zero(&b)?;
        Ok(a / b)
    })
}

/// MOD: remainder of truncated division, with the sign of x1
pub fn modulo(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| {
        non_zero(&b)?;
        Ok(a % b)
    })
}

/// POW: pop exponent, then value; the exponent must be in `0..=max_shift`
pub fn pow(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let exponent = pop_shift(engine)?;
    let value = engine.stack_mut().pop_integer()?;
    push_int(engine, value.pow(exponent))
}

/// SQRT: integer square root, failing for negative values
pub fn sqrt(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let x = engine.stack_mut().pop_integer()?;
    if x.is_negative() {
        return Err(RuntimeError::InvalidArgument(format!("square root of {x}")));
    }
    push_int(engine, x.sqrt())
}

/// MODMUL: pop modulus, x2, x1; push (x1 * x2) % modulus
pub fn mod_mul(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let modulus = stack.pop_integer()?;
    let x2 = stack.pop_integer()?;
    let x1 = stack.pop_integer()?;
    non_zero(&modulus)?;
    push_int(engine, (x1 * x2) % modulus)
}

/// MODPOW
/// 1. Pop modulus, exponent, then value
/// 2. An exponent of -1 computes the modular inverse of value
/// 3. Otherwise push value^exponent % modulus, with the sign of value^exponent
pub fn mod_pow(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let modulus = stack.pop_integer()?;
    let exponent = stack.pop_integer()?;
    let value = stack.pop_integer()?;

    let result = if exponent == -BigInt::one() {
        mod_inverse(&value, &modulus)?
    } else {
        if exponent.is_negative() {
            return Err(RuntimeError::InvalidArgument(format!("negative exponent {exponent}")));
        }
        non_zero(&modulus)?;
        let magnitude = value.magnitude().modpow(exponent.magnitude(), modulus.magnitude());
        let negative = value.is_negative() && exponent.bit(0);
        BigInt::from_biguint(if negative { Sign::Minus } else { Sign::Plus }, magnitude)
    };
    push_int(engine, result)
}

fn mod_inverse(value: &BigInt, modulus: &BigInt) -> Result<BigInt, RuntimeError> {
    if !value.is_positive() || *modulus < BigInt::from(2) {
        return Err(RuntimeError::InvalidArgument(format!(
            "no modular inverse of {value} modulo {modulus}"
        )));
    }
    let (mut r0, mut r1) = (modulus.clone(), value % modulus);
    let (mut t0, mut t1) = (BigInt::zero(), BigInt::one());
    while !r1.is_zero() {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        r0 = std::mem::replace(&mut r1, r2);
        let t2 = &t0 - &q * &t1;
        t0 = std::mem::replace(&mut t1, t2);
    }
    if !r0.is_one() {
        return Err(RuntimeError::InvalidArgument(format!(
            "{value} has no inverse modulo {modulus}"
        )));
    }
    if t0.is_negative() {
        t0 += modulus;
    }
    Ok(t0)
}

/// SHL: pop shift, then x; push x << shift
pub fn shl(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let shift = pop_shift(engine)?;
    let x = engine.stack_mut().pop_integer()?;
    push_int(engine, x << shift)
}

/// SHR: pop shift, then x; push x >> shift, rounding toward negative infinity
pub fn shr(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let shift = pop_shift(engine)?;
    let x = engine.stack_mut().pop_integer()?;
    push_int(engine, x >> shift)
}

/// NOT: pop a boolean and push its negation
pub fn not(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop_bool()?;
    stack.push(Value::from_bool(!x));
    Ok(())
}

pub fn bool_and(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop_bool()?;
    let x1 = stack.pop_bool()?;
    stack.push(Value::from_bool(x1 && x2));
    Ok(())
}

pub fn bool_or(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop_bool()?;
    let x1 = stack.pop_bool()?;
    stack.push(Value::from_bool(x1 || x2));
    Ok(())
}

/// NZ: push whether x is non-zero
pub fn nz(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x = stack.pop_integer()?;
    stack.push(Value::from_bool(!x.is_zero()));
    Ok(())
}

pub fn num_equal(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop_integer()?;
    let x1 = stack.pop_integer()?;
    stack.push(Value::from_bool(x1 == x2));
    Ok(())
}

pub fn num_not_equal(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let x2 = stack.pop_integer()?;
    let x1 = stack.pop_integer()?;
    stack.push(Value::from_bool(x1 != x2));
    Ok(())
}

/// LT: pop x2, then x1; push x1 < x2, false when either is null
pub fn lt(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    compare(engine, |a, b| a < b)
}

pub fn le(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    compare(engine, |a, b| a <= b)
}

pub fn gt(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    compare(engine, |a, b| a > b)
}

pub fn ge(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    compare(engine, |a, b| a >= b)
}

pub fn min(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| Ok(a.min(b)))
}

pub fn max(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    binary(engine, |a, b| Ok(a.max(b)))
}

/// WITHIN: pop b, a, then x; push a <= x < b
pub fn within(engine: &mut Engine, _: &Instruction, _: &mut Diagnostics) -> HandlerResult {
    let stack = engine.stack_mut();
    let b = stack.pop_integer()?;
    let a = stack.pop_integer()?;
    let x = stack.pop_integer()?;
    stack.push(Value::from_bool(a <= x && x < b));
    Ok(())
}
