use super::ValueError;
use crate::parser::limits::MAX_INTEGER_SIZE;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::hash::{Hash, Hasher};

/// An arbitrary-precision integer whose minimal encoding fits in 32 bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    value: BigInt,
    size: usize,
}

impl Integer {
    pub fn new(value: BigInt) -> Result<Self, ValueError> {
        let size = encoded_len(&value);
        if size > MAX_INTEGER_SIZE {
            return Err(ValueError::IntegerTooLarge { size });
        }
        Ok(Integer { value, size })
    }

    /// Decode little-endian two's complement, empty input is zero
    pub fn from_signed_bytes_le(bytes: &[u8]) -> Result<Self, ValueError> {
        if bytes.len() > MAX_INTEGER_SIZE {
            return Err(ValueError::IntegerTooLarge { size: bytes.len() });
        }
        Integer::new(BigInt::from_signed_bytes_le(bytes))
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn into_inner(self) -> BigInt {
        self.value
    }

    /// Length of the minimal encoding
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    /// Minimal little-endian two's complement encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.value.is_zero() {
            Vec::new()
        } else {
            self.value.to_signed_bytes_le()
        }
    }
}

fn encoded_len(value: &BigInt) -> usize {
    if value.is_zero() {
        0
    } else {
        value.to_signed_bytes_le().len()
    }
}

impl Hash for Integer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

macro_rules! from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(value: $t) -> Self {
                    let value = BigInt::from(value);
                    let size = encoded_len(&value);
                    Integer { value, size }
                }
            }
        )*
    };
}

from_primitive!(i8, i16, i32, i64, u8, u16, u32, u64, usize, bool);

impl TryFrom<BigInt> for Integer {
    type Error = ValueError;

    fn try_from(value: BigInt) -> Result<Self, Self::Error> {
        Integer::new(value)
    }
}
