use super::{StackItemType, ValueError};
use crate::parser::limits::MAX_INTEGER_SIZE;
use num_bigint::BigInt;
use std::rc::Rc;

/// Immutable byte sequence, cheap to clone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteString(Rc<[u8]>);

/// UTF-8 encoding of the string
impl From<&str> for ByteString {
    fn from(value: &str) -> Self {
        ByteString(Rc::from(value.as_bytes()))
    }
}

impl ByteString {
    pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
        ByteString(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any byte is non-zero
    pub fn get_boolean(&self) -> Result<bool, ValueError> {
        self.check_coercible(StackItemType::Boolean)?;
        Ok(self.0.iter().any(|b| *b != 0))
    }

    /// Little-endian two's complement interpretation
    pub fn get_integer(&self) -> Result<BigInt, ValueError> {
        self.check_coercible(StackItemType::Integer)?;
        Ok(BigInt::from_signed_bytes_le(&self.0))
    }

    fn check_coercible(&self, to: StackItemType) -> Result<(), ValueError> {
        if self.0.len() > MAX_INTEGER_SIZE {
            return Err(ValueError::InvalidCast {
                from: StackItemType::ByteString,
                to,
            });
        }
        Ok(())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        ByteString(bytes.into())
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        ByteString(bytes.into())
    }
}
