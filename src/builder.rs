//! Script assembly
//!
//! [`ScriptBuilder`] writes bytecode one instruction at a time and always
//! picks the most compact encoding: small integers use the single-byte
//! `PUSHM1`..`PUSH16` forms, other integers the narrowest `PUSHINT*` width,
//! byte strings the narrowest `PUSHDATA*` prefix, and calls and jumps their
//! 1-byte offset forms whenever the offset fits.
//!
//! ```
//! use stackvm::builder::ScriptBuilder;
//! use stackvm::parser::opcode::OpCode;
//!
//! let bytes = ScriptBuilder::new().push_int(1).push_int(2).emit(OpCode::Add).build();
//! assert_eq!(bytes, vec![0x11, 0x12, 0x9e]);
//! ```

use crate::parser::opcode::OpCode;
use crate::runtime::value::{Integer, Value};
use byteorder::{ByteOrder, LittleEndian};
use num_bigint::Sign;

/// Widths available to the `PUSHINT*` opcodes, narrowest first
const PUSH_INT_WIDTHS: [(usize, OpCode); 6] = [
    (1, OpCode::PushInt8),
    (2, OpCode::PushInt16),
    (4, OpCode::PushInt32),
    (8, OpCode::PushInt64),
    (16, OpCode::PushInt128),
    (32, OpCode::PushInt256),
];

/// Incrementally assembles a script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        ScriptBuilder::default()
    }

    /// Append an opcode with no operand
    pub fn emit(mut self, opcode: OpCode) -> Self {
        self.bytes.push(opcode.byte());
        self
    }

    /// Append an opcode followed by raw operand bytes
    pub fn emit_with(mut self, opcode: OpCode, operand: &[u8]) -> Self {
        self.bytes.push(opcode.byte());
        self.bytes.extend_from_slice(operand);
        self
    }

    pub fn push_int(self, value: i64) -> Self {
        self.push_integer(&Integer::from(value))
    }

    /// Push an integer using `PUSHM1`..`PUSH16` when it is in -1..=16, and
    /// otherwise the narrowest `PUSHINT*` form, sign-extended to its width
    pub fn push_integer(self, value: &Integer) -> Self {
        if let Some(opcode) = small_int(value) {
            return self.emit(opcode);
        }
        let mut bytes = value.value().to_signed_bytes_le();
        let (width, opcode) = PUSH_INT_WIDTHS
            .iter()
            .copied()
            .find(|(width, _)| bytes.len() <= *width)
            .unwrap_or((32, OpCode::PushInt256));
        let pad = if value.value().sign() == Sign::Minus { 0xff } else { 0x00 };
        bytes.resize(width, pad);
        self.emit_with(opcode, &bytes)
    }

    pub fn push_bool(self, value: bool) -> Self {
        self.emit(if value { OpCode::PushT } else { OpCode::PushF })
    }

    /// Push a byte string with the narrowest `PUSHDATA*` length prefix
    ///
    /// # Panics
    ///
    /// Panics if `data` is longer than `u32::MAX` bytes, which no length
    /// prefix can encode.
    pub fn push_bytes(self, data: &[u8]) -> Self {
        let Some((opcode, prefix)) = data_prefix(data.len()) else {
            panic!("{} bytes do not fit a PUSHDATA4 length prefix", data.len());
        };
        self.emit_with(opcode, &prefix).raw(data)
    }

    /// Push the UTF-8 encoding of `value`
    pub fn push_string(self, value: &str) -> Self {
        self.push_bytes(value.as_bytes())
    }

    pub fn push_null(self) -> Self {
        self.emit(OpCode::PushNull)
    }

    /// Push any value, building compound values element by element
    pub fn push_value(self, value: &Value) -> Self {
        match value {
            Value::Null => self.push_null(),
            Value::Boolean(b) => self.push_bool(*b),
            Value::Integer(i) => self.push_integer(i),
            Value::ByteString(b) => self.push_bytes(b.as_bytes()),
            Value::Array(a) => self.create_array(&a.items()),
            Value::Struct(s) => self.create_struct(&s.items()),
            Value::Map(m) => self.create_map(&m.entries()),
        }
    }

    /// Call the function at `offset` bytes from this instruction
    pub fn call(self, offset: i32) -> Self {
        match i8::try_from(offset) {
            Ok(short) => self.emit_with(OpCode::Call, &[short as u8]),
            Err(_) => self.emit_with(OpCode::CallL, &long_offset(offset)),
        }
    }

    /// Emit a jump to `offset` bytes from this instruction.
    ///
    /// `opcode` may be the short or the `_L` form of any `JMP*` opcode; the
    /// form actually written depends on whether `offset` fits in a byte.
    pub fn jump(self, opcode: OpCode, offset: i32) -> Self {
        let (short, long) = jump_forms(opcode);
        match i8::try_from(offset) {
            Ok(o) => self.emit_with(short, &[o as u8]),
            Err(_) => self.emit_with(long, &long_offset(offset)),
        }
    }

    /// Invoke the host API identified by `api`
    pub fn syscall(self, api: u32) -> Self {
        let mut operand = [0; 4];
        LittleEndian::write_u32(&mut operand, api);
        self.emit_with(OpCode::Syscall, &operand)
    }

    /// Build an array holding `items` in order
    pub fn create_array(self, items: &[Value]) -> Self {
        if items.is_empty() {
            return self.emit(OpCode::NewArray0);
        }
        self.push_reversed(items).emit(OpCode::Pack)
    }

    /// Build a struct holding `items` in order
    pub fn create_struct(self, items: &[Value]) -> Self {
        if items.is_empty() {
            return self.emit(OpCode::NewStruct0);
        }
        self.push_reversed(items).emit(OpCode::PackStruct)
    }

    /// Build a map by setting each entry in turn
    pub fn create_map(self, entries: &[(Value, Value)]) -> Self {
        entries.iter().fold(self.emit(OpCode::NewMap), |builder, (key, value)| {
            builder
                .emit(OpCode::Dup)
                .push_value(key)
                .push_value(value)
                .emit(OpCode::SetItem)
        })
    }

    /// Append bytes verbatim
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn push_reversed(self, items: &[Value]) -> Self {
        items
            .iter()
            .rev()
            .fold(self, |builder, item| builder.push_value(item))
            .push_int(items.len() as i64)
    }
}

fn small_int(value: &Integer) -> Option<OpCode> {
    let small = num_traits::ToPrimitive::to_i64(value.value())?;
    OpCode::for_small_int(small)
}

/// The narrowest `PUSHDATA*` opcode and length prefix for `len` bytes
fn data_prefix(len: usize) -> Option<(OpCode, Vec<u8>)> {
    if len < u8::MAX as usize {
        Some((OpCode::PushData1, vec![len as u8]))
    } else if len < u16::MAX as usize {
        let mut prefix = vec![0; 2];
        LittleEndian::write_u16(&mut prefix, len as u16);
        Some((OpCode::PushData2, prefix))
    } else {
        let len = u32::try_from(len).ok()?;
        let mut prefix = vec![0; 4];
        LittleEndian::write_u32(&mut prefix, len);
        Some((OpCode::PushData4, prefix))
    }
}

fn long_offset(offset: i32) -> [u8; 4] {
    let mut operand = [0; 4];
    LittleEndian::write_i32(&mut operand, offset);
    operand
}

/// Short and long forms of a jump opcode. Short forms sit on even offsets
/// from `JMP` with the long form immediately after.
fn jump_forms(opcode: OpCode) -> (OpCode, OpCode) {
    let byte = opcode.byte();
    if !(OpCode::Jmp.byte()..=OpCode::JmpLeL.byte()).contains(&byte) {
        return (OpCode::Jmp, OpCode::JmpL);
    }
    let short = byte - (byte - OpCode::Jmp.byte()) % 2;
    match (OpCode::from_u8(short), OpCode::from_u8(short + 1)) {
        (Some(short), Some(long)) => (short, long),
        _ => (OpCode::Jmp, OpCode::JmpL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::{Array, Map, Struct};
    use num_bigint::BigInt;
    use rstest::rstest;

    #[rstest]
    #[case(-1, vec![0x0f])]
    #[case(0, vec![0x10])]
    #[case(16, vec![0x20])]
    #[case(17, vec![0x00, 0x11])]
    #[case(-2, vec![0x00, 0xfe])]
    #[case(127, vec![0x00, 0x7f])]
    #[case(128, vec![0x01, 0x80, 0x00])]
    #[case(-129, vec![0x01, 0x7f, 0xff])]
    #[case(65536, vec![0x02, 0x00, 0x00, 0x01, 0x00])]
    #[case(-65536, vec![0x02, 0x00, 0x00, 0xff, 0xff])]
    #[case(i64::MAX, vec![0x03, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f])]
    fn push_int(#[case] value: i64, #[case] expected: Vec<u8>) {
        assert_eq!(ScriptBuilder::new().push_int(value).build(), expected);
    }

    #[test]
    fn push_wide_integers() {
        let value = Integer::new(BigInt::from(1) << 64).unwrap();
        let bytes = ScriptBuilder::new().push_integer(&value).build();
        assert_eq!(bytes[0], OpCode::PushInt128.byte());
        assert_eq!(bytes.len(), 17);

        let value = Integer::new(-(BigInt::from(1) << 200usize)).unwrap();
        let bytes = ScriptBuilder::new().push_integer(&value).build();
        assert_eq!(bytes[0], OpCode::PushInt256.byte());
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[32], 0xff);
    }

    #[rstest]
    #[case(0, vec![0x0c, 0x00])]
    #[case(3, vec![0x0c, 0x03])]
    #[case(254, vec![0x0c, 0xfe])]
    #[case(255, vec![0x0d, 0xff, 0x00])]
    #[case(65534, vec![0x0d, 0xfe, 0xff])]
    #[case(65535, vec![0x0e, 0xff, 0xff, 0x00, 0x00])]
    fn push_bytes_prefix(#[case] len: usize, #[case] prefix: Vec<u8>) {
        let data = vec![0xab; len];
        let bytes = ScriptBuilder::new().push_bytes(&data).build();
        assert_eq!(&bytes[..prefix.len()], prefix.as_slice());
        assert_eq!(&bytes[prefix.len()..], data.as_slice());
    }

    #[test]
    fn data_prefix_stops_at_u32_lengths() {
        assert_eq!(data_prefix(u32::MAX as usize), Some((OpCode::PushData4, vec![0xff; 4])));
        if let Ok(len) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert_eq!(data_prefix(len), None);
        }
    }

    #[test]
    fn push_string_is_utf8() {
        assert_eq!(
            ScriptBuilder::new().push_string("hé").build(),
            vec![0x0c, 0x03, b'h', 0xc3, 0xa9]
        );
    }

    #[rstest]
    #[case(0, vec![0x34, 0x00])]
    #[case(-128, vec![0x34, 0x80])]
    #[case(127, vec![0x34, 0x7f])]
    #[case(128, vec![0x35, 0x80, 0x00, 0x00, 0x00])]
    #[case(-129, vec![0x35, 0x7f, 0xff, 0xff, 0xff])]
    fn call(#[case] offset: i32, #[case] expected: Vec<u8>) {
        assert_eq!(ScriptBuilder::new().call(offset).build(), expected);
    }

    #[rstest]
    #[case(OpCode::Jmp, 5, vec![0x22, 0x05])]
    #[case(OpCode::JmpL, 5, vec![0x22, 0x05])]
    #[case(OpCode::JmpIfNot, -3, vec![0x26, 0xfd])]
    #[case(OpCode::JmpLe, 300, vec![0x33, 0x2c, 0x01, 0x00, 0x00])]
    fn jump(#[case] opcode: OpCode, #[case] offset: i32, #[case] expected: Vec<u8>) {
        assert_eq!(ScriptBuilder::new().jump(opcode, offset).build(), expected);
    }

    #[test]
    fn syscall() {
        assert_eq!(
            ScriptBuilder::new().syscall(0x12345678).build(),
            vec![0x41, 0x78, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn create_array_pushes_in_reverse() {
        let items = vec![Value::from_int(1), Value::from_int(2)];
        assert_eq!(
            ScriptBuilder::new().create_array(&items).build(),
            vec![0x12, 0x11, 0x12, OpCode::Pack.byte()]
        );
        assert_eq!(
            ScriptBuilder::new().create_array(&[]).build(),
            vec![OpCode::NewArray0.byte()]
        );
        assert_eq!(
            ScriptBuilder::new().create_struct(&[]).build(),
            vec![OpCode::NewStruct0.byte()]
        );
    }

    #[test]
    fn create_map() {
        let entries = vec![(Value::from_int(1), Value::from_bool(true))];
        assert_eq!(
            ScriptBuilder::new().create_map(&entries).build(),
            vec![
                OpCode::NewMap.byte(),
                OpCode::Dup.byte(),
                0x11,
                OpCode::PushT.byte(),
                OpCode::SetItem.byte()
            ]
        );
    }

    #[test]
    fn push_value_nests() {
        let map = Map::new();
        map.set(Value::from_string("k"), Value::Null).unwrap();
        let value = Value::from_array(Array::new(vec![
            Value::from_struct(Struct::new(vec![Value::from_int(0)])),
            Value::from_map(map),
        ]));
        let bytes = ScriptBuilder::new().push_value(&value).build();
        assert_eq!(bytes.last(), Some(&OpCode::Pack.byte()));
        assert!(bytes.contains(&OpCode::PackStruct.byte()));
        assert!(bytes.contains(&OpCode::NewMap.byte()));
    }

    #[test]
    fn len_tracks_bytes() {
        let builder = ScriptBuilder::new();
        assert!(builder.is_empty());
        let builder = builder.push_int(100).emit(OpCode::Nop);
        assert_eq!(builder.len(), 3);
    }
}
