//! Opcode definitions and the static operand metadata table
//!
//! Every opcode is declared exactly once in the `opcodes!` invocation below,
//! together with its byte value, mnemonic and operand shape. The macro
//! generates the [`OpCode`] enum, the byte lookup, and the [`OPERAND_TABLE`]
//! used by the decoder. Declaring the same byte twice is a compile error
//! (duplicate enum discriminant).

use std::fmt;

/// Shape of the operand that follows an opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// A fixed number of operand bytes (zero for opcodes without an operand)
    Fixed(usize),
    /// A little-endian length prefix of 1, 2 or 4 bytes, followed by that many payload bytes
    Prefixed(usize),
}

impl OperandShape {
    /// Width of the length prefix, 0 for fixed operands
    pub const fn prefix_width(self) -> usize {
        match self {
            OperandShape::Fixed(_) => 0,
            OperandShape::Prefixed(width) => width,
        }
    }
}

macro_rules! opcodes {
    ($( $(#[$meta:meta])* $name:ident = $byte:literal, $mnemonic:literal, $shape:ident($n:literal); )*) => {
        /// One-byte instruction tag
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum OpCode {
            $( $(#[$meta])* $name = $byte, )*
        }

        impl OpCode {
            /// Every defined opcode, in byte order
            pub const ALL: &'static [OpCode] = &[ $( OpCode::$name, )* ];

            /// Look up the opcode for a byte, `None` if the byte is not a defined opcode
            pub const fn from_u8(byte: u8) -> Option<OpCode> {
                match byte {
                    $( $byte => Some(OpCode::$name), )*
                    _ => None,
                }
            }

            /// Assembly mnemonic, e.g. `PUSHDATA1`
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( OpCode::$name => $mnemonic, )*
                }
            }

            /// Declared operand shape
            pub const fn operand_shape(self) -> OperandShape {
                match self {
                    $( OpCode::$name => OperandShape::$shape($n), )*
                }
            }
        }
    };
}

opcodes! {
    // ------------------------------------------------------------------
    // Constants
    /// Push a 1-byte signed integer
    PushInt8 = 0x00, "PUSHINT8", Fixed(1);
    PushInt16 = 0x01, "PUSHINT16", Fixed(2);
    PushInt32 = 0x02, "PUSHINT32", Fixed(4);
    PushInt64 = 0x03, "PUSHINT64", Fixed(8);
    PushInt128 = 0x04, "PUSHINT128", Fixed(16);
    /// Push a 32-byte signed integer, the widest integer form
    PushInt256 = 0x05, "PUSHINT256", Fixed(32);
    PushT = 0x08, "PUSHT", Fixed(0);
    PushF = 0x09, "PUSHF", Fixed(0);
    /// Push a code pointer (relative 4-byte offset)
    PushA = 0x0A, "PUSHA", Fixed(4);
    PushNull = 0x0B, "PUSHNULL", Fixed(0);
    /// Push a byte string whose length is given by a 1-byte prefix
    PushData1 = 0x0C, "PUSHDATA1", Prefixed(1);
    PushData2 = 0x0D, "PUSHDATA2", Prefixed(2);
    PushData4 = 0x0E, "PUSHDATA4", Prefixed(4);
    PushM1 = 0x0F, "PUSHM1", Fixed(0);
    Push0 = 0x10, "PUSH0", Fixed(0);
    Push1 = 0x11, "PUSH1", Fixed(0);
    Push2 = 0x12, "PUSH2", Fixed(0);
    Push3 = 0x13, "PUSH3", Fixed(0);
    Push4 = 0x14, "PUSH4", Fixed(0);
    Push5 = 0x15, "PUSH5", Fixed(0);
    Push6 = 0x16, "PUSH6", Fixed(0);
    Push7 = 0x17, "PUSH7", Fixed(0);
    Push8 = 0x18, "PUSH8", Fixed(0);
    Push9 = 0x19, "PUSH9", Fixed(0);
    Push10 = 0x1A, "PUSH10", Fixed(0);
    Push11 = 0x1B, "PUSH11", Fixed(0);
    Push12 = 0x1C, "PUSH12", Fixed(0);
    Push13 = 0x1D, "PUSH13", Fixed(0);
    Push14 = 0x1E, "PUSH14", Fixed(0);
    Push15 = 0x1F, "PUSH15", Fixed(0);
    Push16 = 0x20, "PUSH16", Fixed(0);

    // ------------------------------------------------------------------
    // Flow control
    Nop = 0x21, "NOP", Fixed(0);
    Jmp = 0x22, "JMP", Fixed(1);
    JmpL = 0x23, "JMP_L", Fixed(4);
    JmpIf = 0x24, "JMPIF", Fixed(1);
    JmpIfL = 0x25, "JMPIF_L", Fixed(4);
    JmpIfNot = 0x26, "JMPIFNOT", Fixed(1);
    JmpIfNotL = 0x27, "JMPIFNOT_L", Fixed(4);
    JmpEq = 0x28, "JMPEQ", Fixed(1);
    JmpEqL = 0x29, "JMPEQ_L", Fixed(4);
    JmpNe = 0x2A, "JMPNE", Fixed(1);
    JmpNeL = 0x2B, "JMPNE_L", Fixed(4);
    JmpGt = 0x2C, "JMPGT", Fixed(1);
    JmpGtL = 0x2D, "JMPGT_L", Fixed(4);
    JmpGe = 0x2E, "JMPGE", Fixed(1);
    JmpGeL = 0x2F, "JMPGE_L", Fixed(4);
    JmpLt = 0x30, "JMPLT", Fixed(1);
    JmpLtL = 0x31, "JMPLT_L", Fixed(4);
    JmpLe = 0x32, "JMPLE", Fixed(1);
    JmpLeL = 0x33, "JMPLE_L", Fixed(4);
    /// Call the function at a 1-byte signed offset
    Call = 0x34, "CALL", Fixed(1);
    /// Call the function at a 4-byte signed offset
    CallL = 0x35, "CALL_L", Fixed(4);
    CallA = 0x36, "CALLA", Fixed(0);
    CallT = 0x37, "CALLT", Fixed(2);
    Abort = 0x38, "ABORT", Fixed(0);
    Assert = 0x39, "ASSERT", Fixed(0);
    Throw = 0x3A, "THROW", Fixed(0);
    Try = 0x3B, "TRY", Fixed(2);
    TryL = 0x3C, "TRY_L", Fixed(8);
    EndTry = 0x3D, "ENDTRY", Fixed(1);
    EndTryL = 0x3E, "ENDTRY_L", Fixed(4);
    EndFinally = 0x3F, "ENDFINALLY", Fixed(0);
    Ret = 0x40, "RET", Fixed(0);
    /// Invoke a host API identified by a 4-byte little-endian number
    Syscall = 0x41, "SYSCALL", Fixed(4);

    // ------------------------------------------------------------------
    // Stack
    Depth = 0x43, "DEPTH", Fixed(0);
    Drop = 0x45, "DROP", Fixed(0);
    Nip = 0x46, "NIP", Fixed(0);
    XDrop = 0x48, "XDROP", Fixed(0);
    Clear = 0x49, "CLEAR", Fixed(0);
    Dup = 0x4A, "DUP", Fixed(0);
    Over = 0x4B, "OVER", Fixed(0);
    Pick = 0x4D, "PICK", Fixed(0);
    Tuck = 0x4E, "TUCK", Fixed(0);
    Swap = 0x50, "SWAP", Fixed(0);
    Rot = 0x51, "ROT", Fixed(0);
    Roll = 0x52, "ROLL", Fixed(0);
    Reverse3 = 0x53, "REVERSE3", Fixed(0);
    Reverse4 = 0x54, "REVERSE4", Fixed(0);
    ReverseN = 0x55, "REVERSEN", Fixed(0);

    // ------------------------------------------------------------------
    // Slots
    /// Initialise the static field slot with a 1-byte count
    InitSSlot = 0x56, "INITSSLOT", Fixed(1);
    /// Initialise local (first byte) and argument (second byte) slots
    InitSlot = 0x57, "INITSLOT", Fixed(2);
    LdSFld0 = 0x58, "LDSFLD0", Fixed(0);
    LdSFld1 = 0x59, "LDSFLD1", Fixed(0);
    LdSFld2 = 0x5A, "LDSFLD2", Fixed(0);
    LdSFld3 = 0x5B, "LDSFLD3", Fixed(0);
    LdSFld4 = 0x5C, "LDSFLD4", Fixed(0);
    LdSFld5 = 0x5D, "LDSFLD5", Fixed(0);
    LdSFld6 = 0x5E, "LDSFLD6", Fixed(0);
    LdSFld = 0x5F, "LDSFLD", Fixed(1);
    StSFld0 = 0x60, "STSFLD0", Fixed(0);
    StSFld1 = 0x61, "STSFLD1", Fixed(0);
    StSFld2 = 0x62, "STSFLD2", Fixed(0);
    StSFld3 = 0x63, "STSFLD3", Fixed(0);
    StSFld4 = 0x64, "STSFLD4", Fixed(0);
    StSFld5 = 0x65, "STSFLD5", Fixed(0);
    StSFld6 = 0x66, "STSFLD6", Fixed(0);
    StSFld = 0x67, "STSFLD", Fixed(1);
    LdLoc0 = 0x68, "LDLOC0", Fixed(0);
    LdLoc1 = 0x69, "LDLOC1", Fixed(0);
    LdLoc2 = 0x6A, "LDLOC2", Fixed(0);
    LdLoc3 = 0x6B, "LDLOC3", Fixed(0);
    LdLoc4 = 0x6C, "LDLOC4", Fixed(0);
    LdLoc5 = 0x6D, "LDLOC5", Fixed(0);
    LdLoc6 = 0x6E, "LDLOC6", Fixed(0);
    LdLoc = 0x6F, "LDLOC", Fixed(1);
    StLoc0 = 0x70, "STLOC0", Fixed(0);
    StLoc1 = 0x71, "STLOC1", Fixed(0);
    StLoc2 = 0x72, "STLOC2", Fixed(0);
    StLoc3 = 0x73, "STLOC3", Fixed(0);
    StLoc4 = 0x74, "STLOC4", Fixed(0);
    StLoc5 = 0x75, "STLOC5", Fixed(0);
    StLoc6 = 0x76, "STLOC6", Fixed(0);
    StLoc = 0x77, "STLOC", Fixed(1);
    LdArg0 = 0x78, "LDARG0", Fixed(0);
    LdArg1 = 0x79, "LDARG1", Fixed(0);
    LdArg2 = 0x7A, "LDARG2", Fixed(0);
    LdArg3 = 0x7B, "LDARG3", Fixed(0);
    LdArg4 = 0x7C, "LDARG4", Fixed(0);
    LdArg5 = 0x7D, "LDARG5", Fixed(0);
    LdArg6 = 0x7E, "LDARG6", Fixed(0);
    LdArg = 0x7F, "LDARG", Fixed(1);
    StArg0 = 0x80, "STARG0", Fixed(0);
    StArg1 = 0x81, "STARG1", Fixed(0);
    StArg2 = 0x82, "STARG2", Fixed(0);
    StArg3 = 0x83, "STARG3", Fixed(0);
    StArg4 = 0x84, "STARG4", Fixed(0);
    StArg5 = 0x85, "STARG5", Fixed(0);
    StArg6 = 0x86, "STARG6", Fixed(0);
    StArg = 0x87, "STARG", Fixed(1);

    // ------------------------------------------------------------------
    // Splice
    Cat = 0x8B, "CAT", Fixed(0);
    Substr = 0x8C, "SUBSTR", Fixed(0);
    Left = 0x8D, "LEFT", Fixed(0);
    Right = 0x8E, "RIGHT", Fixed(0);

    // ------------------------------------------------------------------
    // Bitwise logic
    Invert = 0x90, "INVERT", Fixed(0);
    And = 0x91, "AND", Fixed(0);
    Or = 0x92, "OR", Fixed(0);
    Xor = 0x93, "XOR", Fixed(0);
    Equal = 0x97, "EQUAL", Fixed(0);
    NotEqual = 0x98, "NOTEQUAL", Fixed(0);

    // ------------------------------------------------------------------
    // Arithmetic
    Sign = 0x99, "SIGN", Fixed(0);
    Abs = 0x9A, "ABS", Fixed(0);
    Negate = 0x9B, "NEGATE", Fixed(0);
    Inc = 0x9C, "INC", Fixed(0);
    Dec = 0x9D, "DEC", Fixed(0);
    Add = 0x9E, "ADD", Fixed(0);
    Sub = 0x9F, "SUB", Fixed(0);
    Mul = 0xA0, "MUL", Fixed(0);
    Div = 0xA1, "DIV", Fixed(0);
    Mod = 0xA2, "MOD", Fixed(0);
    Pow = 0xA3, "POW", Fixed(0);
    Sqrt = 0xA4, "SQRT", Fixed(0);
    ModMul = 0xA5, "MODMUL", Fixed(0);
    ModPow = 0xA6, "MODPOW", Fixed(0);
    Shl = 0xA8, "SHL", Fixed(0);
    Shr = 0xA9, "SHR", Fixed(0);
    Not = 0xAA, "NOT", Fixed(0);
    BoolAnd = 0xAB, "BOOLAND", Fixed(0);
    BoolOr = 0xAC, "BOOLOR", Fixed(0);
    Nz = 0xB1, "NZ", Fixed(0);
    NumEqual = 0xB3, "NUMEQUAL", Fixed(0);
    NumNotEqual = 0xB4, "NUMNOTEQUAL", Fixed(0);
    Lt = 0xB5, "LT", Fixed(0);
    Le = 0xB6, "LE", Fixed(0);
    Gt = 0xB7, "GT", Fixed(0);
    Ge = 0xB8, "GE", Fixed(0);
    Min = 0xB9, "MIN", Fixed(0);
    Max = 0xBA, "MAX", Fixed(0);
    Within = 0xBB, "WITHIN", Fixed(0);

    // ------------------------------------------------------------------
    // Compound types
    PackMap = 0xBE, "PACKMAP", Fixed(0);
    PackStruct = 0xBF, "PACKSTRUCT", Fixed(0);
    Pack = 0xC0, "PACK", Fixed(0);
    Unpack = 0xC1, "UNPACK", Fixed(0);
    NewArray0 = 0xC2, "NEWARRAY0", Fixed(0);
    NewArray = 0xC3, "NEWARRAY", Fixed(0);
    /// Create an array of `n` default values of the type tag given by the operand
    NewArrayT = 0xC4, "NEWARRAY_T", Fixed(1);
    NewStruct0 = 0xC5, "NEWSTRUCT0", Fixed(0);
    NewStruct = 0xC6, "NEWSTRUCT", Fixed(0);
    NewMap = 0xC8, "NEWMAP", Fixed(0);
    Size = 0xCA, "SIZE", Fixed(0);
    HasKey = 0xCB, "HASKEY", Fixed(0);
    Keys = 0xCC, "KEYS", Fixed(0);
    Values = 0xCD, "VALUES", Fixed(0);
    PickItem = 0xCE, "PICKITEM", Fixed(0);
    Append = 0xCF, "APPEND", Fixed(0);
    SetItem = 0xD0, "SETITEM", Fixed(0);
    ReverseItems = 0xD1, "REVERSEITEMS", Fixed(0);
    Remove = 0xD2, "REMOVE", Fixed(0);
    ClearItems = 0xD3, "CLEARITEMS", Fixed(0);
    PopItem = 0xD4, "POPITEM", Fixed(0);

    // ------------------------------------------------------------------
    // Types
    IsNull = 0xD8, "ISNULL", Fixed(0);
    IsType = 0xD9, "ISTYPE", Fixed(1);
    Convert = 0xDB, "CONVERT", Fixed(1);

    // ------------------------------------------------------------------
    // Extensions
    AbortMsg = 0xE0, "ABORTMSG", Fixed(0);
    AssertMsg = 0xE1, "ASSERTMSG", Fixed(0);
}

/// Operand shape for every byte value, `None` where the byte is not an opcode
pub const OPERAND_TABLE: [Option<OperandShape>; 256] = build_operand_table();

const fn build_operand_table() -> [Option<OperandShape>; 256] {
    let mut table = [None; 256];
    let mut byte = 0;
    while byte < 256 {
        table[byte] = match OpCode::from_u8(byte as u8) {
            Some(opcode) => Some(opcode.operand_shape()),
            None => None,
        };
        byte += 1;
    }
    table
}

impl OpCode {
    /// Byte value of this opcode
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// The `PUSH0`..`PUSH16` opcode for a small integer, `PUSHM1` for -1
    pub fn for_small_int(value: i64) -> Option<OpCode> {
        if !(-1..=16).contains(&value) {
            return None;
        }
        OpCode::from_u8((OpCode::Push0 as i64 + value) as u8)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::from_u8(byte).ok_or(byte)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
