//! Implementation limits for bytecode decoding and execution.
//!
//! These match the protocol's default limits. They bound the
//! size of values a script can build and prevent a malicious script from
//! exhausting memory or recursing without bound.

// =============================================================================
// Value limits
// =============================================================================

/// Maximum length of an integer's minimal two's-complement encoding, in bytes
pub const MAX_INTEGER_SIZE: usize = 32;

/// Maximum canonical memory length of a map key, in bytes
pub const MAX_KEY_SIZE: usize = 64;

/// Maximum size of a byte string produced by a push or splice instruction
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Maximum number of containers one walk over a compound value may visit,
/// also the most structs a single value copy may duplicate
pub const MAX_GRAPH_NODES: usize = 64 * 1024;

// =============================================================================
// Execution limits
// =============================================================================

/// Maximum number of entries on the evaluation stack
pub const MAX_STACK_SIZE: usize = 2 * 1024;

/// Maximum depth of nested `CALL` frames
pub const MAX_INVOCATION_DEPTH: usize = 1024;

/// Maximum shift amount for `SHL`/`SHR`, also the upper bound for `POW` exponents
pub const MAX_SHIFT: u32 = 256;

// =============================================================================
// The protocol also defines these limits for features not
// implemented here:
//
// Exception handling:
//   - MAX_TRY_NESTING_DEPTH = 16
//
// Interop:
//   - MAX_COMPARABLE_SIZE = 65,536
// =============================================================================
