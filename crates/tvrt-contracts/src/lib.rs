//! Shared, version-pinned identifiers for the runtime support layer.
//!
//! These constants are the single source of truth for the values that cross the
//! boundary between generated code and the runtime: error codes returned through the
//! C ABI, the diagnostic schema string, and the host limits both sides agree on.

pub const TVRT_DIAG_SCHEMA_VERSION: &str = "tvrt.diag@0.1.0";
pub const TVRT_TRACE_SCHEMA_VERSION: &str = "tvrt.trace@0.1.0";

// Error codes (runtime error space). Generated code compares against these values.
pub const TVRT_ERR_DIVIDE_BY_ZERO: u32 = 41_001;
pub const TVRT_ERR_MODULO_BY_ZERO: u32 = 41_002;
pub const TVRT_ERR_ZERO_STEP: u32 = 41_003;
pub const TVRT_ERR_NUMBER_TO_INTEGER: u32 = 41_004;
pub const TVRT_ERR_OUT_OF_MEMORY: u32 = 41_005;
pub const TVRT_ERR_INVALID_ARRAY_INDEX: u32 = 41_006;
pub const TVRT_ERR_ARRAY_METATABLE: u32 = 41_007;
pub const TVRT_ERR_TAG_CHECK: u32 = 41_008;
pub const TVRT_ERR_ARITY: u32 = 41_009;
pub const TVRT_ERR_STRING_LENGTH_OVERFLOW: u32 = 41_010;
pub const TVRT_ERR_CHAR_OUT_OF_RANGE: u32 = 41_011;
pub const TVRT_ERR_TOSTRING_UNSUPPORTED: u32 = 41_012;
pub const TVRT_ERR_TABLE_OVERFLOW: u32 = 41_013;

/// Returned by the C ABI when an entry point panicked instead of producing a result.
pub const TVRT_ERR_INTERNAL: u32 = 41_099;

/// Strings up to this many bytes are interned and compared by identity.
pub const SHORT_STR_MAX_LEN: usize = 40;

/// Width of the host integer type, in bits.
pub const INT_BITS: u32 = 64;

/// Default `log2` of the largest array part a table may hold.
pub const DEFAULT_MAX_ARRAY_BITS: u32 = 31;

pub const ALL_ERROR_CODES: &[u32] = &[
    TVRT_ERR_DIVIDE_BY_ZERO,
    TVRT_ERR_MODULO_BY_ZERO,
    TVRT_ERR_ZERO_STEP,
    TVRT_ERR_NUMBER_TO_INTEGER,
    TVRT_ERR_OUT_OF_MEMORY,
    TVRT_ERR_INVALID_ARRAY_INDEX,
    TVRT_ERR_ARRAY_METATABLE,
    TVRT_ERR_TAG_CHECK,
    TVRT_ERR_ARITY,
    TVRT_ERR_STRING_LENGTH_OVERFLOW,
    TVRT_ERR_CHAR_OUT_OF_RANGE,
    TVRT_ERR_TOSTRING_UNSUPPORTED,
    TVRT_ERR_TABLE_OVERFLOW,
];
