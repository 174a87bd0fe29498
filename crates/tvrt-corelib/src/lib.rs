//! Runtime primitives called by native code generated from typed source programs that
//! target a dynamically typed VM.
//!
//! Every primitive reproduces the VM's own semantics exactly: floor division and
//! modulo, unrestricted shifts, exact float to integer conversion, table field lookup,
//! array growth and numeric `for` loops. Failures are returned as [`RuntimeError`]; the
//! [`ffi`] module exposes the same operations over a C ABI.

pub mod array;
pub mod config;
pub mod error;
pub mod ffi;
pub mod forloop;
pub mod heap;
mod host;
pub mod numeric;
pub mod object;
pub mod string;
pub mod table;
pub mod trace;

pub use array::{check_array_metatable, ensure_array_slot};
pub use config::{config, RuntimeConfig};
pub use error::{ErrorKind, RuntimeError, SrcLoc};
pub use forloop::{float_for, int_for, FloatRange, IntRange};
pub use heap::{HeapManager, HostValue, OutOfMemory, TableLayout};
pub use numeric::{
    ceil_to_int, checked_to_int, floor_to_int, int_div, int_mod, log, modf, shl, shr,
};
pub use object::{barrier_if_needed, bool_value, is_record, is_truthy, set_bool};
pub use table::{create_table, get_field, get_field_mut, probe, FieldCache, Probe};
