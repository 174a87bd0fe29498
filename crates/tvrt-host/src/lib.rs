//! In-process model of the dynamic VM the runtime layer is linked against.
//!
//! Values, interned strings, hybrid array/hash tables and collector colours follow the
//! host's object model closely enough that the runtime primitives observe the same
//! bucket layout, chain walk and resize behavior they would see in the real VM.

use std::fmt;

pub mod heap;
pub mod table;
pub mod value;

pub use heap::{Color, GcRef, Heap, Object, Userdata};
pub use table::{Key, Table, MAX_ARRAY_BITS, MAX_HASH_BITS};
pub use value::{str_hash, LuaStr, TypeTag, Value, ABSENT_KEY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostError {
    OutOfMemory,
    InvalidKey(&'static str),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::OutOfMemory => f.write_str("not enough memory"),
            HostError::InvalidKey(what) => write!(f, "table index is {what}"),
        }
    }
}

impl std::error::Error for HostError {}
