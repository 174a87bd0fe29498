use std::fmt;
use std::sync::Arc;

use tvrt_contracts::SHORT_STR_MAX_LEN;

use crate::heap::GcRef;

const STR_HASH_SEED: u32 = 0x2f5c_9a1d;

/// Immutable byte string. Short strings are interned by [`crate::Heap::new_str`], so two
/// short strings are equal exactly when they share an allocation.
#[derive(Clone)]
pub struct LuaStr(Arc<StrObj>);

struct StrObj {
    hash: u32,
    bytes: Box<[u8]>,
}

pub fn str_hash(bytes: &[u8]) -> u32 {
    let mut h = STR_HASH_SEED ^ (bytes.len() as u32);
    for &b in bytes.iter().rev() {
        h ^= (h << 5).wrapping_add(h >> 2).wrapping_add(b as u32);
    }
    h
}

impl LuaStr {
    pub(crate) fn alloc(bytes: &[u8]) -> LuaStr {
        LuaStr(Arc::new(StrObj {
            hash: str_hash(bytes),
            bytes: bytes.into(),
        }))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    pub fn hash(&self) -> u32 {
        self.0.hash
    }

    pub fn is_short(&self) -> bool {
        self.len() <= SHORT_STR_MAX_LEN
    }

    /// Identity comparison; only meaningful for interned short strings.
    pub fn ptr_eq(&self, other: &LuaStr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl PartialEq for LuaStr {
    fn eq(&self, other: &LuaStr) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.is_short() && other.is_short() {
            return false;
        }
        self.hash() == other.hash() && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for LuaStr {}

impl fmt::Debug for LuaStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Userdata,
}

impl TypeTag {
    /// Name reported by the dynamic language's `type` builtin.
    pub fn type_name(self) -> &'static str {
        match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Integer | TypeTag::Float => "number",
            TypeTag::String => "string",
            TypeTag::Table => "table",
            TypeTag::Userdata => "userdata",
        }
    }
}

/// Tagged value of the dynamic language.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    /// Nil variant returned for keys that are not present in a table.
    AbsentKey,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(LuaStr),
    Table(GcRef),
    Userdata(GcRef),
}

/// Shared cell handed out by lookups that find nothing.
pub static ABSENT_KEY: Value = Value::AbsentKey;

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Nil | Value::AbsentKey => TypeTag::Nil,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Int(_) => TypeTag::Integer,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::String,
            Value::Table(_) => TypeTag::Table,
            Value::Userdata(_) => TypeTag::Userdata,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil | Value::AbsentKey)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::AbsentKey)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn as_gc(&self) -> Option<GcRef> {
        match self {
            Value::Table(r) | Value::Userdata(r) => Some(*r),
            _ => None,
        }
    }

    /// Raw equality: no metamethods, `1 == 1.0`.
    pub fn raw_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nil() && b.is_nil() => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                (*i as f64) == *f && float_to_exact_int(*f) == Some(*i)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Userdata(a), Value::Userdata(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn float_to_exact_int(f: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.floor() == f && (-TWO_POW_63..TWO_POW_63).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}
