use std::collections::HashMap;

use tvrt_contracts::SHORT_STR_MAX_LEN;

use crate::table::Table;
use crate::value::{LuaStr, Value};
use crate::HostError;

/// Handle to a collectable object in a [`Heap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GcRef(u32);

impl GcRef {
    /// Rebuilds a handle received over the C ABI. Using an index the heap never
    /// handed out panics on access.
    pub fn from_raw(index: u32) -> GcRef {
        GcRef(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Tri-colour marking state of the incremental collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    White,
    Gray,
    Black,
}

#[derive(Clone, Debug, Default)]
pub struct Userdata {
    /// Type descriptor; typed records use it to identify their record type.
    pub metatable: Option<GcRef>,
    pub user_values: Vec<Value>,
}

#[derive(Debug)]
pub enum Object {
    Table(Table),
    Userdata(Userdata),
}

#[derive(Debug)]
struct GcBox {
    color: Color,
    object: Object,
}

/// Object arena, string interner and collector colour bookkeeping of the host VM.
///
/// Only the pieces the runtime layer touches are modelled: there is no mark or sweep
/// phase, colours are driven explicitly by the embedder.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<GcBox>,
    strings: HashMap<Box<[u8]>, LuaStr>,
    keys: Vec<LuaStr>,
    gray_again: Vec<GcRef>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    fn alloc(&mut self, object: Object) -> Result<GcRef, HostError> {
        let idx = u32::try_from(self.objects.len()).map_err(|_| HostError::OutOfMemory)?;
        self.objects
            .try_reserve(1)
            .map_err(|_| HostError::OutOfMemory)?;
        self.objects.push(GcBox {
            color: Color::White,
            object,
        });
        Ok(GcRef(idx))
    }

    pub fn alloc_table(&mut self, table: Table) -> Result<GcRef, HostError> {
        self.alloc(Object::Table(table))
    }

    pub fn alloc_userdata(&mut self, userdata: Userdata) -> Result<GcRef, HostError> {
        self.alloc(Object::Userdata(userdata))
    }

    pub fn object(&self, r: GcRef) -> &Object {
        &self.objects[r.0 as usize].object
    }

    /// Panics if `r` is not a table.
    pub fn table(&self, r: GcRef) -> &Table {
        match self.object(r) {
            Object::Table(t) => t,
            Object::Userdata(_) => panic!("object {} is not a table", r.0),
        }
    }

    /// Panics if `r` is not a table.
    pub fn table_mut(&mut self, r: GcRef) -> &mut Table {
        match &mut self.objects[r.0 as usize].object {
            Object::Table(t) => t,
            Object::Userdata(_) => panic!("object {} is not a table", r.0),
        }
    }

    pub fn userdata(&self, r: GcRef) -> Option<&Userdata> {
        match self.object(r) {
            Object::Userdata(u) => Some(u),
            Object::Table(_) => None,
        }
    }

    pub fn color(&self, r: GcRef) -> Color {
        self.objects[r.0 as usize].color
    }

    pub fn set_color(&mut self, r: GcRef, color: Color) {
        self.objects[r.0 as usize].color = color;
    }

    /// Turns a black `owner` back to gray so the collector traverses it again.
    pub fn barrier_back(&mut self, owner: GcRef) {
        let gc = &mut self.objects[owner.0 as usize];
        if gc.color == Color::Black {
            gc.color = Color::Gray;
            self.gray_again.push(owner);
        }
    }

    pub fn gray_again(&self) -> &[GcRef] {
        &self.gray_again
    }

    pub fn take_gray_again(&mut self) -> Vec<GcRef> {
        std::mem::take(&mut self.gray_again)
    }

    /// Creates a string; short strings are interned so equal contents share a handle.
    ///
    /// Interned strings are never collected: the interner only grows for the lifetime
    /// of the heap, so this host is not a bounded-memory runtime.
    pub fn new_str(&mut self, bytes: &[u8]) -> LuaStr {
        if bytes.len() > SHORT_STR_MAX_LEN {
            return LuaStr::alloc(bytes);
        }
        if let Some(s) = self.strings.get(bytes) {
            return s.clone();
        }
        let s = LuaStr::alloc(bytes);
        self.strings.insert(bytes.into(), s.clone());
        s
    }

    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }

    /// Interns `bytes` and returns a numeric handle to the string, so callers across
    /// the C ABI can name a field without rehashing it on every access.
    pub fn register_key(&mut self, bytes: &[u8]) -> Result<u32, HostError> {
        let id = u32::try_from(self.keys.len()).map_err(|_| HostError::OutOfMemory)?;
        let s = self.new_str(bytes);
        self.keys.try_reserve(1).map_err(|_| HostError::OutOfMemory)?;
        self.keys.push(s);
        Ok(id)
    }

    pub fn key(&self, id: u32) -> Option<&LuaStr> {
        self.keys.get(id as usize)
    }
}
