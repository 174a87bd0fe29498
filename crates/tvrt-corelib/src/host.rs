use tvrt_host::{Color, GcRef, Heap, HostError, LuaStr, Table, Value, ABSENT_KEY};

use crate::heap::{HeapManager, HostValue, OutOfMemory, TableLayout};

impl From<HostError> for OutOfMemory {
    fn from(_: HostError) -> OutOfMemory {
        OutOfMemory
    }
}

impl HostValue for Value {
    type Obj = GcRef;

    fn is_false(&self) -> bool {
        Value::is_false(self)
    }

    fn is_nil(&self) -> bool {
        Value::is_nil(self)
    }

    fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    fn from_bool(b: bool) -> Value {
        Value::Bool(b)
    }

    fn as_full_userdata(&self) -> Option<GcRef> {
        match self {
            Value::Userdata(r) => Some(*r),
            _ => None,
        }
    }
}

impl TableLayout for Table {
    type Key = LuaStr;
    type Cell = Value;

    fn is_short_key(key: &LuaStr) -> bool {
        key.is_short()
    }

    fn bucket_count(&self) -> usize {
        Table::bucket_count(self)
    }

    fn home_bucket(&self, key: &LuaStr) -> usize {
        Table::home_bucket(self, key)
    }

    fn bucket_holds(&self, idx: usize, key: &LuaStr) -> bool {
        self.bucket_short_str(idx).is_some_and(|s| s.ptr_eq(key))
    }

    fn bucket_next(&self, idx: usize) -> i32 {
        Table::bucket_next(self, idx)
    }

    fn bucket_cell(&self, idx: usize) -> &Value {
        self.bucket_value(idx)
    }

    fn bucket_cell_mut(&mut self, idx: usize) -> &mut Value {
        self.bucket_value_mut(idx)
    }

    fn absent_cell(&self) -> &Value {
        &ABSENT_KEY
    }

    fn lookup_by_key(&self, key: &LuaStr) -> &Value {
        self.get_str(key)
    }

    fn lookup_by_key_mut(&mut self, key: &LuaStr) -> Option<&mut Value> {
        self.get_str_mut(key)
    }
}

impl HeapManager for Heap {
    type Obj = GcRef;

    fn is_black(&self, obj: GcRef) -> bool {
        self.color(obj) == Color::Black
    }

    fn is_white(&self, obj: GcRef) -> bool {
        self.color(obj) == Color::White
    }

    fn notify_possible_cross_generation_reference(&mut self, owner: GcRef, _child: GcRef) {
        self.barrier_back(owner);
    }

    fn type_descriptor(&self, obj: GcRef) -> Option<GcRef> {
        self.userdata(obj).and_then(|u| u.metatable)
    }

    fn new_table(&mut self) -> Result<GcRef, OutOfMemory> {
        Ok(self.alloc_table(Table::new())?)
    }

    fn resize_table(&mut self, table: GcRef, narray: u64, nhash: u64) -> Result<(), OutOfMemory> {
        let narray = usize::try_from(narray).map_err(|_| OutOfMemory)?;
        let nhash = usize::try_from(nhash).map_err(|_| OutOfMemory)?;
        Ok(self.table_mut(table).resize(narray, nhash)?)
    }

    fn array_limit(&self, table: GcRef) -> u64 {
        self.table(table).array_limit() as u64
    }

    fn has_metatable(&self, table: GcRef) -> bool {
        self.table(table).metatable.is_some()
    }

    fn ensure_capacity(&mut self, table: GcRef, len: u64) -> Result<(), OutOfMemory> {
        let len = usize::try_from(len).map_err(|_| OutOfMemory)?;
        let t = self.table_mut(table);
        if len <= t.array_limit() {
            return Ok(());
        }
        Ok(t.resize_array(len)?)
    }
}
