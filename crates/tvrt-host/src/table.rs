use crate::heap::GcRef;
use crate::value::{float_to_exact_int, LuaStr, Value, ABSENT_KEY};
use crate::HostError;

/// Largest `log2` of an array part the host will ever allocate.
pub const MAX_ARRAY_BITS: u32 = 31;
pub const MAX_HASH_BITS: u32 = 30;

#[derive(Clone, Debug, Default)]
pub enum Key {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    /// Non-integral float, stored by bit pattern.
    Float(u64),
    Str(LuaStr),
    Obj(GcRef),
}

impl Key {
    pub fn from_value(v: &Value) -> Result<Key, HostError> {
        Ok(match v {
            Value::Nil | Value::AbsentKey => return Err(HostError::InvalidKey("nil")),
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            Value::Float(f) if f.is_nan() => return Err(HostError::InvalidKey("NaN")),
            Value::Float(f) => match float_to_exact_int(*f) {
                Some(i) => Key::Int(i),
                None => Key::Float(f.to_bits()),
            },
            Value::Str(s) => Key::Str(s.clone()),
            Value::Table(r) | Value::Userdata(r) => Key::Obj(*r),
        })
    }

    fn same(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Bool(a), Key::Bool(b)) => a == b,
            (Key::Int(a), Key::Int(b)) => a == b,
            (Key::Float(a), Key::Float(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Obj(a), Key::Obj(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Node {
    key: Key,
    val: Value,
    /// Offset to the next node of the collision chain; `0` ends the chain.
    next: i32,
}

/// Hybrid table: a dense array part for keys `1..=array_limit` and a hash part of
/// `2^k` nodes using chained scatter with a descending free pointer.
#[derive(Clone, Debug)]
pub struct Table {
    array: Vec<Value>,
    nodes: Vec<Node>,
    /// `None` while the hash part is the shared single dummy node.
    last_free: Option<usize>,
    pub metatable: Option<GcRef>,
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

fn ceil_log2(x: u64) -> u32 {
    debug_assert!(x >= 1);
    64 - (x - 1).leading_zeros()
}

fn offset(from: usize, to: usize) -> i32 {
    (to as isize - from as isize) as i32
}

fn step(from: usize, next: i32) -> usize {
    (from as isize + next as isize) as usize
}

impl Table {
    pub fn new() -> Table {
        Table {
            array: Vec::new(),
            nodes: vec![Node::default()],
            last_free: None,
            metatable: None,
        }
    }

    pub fn array_limit(&self) -> usize {
        self.array.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_dummy(&self) -> bool {
        self.last_free.is_none()
    }

    /// Number of live entries in the hash part.
    pub fn hash_len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.val.is_nil()).count()
    }

    /// True if integer key `k` currently lives in the hash part.
    pub fn in_hash_part(&self, k: i64) -> bool {
        self.find_node(&Key::Int(k))
            .is_some_and(|i| !self.nodes[i].val.is_nil())
    }

    fn hash_mod(&self, h: u64) -> usize {
        (h % (((self.nodes.len() - 1) | 1) as u64)) as usize
    }

    fn main_position(&self, key: &Key) -> usize {
        let mask = self.nodes.len() - 1;
        match key {
            Key::Empty => 0,
            Key::Bool(b) => (*b as usize) & mask,
            Key::Int(i) => self.hash_mod(*i as u64),
            Key::Float(bits) => self.hash_mod(bits ^ (bits >> 32)),
            Key::Str(s) => (s.hash() as usize) & mask,
            Key::Obj(r) => self.hash_mod(r.index() as u64),
        }
    }

    /// Home bucket of a string key.
    pub fn home_bucket(&self, key: &LuaStr) -> usize {
        (key.hash() as usize) & (self.nodes.len() - 1)
    }

    pub fn bucket_short_str(&self, idx: usize) -> Option<&LuaStr> {
        match &self.nodes.get(idx)?.key {
            Key::Str(s) if s.is_short() => Some(s),
            _ => None,
        }
    }

    pub fn bucket_next(&self, idx: usize) -> i32 {
        self.nodes[idx].next
    }

    pub fn bucket_value(&self, idx: usize) -> &Value {
        &self.nodes[idx].val
    }

    pub fn bucket_value_mut(&mut self, idx: usize) -> &mut Value {
        &mut self.nodes[idx].val
    }

    fn find_node(&self, key: &Key) -> Option<usize> {
        let mut n = self.main_position(key);
        loop {
            if self.nodes[n].key.same(key) {
                return Some(n);
            }
            let nx = self.nodes[n].next;
            if nx == 0 {
                return None;
            }
            n = step(n, nx);
        }
    }

    fn array_index(&self, k: i64) -> Option<usize> {
        let ui = (k as u64).wrapping_sub(1);
        (ui < self.array.len() as u64).then_some(ui as usize)
    }

    pub fn get_int(&self, k: i64) -> &Value {
        if let Some(i) = self.array_index(k) {
            return &self.array[i];
        }
        match self.find_node(&Key::Int(k)) {
            Some(n) => &self.nodes[n].val,
            None => &ABSENT_KEY,
        }
    }

    /// Lookup by interned identity; `key` must be a short string.
    pub fn get_short_str(&self, key: &LuaStr) -> &Value {
        let mut n = self.home_bucket(key);
        loop {
            if let Key::Str(s) = &self.nodes[n].key {
                if s.ptr_eq(key) {
                    return &self.nodes[n].val;
                }
            }
            let nx = self.nodes[n].next;
            if nx == 0 {
                return &ABSENT_KEY;
            }
            n = step(n, nx);
        }
    }

    pub fn get_str(&self, key: &LuaStr) -> &Value {
        if key.is_short() {
            return self.get_short_str(key);
        }
        match self.find_node(&Key::Str(key.clone())) {
            Some(n) => &self.nodes[n].val,
            None => &ABSENT_KEY,
        }
    }

    pub fn get(&self, key: &Value) -> &Value {
        match Key::from_value(key) {
            Ok(Key::Int(k)) => self.get_int(k),
            Ok(k) => match self.find_node(&k) {
                Some(n) => &self.nodes[n].val,
                None => &ABSENT_KEY,
            },
            Err(_) => &ABSENT_KEY,
        }
    }

    pub fn get_str_mut(&mut self, key: &LuaStr) -> Option<&mut Value> {
        let n = self.find_node(&Key::Str(key.clone()))?;
        Some(&mut self.nodes[n].val)
    }

    pub fn set_int(&mut self, k: i64, val: Value) -> Result<(), HostError> {
        self.set_key(Key::Int(k), val)
    }

    pub fn set_str(&mut self, key: &LuaStr, val: Value) -> Result<(), HostError> {
        self.set_key(Key::Str(key.clone()), val)
    }

    pub fn set(&mut self, key: &Value, val: Value) -> Result<(), HostError> {
        self.set_key(Key::from_value(key)?, val)
    }

    fn set_key(&mut self, key: Key, val: Value) -> Result<(), HostError> {
        if let Key::Int(k) = key {
            if let Some(i) = self.array_index(k) {
                self.array[i] = val;
                return Ok(());
            }
        }
        if let Some(n) = self.find_node(&key) {
            self.nodes[n].val = val;
            return Ok(());
        }
        if val.is_nil() {
            return Ok(());
        }
        self.new_key(key, val)
    }

    fn free_pos(&mut self) -> Option<usize> {
        let lf = self.last_free.as_mut()?;
        while *lf > 0 {
            *lf -= 1;
            if matches!(self.nodes[*lf].key, Key::Empty) {
                return Some(*lf);
            }
        }
        None
    }

    /// Inserts a key known to be absent. A colliding node that is not in its own
    /// main position is moved to a free slot.
    fn new_key(&mut self, key: Key, val: Value) -> Result<(), HostError> {
        let mut mp = self.main_position(&key);
        if !self.nodes[mp].val.is_nil() || self.is_dummy() {
            let Some(f) = self.free_pos() else {
                self.rehash(&key)?;
                return self.set_key(key, val);
            };
            let mut othern = self.main_position(&self.nodes[mp].key);
            if othern != mp {
                while step(othern, self.nodes[othern].next) != mp {
                    othern = step(othern, self.nodes[othern].next);
                }
                self.nodes[othern].next = offset(othern, f);
                let moved = std::mem::take(&mut self.nodes[mp]);
                self.nodes[f] = moved;
                if self.nodes[f].next != 0 {
                    self.nodes[f].next += offset(f, mp);
                }
            } else {
                let nx = self.nodes[mp].next;
                self.nodes[f].next = if nx != 0 { offset(f, step(mp, nx)) } else { 0 };
                self.nodes[mp].next = offset(mp, f);
                mp = f;
            }
        }
        self.nodes[mp].key = key;
        self.nodes[mp].val = val;
        Ok(())
    }

    fn rehash(&mut self, extra: &Key) -> Result<(), HostError> {
        let mut nums = [0usize; MAX_ARRAY_BITS as usize + 1];
        let mut na = 0usize;
        for (i, v) in self.array.iter().enumerate() {
            if !v.is_nil() {
                nums[ceil_log2(i as u64 + 1) as usize] += 1;
                na += 1;
            }
        }
        let mut total = na;
        for node in &self.nodes {
            if node.val.is_nil() {
                continue;
            }
            total += 1;
            if let Key::Int(k) = node.key {
                na += count_int(k, &mut nums);
            }
        }
        if let Key::Int(k) = *extra {
            na += count_int(k, &mut nums);
        }
        total += 1;
        let asize = compute_sizes(&nums, &mut na);
        self.resize(asize, total - na)
    }

    /// Resizes both parts, moving every entry to wherever its key now belongs.
    pub fn resize(&mut self, nasize: usize, nhsize: usize) -> Result<(), HostError> {
        if nasize > (1usize << MAX_ARRAY_BITS) {
            return Err(HostError::OutOfMemory);
        }
        let (hsize, last_free) = if nhsize == 0 {
            (1, None)
        } else {
            let lsize = ceil_log2(nhsize as u64);
            if lsize > MAX_HASH_BITS {
                return Err(HostError::OutOfMemory);
            }
            (1usize << lsize, Some(1usize << lsize))
        };
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(hsize)
            .map_err(|_| HostError::OutOfMemory)?;
        nodes.resize_with(hsize, Node::default);

        if nasize > self.array.len() {
            self.array
                .try_reserve_exact(nasize - self.array.len())
                .map_err(|_| HostError::OutOfMemory)?;
        }

        let old_nodes = std::mem::replace(&mut self.nodes, nodes);
        self.last_free = last_free;
        let vanishing = if nasize < self.array.len() {
            self.array.split_off(nasize)
        } else {
            self.array.resize(nasize, Value::Nil);
            Vec::new()
        };

        for (j, v) in vanishing.into_iter().enumerate() {
            if !v.is_nil() {
                self.set_key(Key::Int((nasize + j + 1) as i64), v)?;
            }
        }
        for node in old_nodes {
            if !node.val.is_nil() {
                self.set_key(node.key, node.val)?;
            }
        }
        Ok(())
    }

    /// Resizes only the array part; the hash part keeps its allocated size.
    pub fn resize_array(&mut self, nasize: usize) -> Result<(), HostError> {
        let nhsize = if self.is_dummy() { 0 } else { self.nodes.len() };
        self.resize(nasize, nhsize)
    }
}

fn count_int(k: i64, nums: &mut [usize]) -> usize {
    if k >= 1 && (k as u64) <= (1u64 << MAX_ARRAY_BITS) {
        nums[ceil_log2(k as u64) as usize] += 1;
        1
    } else {
        0
    }
}

/// Picks the largest power of two `n` such that more than half of `1..=n` is in use.
fn compute_sizes(nums: &[usize], pna: &mut usize) -> usize {
    let mut a = 0;
    let mut na = 0;
    let mut optimal = 0;
    let mut twotoi = 1usize;
    for &count in nums {
        if *pna <= twotoi / 2 {
            break;
        }
        a += count;
        if a > twotoi / 2 {
            optimal = twotoi;
            na = a;
        }
        twotoi *= 2;
    }
    *pna = na;
    optimal
}
