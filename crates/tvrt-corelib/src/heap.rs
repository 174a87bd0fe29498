//! Capabilities the runtime layer needs from the host VM.
//!
//! The primitives are written against these traits only; `host.rs` adapts the
//! in-process reference VM to them.

/// Host allocator could not satisfy a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfMemory;

/// Tagged-value predicates.
pub trait HostValue {
    type Obj: Copy + Eq;

    /// The boolean-false singleton.
    fn is_false(&self) -> bool;
    /// Any "no value" variant.
    fn is_nil(&self) -> bool;
    fn is_true(&self) -> bool;
    fn from_bool(b: bool) -> Self;
    /// Handle of the full userdata this value refers to, if any.
    fn as_full_userdata(&self) -> Option<Self::Obj>;
}

/// Bucket layout and chain walk of a table's hash part.
pub trait TableLayout {
    type Key: ?Sized;
    type Cell;

    fn is_short_key(key: &Self::Key) -> bool;
    fn bucket_count(&self) -> usize;
    fn home_bucket(&self, key: &Self::Key) -> usize;
    /// True if bucket `idx` holds a short-string key identical to `key`.
    fn bucket_holds(&self, idx: usize, key: &Self::Key) -> bool;
    /// Signed offset to the next bucket of the chain; `0` ends the chain.
    fn bucket_next(&self, idx: usize) -> i32;
    fn bucket_cell(&self, idx: usize) -> &Self::Cell;
    fn bucket_cell_mut(&mut self, idx: usize) -> &mut Self::Cell;
    /// Shared cell returned for keys that are not present.
    fn absent_cell(&self) -> &Self::Cell;
    /// Generic string-keyed lookup used for long keys.
    fn lookup_by_key(&self, key: &Self::Key) -> &Self::Cell;
    fn lookup_by_key_mut(&mut self, key: &Self::Key) -> Option<&mut Self::Cell>;
}

/// Heap and collector entry points.
pub trait HeapManager {
    type Obj: Copy + Eq;

    fn is_black(&self, obj: Self::Obj) -> bool;
    fn is_white(&self, obj: Self::Obj) -> bool;
    /// Tell the collector that black `owner` now references white `child`.
    fn notify_possible_cross_generation_reference(&mut self, owner: Self::Obj, child: Self::Obj);
    /// Type descriptor attached to a full userdata.
    fn type_descriptor(&self, obj: Self::Obj) -> Option<Self::Obj>;

    fn new_table(&mut self) -> Result<Self::Obj, OutOfMemory>;
    fn resize_table(&mut self, table: Self::Obj, narray: u64, nhash: u64)
        -> Result<(), OutOfMemory>;
    fn array_limit(&self, table: Self::Obj) -> u64;
    fn has_metatable(&self, table: Self::Obj) -> bool;
    /// Grow the array part to at least `len` slots, moving matching hash keys into it.
    fn ensure_capacity(&mut self, table: Self::Obj, len: u64) -> Result<(), OutOfMemory>;
}
