//! Field projection by constant name, with a per-call-site inline cache.

use crate::config::config;
use crate::error::{ErrorKind, RuntimeError, SrcLoc};
use crate::heap::{HeapManager, TableLayout};

/// Last bucket index that matched at one call site.
///
/// Any value is safe to hand in: a hit is only taken after the bucket's key has been
/// compared by identity, so stale or foreign values degrade to a chain walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct FieldCache(i32);

impl FieldCache {
    pub const UNSET: FieldCache = FieldCache(-1);
    pub const MISS: FieldCache = FieldCache(i32::MIN);

    pub const fn new() -> FieldCache {
        FieldCache::UNSET
    }

    pub fn from_raw(raw: i32) -> FieldCache {
        FieldCache(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub fn is_known_miss(self) -> bool {
        self == FieldCache::MISS
    }

    fn remember(&mut self, bucket: usize) {
        // node vectors never reach 2^31 buckets
        self.0 = i32::try_from(bucket).unwrap_or(FieldCache::MISS.0);
    }
}

impl Default for FieldCache {
    fn default() -> Self {
        FieldCache::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The cached bucket still held the key.
    Hit(usize),
    /// Found by walking the chain from the home bucket.
    Walked { bucket: usize, steps: u32 },
    Miss,
    /// Long key; the cache does not apply.
    Uncached,
}

/// Locates `key` and updates `cache` without touching the cell.
pub fn probe<T: TableLayout>(table: &T, key: &T::Key, cache: &mut FieldCache) -> Probe {
    probe_with(table, key, cache, config().inline_cache)
}

/// With `use_cache` off the chain is always walked and `cache` is left as it was.
fn probe_with<T: TableLayout>(
    table: &T,
    key: &T::Key,
    cache: &mut FieldCache,
    use_cache: bool,
) -> Probe {
    if !T::is_short_key(key) {
        return Probe::Uncached;
    }
    if use_cache {
        if let Some(slot) = cache.slot() {
            if slot < table.bucket_count() && table.bucket_holds(slot, key) {
                return Probe::Hit(slot);
            }
        }
    }
    let mut n = table.home_bucket(key);
    let mut steps = 0u32;
    loop {
        if table.bucket_holds(n, key) {
            if use_cache {
                cache.remember(n);
            }
            return Probe::Walked { bucket: n, steps };
        }
        let next = table.bucket_next(n);
        if next == 0 {
            if use_cache {
                *cache = FieldCache::MISS;
            }
            return Probe::Miss;
        }
        n = (n as isize + next as isize) as usize;
        steps += 1;
    }
}

/// Returns the cell stored under `key`, or the table's absent-key cell.
#[inline]
pub fn get_field<'t, T: TableLayout>(
    table: &'t T,
    key: &T::Key,
    cache: &mut FieldCache,
) -> &'t T::Cell {
    match probe(table, key, cache) {
        Probe::Hit(bucket) | Probe::Walked { bucket, .. } => table.bucket_cell(bucket),
        Probe::Miss => table.absent_cell(),
        Probe::Uncached => table.lookup_by_key(key),
    }
}

/// Mutable counterpart of [`get_field`] for stores into an existing field.
#[inline]
pub fn get_field_mut<'t, T: TableLayout>(
    table: &'t mut T,
    key: &T::Key,
    cache: &mut FieldCache,
) -> Option<&'t mut T::Cell> {
    match probe(&*table, key, cache) {
        Probe::Hit(bucket) | Probe::Walked { bucket, .. } => Some(table.bucket_cell_mut(bucket)),
        Probe::Miss => None,
        Probe::Uncached => table.lookup_by_key_mut(key),
    }
}

const MAX_HASH_SIZE: u64 = 1 << tvrt_host::MAX_HASH_BITS;

/// Allocates a table, pre-sized only when a hint is positive.
///
/// Hints past the largest array or hash part a table can hold fail with
/// [`ErrorKind::TableOverflow`] before anything is allocated.
pub fn create_table<H: HeapManager>(
    heap: &mut H,
    narray: i64,
    nrec: i64,
    loc: SrcLoc<'_>,
) -> Result<H::Obj, RuntimeError> {
    let (narray, nrec) = (narray.max(0) as u64, nrec.max(0) as u64);
    if narray > config().max_array_size() || nrec > MAX_HASH_SIZE {
        return Err(RuntimeError::new(ErrorKind::TableOverflow, loc));
    }
    let oom = |_| RuntimeError::new(ErrorKind::OutOfMemory, loc);
    let table = heap.new_table().map_err(oom)?;
    if narray > 0 || nrec > 0 {
        heap.resize_table(table, narray, nrec).map_err(oom)?;
    }
    Ok(table)
}
