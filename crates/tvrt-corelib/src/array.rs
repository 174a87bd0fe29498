use crate::config::config;
use crate::error::{ErrorKind, RuntimeError, SrcLoc};
use crate::heap::HeapManager;
use crate::trace;

/// Makes 1-based index `i` addressable through the array part of `arr`.
///
/// Must be called before every indexed store. Indices `<= 0` wrap to huge unsigned
/// values and are rejected like any other out-of-range index.
#[inline]
pub fn ensure_array_slot<H: HeapManager>(
    heap: &mut H,
    arr: H::Obj,
    i: i64,
    loc: SrcLoc<'_>,
) -> Result<(), RuntimeError> {
    let ui = (i as u64).wrapping_sub(1);
    if ui < heap.array_limit(arr) {
        return Ok(());
    }
    grow_array(heap, arr, ui, loc)
}

#[cold]
fn grow_array<H: HeapManager>(
    heap: &mut H,
    arr: H::Obj,
    ui: u64,
    loc: SrcLoc<'_>,
) -> Result<(), RuntimeError> {
    if ui >= config().max_array_size() {
        return Err(RuntimeError::new(ErrorKind::InvalidArrayIndex, loc));
    }
    let from = heap.array_limit(arr);
    let new_size = (ui + 1).next_power_of_two();
    heap.ensure_capacity(arr, new_size)
        .map_err(|_| RuntimeError::new(ErrorKind::OutOfMemory, loc))?;
    trace::array_grown(from, new_size, loc.file, loc.line);
    Ok(())
}

/// Typed arrays are plain tables; a metatable would change their indexing semantics.
pub fn check_array_metatable<H: HeapManager>(
    heap: &H,
    arr: H::Obj,
    loc: SrcLoc<'_>,
) -> Result<(), RuntimeError> {
    if heap.has_metatable(arr) {
        return Err(RuntimeError::new(ErrorKind::ArrayMetatable, loc));
    }
    Ok(())
}
