//! Object-model checks emitted inline by generated code.

use crate::heap::{HeapManager, HostValue};

/// Only `false` and nil (including the absent-key cell) are falsy.
#[inline]
pub fn is_truthy<V: HostValue>(v: &V) -> bool {
    !v.is_false() && !v.is_nil()
}

/// True iff `v` is a full userdata whose type descriptor is exactly `expected`.
#[inline]
pub fn is_record<H, V>(heap: &H, v: &V, expected: H::Obj) -> bool
where
    H: HeapManager,
    V: HostValue<Obj = H::Obj>,
{
    match v.as_full_userdata() {
        Some(obj) => heap.type_descriptor(obj) == Some(expected),
        None => false,
    }
}

/// Must run before `child` is stored into `owner`.
#[inline]
pub fn barrier_if_needed<H: HeapManager>(heap: &mut H, owner: H::Obj, child: H::Obj) {
    if heap.is_black(owner) && heap.is_white(child) {
        heap.notify_possible_cross_generation_reference(owner, child);
    }
}

#[inline]
pub fn bool_value<V: HostValue>(v: &V) -> bool {
    v.is_true()
}

#[inline]
pub fn set_bool<V: HostValue>(b: bool) -> V {
    V::from_bool(b)
}
