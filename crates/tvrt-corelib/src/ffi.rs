#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

//! C ABI for generated native code.
//!
//! Fallible entry points return a tagged result (`tag == 1` ok, `tag == 0` err with a
//! `tvrt-contracts` error code). The rendered message of the last error on the calling
//! thread can be fetched with `tvrt_last_error_message_v1`. Out-of-memory aborts.

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr};
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tvrt_contracts::TVRT_ERR_INTERNAL;
use tvrt_host::{Color, GcRef, Heap, Value};

use crate::array::ensure_array_slot;
use crate::error::{ErrorKind, RuntimeError, SrcLoc};
use crate::forloop::{float_for, int_for};
use crate::heap::HostValue;
use crate::numeric;
use crate::object::{barrier_if_needed, is_record, is_truthy};
use crate::table::{create_table, get_field, get_field_mut, FieldCache};

pub const TVRT_TAG_NIL: u32 = 0;
pub const TVRT_TAG_ABSENT: u32 = 1;
pub const TVRT_TAG_BOOL: u32 = 2;
pub const TVRT_TAG_INT: u32 = 3;
pub const TVRT_TAG_FLOAT: u32 = 4;
pub const TVRT_TAG_STRING: u32 = 5;
pub const TVRT_TAG_TABLE: u32 = 6;
pub const TVRT_TAG_USERDATA: u32 = 7;

/// Flat tagged value. Strings borrow their bytes (`bits` is the pointer) from the
/// heap; the view is valid until the owning entry is overwritten.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct tvrt_value {
    pub tag: u32,
    pub len: u32,
    pub bits: u64,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union tvrt_result_i64_payload {
    pub ok: i64,
    pub err: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct tvrt_result_i64 {
    pub tag: u32, // 1 = ok, 0 = err
    pub payload: tvrt_result_i64_payload,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union tvrt_result_u32_payload {
    pub ok: u32,
    pub err: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct tvrt_result_u32 {
    pub tag: u32, // 1 = ok, 0 = err
    pub payload: tvrt_result_u32_payload,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct tvrt_modf_parts {
    pub int_part: i64,
    pub frac_part: f64,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union tvrt_result_modf_payload {
    pub ok: tvrt_modf_parts,
    pub err: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct tvrt_result_modf {
    pub tag: u32, // 1 = ok, 0 = err
    pub payload: tvrt_result_modf_payload,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union tvrt_result_value_payload {
    pub ok: tvrt_value,
    pub err: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct tvrt_result_value {
    pub tag: u32, // 1 = ok, 0 = err
    pub payload: tvrt_result_value_payload,
}

/// Loop body callback; a nonzero return breaks out of the loop.
pub type tvrt_int_body = extern "C" fn(i: i64, ctx: *mut c_void) -> u32;
pub type tvrt_float_body = extern "C" fn(x: f64, ctx: *mut c_void) -> u32;

struct LastError {
    code: u32,
    message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

fn set_last_error(code: u32, message: String) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(LastError { code, message }));
}

fn fail(err: RuntimeError) -> u32 {
    let code = err.code();
    if err.is_fatal() {
        eprintln!("{}", err.to_diag_json());
        std::process::abort();
    }
    set_last_error(code, err.to_string());
    code
}

fn internal() -> u32 {
    set_last_error(TVRT_ERR_INTERNAL, "internal error".to_string());
    TVRT_ERR_INTERNAL
}

#[inline]
fn ok_i64(x: i64) -> tvrt_result_i64 {
    tvrt_result_i64 {
        tag: 1,
        payload: tvrt_result_i64_payload { ok: x },
    }
}

#[inline]
fn err_i64(code: u32) -> tvrt_result_i64 {
    tvrt_result_i64 {
        tag: 0,
        payload: tvrt_result_i64_payload { err: code },
    }
}

#[inline]
fn ok_u32(x: u32) -> tvrt_result_u32 {
    tvrt_result_u32 {
        tag: 1,
        payload: tvrt_result_u32_payload { ok: x },
    }
}

#[inline]
fn err_u32(code: u32) -> tvrt_result_u32 {
    tvrt_result_u32 {
        tag: 0,
        payload: tvrt_result_u32_payload { err: code },
    }
}

#[inline]
fn err_value(code: u32) -> tvrt_result_value {
    tvrt_result_value {
        tag: 0,
        payload: tvrt_result_value_payload { err: code },
    }
}

fn i64_result(res: Result<i64, RuntimeError>) -> tvrt_result_i64 {
    match res {
        Ok(v) => ok_i64(v),
        Err(e) => err_i64(fail(e)),
    }
}

fn u32_result(res: Result<u32, RuntimeError>) -> tvrt_result_u32 {
    match res {
        Ok(v) => ok_u32(v),
        Err(e) => err_u32(fail(e)),
    }
}

fn broke<B>(flow: ControlFlow<B>) -> u32 {
    flow.is_break() as u32
}

/// `file` may be null; a name that is not UTF-8 is reported as `?`.
unsafe fn loc<'a>(file: *const c_char, line: u32) -> SrcLoc<'a> {
    if file.is_null() {
        return SrcLoc::new("", line);
    }
    SrcLoc::new(CStr::from_ptr(file).to_str().unwrap_or("?"), line)
}

unsafe fn bytes<'a>(ptr: *const u8, len: u32) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr, len as usize)
}

impl HostValue for tvrt_value {
    type Obj = GcRef;

    fn is_false(&self) -> bool {
        self.tag == TVRT_TAG_BOOL && self.bits == 0
    }

    fn is_nil(&self) -> bool {
        self.tag == TVRT_TAG_NIL || self.tag == TVRT_TAG_ABSENT
    }

    fn is_true(&self) -> bool {
        self.tag == TVRT_TAG_BOOL && self.bits != 0
    }

    fn from_bool(b: bool) -> tvrt_value {
        tvrt_value {
            tag: TVRT_TAG_BOOL,
            len: 0,
            bits: b as u64,
        }
    }

    fn as_full_userdata(&self) -> Option<GcRef> {
        (self.tag == TVRT_TAG_USERDATA).then(|| GcRef::from_raw(self.bits as u32))
    }
}

fn value_to_ffi(v: &Value) -> Option<tvrt_value> {
    let (tag, len, bits) = match v {
        Value::Nil => (TVRT_TAG_NIL, 0, 0),
        Value::AbsentKey => (TVRT_TAG_ABSENT, 0, 0),
        Value::Bool(b) => (TVRT_TAG_BOOL, 0, *b as u64),
        Value::Int(i) => (TVRT_TAG_INT, 0, *i as u64),
        Value::Float(f) => (TVRT_TAG_FLOAT, 0, f.to_bits()),
        Value::Str(s) => (
            TVRT_TAG_STRING,
            u32::try_from(s.len()).ok()?,
            s.as_bytes().as_ptr() as u64,
        ),
        Value::Table(r) => (TVRT_TAG_TABLE, 0, r.index() as u64),
        Value::Userdata(r) => (TVRT_TAG_USERDATA, 0, r.index() as u64),
    };
    Some(tvrt_value { tag, len, bits })
}

unsafe fn value_from_ffi(heap: &mut Heap, v: tvrt_value) -> Option<Value> {
    Some(match v.tag {
        TVRT_TAG_NIL => Value::Nil,
        TVRT_TAG_ABSENT => Value::AbsentKey,
        TVRT_TAG_BOOL => Value::Bool(v.bits != 0),
        TVRT_TAG_INT => Value::Int(v.bits as i64),
        TVRT_TAG_FLOAT => Value::Float(f64::from_bits(v.bits)),
        TVRT_TAG_STRING => Value::Str(heap.new_str(bytes(v.bits as *const u8, v.len))),
        TVRT_TAG_TABLE => Value::Table(GcRef::from_raw(v.bits as u32)),
        TVRT_TAG_USERDATA => Value::Userdata(GcRef::from_raw(v.bits as u32)),
        _ => return None,
    })
}

// Heap lifecycle

#[no_mangle]
pub extern "C" fn tvrt_heap_new_v1() -> *mut Heap {
    Box::into_raw(Box::new(Heap::new()))
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_heap_free_v1(heap: *mut Heap) {
    if !heap.is_null() {
        drop(Box::from_raw(heap));
    }
}

/// Colours are driven by the embedder's collector: 0 white, 1 gray, 2 black.
#[no_mangle]
pub unsafe extern "C" fn tvrt_heap_set_color_v1(heap: *mut Heap, obj: u32, color: u32) -> u32 {
    let Some(heap) = heap.as_mut() else {
        return 0;
    };
    let color = match color {
        0 => Color::White,
        1 => Color::Gray,
        2 => Color::Black,
        _ => return 0,
    };
    catch_unwind(AssertUnwindSafe(|| heap.set_color(GcRef::from_raw(obj), color))).is_ok() as u32
}

// Arithmetic

#[no_mangle]
pub unsafe extern "C" fn tvrt_div_v1(
    m: i64,
    n: i64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_i64 {
    i64_result(numeric::int_div(m, n, loc(file, line)))
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_mod_v1(
    m: i64,
    n: i64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_i64 {
    i64_result(numeric::int_mod(m, n, loc(file, line)))
}

#[no_mangle]
pub extern "C" fn tvrt_shl_v1(x: i64, y: i64) -> i64 {
    numeric::shl(x, y)
}

#[no_mangle]
pub extern "C" fn tvrt_shr_v1(x: i64, y: i64) -> i64 {
    numeric::shr(x, y)
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_checked_to_int_v1(
    d: f64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_i64 {
    i64_result(numeric::checked_to_int(d, loc(file, line)))
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_ceil_to_int_v1(
    d: f64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_i64 {
    i64_result(numeric::ceil_to_int(d, loc(file, line)))
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_floor_to_int_v1(
    d: f64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_i64 {
    i64_result(numeric::floor_to_int(d, loc(file, line)))
}

#[no_mangle]
pub extern "C" fn tvrt_log_v1(x: f64, base: f64) -> f64 {
    numeric::log(x, base)
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_modf_v1(n: f64, file: *const c_char, line: u32) -> tvrt_result_modf {
    match numeric::modf(n, loc(file, line)) {
        Ok((int_part, frac_part)) => tvrt_result_modf {
            tag: 1,
            payload: tvrt_result_modf_payload {
                ok: tvrt_modf_parts {
                    int_part,
                    frac_part,
                },
            },
        },
        Err(e) => tvrt_result_modf {
            tag: 0,
            payload: tvrt_result_modf_payload { err: fail(e) },
        },
    }
}

// Object checks

#[no_mangle]
pub extern "C" fn tvrt_is_truthy_v1(v: tvrt_value) -> u32 {
    is_truthy(&v) as u32
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_is_record_v1(
    heap: *const Heap,
    v: tvrt_value,
    expected: u32,
) -> u32 {
    let Some(heap) = heap.as_ref() else {
        return 0;
    };
    let res = catch_unwind(AssertUnwindSafe(|| {
        is_record(heap, &v, GcRef::from_raw(expected))
    }));
    res.unwrap_or(false) as u32
}

/// Must run before storing `child` into `owner`. An unknown handle is an internal
/// error: the store must not go ahead.
#[no_mangle]
pub unsafe extern "C" fn tvrt_barrier_v1(
    heap: *mut Heap,
    owner: u32,
    child: u32,
) -> tvrt_result_u32 {
    let Some(heap) = heap.as_mut() else {
        return err_u32(internal());
    };
    match catch_unwind(AssertUnwindSafe(|| {
        barrier_if_needed(heap, GcRef::from_raw(owner), GcRef::from_raw(child))
    })) {
        Ok(()) => ok_u32(0),
        Err(_) => err_u32(internal()),
    }
}

// Tables

/// Registers a field name once; the returned handle is what the field accessors take.
#[no_mangle]
pub unsafe extern "C" fn tvrt_intern_v1(
    heap: *mut Heap,
    ptr: *const u8,
    len: u32,
) -> tvrt_result_u32 {
    let Some(heap) = heap.as_mut() else {
        return err_u32(internal());
    };
    let name = bytes(ptr, len);
    match catch_unwind(AssertUnwindSafe(|| heap.register_key(name))) {
        Ok(Ok(id)) => ok_u32(id),
        Ok(Err(_)) => err_u32(fail(RuntimeError::new(ErrorKind::OutOfMemory, SrcLoc::NONE))),
        Err(_) => err_u32(internal()),
    }
}

/// Returns the new table's handle.
#[no_mangle]
pub unsafe extern "C" fn tvrt_create_table_v1(
    heap: *mut Heap,
    narray: i64,
    nrec: i64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_u32 {
    let Some(heap) = heap.as_mut() else {
        return err_u32(internal());
    };
    let loc = loc(file, line);
    match catch_unwind(AssertUnwindSafe(|| create_table(heap, narray, nrec, loc))) {
        Ok(res) => u32_result(res.map(GcRef::index)),
        Err(_) => err_u32(internal()),
    }
}

/// `key` comes from `tvrt_intern_v1`. `cache` is the call site's slot; it must start
/// out as `-1`.
#[no_mangle]
pub unsafe extern "C" fn tvrt_get_field_v1(
    heap: *const Heap,
    table: u32,
    key: u32,
    cache: *mut i32,
) -> tvrt_result_value {
    let (Some(heap), Some(cache)) = (heap.as_ref(), cache.as_mut()) else {
        return err_value(internal());
    };
    let res = catch_unwind(AssertUnwindSafe(|| {
        let key = heap.key(key)?;
        let mut slot = FieldCache::from_raw(*cache);
        let cell = get_field(heap.table(GcRef::from_raw(table)), key, &mut slot);
        *cache = slot.raw();
        value_to_ffi(cell)
    }));
    match res {
        Ok(Some(v)) => tvrt_result_value {
            tag: 1,
            payload: tvrt_result_value_payload { ok: v },
        },
        _ => err_value(internal()),
    }
}

/// Stores `value` under `key`, running the write barrier for collectable values.
#[no_mangle]
pub unsafe extern "C" fn tvrt_set_field_v1(
    heap: *mut Heap,
    table: u32,
    key: u32,
    value: tvrt_value,
    cache: *mut i32,
) -> tvrt_result_u32 {
    let (Some(heap), Some(cache)) = (heap.as_mut(), cache.as_mut()) else {
        return err_u32(internal());
    };
    let res = catch_unwind(AssertUnwindSafe(|| {
        let owner = GcRef::from_raw(table);
        let key = heap.key(key)?.clone();
        let val = value_from_ffi(heap, value)?;
        if let Some(child) = val.as_gc() {
            barrier_if_needed(heap, owner, child);
        }
        let mut slot = FieldCache::from_raw(*cache);
        let t = heap.table_mut(owner);
        let stored = match get_field_mut(t, &key, &mut slot) {
            Some(cell) => {
                *cell = val;
                true
            }
            None => t.set_str(&key, val).is_ok(),
        };
        *cache = slot.raw();
        Some(stored)
    }));
    match res {
        Ok(Some(true)) => ok_u32(0),
        Ok(Some(false)) => {
            err_u32(fail(RuntimeError::new(ErrorKind::OutOfMemory, SrcLoc::NONE)))
        }
        _ => err_u32(internal()),
    }
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_ensure_array_slot_v1(
    heap: *mut Heap,
    arr: u32,
    i: i64,
    file: *const c_char,
    line: u32,
) -> tvrt_result_u32 {
    let Some(heap) = heap.as_mut() else {
        return err_u32(internal());
    };
    let loc = loc(file, line);
    match catch_unwind(AssertUnwindSafe(|| {
        ensure_array_slot(heap, GcRef::from_raw(arr), i, loc)
    })) {
        Ok(res) => u32_result(res.map(|()| 0)),
        Err(_) => err_u32(internal()),
    }
}

// Loops

/// `ok` is 1 when the body broke out of the loop, 0 when it ran to completion.
#[no_mangle]
pub unsafe extern "C" fn tvrt_int_for_v1(
    init: i64,
    limit: i64,
    step: i64,
    file: *const c_char,
    line: u32,
    body: tvrt_int_body,
    ctx: *mut c_void,
) -> tvrt_result_u32 {
    let res = int_for(init, limit, step, loc(file, line), |i| {
        if body(i, ctx) != 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    u32_result(res.map(broke))
}

#[no_mangle]
pub unsafe extern "C" fn tvrt_float_for_v1(
    init: f64,
    limit: f64,
    step: f64,
    file: *const c_char,
    line: u32,
    body: tvrt_float_body,
    ctx: *mut c_void,
) -> tvrt_result_u32 {
    let res = float_for(init, limit, step, loc(file, line), |x| {
        if body(x, ctx) != 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    u32_result(res.map(broke))
}

// Errors

/// 0 when no error has been raised on this thread.
#[no_mangle]
pub extern "C" fn tvrt_last_error_code_v1() -> u32 {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(0, |e| e.code))
}

/// Copies up to `cap` bytes of the message into `buf` and returns its full length.
#[no_mangle]
pub unsafe extern "C" fn tvrt_last_error_message_v1(buf: *mut u8, cap: u32) -> u32 {
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let Some(e) = slot.as_ref() else {
            return 0;
        };
        let msg = e.message.as_bytes();
        if !buf.is_null() {
            let n = msg.len().min(cap as usize);
            std::ptr::copy_nonoverlapping(msg.as_ptr(), buf, n);
        }
        msg.len() as u32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvrt_contracts::{
        TVRT_ERR_DIVIDE_BY_ZERO, TVRT_ERR_INVALID_ARRAY_INDEX, TVRT_ERR_TABLE_OVERFLOW,
        TVRT_ERR_ZERO_STEP,
    };

    const FILE: &[u8] = b"ffi.tl\0";

    fn file() -> *const c_char {
        FILE.as_ptr() as *const c_char
    }

    unsafe fn intern(heap: *mut Heap, name: &[u8]) -> u32 {
        let r = tvrt_intern_v1(heap, name.as_ptr(), name.len() as u32);
        assert_eq!(r.tag, 1);
        r.payload.ok
    }

    fn last_message() -> String {
        let mut buf = [0u8; 128];
        let n = unsafe { tvrt_last_error_message_v1(buf.as_mut_ptr(), buf.len() as u32) };
        String::from_utf8_lossy(&buf[..n as usize]).into_owned()
    }

    #[test]
    fn div_reports_tag_and_code() {
        unsafe {
            let r = tvrt_div_v1(-7, 2, file(), 3);
            assert_eq!(r.tag, 1);
            assert_eq!(r.payload.ok, -4);

            let r = tvrt_div_v1(1, 0, file(), 3);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_DIVIDE_BY_ZERO);
        }
        assert_eq!(tvrt_last_error_code_v1(), TVRT_ERR_DIVIDE_BY_ZERO);
        assert_eq!(last_message(), "file ffi.tl: line 3: attempt to divide by zero");
    }

    #[test]
    fn modf_and_shifts() {
        unsafe {
            let r = tvrt_modf_v1(-2.5, std::ptr::null(), 0);
            assert_eq!(r.tag, 1);
            assert_eq!(r.payload.ok.int_part, -2);
            assert_eq!(r.payload.ok.frac_part, -0.5);
        }
        assert_eq!(tvrt_shl_v1(1, 70), 0);
        assert_eq!(tvrt_shr_v1(8, -1), 16);
        assert_eq!(tvrt_log_v1(100.0, 10.0), 2.0);
    }

    #[test]
    fn truthiness_of_flat_values() {
        let nil = tvrt_value { tag: TVRT_TAG_NIL, len: 0, bits: 0 };
        let zero = tvrt_value { tag: TVRT_TAG_INT, len: 0, bits: 0 };
        assert_eq!(tvrt_is_truthy_v1(nil), 0);
        assert_eq!(tvrt_is_truthy_v1(tvrt_value::from_bool(false)), 0);
        assert_eq!(tvrt_is_truthy_v1(tvrt_value::from_bool(true)), 1);
        assert_eq!(tvrt_is_truthy_v1(zero), 1);
    }

    extern "C" fn collect(i: i64, ctx: *mut c_void) -> u32 {
        let seen = unsafe { &mut *(ctx as *mut Vec<i64>) };
        seen.push(i);
        (i == 3) as u32
    }

    extern "C" fn sum_until_two(x: f64, ctx: *mut c_void) -> u32 {
        let sum = unsafe { &mut *(ctx as *mut f64) };
        *sum += x;
        (x >= 2.0) as u32
    }

    #[test]
    fn float_loop_through_callback() {
        let mut sum = 0.0f64;
        let ctx = &mut sum as *mut f64 as *mut c_void;
        unsafe {
            let r = tvrt_float_for_v1(0.5, 1.5, 0.5, file(), 2, sum_until_two, ctx);
            assert_eq!(r.tag, 1);
            assert_eq!(r.payload.ok, 0);
            assert_eq!(sum, 3.0);

            let r = tvrt_float_for_v1(1.0, 10.0, 1.0, file(), 2, sum_until_two, ctx);
            assert_eq!(r.payload.ok, 1);
            assert_eq!(sum, 6.0);

            let r = tvrt_float_for_v1(0.0, 1.0, 0.0, file(), 2, sum_until_two, ctx);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_ZERO_STEP);
        }
        assert_eq!(sum, 6.0);
        assert_eq!(last_message(), "file ffi.tl: line 2: 'for' step is zero");
    }

    #[test]
    fn int_loop_through_callback() {
        let mut seen: Vec<i64> = Vec::new();
        let ctx = &mut seen as *mut Vec<i64> as *mut c_void;
        unsafe {
            let r = tvrt_int_for_v1(10, 1, -4, file(), 1, collect, ctx);
            assert_eq!(r.tag, 1);
            assert_eq!(r.payload.ok, 0);
            let r = tvrt_int_for_v1(1, 10, 1, file(), 1, collect, ctx);
            assert_eq!(r.payload.ok, 1);
            let r = tvrt_int_for_v1(1, 10, 0, file(), 1, collect, ctx);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_ZERO_STEP);
        }
        assert_eq!(seen, vec![10, 6, 2, 1, 2, 3]);
    }

    #[test]
    fn table_fields_through_heap_handle() {
        unsafe {
            let heap = tvrt_heap_new_v1();
            let r = tvrt_create_table_v1(heap, 0, 4, file(), 1);
            assert_eq!(r.tag, 1);
            let t = r.payload.ok;

            let key = intern(heap, b"speed");
            let mut cache = FieldCache::UNSET.raw();
            let val = tvrt_value { tag: TVRT_TAG_INT, len: 0, bits: 88 };
            let r = tvrt_set_field_v1(heap, t, key, val, &mut cache);
            assert_eq!(r.tag, 1);

            let mut cache = FieldCache::UNSET.raw();
            let r = tvrt_get_field_v1(heap, t, key, &mut cache);
            assert_eq!(r.tag, 1);
            assert_eq!(r.payload.ok.tag, TVRT_TAG_INT);
            assert_eq!(r.payload.ok.bits, 88);
            assert!(cache >= 0);
            let r = tvrt_get_field_v1(heap, t, key, &mut cache);
            assert_eq!(r.payload.ok.bits, 88);

            let missing = intern(heap, b"nope");
            let mut cache = FieldCache::UNSET.raw();
            let r = tvrt_get_field_v1(heap, t, missing, &mut cache);
            assert_eq!(r.payload.ok.tag, TVRT_TAG_ABSENT);
            assert_eq!(cache, FieldCache::MISS.raw());

            let r = tvrt_get_field_v1(heap, t, missing + 1, &mut cache);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_INTERNAL);

            let r = tvrt_ensure_array_slot_v1(heap, t, 0, file(), 5);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_INVALID_ARRAY_INDEX);
            let r = tvrt_ensure_array_slot_v1(heap, t, 3, file(), 5);
            assert_eq!(r.tag, 1);
            assert_eq!((*heap).table(GcRef::from_raw(t)).array_limit(), 4);

            tvrt_heap_free_v1(heap);
        }
    }

    #[test]
    fn set_field_runs_barrier() {
        unsafe {
            let heap = tvrt_heap_new_v1();
            let owner = tvrt_create_table_v1(heap, 0, 0, std::ptr::null(), 0).payload.ok;
            let child = tvrt_create_table_v1(heap, 0, 0, std::ptr::null(), 0).payload.ok;
            assert_eq!(tvrt_heap_set_color_v1(heap, owner, 2), 1);

            let key = intern(heap, b"next");
            let val = tvrt_value { tag: TVRT_TAG_TABLE, len: 0, bits: child as u64 };
            let mut cache = -1;
            let r = tvrt_set_field_v1(heap, owner, key, val, &mut cache);
            assert_eq!(r.tag, 1);
            assert_eq!((*heap).color(GcRef::from_raw(owner)), Color::Gray);

            tvrt_heap_free_v1(heap);
        }
    }

    #[test]
    fn bad_handles_are_internal_errors() {
        unsafe {
            let heap = tvrt_heap_new_v1();
            let r = tvrt_ensure_array_slot_v1(heap, 99, 1, std::ptr::null(), 0);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_INTERNAL);
            tvrt_heap_free_v1(heap);
        }
    }

    #[test]
    fn barrier_with_unknown_child_is_reported() {
        unsafe {
            let heap = tvrt_heap_new_v1();
            let owner = tvrt_create_table_v1(heap, 0, 0, std::ptr::null(), 0).payload.ok;
            let child = tvrt_create_table_v1(heap, 0, 0, std::ptr::null(), 0).payload.ok;
            assert_eq!(tvrt_heap_set_color_v1(heap, owner, 2), 1);

            let r = tvrt_barrier_v1(heap, owner, 999);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_INTERNAL);
            assert_eq!(tvrt_last_error_code_v1(), TVRT_ERR_INTERNAL);

            let r = tvrt_barrier_v1(heap, owner, child);
            assert_eq!(r.tag, 1);
            assert_eq!((*heap).color(GcRef::from_raw(owner)), Color::Gray);

            let r = tvrt_barrier_v1(std::ptr::null_mut(), owner, child);
            assert_eq!(r.tag, 0);
            tvrt_heap_free_v1(heap);
        }
    }

    #[test]
    fn oversized_table_hint_is_not_fatal() {
        unsafe {
            let heap = tvrt_heap_new_v1();
            let r = tvrt_create_table_v1(heap, i64::MAX, 0, file(), 8);
            assert_eq!(r.tag, 0);
            assert_eq!(r.payload.err, TVRT_ERR_TABLE_OVERFLOW);
            assert_eq!(last_message(), "file ffi.tl: line 8: table overflow");
            tvrt_heap_free_v1(heap);
        }
    }

    #[test]
    fn non_utf8_file_name_is_replaced() {
        const BAD: &[u8] = b"\xffbad.tl\0";
        let r = unsafe { tvrt_div_v1(1, 0, BAD.as_ptr() as *const c_char, 4) };
        assert_eq!(r.tag, 0);
        assert_eq!(last_message(), "file ?: line 4: attempt to divide by zero");
    }
}
