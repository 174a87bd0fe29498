#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use tvrt_corelib::{ensure_array_slot, get_field, FieldCache, SrcLoc};
use tvrt_host::{Heap, Value};

// Each 3-byte chunk is one operation against a table and a HashMap model.
fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 3 * 4096 {
        &data[..3 * 4096]
    } else {
        data
    };

    let mut heap = Heap::new();
    let Ok(t) = heap.alloc_table(Default::default()) else {
        return;
    };
    let names: Vec<_> = (0..16u8).map(|i| heap.new_str(&[b'f', i])).collect();
    let mut caches = [FieldCache::new(); 16];
    let mut ints: HashMap<i64, i64> = HashMap::new();
    let mut fields: HashMap<usize, i64> = HashMap::new();

    for op in data.chunks_exact(3) {
        let k = (op[1] as i64) - 32;
        let v = op[2] as i64;
        match op[0] % 4 {
            0 => {
                if heap.table_mut(t).set_int(k, Value::Int(v)).is_ok() {
                    ints.insert(k, v);
                }
            }
            1 => {
                let _ = heap.table_mut(t).set_int(k, Value::Nil);
                ints.remove(&k);
            }
            2 => {
                let f = (op[1] % 16) as usize;
                if heap.table_mut(t).set_str(&names[f], Value::Int(v)).is_ok() {
                    fields.insert(f, v);
                }
            }
            _ => {
                let _ = ensure_array_slot(&mut heap, t, k, SrcLoc::NONE);
            }
        }
    }

    let table = heap.table(t);
    for k in -32..=223 {
        let got = match table.get_int(k) {
            Value::Int(v) => Some(*v),
            _ => None,
        };
        assert_eq!(got, ints.get(&k).copied(), "int key {k}");
        if (k as usize).wrapping_sub(1) < table.array_limit() {
            assert!(!table.in_hash_part(k));
        }
    }
    for (f, name) in names.iter().enumerate() {
        let got = match get_field(table, name, &mut caches[f]) {
            Value::Int(v) => Some(*v),
            _ => None,
        };
        assert_eq!(got, fields.get(&f).copied(), "field {f}");
    }
});
