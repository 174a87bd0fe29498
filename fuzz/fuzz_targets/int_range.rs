#![no_main]

use libfuzzer_sys::fuzz_target;
use tvrt_corelib::{IntRange, SrcLoc};

const MAX_VALUES: u64 = 1 << 16;

// Compares the unsigned-count loop against a wide-integer model.
fuzz_target!(|data: [i64; 3]| {
    let [init, limit, step] = data;
    let Ok(range) = IntRange::new(init, limit, step, SrcLoc::NONE) else {
        assert_eq!(step, 0);
        return;
    };

    let (step, limit) = (step as i128, limit as i128);
    let mut v = init as i128;
    let mut n = 0u64;
    for got in range.take(MAX_VALUES as usize) {
        assert!(if step > 0 { v <= limit } else { v >= limit });
        assert_eq!(got as i128, v);
        v += step;
        n += 1;
    }
    if n < MAX_VALUES {
        assert!(if step > 0 { v > limit } else { v < limit });
    }
});
