use std::ops::ControlFlow;

use serde_json::json;
use tvrt_corelib::{
    ceil_to_int, checked_to_int, floor_to_int, int_div, int_for, int_mod, modf, shl, shr, ErrorKind,
    IntRange, SrcLoc,
};

const LOC: SrcLoc<'static> = SrcLoc::new("prims.tl", 10);

#[test]
fn integer_loop_matches_manual_count() {
    let cases = [
        (1i64, 10i64, 1i64),
        (10, 1, -1),
        (-5, 5, 2),
        (5, -5, -3),
        (0, 0, 7),
        (i64::MAX - 10, i64::MAX, 3),
        (i64::MIN + 10, i64::MIN, -3),
    ];
    for (init, limit, step) in cases {
        let mut manual = Vec::new();
        let mut v = init as i128;
        while if step > 0 { v <= limit as i128 } else { v >= limit as i128 } {
            manual.push(v as i64);
            v += step as i128;
        }
        let got: Vec<i64> = IntRange::new(init, limit, step, LOC).unwrap().collect();
        assert_eq!(got, manual, "for {init}, {limit}, {step}");
    }
}

#[test]
fn loop_body_sees_values_until_break() {
    let mut total = 0i64;
    let flow = int_for(1, 100, 1, LOC, |i| {
        total += i;
        if total > 20 {
            ControlFlow::Break(i)
        } else {
            ControlFlow::Continue(())
        }
    })
    .unwrap();
    assert_eq!(flow, ControlFlow::Break(6));
    assert_eq!(total, 21);
}

#[test]
fn floor_semantics_agree_with_float_floor() {
    for m in -20i64..=20 {
        for n in (-6i64..=6).filter(|&n| n != 0) {
            let q = int_div(m, n, LOC).unwrap();
            assert_eq!(q, (m as f64 / n as f64).floor() as i64, "{m} // {n}");
            assert_eq!(int_mod(m, n, LOC).unwrap(), m - q * n, "{m} % {n}");
        }
    }
}

#[test]
fn shifts_by_width_boundaries() {
    assert_eq!(shl(1, 63), i64::MIN);
    assert_eq!(shl(1, 64), 0);
    assert_eq!(shr(i64::MIN, 63), 1);
    assert_eq!(shr(i64::MIN, 64), 0);
    assert_eq!(shl(i64::MIN, -63), 1);
    assert_eq!(shr(1, -63), i64::MIN);
}

#[test]
fn float_conversions_report_location() {
    let err = checked_to_int(0.5, LOC).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NumberToInteger);
    assert_eq!(
        err.to_diag_json(),
        json!({
            "schema_version": "tvrt.diag@0.1.0",
            "code": 41004,
            "kind": "number_to_integer",
            "message": "conversion from float does not fit into integer",
            "file": "prims.tl",
            "line": 10,
            "fatal": false,
        })
    );
    assert_eq!(floor_to_int(-0.5, LOC).unwrap(), -1);
    assert_eq!(ceil_to_int(-0.5, LOC).unwrap(), 0);
    assert_eq!(modf(-0.25, LOC).unwrap(), (0, -0.25));
}

#[test]
fn errors_without_location_omit_file_and_line() {
    let err = int_div(1, 0, SrcLoc::NONE).unwrap_err();
    assert_eq!(
        err.to_diag_json(),
        json!({
            "schema_version": "tvrt.diag@0.1.0",
            "code": 41001,
            "kind": "divide_by_zero",
            "message": "attempt to divide by zero",
            "file": null,
            "line": null,
            "fatal": false,
        })
    );
}
