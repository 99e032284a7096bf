//! End-to-end desugaring of the four reference shapes: a single marker in a
//! local initializer, two markers in one expression, a marker in an `if`
//! condition, and nested markers.

mod common;

use bailout::tree::printer::print_unit;
use bailout::tree::{BinaryOp, Span};
use bailout::{CompilationPhase, CompileError, DesugarOutcome, UNSUPPORTED_POSITION};
use common::{Fixture, desugar, err, ok, run_main};

fn outcome(passes: usize, rewrites: usize) -> DesugarOutcome {
    DesugarOutcome {
        passes,
        rewrites,
        reached_fixpoint: true,
    }
}

#[test]
fn local_initializer_becomes_an_early_return() {
    let mut fx = Fixture::new("scenario_a");
    let result = fx.result;
    fx.host("f", result);
    let f = fx.unwrap_call("f");
    let local = fx.b.local("x", f);
    let x = fx.b.name("x");
    let ok_x = fx.ok(x);
    let ret = fx.b.ret(ok_x);
    let compiled = desugar(fx.main(vec![local, ret]));

    assert_eq!(compiled.outcome.expect("legal position"), outcome(2, 1));
    assert!(compiled.diagnostics.is_empty());
    insta::assert_snapshot!(print_unit(&compiled.unit), @r"
    Result<int, String> main() {
        var $r0 = f();
        if ($r0.isErr()) {
            return Result.err($r0.getError());
        }
        var $v1 = $r0.get();
        var x = $v1;
        return Result.ok(x);
    }
    ");

    let (value, calls) = run_main(&compiled.unit, &[("f", err("boom"))]);
    assert_eq!(value, err("boom"));
    assert_eq!(calls, ["main", "f"]);

    let (value, _) = run_main(&compiled.unit, &[("f", ok(41))]);
    assert_eq!(value, ok(41));
}

#[test]
fn two_markers_in_one_expression_short_circuit_left_to_right() {
    let mut fx = Fixture::new("scenario_b");
    let result = fx.result;
    fx.host("a", result);
    fx.host("b", result);
    let a = fx.unwrap_call("a");
    let b = fx.unwrap_call("b");
    let sum = fx.b.binary(BinaryOp::Add, a, b);
    let ok_sum = fx.ok(sum);
    let ret = fx.b.ret(ok_sum);
    let compiled = desugar(fx.main(vec![ret]));

    assert_eq!(compiled.outcome.expect("legal position"), outcome(3, 2));
    insta::assert_snapshot!(print_unit(&compiled.unit), @r"
    Result<int, String> main() {
        var $r0 = a();
        if ($r0.isErr()) {
            return Result.err($r0.getError());
        }
        var $v1 = $r0.get();
        var $r2 = b();
        if ($r2.isErr()) {
            return Result.err($r2.getError());
        }
        var $v3 = $r2.get();
        return Result.ok($v1 + $v3);
    }
    ");

    let (value, calls) = run_main(&compiled.unit, &[("a", err("first")), ("b", ok(2))]);
    assert_eq!(value, err("first"));
    assert_eq!(calls, ["main", "a"]);

    let (value, calls) = run_main(&compiled.unit, &[("a", ok(1)), ("b", err("second"))]);
    assert_eq!(value, err("second"));
    assert_eq!(calls, ["main", "a", "b"]);

    let (value, _) = run_main(&compiled.unit, &[("a", ok(1)), ("b", ok(2))]);
    assert_eq!(value, ok(3));
}

#[test]
fn marker_in_if_condition_is_reported_once() {
    let mut fx = Fixture::new("scenario_c");
    let result = fx.result;
    fx.host("f", result);
    fx.b.at(Span::new(200, 211));
    let f = fx.unwrap_call("f");
    fx.b.unpin();
    let zero = fx.b.int(0);
    let cond = fx.b.binary(BinaryOp::Gt, f, zero);
    let then_ret = fx.ret_ok(1);
    let if_stmt = fx.b.if_(cond, [then_ret], None);
    let tail = fx.ret_ok(0);
    let compiled = desugar(fx.main(vec![if_stmt, tail]));

    let Err(CompileError::Desugar(failure)) = compiled.outcome else {
        panic!("expected an unsupported-position failure");
    };
    assert_eq!(failure.diagnostics.len(), 1);
    let diagnostic = &failure.diagnostics[0];
    assert_eq!(diagnostic.message, UNSUPPORTED_POSITION);
    assert_eq!(diagnostic.phase, CompilationPhase::Desugaring);
    assert_eq!(diagnostic.span, Span::new(200, 211));
    assert_eq!(compiled.diagnostics, failure.diagnostics);
    assert!(print_unit(&compiled.unit).contains("if (f().unwrap() > 0) {"));
}

#[test]
fn nested_markers_are_peeled_outermost_first() {
    let mut fx = Fixture::new("scenario_d");
    let result = fx.result;
    fx.host("idx", result);
    let arr_ty = fx.b.array_ty(result);
    let idx = fx.unwrap_call("idx");
    let arr = fx.b.name("arr");
    let element = fx.b.index(arr, idx);
    let outer = fx.b.unwrap(element);
    let ok_outer = fx.ok(outer);
    let ret = fx.b.ret(ok_outer);

    // main() builds the array and hands it to pick(arr)
    let one = fx.b.int(1);
    let two = fx.b.int(2);
    let ok_one = fx.ok(one);
    let bad = fx.b.str("bad element");
    let err_bad = fx.b.static_call("Result", "err", [bad]);
    let ok_two = fx.ok(two);
    let lit = fx.b.array_lit(result, [ok_one, err_bad, ok_two]);
    let items = fx.b.local("items", lit);
    let items_name = fx.b.name("items");
    let pick = fx.b.call("pick", [items_name]);
    let main_ret = fx.b.ret(pick);
    fx.b.func("pick", &[("arr", arr_ty)], result, [ret]);
    let compiled = desugar(fx.main(vec![items, main_ret]));

    assert_eq!(compiled.outcome.expect("legal position"), outcome(3, 2));
    insta::assert_snapshot!(print_unit(&compiled.unit), @r#"
    Result<int, String> pick(Result<int, String>[] arr) {
        var $r2 = idx();
        if ($r2.isErr()) {
            return Result.err($r2.getError());
        }
        var $v3 = $r2.get();
        var $r0 = arr[$v3];
        if ($r0.isErr()) {
            return Result.err($r0.getError());
        }
        var $v1 = $r0.get();
        return Result.ok($v1);
    }

    Result<int, String> main() {
        var items = new Result<int, String>[] {Result.ok(1), Result.err("bad element"), Result.ok(2)};
        return pick(items);
    }
    "#);

    let (value, calls) = run_main(&compiled.unit, &[("idx", err("no index"))]);
    assert_eq!(value, err("no index"));
    assert_eq!(calls, ["main", "pick", "idx"]);

    let (value, _) = run_main(&compiled.unit, &[("idx", ok(1))]);
    assert_eq!(value, err("bad element"));

    let (value, _) = run_main(&compiled.unit, &[("idx", ok(2))]);
    assert_eq!(value, ok(2));
}
