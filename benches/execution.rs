//! Execution benchmarks for the bytecode engine.
//!
//! These benchmarks measure instruction dispatch, call overhead and
//! compound value construction.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stackvm::builder::ScriptBuilder;
use stackvm::parser::opcode::OpCode;
use stackvm::parser::Script;
use stackvm::runtime::{Engine, Value, VmState};
use std::hint::black_box;
use std::sync::Arc;

/// Count down from `n` to zero
fn countdown(n: i64) -> Script {
    // 0: PUSHn  k: DEC  k+1: DUP  k+2: JMPIF -2
    let bytes = ScriptBuilder::new()
        .push_int(n)
        .emit(OpCode::Dec)
        .emit(OpCode::Dup)
        .jump(OpCode::JmpIf, -2)
        .build();
    Script::new(bytes).expect("countdown decodes")
}

/// Iterative fibonacci of the value left in argument 0
fn fib_iterative(n: i64) -> Script {
    // locals: 0 = a, 1 = b; argument 0 = remaining
    let prologue = ScriptBuilder::new()
        .push_int(n)
        .emit_with(OpCode::InitSlot, &[2, 1])
        .push_int(0)
        .emit(OpCode::StLoc0)
        .push_int(1)
        .emit(OpCode::StLoc1);
    let body_start = prologue.len();
    let body = prologue
        .emit(OpCode::LdArg0)
        .jump(OpCode::JmpIfNot, 13)
        .emit(OpCode::LdLoc0)
        .emit(OpCode::LdLoc1)
        .emit(OpCode::Dup)
        .emit(OpCode::StLoc0)
        .emit(OpCode::Add)
        .emit(OpCode::StLoc1)
        .emit(OpCode::LdArg0)
        .emit(OpCode::Dec)
        .emit(OpCode::StArg0);
    let back = body_start as i32 - body.len() as i32;
    let bytes = body.jump(OpCode::Jmp, back).emit(OpCode::LdLoc0).build();
    Script::new(bytes).expect("fib decodes")
}

fn run(script: &Arc<Script>) -> Engine {
    let mut engine = Engine::new(Arc::clone(script));
    engine.run();
    engine
}

/// Verify scripts before benchmarking
fn verify_scripts() {
    let engine = run(&Arc::new(countdown(1000)));
    assert_eq!(engine.state(), VmState::Halt, "countdown should halt");
    assert_eq!(engine.stack().values(), &[Value::from_int(0)]);

    for (n, expected) in [(0, 0), (1, 1), (10, 55), (20, 6765), (90, 2880067194370816120)] {
        let engine = run(&Arc::new(fib_iterative(n)));
        assert_eq!(engine.state(), VmState::Halt, "fib({}) should halt: {:?}", n, engine.error());
        assert_eq!(
            engine.stack().values(),
            &[Value::from_int(expected)],
            "fib({}) should be {}",
            n,
            expected
        );
    }

    println!("All script correctness checks passed.");
}

fn bench_countdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for n in [1_000, 10_000, 100_000] {
        let script = Arc::new(countdown(n));
        group.bench_with_input(BenchmarkId::new("countdown", n), &script, |b, script| {
            b.iter(|| black_box(run(script)))
        });
    }
    group.finish();
}

fn bench_fib_iterative(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    for n in [10, 50, 90] {
        let script = Arc::new(fib_iterative(n));
        group.bench_with_input(BenchmarkId::new("fib_iterative", n), &script, |b, script| {
            b.iter(|| black_box(run(script)))
        });
    }
    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("compound");
    for size in [16, 256, 1024] {
        let items: Vec<Value> = (0..size).map(Value::from_int).collect();
        let script = Arc::new(Script::new(ScriptBuilder::new().create_array(&items).build()).expect("pack decodes"));
        group.bench_with_input(BenchmarkId::new("pack", size), &script, |b, script| {
            b.iter(|| black_box(run(script)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let items: Vec<Value> = (0..1024).map(Value::from_int).collect();
    let bytes = ScriptBuilder::new().create_array(&items).build();
    c.bench_function("decode/pack_1024", |b| b.iter(|| black_box(Script::new(bytes.clone()))));
}

fn all_benches(c: &mut Criterion) {
    verify_scripts();
    bench_countdown(c);
    bench_fib_iterative(c);
    bench_pack(c);
    bench_decode(c);
}

criterion_group!(benches, all_benches);
criterion_main!(benches);
