//! Benchmarks for compiling and executing Heir programs.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use heir_core::{Engine, Scope, VirtualMachine};

const FIB: &str = "fn fib(n) { if n < 2 return n; return fib(n - 1) + fib(n - 2); } fib(15)";
const ARITHMETIC: &str = "let mut a = 0; a += 1; a *= 3; a -= 2; a //= 2; a ^= 2; a";
const OBJECTS: &str = "let o = { a: 1, b: { c: \"two\", [3]: true }, e: 'x' }; o.b.c";

fn compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, source) in [("fib", FIB), ("arithmetic", ARITHMETIC), ("objects", OBJECTS)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| Engine::new().compile(black_box(source)))
        });
    }
    group.finish();
}

fn execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    for (name, source) in [("fib", FIB), ("arithmetic", ARITHMETIC), ("objects", OBJECTS)] {
        let bytecode = Engine::new().compile(source);
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytecode, |b, bytecode| {
            b.iter(|| VirtualMachine::new(black_box(bytecode), Scope::new()).evaluate())
        });
    }
    group.finish();
}

criterion_group!(benches, compile, execute);
criterion_main!(benches);
