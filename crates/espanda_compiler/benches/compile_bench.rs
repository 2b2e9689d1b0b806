//! Benchmark harness for the espanda pipeline.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p espanda_compiler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use espanda_binder::bind;
use espanda_checker::Checker;
use espanda_codegen::{compile, CodegenOptions};
use espanda_compiler::Program;
use espanda_core::StringInterner;
use espanda_options::CompilerOptions;
use espanda_parser::parse;
use espanda_scanner::{Scanner, TokenKind};

/// Small TypeScript source for micro-benchmarks.
const SMALL_SOURCE: &str = r#"
const x: number = 42;
let greeting: string = "hello";
function add(a: number, b: number): number {
    return a + b;
}
const result = add(1, 2);
"#;

/// Medium TypeScript source for realistic benchmarks.
const MEDIUM_SOURCE: &str = r#"
interface Shape {
    area(): number;
    perimeter(): number;
}

class Circle implements Shape {
    radius: number;
    constructor(radius: number) {
        this.radius = radius;
    }

    area(): number {
        return 3.14159 * this.radius ** 2;
    }

    perimeter(): number {
        return 2 * 3.14159 * this.radius;
    }
}

class Rectangle implements Shape {
    width: number;
    height: number;
    constructor(width: number, height: number) {
        this.width = width;
        this.height = height;
    }

    area(): number {
        return this.width * this.height;
    }

    perimeter(): number {
        return 2 * (this.width + this.height);
    }
}

function totalArea(shapes: Shape[]): number {
    let total = 0;
    for (const shape of shapes) {
        total += shape.area();
    }
    return total;
}

type Result<T> = { ok: true; value: T } | { ok: false; error: string };

function parsePositive(input: number): Result<number> {
    if (input < 0) {
        return { ok: false, error: `${input} is negative` };
    }
    return { ok: true, value: input };
}

async function settle(p: Promise<number>): Promise<number> {
    const value = await p;
    return value + 1;
}

const shapes: Shape[] = [
    new Circle(5),
    new Rectangle(3, 4),
    new Circle(10),
];
const area = totalArea(shapes);
"#;

/// Generate a large TypeScript source.
fn generate_large_source(num_classes: usize, num_functions: usize) -> String {
    let mut source = String::new();

    for i in 0..num_classes {
        source.push_str(&format!(
            "class Class{i} {{
    field{i}: number;
    constructor(value: number) {{
        this.field{i} = value;
    }}
    method{i}(): number {{
        return this.field{i} * 2;
    }}
    static create(value: number): Class{i} {{
        return new Class{i}(value);
    }}
}}\n\n"
        ));
    }

    for i in 0..num_functions {
        source.push_str(&format!(
            "function func{i}(x: number, y: string): {{ num: number; str: string }} {{
    return {{ num: x + {i}, str: y + '{i}' }};
}}\n\n"
        ));
    }

    source
}

/// Parse, bind, check and generate code for one file.
fn run_pipeline(source: &str) {
    let parsed = parse("bench.ts", source, StringInterner::new());
    let mut bound = bind(&parsed.ast);
    {
        let mut checker = Checker::new(&parsed.ast, &mut bound.scopes);
        checker.check_program(parsed.ast.root());
        black_box(checker.diagnostics().len());
    }
    let _ = black_box(compile(&parsed.ast, &bound.scopes, &CodegenOptions::default()));
}

// ============================================================================
// Scanner Benchmarks
// ============================================================================

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    group.bench_function("small", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new("bench.ts", black_box(SMALL_SOURCE));
            while scanner.scan() != TokenKind::EndOfFile {}
        });
    });

    group.bench_function("medium", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new("bench.ts", black_box(MEDIUM_SOURCE));
            while scanner.scan() != TokenKind::EndOfFile {}
        });
    });

    let large = generate_large_source(50, 50);
    group.bench_function("large", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new("bench.ts", black_box(&large));
            while scanner.scan() != TokenKind::EndOfFile {}
        });
    });

    group.finish();
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    group.bench_function("medium", |b| {
        b.iter(|| black_box(parse("bench.ts", black_box(MEDIUM_SOURCE), StringInterner::new())));
    });

    let large = generate_large_source(50, 50);
    group.bench_function("large", |b| {
        b.iter(|| black_box(parse("bench.ts", black_box(&large), StringInterner::new())));
    });

    group.finish();
}

// ============================================================================
// Binder Benchmarks
// ============================================================================

fn bench_binder(c: &mut Criterion) {
    let mut group = c.benchmark_group("binder");

    let parsed = parse("bench.ts", MEDIUM_SOURCE, StringInterner::new());
    group.bench_function("medium", |b| {
        b.iter(|| black_box(bind(black_box(&parsed.ast))));
    });

    let large = generate_large_source(50, 50);
    let parsed = parse("bench.ts", &large, StringInterner::new());
    group.bench_function("large", |b| {
        b.iter(|| black_box(bind(black_box(&parsed.ast))));
    });

    group.finish();
}

// ============================================================================
// Code Generation Benchmarks
// ============================================================================

fn bench_codegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("codegen");

    let large = generate_large_source(50, 50);
    let parsed = parse("bench.ts", &large, StringInterner::new());
    let bound = bind(&parsed.ast);
    group.bench_function("large", |b| {
        b.iter(|| {
            let _ = black_box(compile(&parsed.ast, &bound.scopes, &CodegenOptions::default()));
        });
    });

    group.finish();
}

// ============================================================================
// Full Pipeline Benchmarks
// ============================================================================

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");

    group.bench_function("small", |b| b.iter(|| run_pipeline(black_box(SMALL_SOURCE))));
    group.bench_function("medium", |b| b.iter(|| run_pipeline(black_box(MEDIUM_SOURCE))));

    let large = generate_large_source(50, 50);
    group.bench_function("large", |b| b.iter(|| run_pipeline(black_box(&large))));

    group.finish();
}

// ============================================================================
// Program Benchmarks
// ============================================================================

fn bench_program_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("program_compile");

    group.bench_function("single_file", |b| {
        b.iter(|| {
            let mut program = Program::new(vec![], CompilerOptions::default());
            program.add_source("bench.ts", MEDIUM_SOURCE);
            black_box(program.compile())
        });
    });

    group.bench_function("multiple_files", |b| {
        b.iter(|| {
            let mut program = Program::new(vec![], CompilerOptions::default());
            for i in 0..10 {
                program.add_source(format!("file_{i}.ts"), MEDIUM_SOURCE);
            }
            black_box(program.compile())
        });
    });

    group.finish();
}

// ============================================================================
// Scaling Benchmarks
// ============================================================================

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for size in [10, 50, 100, 200] {
        let source = generate_large_source(size / 2, size / 2);
        group.bench_with_input(BenchmarkId::new("classes_and_functions", size), &source, |b, source| {
            b.iter(|| run_pipeline(black_box(source)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scanner,
    bench_parser,
    bench_binder,
    bench_codegen,
    bench_full_pipeline,
    bench_program_compile,
    bench_scaling,
);
criterion_main!(benches);
