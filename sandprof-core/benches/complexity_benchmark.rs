use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sandprof_core::bottleneck;
use sandprof_core::complexity;
use sandprof_core::types::{MemorySample, MIB};

const SMALL_JS: &str = r#"
import React from 'react';
function App() {
  if (loading) { return null; }
  return <div />;
}
"#;

const MEDIUM_PY: &str = r#"
import os
from pathlib import Path

class Walker:
    def walk(self, root):
        for entry in os.scandir(root):
            if entry.is_dir() and not entry.name.startswith('.'):
                self.walk(entry.path)
            elif entry.is_file():
                try:
                    yield Path(entry.path)
                except (OSError):
                    continue
"#;

fn generated_source(functions: usize) -> String {
    let mut code = String::from("import fs from 'fs';\n");
    for i in 0..functions {
        code.push_str(&format!(
            "function handler{i}(req) {{\n  if (req.a && req.b) {{\n    for (let j = 0; j < 3; j++) {{\n      while (busy()) {{ wait(); }}\n    }}\n  }} else if (req.c) {{\n    try {{ run(); }} catch (e) {{ log(e); }}\n  }}\n}}\n"
        ));
    }
    code
}

fn complexity_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("complexity");

    group.throughput(Throughput::Bytes(SMALL_JS.len() as u64));
    group.bench_function("small_js", |b| {
        b.iter(|| complexity::analyze(black_box(SMALL_JS)));
    });

    group.throughput(Throughput::Bytes(MEDIUM_PY.len() as u64));
    group.bench_function("medium_python", |b| {
        b.iter(|| complexity::analyze(black_box(MEDIUM_PY)));
    });

    for functions in [10, 100, 1000] {
        let code = generated_source(functions);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(BenchmarkId::new("generated", functions), &code, |b, code| {
            b.iter(|| complexity::analyze(black_box(code)));
        });
    }

    group.finish();
}

fn bottleneck_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bottleneck");

    for count in [100, 10_000] {
        let samples: Vec<MemorySample> = (0..count)
            .map(|i| MemorySample {
                timestamp: i as f64 * 100.0,
                usage: (i as u64 % 64) * MIB,
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("memory_jump", count), &samples, |b, samples| {
            b.iter(|| bottleneck::max_memory_jump(black_box(samples)));
        });
    }

    group.finish();
}

criterion_group!(benches, complexity_benchmarks, bottleneck_benchmarks);
criterion_main!(benches);
