//! Benchmarks for msgpgen core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use msgpgen::core::directive::parse_directive;
use msgpgen::core::extractor::Extractor;
use msgpgen::core::generate::sort_output;
use msgpgen::core::state::State;
use msgpgen::core::types::TypeName;
use msgpgen::packages::manifest::ManifestPackageSet;
use msgpgen::provenance::hasher::hash_bytes;
use std::fmt::Write;
use std::path::Path;

fn bench_directive_parse(c: &mut Criterion) {
    let lines = [
        "//msgp:ignore Foo Bar Baz",
        "//msgp:tuple example.com/app.User",
        "//msgp:shim time.Duration as:int64 using:int64/time.Duration mode:cast",
        "//msgp:intercept shapes.Shape using:example_com_shapes_ShapeInterceptor",
    ];
    let mut group = c.benchmark_group("directive_parse");
    for line in lines {
        let name = line.split_whitespace().next().unwrap_or(line);
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| black_box(parse_directive(black_box(line)).unwrap()));
        });
    }
    group.finish();
}

fn bench_sort_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_output");
    for n in [16, 128, 1024] {
        let parts: Vec<String> = (0..n)
            .map(|i| match i % 3 {
                0 => format!("//msgp:shim p{}.T as:int32 using:int32/p{}.T mode:cast", i, i),
                1 => format!("//msgp:tuple T{}", i),
                _ => format!("type T{} struct {{\n\tX int\n}}", i),
            })
            .rev()
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &parts, |b, parts| {
            b.iter(|| {
                let mut p = parts.clone();
                sort_output(&mut p);
                black_box(p);
            });
        });
    }
    group.finish();
}

/// `pkgs` packages, each with a chain of `depth` structs, a named primitive
/// and an interface implemented in every package.
fn generated_manifest(pkgs: usize, depth: usize) -> String {
    let mut yaml = String::from("packages:\n  example.com/core:\n    dir: core\n    types:\n      Node: { interface: [Visit] }\n");
    for p in 0..pkgs {
        let _ = writeln!(yaml, "  example.com/p{}:\n    dir: p{}\n    imports: [example.com/core]\n    types:", p, p);
        let _ = writeln!(yaml, "      Count: {{ underlying: int64 }}");
        for d in 0..depth {
            let _ = writeln!(yaml, "      S{}:\n        methods: [{{ name: Visit }}]\n        fields:", d);
            let _ = writeln!(yaml, "          - {{ name: N, type: Count }}");
            let _ = writeln!(yaml, "          - {{ name: Any, type: core.Node }}");
            let _ = writeln!(yaml, "          - {{ name: Tags, type: \"map[string][]byte\" }}");
            if d + 1 < depth {
                let _ = writeln!(yaml, "          - {{ name: Next, type: \"*S{}\" }}", d + 1);
            }
        }
    }
    yaml
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    for (pkgs, depth) in [(2, 4), (8, 8), (16, 16)] {
        let set = ManifestPackageSet::from_yaml(&generated_manifest(pkgs, depth), Path::new("/bench"))
            .unwrap();
        let roots: Vec<TypeName> = (0..pkgs)
            .map(|p| TypeName::new(&format!("example.com/p{}", p), "S0"))
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", pkgs, depth)),
            &roots,
            |b, roots| {
                b.iter(|| {
                    let mut ex = Extractor::new(&set, Some(State::new()));
                    for r in roots {
                        ex.add_root(r).unwrap();
                    }
                    ex.extract().unwrap();
                    black_box(ex.temp_output().len());
                });
            },
        );
    }
    group.finish();
}

fn bench_sha256(c: &mut Criterion) {
    let mut group = c.benchmark_group("sha256_unit");
    for size in [256, 4096, 65536] {
        let input: String = "type T struct{}\n".repeat(size / 16);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(hash_bytes(black_box(input.as_bytes()))));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_directive_parse,
    bench_sort_output,
    bench_extraction,
    bench_sha256
);
criterion_main!(benches);
