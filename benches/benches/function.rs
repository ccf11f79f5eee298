// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for handler chain resolution and invocation in `understory_feature`.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use understory_feature::{
    Arguments, FeatureHolder, FunctionDefinition, Modifiers, ParameterType, Priority, TypeTag,
};

const ORC: TypeTag = TypeTag::new("orc");

const NAMES: [&str; 16] = [
    "h0", "h1", "h2", "h3", "h4", "h5", "h6", "h7", "h8", "h9", "h10", "h11", "h12", "h13", "h14",
    "h15",
];

fn chain(len: usize, modifiers: Modifiers) -> FunctionDefinition<i64> {
    let mut def = FunctionDefinition::new("damage", [ParameterType::of::<i64>()]);
    for (i, name) in NAMES.iter().copied().take(len).enumerate() {
        let tier = u8::try_from(i % 10).unwrap_or(0);
        def.add_executor(
            TypeTag::HOLDER,
            name,
            Priority::level(tier),
            modifiers,
            |inv, args| Ok(inv.next(args)? + args.get::<i64>(0).copied().unwrap_or(0)),
        );
    }
    def.add_executor(
        ORC,
        "rage",
        Priority::HIGHEST,
        Modifiers::NONE,
        |inv, args| Ok(inv.next(args)? * 2),
    );
    def
}

fn bench_function(c: &mut Criterion) {
    let args = Arguments::new().with(3_i64);

    let mut group = c.benchmark_group("function/invoke");
    for len in [1_usize, 4, 16] {
        let def = chain(len, Modifiers::NONE);
        let holder = FeatureHolder::new();
        let function = holder.get(&def).unwrap();
        group.bench_function(BenchmarkId::new("plain", len), |b| {
            b.iter(|| black_box(function.invoke(&args).unwrap()));
        });

        let def = chain(len, Modifiers::NONE.with_delay(1, 1).lock_sensitive());
        let holder = FeatureHolder::builder().tag(ORC).locked(false).build();
        let function = holder.get(&def).unwrap();
        group.bench_function(BenchmarkId::new("gated", len), |b| {
            b.iter(|| black_box(function.invoke(&args).unwrap()));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("function/resolve");
    for len in [1_usize, 16] {
        let def = chain(len, Modifiers::NONE);
        group.bench_function(BenchmarkId::new("instantiate", len), |b| {
            b.iter(|| {
                let holder = FeatureHolder::builder().tag(ORC).build();
                black_box(holder.get(&def).unwrap().executor_names().count())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_function);
criterion_main!(benches);
