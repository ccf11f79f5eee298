// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property`.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::string::String;

use understory_feature::{FeatureHolder, Modifiers, Priority, TypeTag};
use understory_property::{
    CollectionPropertyDefinition, PropertyDefinition, PropertyDefinitionBuilder,
};

const ROOM: TypeTag = TypeTag::new("room");

fn bench_property(c: &mut Criterion) {
    let width = PropertyDefinitionBuilder::<f64>::new("width")
        .initial_value(|| 50.0)
        .build();
    let mut clamped = PropertyDefinitionBuilder::<f64>::new("clamped")
        .initial_value(|| 50.0)
        .build();
    clamped.getter_mut().add_executor(
        TypeTag::HOLDER,
        "clamp",
        Priority::new(6, 0),
        Modifiers::NONE,
        |inv, args| Ok(inv.next(args)?.clamp(0.0, 100.0)),
    );
    let title = PropertyDefinitionBuilder::<String>::new("title")
        .initial_value(|| String::from("The quick brown fox"))
        .build();

    let holder = FeatureHolder::new();

    let mut group = c.benchmark_group("property/get");

    group.bench_function("lookup", |b| {
        holder.get(&width).unwrap();
        b.iter(|| black_box(holder.get(&width).unwrap()));
    });

    group.bench_function("storage_only", |b| {
        let property = holder.get(&width).unwrap();
        b.iter(|| black_box(property.get().unwrap()));
    });

    group.bench_function("one_interceptor", |b| {
        let property = holder.get(&clamped).unwrap();
        b.iter(|| black_box(property.get().unwrap()));
    });

    group.bench_function("string_clone", |b| {
        let property = holder.get(&title).unwrap();
        b.iter(|| black_box(property.get().unwrap().len()));
    });

    group.finish();

    let mut group = c.benchmark_group("property/set");

    group.bench_function("f64", |b| {
        let property = holder.get(&width).unwrap();
        let mut next = 0.0;
        b.iter(|| {
            next += 1.0;
            property.set(black_box(next)).unwrap();
        });
    });

    group.bench_function("first_access", |b| {
        b.iter_batched(
            FeatureHolder::new,
            |fresh| black_box(fresh.get(&width).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.finish();

    let occupant = PropertyDefinition::<Option<FeatureHolder>>::new("occupant");
    let guests = CollectionPropertyDefinition::<FeatureHolder, Vec<FeatureHolder>>::new("guests");

    let mut group = c.benchmark_group("property/ownership");

    group.bench_function("swap_child", |b| {
        let room = FeatureHolder::builder().tag(ROOM).build();
        let slot = room.get(&occupant).unwrap();
        let a = FeatureHolder::builder().owned_by(ROOM).build();
        let b_child = FeatureHolder::builder().owned_by(ROOM).build();
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let child = if flip { &a } else { &b_child };
            slot.set(Some(child.clone())).unwrap();
        });
    });

    group.bench_function("add_remove_child", |b| {
        let room = FeatureHolder::builder().tag(ROOM).build();
        let list = room.get(&guests).unwrap();
        let child = FeatureHolder::builder().owned_by(ROOM).build();
        b.iter(|| {
            list.add(child.clone()).unwrap();
            list.remove(child.clone()).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);
