//! Event delivery benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memgoal::*;

fn benchmark_probe_events(c: &mut Criterion) {
    let target = MethodIdentity::from_raw(1);
    let other = MethodIdentity::from_raw(2);

    c.bench_function("probe_10k_events", |b| {
        b.iter(|| {
            let mut probe = GoalProbe::new(target, &ProbeConfig::default());
            probe.on_instruction(target, false);
            for i in 0..10_000u64 {
                probe.on_instruction(other, false);
                probe.on_object_created(black_box(i & 0xff));
                probe.on_object_released(black_box(i & 0x7f));
            }
            probe.on_instruction(target, true);
            black_box(probe.net_allocated_bytes())
        });
    });
}

fn benchmark_scripted_host(c: &mut Criterion) {
    c.bench_function("scripted_host_call_1k_objects", |b| {
        b.iter(|| {
            let mut host = ScriptedHost::new();
            let method = host.define_method("Bench.run()").unwrap();
            let target = GoalProbe::resolve(&host, &method).unwrap();
            let handle = GoalProbe::begin(&mut host, target).unwrap();
            host.call(method, |h| {
                for size in 0..1_000u64 {
                    let obj = h.allocate(size);
                    if size % 2 == 0 {
                        h.release(obj).unwrap();
                    }
                }
            })
            .unwrap();
            black_box(GoalProbe::end(&mut host, handle, 0).unwrap())
        });
    });
}

criterion_group!(benches, benchmark_probe_events, benchmark_scripted_host);
criterion_main!(benches);
