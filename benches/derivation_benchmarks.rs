use criterion::{Criterion, black_box, criterion_group, criterion_main};
use routewatch::analyzers::classify;
use routewatch::collectors::device_info::build_interface_table;
use routewatch::snmp::{Oid, Value, VarBind, mib};
use std::time::Duration;

fn column(base: &[u32], rows: u32, value: impl Fn(u32) -> Value) -> Vec<(Oid, Value)> {
    (1..=rows)
        .map(|index| (mib::instance(base, index), value(index)))
        .collect()
}

/// Benchmark the interface-table join over a 48-port switch
fn benchmark_interface_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("interface_table");
    group.measurement_time(Duration::from_secs(5));

    let names = column(mib::IF_NAME, 48, |i| {
        Value::OctetString(format!("GigabitEthernet0/{i}").into_bytes().into())
    });
    let types = column(mib::IF_TYPE, 48, |_| Value::Integer(6));
    let statuses = column(mib::IF_OPER_STATUS, 48, |i| Value::Integer(if i % 3 == 0 { 2 } else { 1 }));
    let ip_to_index: Vec<(Oid, Value)> = (1..=8)
        .map(|i| {
            (
                mib::extend(mib::IP_AD_ENT_IF_INDEX, &[10, 0, i, 1]),
                Value::Integer(i as i32),
            )
        })
        .collect();
    let masks: Vec<(Oid, Value)> = (1..=8)
        .map(|i| {
            (
                mib::extend(mib::IP_AD_ENT_NET_MASK, &[10, 0, i, 1]),
                Value::IpAddress([255, 255, 255, 0].into()),
            )
        })
        .collect();

    group.bench_function("join_48_rows", |b| {
        b.iter(|| {
            black_box(build_interface_table(
                black_box(&names),
                &types,
                &statuses,
                &ip_to_index,
                &masks,
            ))
        });
    });

    group.finish();
}

/// Benchmark classification of a link trap binding list
fn benchmark_trap_classification(c: &mut Criterion) {
    let varbinds = vec![
        VarBind::new(
            mib::oid(mib::SNMP_TRAP_OID_INSTANCE),
            Value::ObjectIdentifier(mib::oid(mib::LINK_DOWN)),
        ),
        VarBind::new(mib::instance(mib::IF_DESCR, 3), Value::OctetString("Gi0/3".into())),
    ];

    c.bench_function("classify_link_trap", |b| {
        b.iter(|| black_box(classify(black_box(&varbinds))));
    });
}

criterion_group!(benches, benchmark_interface_table, benchmark_trap_classification);
criterion_main!(benches);
