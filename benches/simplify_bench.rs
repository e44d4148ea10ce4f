use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use litetable::codec::{Primitive, ValueType};
use litetable::space::ParameterSpace;
use litetable::space::aligned::AlignedSpace;
use litetable::space::flatten::{FlattenSegment, MergeContext, simplify};
use litetable::space::segment::{Axis, IntAxis};
use litetable::trial::{Mapping, ResultType, ResultValue, Trial, TrialStatus};
use litetable::trial_table::TrialTable;
use std::hint::black_box;

fn scattered_segments(n: i64) -> Vec<FlattenSegment> {
    (0..n).map(|i| FlattenSegment::new(i * 3, Some(2))).collect()
}

fn bench_simplify(c: &mut Criterion) {
    let segments = scattered_segments(2_000);
    c.bench_function("simplify 2000 adjacent segments", |b| {
        b.iter(|| simplify(black_box(&segments), MergeContext::OneDim))
    });
}

fn axis(ambient_index: i64, size: i64, ambient_size: i64) -> Axis {
    Axis::Int(IntAxis {
        name: Some("x".into()),
        start: ambient_index,
        step: 1,
        size: Some(size),
        ambient_index,
        ambient_size: Some(ambient_size),
    })
}

fn done_trial(trial_id: &str, start: i64, size: i64, ambient: i64) -> (Trial, Vec<Mapping>) {
    let space = ParameterSpace::Aligned(AlignedSpace::new(vec![axis(start, size, ambient)], true).unwrap());
    let trial = Trial {
        study_id: "bench".into(),
        trial_id: trial_id.into(),
        timestamp: Utc::now(),
        status: TrialStatus::Running,
        parameter_space: space,
        result_type: ResultType::Scalar,
        result_value_type: ValueType::Int,
        result: None,
    };
    let mappings = (0..size)
        .map(|i| Mapping { params: vec![Primitive::Int(i)], result: ResultValue::Scalar(Primitive::Int(i)) })
        .collect();
    (trial, mappings)
}

fn bench_find_least_division(c: &mut Criterion) {
    let ambient = 500 * 4 + 4;
    c.bench_function("find_least_division over 500 registered trials", |b| {
        b.iter_batched(
            || {
                let mut table = TrialTable::new(60);
                for i in 0..500 {
                    let id = format!("bench-{i}");
                    let (trial, mappings) = done_trial(&id, i * 4, 4, ambient);
                    table.register(trial);
                    table.receipt(&id, Some(mappings)).unwrap();
                }
                table
            },
            |mut table| black_box(table.find_least_division(Some(ambient)).unwrap()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().without_plots().sample_size(20);
    targets = bench_simplify, bench_find_least_division,
}
criterion_main!(benches);
