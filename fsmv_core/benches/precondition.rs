use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fsmv_core::*;

#[inline(always)]
fn choices(vars: usize, width: i64) -> Vec<Choice> {
    (0..vars)
        .map(|idx| Choice {
            var: format!("v{idx}"),
            values: Interval::new(0, width - 1).values().collect(),
        })
        .collect()
}

#[inline(always)]
fn counter() -> Automaton {
    let mut builder = AutomatonBuilder::new("Counter");
    let initial = builder.new_initial_state("Count").unwrap();
    let done = builder.new_state("Done").unwrap();
    for counter in 0..10 {
        builder
            .add_transition(
                format!("inc{counter}"),
                initial,
                initial,
                Label::new()
                    .guard(format!("tick_isPresent && x == {counter}"))
                    .set("x = x + 1"),
            )
            .unwrap();
    }
    builder
        .add_transition("stop", initial, done, Label::new().guard("x >= 10"))
        .unwrap();
    builder.build().unwrap()
}

fn enumerate(c: &mut Criterion) {
    for (vars, width) in [(1, 10), (2, 10), (3, 10), (4, 5)] {
        let choices = choices(vars, width);
        c.bench_with_input(
            BenchmarkId::new("generate", format!("{vars} vars x {width} values")),
            &choices,
            |b, choices| {
                b.iter(|| generate("state=S", choices, |valuation| valuation.get("v0")).len());
            },
        );
    }
}

fn saturate(c: &mut Criterion) {
    let domain = Interval::new(-50, 50);
    c.bench_function("apply on sentinels", |b| {
        b.iter(|| {
            [ArithOp::Add, ArithOp::Sub, ArithOp::Mul]
                .into_iter()
                .flat_map(|op| [Value::Ls, Value::Gt].map(|v| apply(op, v, 7, domain, domain)))
                .map(|values| values.len())
                .sum::<usize>()
        });
    });
}

fn prepare_counter(c: &mut Criterion) {
    let automaton = counter();
    for span in [0, 1, 4] {
        c.bench_with_input(BenchmarkId::new("prepare", span), &automaton, |b, automaton| {
            b.iter(|| prepare(automaton, span).unwrap().domains.variables().count());
        });
    }
}

criterion_group!(benches, enumerate, saturate, prepare_counter);
criterion_main!(benches);
