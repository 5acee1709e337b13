use fsmv_core::*;

// A ring of `n` states, each transition comparing and assigning some literals.
fn ring(n: i64) -> Result<Automaton, ModelError> {
    let mut builder = AutomatonBuilder::new("Ring");
    let mut states = vec![builder.new_initial_state("S0")?];
    for idx in 1..n {
        states.push(builder.new_state(format!("S{idx}"))?);
    }
    builder.new_var("x", 0)?;
    for idx in 0..n {
        let label = Label::new()
            .guard(format!("tick_isPresent && x >= {} && y != {}", -idx, idx * 3))
            .set(format!("x = x + {idx}; y = {}", 2 * idx - 5));
        builder.add_transition(
            format!("t{idx}"),
            states[idx as usize],
            states[((idx + 1) % n) as usize],
            label,
        )?;
    }
    builder.build()
}

#[test]
fn domain_soundness() -> Result<(), TranslationError> {
    let automaton = ring(6)?;
    let domains = infer_domains(&automaton, 0)?;
    for transition in automaton.transitions() {
        for comparison in transition.guard().comparisons() {
            let interval = domains.get(&comparison.var).expect("domain");
            assert!(interval.contains(comparison.literal));
        }
        for action in transition.actions() {
            if let Action::Assign(assignment) = action {
                let interval = domains.get(&assignment.var).expect("domain");
                match assignment.update {
                    Update::Constant(value) => assert!(interval.contains(value)),
                    Update::Offset { operand, .. } => assert!(interval.contains(operand)),
                }
            }
        }
    }
    // the declared initial value is in the domain too
    assert!(domains.get("x").expect("domain").contains(0));
    assert_eq!(domains.signals().collect::<Vec<_>>(), ["tick"]);
    Ok(())
}

#[test]
fn widening_monotonicity() -> Result<(), TranslationError> {
    let automaton = ring(4)?;
    for s1 in 0..4 {
        let narrow = infer_domains(&automaton, s1)?;
        for s2 in s1 + 1..5 {
            let wide = infer_domains(&automaton, s2)?;
            for (var, interval) in narrow.variables() {
                assert!(wide.get(var).expect("domain").contains_interval(&interval));
            }
        }
    }
    Ok(())
}

#[test]
fn saturating_closure() {
    let domain = Interval::new(-2, 3);
    for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul] {
        for operand in -7..=7 {
            for value in domain.values() {
                for result in apply(op, value, operand, domain, domain) {
                    if let Value::Int(result) = result {
                        assert!(domain.contains(result), "{value} {op} {operand} = {result}");
                    }
                }
            }
        }
    }
}

#[test]
fn flattening_state_count() -> Result<(), TranslationError> {
    for n in 1..5 {
        for m in 1..5 {
            for refined in 0..n {
                let mut inner = AutomatonBuilder::new("Inner");
                let mut previous = inner.new_initial_state("r0")?;
                for idx in 1..m {
                    let next = inner.new_state(format!("r{idx}"))?;
                    inner.add_transition(format!("i{idx}"), previous, next, Label::new())?;
                    previous = next;
                }
                let mut outer = AutomatonBuilder::new("Outer");
                let mut states = Vec::new();
                for idx in 0..n {
                    let state = if idx == 0 {
                        outer.new_initial_state(format!("S{idx}"))?
                    } else {
                        outer.new_state(format!("S{idx}"))?
                    };
                    states.push(state);
                }
                outer.add_refinement(states[refined], inner.build()?)?;
                for (idx, pair) in states.windows(2).enumerate() {
                    outer.add_transition(format!("o{idx}"), pair[0], pair[1], Label::new())?;
                }
                let flat = flatten(&outer.build()?)?;
                assert_eq!(flat.states().len(), n - 1 + m);
                assert_eq!(flat.states().iter().filter(|s| s.is_initial()).count(), 1);
            }
        }
    }
    Ok(())
}

#[test]
fn two_state_scenario() -> Result<(), TranslationError> {
    let mut builder = AutomatonBuilder::new("M");
    let a = builder.new_initial_state("A")?;
    let b = builder.new_state("B")?;
    builder.add_transition("t", a, b, Label::new().guard("x==1"))?;
    let prepared = prepare(&builder.build()?, 0)?;
    assert_eq!(prepared.domains.get("x"), Some(Interval::point(1)));
    let encoding = encode(&prepared.automaton.transitions()[0]);
    let x = prepared.domains.get("x").expect("domain");
    assert_eq!(
        admissible(x, &encoding.preconditions),
        vec![Value::Int(1)]
    );
    Ok(())
}

#[test]
fn diagnostics_are_collected() -> Result<(), TranslationError> {
    let mut builder = AutomatonBuilder::new("M");
    let a = builder.new_initial_state("A")?;
    builder.add_transition(
        "t",
        a,
        a,
        Label::new().guard("x == 1 || x == 2").set("y = y / 0; z = 1"),
    )?;
    let prepared = prepare(&builder.build()?, 1)?;
    let reasons: Vec<_> = prepared.diagnostics.iter().map(|d| d.reason).collect();
    assert_eq!(reasons, [Unsupported::Disjunction, Unsupported::DivisionByZero]);
    // the unsupported parts are skipped, the rest goes on
    assert_eq!(prepared.domains.get("x"), None);
    assert_eq!(prepared.domains.get("z"), Some(Interval::new(0, 2)));
    Ok(())
}

#[test]
fn offsets_from_unknown_variables_are_reported() -> Result<(), TranslationError> {
    let mut builder = AutomatonBuilder::new("M");
    let a = builder.new_initial_state("A")?;
    let dead = builder.new_state("Dead")?;
    builder.add_transition("copy", a, a, Label::new().set("y = w + 1; x = x - 1"))?;
    // unreachable, so nothing is reported for it
    builder.add_transition("zombie", dead, a, Label::new().set("y = v * 2"))?;
    let automaton = builder.build()?;
    assert_eq!(automaton.reachable(), [a]);

    let prepared = prepare(&automaton, 0)?;
    assert_eq!(prepared.domains.get("w"), None);
    assert_eq!(prepared.domains.get("y"), Some(Interval::point(1)));
    assert_eq!(
        prepared.diagnostics,
        [UnsupportedExpression {
            automaton: "M".to_owned(),
            transition: "copy".to_owned(),
            expression: "y = w + 1".to_owned(),
            reason: Unsupported::UndeclaredSource,
        }]
    );
    Ok(())
}
