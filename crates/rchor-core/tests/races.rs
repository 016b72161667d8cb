use rchor_core::ast::Program;
use rchor_core::{
    run, FaultKind, Frontend, InitBinding, RaceKey, RacePolicy, RaceWinnerSide, RacingFrontend,
    SimOptions, TraceKind, Value,
};

fn parse(input: &str) -> Program {
    RacingFrontend.parse(input, "test.rc").expect("parse")
}

fn options(policy: RacePolicy) -> SimOptions {
    SimOptions {
        race_policy: policy,
        ..SimOptions::default()
    }
}

fn init(process: &str, var: &str, value: Value) -> InitBinding {
    InitBinding {
        process: process.to_string(),
        var: var.to_string(),
        value,
    }
}

const S2: &str = "main { race a[k] : p.1 , q.2 -> r.w }";

#[test]
fn s2_race_left_policy() {
    let program = parse(S2);
    let opts = SimOptions {
        race_policy: RacePolicy::Left,
        init: vec![init("p", "dummy", Value::Int(0)), init("q", "dummy", Value::Int(0))],
        ..SimOptions::default()
    };
    let result = run(&program, &opts);

    assert!(result.ok);
    assert_eq!(result.store.get("r", "w"), Some(Value::Int(1)));

    let entry = result
        .races
        .get(&RaceKey::new("a", "k"))
        .expect("race entry");
    assert_eq!(entry.left_proc, "p");
    assert_eq!(entry.right_proc, "q");
    assert_eq!(entry.winner_side, RaceWinnerSide::Left);
    assert_eq!(entry.winner_proc, "p");
    assert_eq!(entry.loser_proc, "q");
    assert_eq!(entry.v_winner, Value::Int(1));
    assert_eq!(entry.v_loser, Value::Int(2));
    assert!(!entry.discharged);

    let race_event = result
        .trace
        .iter()
        .find(|e| e.kind == TraceKind::Race)
        .expect("race event");
    assert_eq!(race_event.message, "a[k] winner=p loser=q write r.w=1");
}

#[test]
fn race_right_policy() {
    let program = parse(S2);
    let result = run(&program, &options(RacePolicy::Right));

    assert!(result.ok);
    assert_eq!(result.store.get("r", "w"), Some(Value::Int(2)));

    let entry = result
        .races
        .get(&RaceKey::new("a", "k"))
        .expect("race entry");
    assert_eq!(entry.winner_side, RaceWinnerSide::Right);
    assert_eq!(entry.winner_proc, "q");
    assert_eq!(entry.loser_proc, "p");
    assert_eq!(entry.v_winner, Value::Int(2));
    assert_eq!(entry.v_loser, Value::Int(1));
}

#[test]
fn s3_discharge_retrieves_loser_value() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; discharge a[k] : q -> r.z }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(result.ok);
    assert_eq!(result.store.get("r", "w"), Some(Value::Int(1)));
    assert_eq!(result.store.get("r", "z"), Some(Value::Int(2)));

    let entry = result
        .races
        .get(&RaceKey::new("a", "k"))
        .expect("race entry");
    assert!(entry.discharged);
    // The election outcome is untouched by the discharge.
    assert_eq!(entry.winner_proc, "p");
    assert_eq!(entry.v_winner, Value::Int(1));
    assert_eq!(entry.v_loser, Value::Int(2));

    let dis_event = result
        .trace
        .iter()
        .find(|e| e.kind == TraceKind::Dis)
        .expect("dis event");
    assert_eq!(dis_event.message, "a[k] loser=q write r.z=2");
}

#[test]
fn s3_second_discharge_faults() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; discharge a[k] : q -> r.z; discharge a[k] : q -> r.w2 }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::DoubleDischarge);
    assert_eq!(diagnostic.message, "race 'a[k]' already discharged");
    // State from before the fault is preserved.
    assert_eq!(result.store.get("r", "z"), Some(Value::Int(2)));
    assert!(result.store.get("r", "w2").is_none());
}

#[test]
fn discharge_source_must_be_the_loser() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; discharge a[k] : p -> r.z }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::DischargeSourceMismatch);
    assert_eq!(diagnostic.message, "discharge expects loser 'q', got 'p'");
}

#[test]
fn discharge_of_unresolved_race_faults() {
    let program = parse("main { discharge a[k] : q -> r.z }");
    let result = run(&program, &options(RacePolicy::Left));

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::RaceNotResolved);
    assert_eq!(diagnostic.message, "race 'a[k]' not resolved");
}

#[test]
fn resolving_the_same_key_twice_faults() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; race a[k] : p.3 , q.4 -> r.v }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::DoubleRaceResolution);
    assert_eq!(diagnostic.message, "race 'a[k]' already resolved");

    // The first resolution survives untouched.
    let entry = result
        .races
        .get(&RaceKey::new("a", "k"))
        .expect("race entry");
    assert_eq!(entry.v_winner, Value::Int(1));
    assert!(result.store.get("r", "v").is_none());
}

#[test]
fn s4_if_race_picks_then_when_left_won() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; if race a[k] then { s.flag = true } else { s.flag = false } }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(result.ok);
    assert_eq!(result.store.get("s", "flag"), Some(Value::Bool(true)));

    let event = result
        .trace
        .iter()
        .find(|e| e.kind == TraceKind::IfRace)
        .expect("ifRace event");
    assert_eq!(event.message, "a[k] winner=p -> then");
}

#[test]
fn if_race_picks_else_when_right_won() {
    let program = parse(
        "main { race a[k] : p.1 , q.2 -> r.w; if race a[k] then { s.flag = true } else { s.flag = false } }",
    );
    let result = run(&program, &options(RacePolicy::Right));

    assert!(result.ok);
    assert_eq!(result.store.get("s", "flag"), Some(Value::Bool(false)));
}

#[test]
fn if_race_on_unresolved_key_faults() {
    let program = parse("main { if race a[k] then { } else { } }");
    let result = run(&program, &options(RacePolicy::Left));

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::RaceNotResolved);
    assert_eq!(diagnostic.message, "race 'a[k]' not resolved");
}

#[test]
fn both_race_operands_are_evaluated() {
    // Left policy cannot rescue an uninitialized right operand.
    let program = parse("main { race a[k] : p.v , q.x -> r.w }");
    let opts = SimOptions {
        race_policy: RacePolicy::Left,
        init: vec![init("p", "v", Value::Int(1))],
        ..SimOptions::default()
    };
    let result = run(&program, &opts);

    assert!(!result.ok);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.kind, FaultKind::UninitializedVariable);
    assert_eq!(diagnostic.message, "uninitialized variable 'q.x'");
    assert!(result.races.is_empty());
}

#[test]
fn race_key_and_operands_go_through_substitution() {
    let program = parse(
        "proc R(a,b,c) { race a[k] : b.1 , c.2 -> a.out }\nmain { R(m,p,q) }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(result.ok);
    assert_eq!(result.store.get("m", "out"), Some(Value::Int(1)));

    let entry = result
        .races
        .get(&RaceKey::new("m", "k"))
        .expect("race entry");
    assert_eq!(entry.left_proc, "p");
    assert_eq!(entry.right_proc, "q");
}

#[test]
fn random_policy_is_deterministic_for_a_seed() {
    let program = parse(
        "main { race a[k1] : p.1 , q.2 -> r.w1; race a[k2] : p.3 , q.4 -> r.w2; race a[k3] : p.5 , q.6 -> r.w3 }",
    );
    let opts = SimOptions {
        race_policy: RacePolicy::Random,
        seed: 42,
        ..SimOptions::default()
    };

    let first = run(&program, &opts);
    let second = run(&program, &opts);

    assert!(first.ok && second.ok);
    assert_eq!(first.trace, second.trace);
    assert_eq!(first.store, second.store);
    assert_eq!(first.races, second.races);

    // Every race elected one of its two operands.
    for (_, entry) in first.races.iter() {
        assert!(entry.winner_proc == "p" || entry.winner_proc == "q");
        assert_ne!(entry.winner_proc, entry.loser_proc);
    }
}

#[test]
fn left_policy_always_elects_left() {
    let program = parse(
        "main { race a[k1] : p.1 , q.2 -> r.w1; race a[k2] : p.3 , q.4 -> r.w2 }",
    );
    let result = run(&program, &options(RacePolicy::Left));

    assert!(result.ok);
    for (_, entry) in result.races.iter() {
        assert_eq!(entry.winner_side, RaceWinnerSide::Left);
        assert_eq!(entry.winner_proc, "p");
    }
}

#[test]
fn right_policy_always_elects_right() {
    let program = parse(
        "main { race a[k1] : p.1 , q.2 -> r.w1; race a[k2] : p.3 , q.4 -> r.w2 }",
    );
    let result = run(&program, &options(RacePolicy::Right));

    assert!(result.ok);
    for (_, entry) in result.races.iter() {
        assert_eq!(entry.winner_side, RaceWinnerSide::Right);
        assert_eq!(entry.winner_proc, "q");
    }
}
