use rchor_core::ast::{Expr, Interaction, Program, Stmt};
use rchor_core::value::Value;
use rchor_core::{Frontend, FrontendError, FrontendErrorKind, RacingFrontend};

fn parse(input: &str) -> Program {
    RacingFrontend.parse(input, "test.rc").expect("parse")
}

fn parse_err(input: &str) -> FrontendError {
    match RacingFrontend.parse(input, "test.rc") {
        Ok(_) => panic!("expected error"),
        Err(err) => err,
    }
}

fn interaction(stmt: &Stmt) -> &Interaction {
    match stmt {
        Stmt::Interaction(s) => &s.interaction,
        other => panic!("expected interaction, got {other:?}"),
    }
}

#[test]
fn empty_main_parses() {
    let program = parse("main { }");
    assert!(program.procedures.is_empty());
    assert!(program.main.statements.is_empty());
}

#[test]
fn assign_and_comm_with_spans() {
    let program = parse("main {\n  a.x = 5;\n  a.x -> b.y\n}");
    assert_eq!(program.main.statements.len(), 2);

    let Interaction::Assign(assign) = interaction(&program.main.statements[0]) else {
        panic!("expected assign");
    };
    assert_eq!(assign.target.process, "a");
    assert_eq!(assign.target.var, "x");
    let Expr::Value { value, span } = &assign.value else {
        panic!("expected literal");
    };
    assert_eq!(*value, Value::Int(5));
    assert_eq!((span.start_line, span.start_col), (2, 8));
    assert_eq!((assign.span.start_line, assign.span.start_col), (2, 2));

    let Interaction::Comm(comm) = interaction(&program.main.statements[1]) else {
        panic!("expected comm");
    };
    assert_eq!(comm.from.process, "a");
    assert_eq!(comm.to.process, "b");
    assert_eq!(comm.to.var, "y");
    assert_eq!((comm.span.start_line, comm.span.start_col), (3, 2));
}

#[test]
fn assign_with_qualified_rhs_is_a_comm() {
    let program = parse("main { a.y = b.x }");
    let Interaction::Comm(comm) = interaction(&program.main.statements[0]) else {
        panic!("expected comm");
    };
    assert_eq!(comm.from.process, "b");
    let Expr::Var { name, .. } = &comm.from.expr else {
        panic!("expected var");
    };
    assert_eq!(name, "x");
    assert_eq!(comm.to.process, "a");
    assert_eq!(comm.to.var, "y");
}

#[test]
fn procedure_definition_and_call() {
    let program = parse("proc P(x,y) { x.v = 1; y.v = 2 }\nmain { P(u,u) }");
    assert_eq!(program.procedures.len(), 1);
    let def = &program.procedures[0];
    assert_eq!(def.name, "P");
    assert_eq!(def.params, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(def.body.statements.len(), 2);

    let Stmt::Call(call) = &program.main.statements[0] else {
        panic!("expected call");
    };
    assert_eq!(call.proc, "P");
    assert_eq!(call.args, vec!["u".to_string(), "u".to_string()]);
}

#[test]
fn race_and_discharge() {
    let program = parse("main { race a[k] : p.1 , q.2 -> r.w; discharge a[k] : q -> r.z }");

    let Interaction::Race(race) = interaction(&program.main.statements[0]) else {
        panic!("expected race");
    };
    assert_eq!(race.id.process, "a");
    assert_eq!(race.id.key, "k");
    assert_eq!(race.left.process, "p");
    let Expr::Value { value, .. } = &race.left.expr else {
        panic!("expected literal");
    };
    assert_eq!(*value, Value::Int(1));
    assert_eq!(race.right.process, "q");
    assert_eq!(race.target.process, "r");
    assert_eq!(race.target.var, "w");

    let Interaction::Discharge(discharge) = interaction(&program.main.statements[1]) else {
        panic!("expected discharge");
    };
    assert_eq!(discharge.id.process, "a");
    assert_eq!(discharge.source, "q");
    assert_eq!(discharge.target.var, "z");
}

#[test]
fn select_statement() {
    let program = parse("main { p -> q [go] }");
    let Interaction::Select(select) = interaction(&program.main.statements[0]) else {
        panic!("expected select");
    };
    assert_eq!(select.from, "p");
    assert_eq!(select.to, "q");
    assert_eq!(select.label, "go");
}

#[test]
fn if_local_and_if_race() {
    let program = parse(
        "main { if a.c then { a.r = 1 } else { a.r = 2 }; if race a[k] then { } else { } }",
    );

    let Stmt::IfLocal(if_local) = &program.main.statements[0] else {
        panic!("expected if local");
    };
    assert_eq!(if_local.condition.process, "a");
    assert_eq!(if_local.then_block.statements.len(), 1);
    assert_eq!(if_local.else_block.statements.len(), 1);

    let Stmt::IfRace(if_race) = &program.main.statements[1] else {
        panic!("expected if race");
    };
    assert_eq!(if_race.condition.process, "a");
    assert_eq!(if_race.condition.key, "k");
}

#[test]
fn negative_literal() {
    let program = parse("main { a.x = -5 }");
    let Interaction::Assign(assign) = interaction(&program.main.statements[0]) else {
        panic!("expected assign");
    };
    let Expr::Value { value, .. } = &assign.value else {
        panic!("expected literal");
    };
    assert_eq!(*value, Value::Int(-5));
}

#[test]
fn line_comments_are_ignored() {
    let program = parse("// choreography\nmain {\n  a.x = 1 // write\n}");
    assert_eq!(program.main.statements.len(), 1);
}

#[test]
fn missing_expression_is_a_syntax_error() {
    let err = parse_err("main { a.x = }");
    assert_eq!(err.kind, FrontendErrorKind::Syntax);
    let span = err.span.expect("span");
    assert_eq!((span.start_line, span.start_col), (1, 13));
    assert!(err.message.contains("expected ID, INT, TRUE or FALSE"));
}

#[test]
fn missing_main_is_a_syntax_error() {
    let err = parse_err("proc P() { }");
    assert_eq!(err.kind, FrontendErrorKind::Syntax);
    assert!(err.message.contains("expected MAIN"));
}

#[test]
fn missing_separator_is_a_syntax_error() {
    let err = parse_err("main { a.x = 1 b.y = 2 }");
    assert!(err.message.contains("expected SEMI or RBRACE"));
}

#[test]
fn unexpected_character_is_reported_with_position() {
    let err = parse_err("main { a.x = 5 ? }");
    let span = err.span.expect("span");
    assert_eq!((span.start_line, span.start_col), (1, 15));
    assert!(err.message.contains("unexpected character"));
}

#[test]
fn trailing_semicolon_is_allowed() {
    let program = parse("main { a.x = 1; }");
    assert_eq!(program.main.statements.len(), 1);
}
