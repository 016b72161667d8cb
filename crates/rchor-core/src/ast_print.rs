//! Indented tree dump of a program, for the `parse` command.

use crate::ast::{Block, Interaction, ProcDef, ProcExpr, ProcVar, Program, RaceId, Stmt};
use std::fmt::Write;

pub fn pretty(program: &Program) -> String {
    let mut out = String::new();
    print_program(&mut out, program, 0);
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn print_program(out: &mut String, program: &Program, level: usize) {
    indent(out, level);
    out.push_str("Program\n");

    indent(out, level + 1);
    let _ = writeln!(out, "Procedures ({})", program.procedures.len());
    for def in &program.procedures {
        print_proc_def(out, def, level + 2);
    }

    indent(out, level + 1);
    out.push_str("Main\n");
    print_block(out, &program.main, level + 2);
}

fn print_proc_def(out: &mut String, def: &ProcDef, level: usize) {
    indent(out, level);
    let _ = writeln!(out, "ProcDef {}({})", def.name, def.params.join(","));
    print_block(out, &def.body, level + 1);
}

fn print_block(out: &mut String, block: &Block, level: usize) {
    indent(out, level);
    let _ = writeln!(out, "Block ({} stmt)", block.statements.len());
    for stmt in &block.statements {
        print_stmt(out, stmt, level + 1);
    }
}

fn print_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Interaction(s) => {
            indent(out, level);
            out.push_str("InteractionStmt\n");
            print_interaction(out, &s.interaction, level + 1);
        }
        Stmt::Call(s) => {
            indent(out, level);
            let _ = writeln!(out, "Call {}({})", s.proc, s.args.join(","));
        }
        Stmt::IfLocal(s) => {
            indent(out, level);
            let _ = writeln!(out, "IfLocal ({})", proc_expr_text(&s.condition));
            indent(out, level);
            out.push_str("Then:\n");
            print_block(out, &s.then_block, level + 1);
            indent(out, level);
            out.push_str("Else:\n");
            print_block(out, &s.else_block, level + 1);
        }
        Stmt::IfRace(s) => {
            indent(out, level);
            let _ = writeln!(out, "IfRace ({})", race_id_text(&s.condition));
            indent(out, level);
            out.push_str("Then:\n");
            print_block(out, &s.then_block, level + 1);
            indent(out, level);
            out.push_str("Else:\n");
            print_block(out, &s.else_block, level + 1);
        }
    }
}

fn print_interaction(out: &mut String, interaction: &Interaction, level: usize) {
    indent(out, level);
    match interaction {
        Interaction::Comm(n) => {
            let _ = writeln!(
                out,
                "Comm {} -> {}",
                proc_expr_text(&n.from),
                proc_var_text(&n.to)
            );
        }
        Interaction::Select(n) => {
            let _ = writeln!(out, "Select {} -> {} [{}]", n.from, n.to, n.label);
        }
        Interaction::Assign(n) => {
            let _ = writeln!(out, "Assign {} = {}", proc_var_text(&n.target), n.value);
        }
        Interaction::Race(n) => {
            let _ = writeln!(
                out,
                "Race {} : {} , {} -> {}",
                race_id_text(&n.id),
                proc_expr_text(&n.left),
                proc_expr_text(&n.right),
                proc_var_text(&n.target)
            );
        }
        Interaction::Discharge(n) => {
            let _ = writeln!(
                out,
                "Discharge {} : {} -> {}",
                race_id_text(&n.id),
                n.source,
                proc_var_text(&n.target)
            );
        }
    }
}

fn proc_expr_text(pe: &ProcExpr) -> String {
    format!("{}.{}", pe.process, pe.expr)
}

fn proc_var_text(pv: &ProcVar) -> String {
    format!("{}.{}", pv.process, pv.var)
}

fn race_id_text(id: &RaceId) -> String {
    format!("{}[{}]", id.process, id.key)
}
