//! The simulator: a single-threaded tree-walking interpreter driven by an
//! explicit frame stack, so step and call-depth bounds stay enforceable and
//! deeply nested choreographies cannot overflow the native stack.
//!
//! Faults are non-recoverable within a run: the first one stops
//! interpretation and is returned as a single diagnostic together with all
//! partial state produced so far.

use crate::ast::{
    Assign, Block, CallStmt, Comm, Discharge, Expr, Interaction, ProcDef, ProcExpr, Program, Race,
    RaceId, Select, Stmt,
};
use crate::race::{RaceEntry, RaceKey, RaceMemory, RaceWinnerSide};
use crate::rng::SimRng;
use crate::store::Store;
use crate::trace::{Trace, TraceEvent, TraceKind};
use crate::types::SourceSpan;
use crate::value::Value;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    #[default]
    Random,
    Left,
    Right,
}

/// One `--init`-style store binding, applied before `main` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitBinding {
    pub process: String,
    pub var: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimOptions {
    pub race_policy: RacePolicy,
    pub seed: u64,
    pub max_steps: u64,
    pub max_call_depth: u64,
    pub trace: bool,
    pub init: Vec<InitBinding>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            race_policy: RacePolicy::Random,
            seed: 0,
            max_steps: 100_000,
            max_call_depth: 1_000,
            trace: true,
            init: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    UninitializedVariable,
    TypeMismatch,
    UndefinedProcedure,
    ArityMismatch,
    DoubleRaceResolution,
    RaceNotResolved,
    DischargeSourceMismatch,
    DoubleDischarge,
    MaxStepsExceeded,
    MaxCallDepthExceeded,
    Internal,
}

/// Outbound runtime diagnostic. `line` is 1-based, `col` 0-based; synthetic
/// faults use the `<internal>` pseudo-file with line = col = 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDiagnostic {
    pub kind: FaultKind,
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl Display for RuntimeDiagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.col, self.message
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationResult {
    pub ok: bool,
    pub trace: Trace,
    pub store: Store,
    pub races: RaceMemory,
    pub diagnostics: Vec<RuntimeDiagnostic>,
}

struct Fault {
    kind: FaultKind,
    span: SourceSpan,
    message: String,
}

impl Fault {
    fn new(kind: FaultKind, span: &SourceSpan, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: span.clone(),
            message: message.into(),
        }
    }

    fn into_diagnostic(self) -> RuntimeDiagnostic {
        RuntimeDiagnostic {
            kind: self.kind,
            file: self.span.path,
            line: self.span.start_line,
            col: self.span.start_col,
            message: self.message,
        }
    }
}

type Subst = HashMap<String, String>;

struct ExecCtx<'o> {
    opt: &'o SimOptions,
    store: Store,
    races: RaceMemory,
    trace: Trace,
    steps: u64,
    call_depth: u64,
    rng: SimRng,
}

impl ExecCtx<'_> {
    fn push_trace(&mut self, kind: TraceKind, message: String, span: &SourceSpan) {
        if !self.opt.trace {
            return;
        }
        self.trace.push(TraceEvent {
            kind,
            message,
            span: span.clone(),
        });
    }

    fn check_step_limit(&mut self, span: &SourceSpan) -> Result<(), Fault> {
        self.steps += 1;
        if self.steps > self.opt.max_steps {
            return Err(Fault::new(
                FaultKind::MaxStepsExceeded,
                span,
                "max steps exceeded",
            ));
        }
        Ok(())
    }

    fn check_call_depth(&self, span: &SourceSpan) -> Result<(), Fault> {
        if self.call_depth >= self.opt.max_call_depth {
            return Err(Fault::new(
                FaultKind::MaxCallDepthExceeded,
                span,
                "max call depth exceeded",
            ));
        }
        Ok(())
    }
}

/// Frame over one block. `subst` maps formal process names to effective ones
/// and is never mutated after the frame is pushed; `proc_name` is `None` for
/// `main` and for `if` branch frames.
struct Frame<'p> {
    block: &'p Block,
    ip: usize,
    subst: Subst,
    proc_name: Option<&'p str>,
    call_span: Option<&'p SourceSpan>,
}

/// Execute a validated program. Every run owns its store, race memory, trace
/// and PRNG; identical inputs produce identical output.
pub fn run(program: &Program, options: &SimOptions) -> SimulationResult {
    let mut ctx = ExecCtx {
        opt: options,
        store: Store::new(),
        races: RaceMemory::new(),
        trace: Trace::new(),
        steps: 0,
        call_depth: 0,
        rng: SimRng::new(options.seed),
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| exec(program, &mut ctx)));

    let (ok, diagnostics) = match outcome {
        Ok(Ok(())) => (true, Vec::new()),
        Ok(Err(fault)) => (false, vec![fault.into_diagnostic()]),
        Err(payload) => (false, vec![internal_diagnostic(payload.as_ref())]),
    };

    SimulationResult {
        ok,
        trace: ctx.trace,
        store: ctx.store,
        races: ctx.races,
        diagnostics,
    }
}

fn internal_diagnostic(payload: &(dyn std::any::Any + Send)) -> RuntimeDiagnostic {
    let message = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "internal error".to_string()
    };
    RuntimeDiagnostic {
        kind: FaultKind::Internal,
        file: "<internal>".to_string(),
        line: 0,
        col: 0,
        message,
    }
}

fn exec(program: &Program, ctx: &mut ExecCtx) -> Result<(), Fault> {
    let init_span = SourceSpan::synthetic("<init>");
    for binding in &ctx.opt.init {
        ctx.store
            .set(binding.process.clone(), binding.var.clone(), binding.value);
        let message = format!("{}.{} = {}", binding.process, binding.var, binding.value);
        ctx.push_trace(TraceKind::Init, message, &init_span);
    }

    let proc_table = build_proc_table(program);

    let mut stack: Vec<Frame> = vec![Frame {
        block: &program.main,
        ip: 0,
        subst: Subst::new(),
        proc_name: None,
        call_span: None,
    }];

    loop {
        let Some(fr) = stack.last_mut() else {
            return Ok(());
        };
        let block = fr.block;

        if fr.ip >= block.statements.len() {
            if let Some(name) = fr.proc_name {
                ctx.call_depth -= 1;
                let span = fr
                    .call_span
                    .filter(|s| !s.path.is_empty())
                    .unwrap_or(&program.span);
                let message = name.to_string();
                ctx.push_trace(TraceKind::Ret, message, span);
            }
            stack.pop();
            continue;
        }

        let stmt = &block.statements[fr.ip];
        ctx.check_step_limit(stmt.span())?;

        match stmt {
            Stmt::Interaction(st) => {
                fr.ip += 1;
                exec_interaction(ctx, &st.interaction, &fr.subst)?;
            }

            Stmt::IfLocal(s) => {
                let cond_value = eval_proc_expr(ctx, &s.condition, &fr.subst)?;
                let cond = require_bool(cond_value, &s.condition.span)?;

                let message = format!(
                    "cond={} @ {} -> {}",
                    cond,
                    proc_expr_text(&s.condition, &fr.subst),
                    branch_name(cond)
                );
                let span = s.span.clone();
                fr.ip += 1;
                let subst = fr.subst.clone();
                ctx.push_trace(TraceKind::If, message, &span);

                let chosen = if cond { &s.then_block } else { &s.else_block };
                stack.push(Frame {
                    block: chosen,
                    ip: 0,
                    subst,
                    proc_name: None,
                    call_span: None,
                });
            }

            Stmt::IfRace(s) => {
                let key = to_race_key(&s.condition, &fr.subst);
                let Some(entry) = ctx.races.get(&key) else {
                    return Err(race_not_resolved(&key, &s.span));
                };
                let cond = entry.winner_side == RaceWinnerSide::Left;
                let message = format!(
                    "{key} winner={} -> {}",
                    entry.winner_proc,
                    branch_name(cond)
                );
                let span = s.span.clone();
                fr.ip += 1;
                let subst = fr.subst.clone();
                ctx.push_trace(TraceKind::IfRace, message, &span);

                let chosen = if cond { &s.then_block } else { &s.else_block };
                stack.push(Frame {
                    block: chosen,
                    ip: 0,
                    subst,
                    proc_name: None,
                    call_span: None,
                });
            }

            Stmt::Call(call) => {
                let Some(def) = proc_table.get(call.proc.as_str()).copied() else {
                    return Err(Fault::new(
                        FaultKind::UndefinedProcedure,
                        &call.span,
                        format!("call to undefined procedure '{}'", call.proc),
                    ));
                };

                ctx.check_call_depth(&call.span)?;
                ctx.call_depth += 1;

                let resolved: Vec<&str> = call
                    .args
                    .iter()
                    .map(|arg| process_subst(arg, &fr.subst))
                    .collect();
                let message = format!("{}({})", call.proc, resolved.join(","));
                ctx.push_trace(TraceKind::Call, message, &call.span);

                let inner = build_call_subst(def, call, &fr.subst)?;
                let composed = compose_subst(&fr.subst, &inner);

                fr.ip += 1;
                stack.push(Frame {
                    block: &def.body,
                    ip: 0,
                    subst: composed,
                    proc_name: Some(&def.name),
                    call_span: Some(&call.span),
                });
            }
        }
    }
}

// -------------------- interactions --------------------

fn exec_interaction(
    ctx: &mut ExecCtx,
    interaction: &Interaction,
    subst: &Subst,
) -> Result<(), Fault> {
    match interaction {
        Interaction::Assign(n) => exec_assign(ctx, n, subst),
        Interaction::Comm(n) => exec_comm(ctx, n, subst),
        Interaction::Select(n) => exec_select(ctx, n, subst),
        Interaction::Race(n) => exec_race(ctx, n, subst),
        Interaction::Discharge(n) => exec_discharge(ctx, n, subst),
    }
}

fn exec_assign(ctx: &mut ExecCtx, a: &Assign, subst: &Subst) -> Result<(), Fault> {
    let target_proc_eff = process_subst(&a.target.process, subst).to_string();
    let value = eval_expr(ctx, &a.target.process, &a.value, subst, &a.span)?;
    ctx.store
        .set(target_proc_eff.clone(), a.target.var.clone(), value);

    let message = format!("{target_proc_eff}.{} = {value}", a.target.var);
    ctx.push_trace(TraceKind::Asg, message, &a.span);
    Ok(())
}

fn exec_comm(ctx: &mut ExecCtx, c: &Comm, subst: &Subst) -> Result<(), Fault> {
    let to_proc_eff = process_subst(&c.to.process, subst).to_string();
    let value = eval_proc_expr(ctx, &c.from, subst)?;
    ctx.store.set(to_proc_eff.clone(), c.to.var.clone(), value);

    let message = format!(
        "{} = {value} -> {to_proc_eff}.{}",
        proc_expr_text(&c.from, subst),
        c.to.var
    );
    ctx.push_trace(TraceKind::Com, message, &c.span);
    Ok(())
}

fn exec_select(ctx: &mut ExecCtx, s: &Select, subst: &Subst) -> Result<(), Fault> {
    let from_eff = process_subst(&s.from, subst);
    let to_eff = process_subst(&s.to, subst);

    let message = format!("{from_eff} -> {to_eff} [{}]", s.label);
    ctx.push_trace(TraceKind::Sel, message, &s.span);
    Ok(())
}

fn exec_race(ctx: &mut ExecCtx, r: &Race, subst: &Subst) -> Result<(), Fault> {
    let key = to_race_key(&r.id, subst);
    if ctx.races.contains(&key) {
        return Err(Fault::new(
            FaultKind::DoubleRaceResolution,
            &r.span,
            format!("race '{key}' already resolved"),
        ));
    }

    // Both sides are always evaluated, left first; no short-circuit.
    let v_left = eval_proc_expr(ctx, &r.left, subst)?;
    let v_right = eval_proc_expr(ctx, &r.right, subst)?;

    let left_proc_eff = process_subst(&r.left.process, subst).to_string();
    let right_proc_eff = process_subst(&r.right.process, subst).to_string();

    let side = decide_race_winner(ctx);
    let entry = match side {
        RaceWinnerSide::Left => RaceEntry {
            left_proc: left_proc_eff.clone(),
            right_proc: right_proc_eff.clone(),
            winner_side: side,
            winner_proc: left_proc_eff,
            loser_proc: right_proc_eff,
            v_winner: v_left,
            v_loser: v_right,
            discharged: false,
        },
        RaceWinnerSide::Right => RaceEntry {
            left_proc: left_proc_eff.clone(),
            right_proc: right_proc_eff.clone(),
            winner_side: side,
            winner_proc: right_proc_eff,
            loser_proc: left_proc_eff,
            v_winner: v_right,
            v_loser: v_left,
            discharged: false,
        },
    };

    let target_proc_eff = process_subst(&r.target.process, subst).to_string();
    ctx.store
        .set(target_proc_eff.clone(), r.target.var.clone(), entry.v_winner);

    let message = format!(
        "{key} winner={} loser={} write {target_proc_eff}.{}={}",
        entry.winner_proc, entry.loser_proc, r.target.var, entry.v_winner
    );
    ctx.races.put(key, entry);
    ctx.push_trace(TraceKind::Race, message, &r.span);
    Ok(())
}

fn exec_discharge(ctx: &mut ExecCtx, d: &Discharge, subst: &Subst) -> Result<(), Fault> {
    let key = to_race_key(&d.id, subst);
    let ell_eff = process_subst(&d.source, subst).to_string();

    let v_loser;
    {
        let Some(entry) = ctx.races.get_mut(&key) else {
            return Err(race_not_resolved(&key, &d.span));
        };

        if ell_eff != entry.loser_proc {
            return Err(Fault::new(
                FaultKind::DischargeSourceMismatch,
                &d.span,
                format!(
                    "discharge expects loser '{}', got '{ell_eff}'",
                    entry.loser_proc
                ),
            ));
        }
        if entry.discharged {
            return Err(Fault::new(
                FaultKind::DoubleDischarge,
                &d.span,
                format!("race '{key}' already discharged"),
            ));
        }

        entry.discharged = true;
        v_loser = entry.v_loser;
    }

    let target_proc_eff = process_subst(&d.target.process, subst).to_string();
    ctx.store
        .set(target_proc_eff.clone(), d.target.var.clone(), v_loser);

    let message = format!(
        "{key} loser={ell_eff} write {target_proc_eff}.{}={v_loser}",
        d.target.var
    );
    ctx.push_trace(TraceKind::Dis, message, &d.span);
    Ok(())
}

// -------------------- helpers --------------------

fn build_proc_table(program: &Program) -> HashMap<&str, &ProcDef> {
    let mut table = HashMap::new();
    for def in &program.procedures {
        table.insert(def.name.as_str(), def);
    }
    table
}

/// `subst[p]` if bound, `p` otherwise. The identity fallback lets globally
/// scoped process names pass through procedure bodies unchanged.
fn process_subst<'a>(process: &'a str, subst: &'a Subst) -> &'a str {
    subst.get(process).map(String::as_str).unwrap_or(process)
}

/// `inner` maps each formal to its caller-resolved actual; composition starts
/// from `outer` and re-resolves every actual through it.
fn compose_subst(outer: &Subst, inner: &Subst) -> Subst {
    let mut composed = outer.clone();
    for (formal, actual) in inner {
        let resolved = outer.get(actual).unwrap_or(actual);
        composed.insert(formal.clone(), resolved.clone());
    }
    composed
}

fn build_call_subst(
    def: &ProcDef,
    call: &CallStmt,
    caller_subst: &Subst,
) -> Result<Subst, Fault> {
    if def.params.len() != call.args.len() {
        return Err(Fault::new(
            FaultKind::ArityMismatch,
            &call.span,
            format!("procedure '{}' arity mismatch at runtime", def.name),
        ));
    }

    let mut inner = Subst::new();
    for (formal, actual) in def.params.iter().zip(&call.args) {
        inner.insert(
            formal.clone(),
            process_subst(actual, caller_subst).to_string(),
        );
    }
    Ok(inner)
}

fn eval_expr(
    ctx: &ExecCtx,
    process: &str,
    expr: &Expr,
    subst: &Subst,
    err_span: &SourceSpan,
) -> Result<Value, Fault> {
    let p_eff = process_subst(process, subst);
    match expr {
        Expr::Value { value, .. } => Ok(*value),
        Expr::Var { name, span } => ctx.store.get(p_eff, name).ok_or_else(|| {
            let loc = if span.is_absent() { err_span } else { span };
            Fault::new(
                FaultKind::UninitializedVariable,
                loc,
                format!("uninitialized variable '{p_eff}.{name}'"),
            )
        }),
    }
}

fn eval_proc_expr(ctx: &ExecCtx, pe: &ProcExpr, subst: &Subst) -> Result<Value, Fault> {
    eval_expr(ctx, &pe.process, &pe.expr, subst, &pe.span)
}

fn require_bool(value: Value, span: &SourceSpan) -> Result<bool, Fault> {
    value.as_bool().ok_or_else(|| {
        Fault::new(
            FaultKind::TypeMismatch,
            span,
            "condition is not a boolean",
        )
    })
}

fn decide_race_winner(ctx: &mut ExecCtx) -> RaceWinnerSide {
    match ctx.opt.race_policy {
        RacePolicy::Left => RaceWinnerSide::Left,
        RacePolicy::Right => RaceWinnerSide::Right,
        RacePolicy::Random => {
            if ctx.rng.next_bool() {
                RaceWinnerSide::Left
            } else {
                RaceWinnerSide::Right
            }
        }
    }
}

fn to_race_key(id: &RaceId, subst: &Subst) -> RaceKey {
    RaceKey::new(process_subst(&id.process, subst), id.key.clone())
}

fn race_not_resolved(key: &RaceKey, span: &SourceSpan) -> Fault {
    Fault::new(
        FaultKind::RaceNotResolved,
        span,
        format!("race '{key}' not resolved"),
    )
}

fn proc_expr_text(pe: &ProcExpr, subst: &Subst) -> String {
    format!("{}.{}", process_subst(&pe.process, subst), pe.expr)
}

fn branch_name(cond: bool) -> &'static str {
    if cond {
        "then"
    } else {
        "else"
    }
}
