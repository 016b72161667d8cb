//! Program tree for Racing Choreographies.
//!
//! The tree is built once by the parser and is immutable afterwards; the
//! validator and the simulator only borrow it. Every node carries the
//! `SourceSpan` of the tokens it was built from. Serialization is
//! `kind`-tagged so the `parse --json` output is self-describing.

use crate::types::SourceSpan;
use crate::value::Value;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub type Process = String;
pub type Var = String;
pub type Label = String;
pub type ProcName = String;

/// Expression: a literal value or a variable reference.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Value {
        value: Value,
        #[serde(rename = "loc")]
        span: SourceSpan,
    },
    Var {
        name: Var,
        #[serde(rename = "loc")]
        span: SourceSpan,
    },
}

impl Expr {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Expr::Value { span, .. } => span,
            Expr::Var { span, .. } => span,
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Value { value, .. } => write!(f, "{value}"),
            Expr::Var { name, .. } => write!(f, "{name}"),
        }
    }
}

/// `process.expr` — an expression evaluated in the store of `process`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcExpr {
    pub process: Process,
    pub expr: Expr,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

/// `process.var` — an l-value.
#[derive(Debug, Clone, Serialize)]
pub struct ProcVar {
    pub process: Process,
    pub var: Var,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

/// `process[key]` — a race identifier.
#[derive(Debug, Clone, Serialize)]
pub struct RaceId {
    pub process: Process,
    pub key: String,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comm {
    pub from: ProcExpr,
    pub to: ProcVar,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Select {
    pub from: Process,
    pub to: Process,
    pub label: Label,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assign {
    pub target: ProcVar,
    pub value: Expr,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Race {
    pub id: RaceId,
    pub left: ProcExpr,
    pub right: ProcExpr,
    pub target: ProcVar,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Discharge {
    pub id: RaceId,
    pub source: Process,
    pub target: ProcVar,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum Interaction {
    Comm(Comm),
    Select(Select),
    Assign(Assign),
    Race(Race),
    Discharge(Discharge),
}

impl Interaction {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Interaction::Comm(n) => &n.span,
            Interaction::Select(n) => &n.span,
            Interaction::Assign(n) => &n.span,
            Interaction::Race(n) => &n.span,
            Interaction::Discharge(n) => &n.span,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionStmt {
    pub interaction: Interaction,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallStmt {
    pub proc: ProcName,
    pub args: Vec<Process>,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfLocalStmt {
    pub condition: ProcExpr,
    pub then_block: Block,
    pub else_block: Block,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfRaceStmt {
    pub condition: RaceId,
    pub then_block: Block,
    pub else_block: Block,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    Interaction(InteractionStmt),
    Call(CallStmt),
    IfLocal(IfLocalStmt),
    IfRace(IfRaceStmt),
}

impl Stmt {
    pub fn span(&self) -> &SourceSpan {
        match self {
            Stmt::Interaction(n) => &n.span,
            Stmt::Call(n) => &n.span,
            Stmt::IfLocal(n) => &n.span,
            Stmt::IfRace(n) => &n.span,
        }
    }
}

/// Ordered statement sequence between braces.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcDef {
    pub name: ProcName,
    pub params: Vec<Process>,
    pub body: Block,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub procedures: Vec<ProcDef>,
    pub main: Block,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}
