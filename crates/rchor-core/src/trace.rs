use crate::types::SourceSpan;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceKind {
    Init,
    Asg,
    Com,
    Sel,
    Race,
    Dis,
    If,
    IfRace,
    Call,
    Ret,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::Init => "init",
            TraceKind::Asg => "asg",
            TraceKind::Com => "com",
            TraceKind::Sel => "sel",
            TraceKind::Race => "race",
            TraceKind::Dis => "dis",
            TraceKind::If => "if",
            TraceKind::IfRace => "ifRace",
            TraceKind::Call => "call",
            TraceKind::Ret => "ret",
        }
    }
}

/// One entry of the append-only execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub kind: TraceKind,
    pub message: String,
    #[serde(rename = "loc")]
    pub span: SourceSpan,
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if !self.span.path.is_empty() {
            write!(f, " @{}", self.span)?;
        }
        write!(f, " {}", self.message)
    }
}

pub type Trace = Vec<TraceEvent>;
