use crate::ast::{Block, Program, Stmt};
use crate::types::SourceSpan;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub span: SourceSpan,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for ValidationError {}

struct ProcInfo {
    arity: usize,
}

/// Single pass over the program: build the procedure table, then check every
/// call site for resolution and arity. Returns the full error list; an empty
/// list means the program is valid. The simulator re-checks resolution and
/// arity at call time regardless.
pub fn validate(program: &Program) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut procs: HashMap<&str, ProcInfo> = HashMap::new();

    for def in &program.procedures {
        if procs.contains_key(def.name.as_str()) {
            errors.push(ValidationError {
                message: format!("duplicate procedure '{}'", def.name),
                span: def.span.clone(),
            });
            continue;
        }
        procs.insert(
            def.name.as_str(),
            ProcInfo {
                arity: def.params.len(),
            },
        );
    }

    for def in &program.procedures {
        validate_block(&def.body, &procs, &mut errors);
    }
    validate_block(&program.main, &procs, &mut errors);

    errors
}

fn validate_block(
    block: &Block,
    procs: &HashMap<&str, ProcInfo>,
    errors: &mut Vec<ValidationError>,
) {
    for stmt in &block.statements {
        match stmt {
            Stmt::Interaction(_) => {}
            Stmt::Call(call) => {
                let Some(info) = procs.get(call.proc.as_str()) else {
                    errors.push(ValidationError {
                        message: format!("call to undefined procedure '{}'", call.proc),
                        span: call.span.clone(),
                    });
                    continue;
                };
                if info.arity != call.args.len() {
                    errors.push(ValidationError {
                        message: format!(
                            "wrong number of arguments in call to '{}': expected {}, got {}",
                            call.proc,
                            info.arity,
                            call.args.len()
                        ),
                        span: call.span.clone(),
                    });
                }
            }
            Stmt::IfLocal(s) => {
                validate_block(&s.then_block, procs, errors);
                validate_block(&s.else_block, procs, errors);
            }
            Stmt::IfRace(s) => {
                validate_block(&s.then_block, procs, errors);
                validate_block(&s.else_block, procs, errors);
            }
        }
    }
}
