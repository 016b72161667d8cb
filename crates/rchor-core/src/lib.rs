pub mod ast;
pub mod ast_print;
pub mod frontend;
pub mod lexer;
pub mod parser;
pub mod race;
pub mod rng;
pub mod sim;
pub mod store;
pub mod trace;
pub mod types;
pub mod validate;
pub mod value;

pub use frontend::{Frontend, FrontendError, FrontendErrorKind, RacingFrontend};
pub use race::{RaceEntry, RaceKey, RaceMemory, RaceWinnerSide};
pub use sim::{
    run, FaultKind, InitBinding, RacePolicy, RuntimeDiagnostic, SimOptions, SimulationResult,
};
pub use store::Store;
pub use trace::{Trace, TraceEvent, TraceKind};
pub use types::{Diagnostic, SourceSpan};
pub use validate::{validate, ValidationError};
pub use value::Value;
