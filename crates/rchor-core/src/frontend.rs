use crate::ast::Program;
use crate::lexer::tokenize;
use crate::parser::parse_tokens;
use crate::types::SourceSpan;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendErrorKind {
    /// Input does not match the grammar.
    Syntax,
    /// Lexically valid but unusable input (e.g. an out-of-range literal).
    InvalidInput,
}

#[derive(Debug, Clone)]
pub struct FrontendError {
    pub kind: FrontendErrorKind,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl FrontendError {
    pub fn syntax(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            kind: FrontendErrorKind::Syntax,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn invalid_input(message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            kind: FrontendErrorKind::InvalidInput,
            message: message.into(),
            span: Some(span),
        }
    }
}

impl Display for FrontendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{span}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for FrontendError {}

pub trait Frontend {
    type Ast;
    type Error;

    fn parse(&self, input: &str, path: &str) -> Result<Self::Ast, Self::Error>;
}

/// The Racing Choreographies front-end: lexer + recursive descent parser.
#[derive(Debug, Default)]
pub struct RacingFrontend;

impl Frontend for RacingFrontend {
    type Ast = Program;
    type Error = FrontendError;

    fn parse(&self, input: &str, path: &str) -> Result<Program, FrontendError> {
        let tokens = tokenize(input, path)?;
        parse_tokens(tokens, path)
    }
}
