use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Source range attached to AST nodes and diagnostics.
///
/// `start_line`/`end_line` are 1-based; `start_col`/`end_col` are 0-based.
/// An empty `path` marks an absent span; synthetic spans use pseudo-paths
/// such as `<init>` and `<internal>` with line = col = 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub path: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(
        path: impl Into<String>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            path: path.into(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at a single position.
    pub fn point(path: impl Into<String>, line: u32, col: u32) -> Self {
        let path = path.into();
        Self {
            path,
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }

    /// Span for events with no source counterpart (`<init>`, `<internal>`).
    pub fn synthetic(label: &str) -> Self {
        Self::point(label, 0, 0)
    }

    pub fn is_absent(&self) -> bool {
        self.path.is_empty()
    }
}

impl Display for SourceSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.start_line, self.start_col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}
