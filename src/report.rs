use std::fmt;

use serde::Serialize;

/// Problems found while assembling one statement.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AsmError {
    #[error("invalid or unsupported instruction")]
    UnsupportedInstruction,
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("invalid parameter {value} (limit {limit})")]
    OperandOutOfRange { value: u32, limit: u32 },
    #[error("invalid parameter {value} (not a multiple of {scale})")]
    MisalignedOperand { value: u32, scale: u16 },
    #[error("branch offset {offset} out of range")]
    BranchOutOfRange { offset: i32 },
}

/// One accumulated assembly problem, tied to the statement that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line number in the original source.
    pub line_no: usize,
    /// Statement text with the comment removed.
    pub line: String,
    pub error: AsmError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.line, self.error)
    }
}

/// Failure value of an assembly run: every diagnostic plus the pass totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub diagnostics: Vec<Diagnostic>,
    pub lines: usize,
    pub symbols: usize,
    pub instructions: usize,
}

impl ErrorReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error Report")?;
        writeln!(f)?;
        for d in &self.diagnostics {
            writeln!(f, "{d}")?;
        }
        writeln!(f)?;
        writeln!(f, "Lines processed = {}", self.lines)?;
        writeln!(f, "Symbol Table Size = {}", self.symbols)?;
        writeln!(f, "Instruction Array Size = {}", self.instructions)?;
        write!(f, "Errors = {}", self.error_count())
    }
}

impl std::error::Error for ErrorReport {}
