//! Runtime errors raised while executing a program

use std::io;

/// What went wrong. Every kind is fatal for the invocation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("{0}")]
    EmptyStack(&'static str),
    #[error("program expected integer input, got {0:?} instead")]
    Input(String),
    #[error("attempted to load backup, but backup is empty")]
    BackupCell,
    #[error("{0}")]
    ZeroDivision(&'static str),
    #[error("stack index {index} out of range for a stack of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("{0}")]
    Overflow(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Value(String),
    #[error("functions cannot contain the 'i' instruction")]
    InputInFunction,
    #[error("maximum function call depth of {0} exceeded")]
    RecursionLimit(usize),
    /// An error raised inside a function body. The wrapped error's index is
    /// relative to the body, not to the calling program.
    #[error("{} in function {name}: {}", .source.kind.name(), .source.kind)]
    Function {
        name: char,
        #[source]
        source: Box<RuntimeError>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ErrorKind {
    /// Category name shown in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::EmptyStack(_) => "EmptyStackError",
            ErrorKind::Input(_) => "InputError",
            ErrorKind::BackupCell => "BackupCellError",
            ErrorKind::ZeroDivision(_) => "ZeroDivisionError",
            ErrorKind::IndexOutOfRange { .. } => "IndexError",
            ErrorKind::Overflow(_) => "OverflowError",
            ErrorKind::Type(_) => "TypeError",
            ErrorKind::Value(_) => "ValueError",
            ErrorKind::RecursionLimit(_) => "RecursionError",
            ErrorKind::InputInFunction | ErrorKind::Function { .. } => "FunctionError",
            ErrorKind::Io(_) => "IOError",
        }
    }
}

/// An [`ErrorKind`] located at an instruction of the invocation that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{}: {kind} (index {index})", .kind.name())]
pub struct RuntimeError {
    /// Zero-based index into the preprocessed text of the raising invocation.
    pub index: usize,
    /// `None` when the implicit output at the end of the text failed.
    pub instruction: Option<char>,
    pub kind: ErrorKind,
}

impl RuntimeError {
    /// Follows nested function errors down to the one that was raised first.
    pub fn innermost(&self) -> &RuntimeError {
        match &self.kind {
            ErrorKind::Function { source, .. } => source.innermost(),
            _ => self,
        }
    }
}
