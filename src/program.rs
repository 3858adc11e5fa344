//! Program loading

use crate::{brackets, preprocess::preprocess};
use anyhow::anyhow;

/// A preprocessed, bracket-checked program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Preprocessed text, one entry per code point
    pub code: Vec<char>,
}

impl Program {
    /// Strip comments, hide literal brackets and check that the rest balance.
    ///
    /// * `source` raw program text
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let preprocessed = preprocess(source);

        if !brackets::balanced(&preprocessed) {
            return Err(anyhow!("unmatched brackets in program"));
        }

        Ok(Program {
            code: preprocessed.chars().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
