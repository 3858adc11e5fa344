//! Machine state owned by a single invocation of the engine

use crate::{error::ErrorKind, value::Value};
use std::{cmp::Ordering, fmt};

/// One growable stack of values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stack(Vec<Value>);

impl Stack {
    /// Top value, `None` on an empty stack.
    pub fn peek(&self) -> Option<Value> {
        self.0.last().cloned()
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.0.pop()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Appends every value in order, the last one ends up on top.
    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.0.extend(values);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Removes every value, bottom first.
    pub fn drain(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.0)
    }

    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    pub fn sort(&mut self) {
        self.0
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Resolves an index counted from the bottom; negative indices count from the top.
    fn slot(&self, index: i64) -> Result<usize, ErrorKind> {
        let len = self.0.len();
        let resolved = if index < 0 {
            i64::try_from(len).ok().and_then(|len| len.checked_add(index))
        } else {
            Some(index)
        };
        resolved
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < len)
            .ok_or(ErrorKind::IndexOutOfRange { index, len })
    }

    pub fn get(&self, index: i64) -> Result<Value, ErrorKind> {
        Ok(self.0[self.slot(index)?].clone())
    }

    pub fn swap(&mut self, a: i64, b: i64) -> Result<(), ErrorKind> {
        let (a, b) = (self.slot(a)?, self.slot(b)?);
        self.0.swap(a, b);
        Ok(())
    }
}

impl From<Vec<Value>> for Stack {
    fn from(values: Vec<Value>) -> Self {
        Stack(values)
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

/// The auxiliary storage slot.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Backup {
    #[default]
    Empty,
    Value(Value),
    Snapshot(Vec<Value>),
}

/// Stacks, stack pointer and backup of one invocation.
#[derive(Debug)]
pub struct Machine {
    stacks: Vec<Stack>,
    pointer: usize,
    pub backup: Backup,
}

impl Default for Machine {
    fn default() -> Self {
        Machine {
            stacks: vec![Stack::default()],
            pointer: 0,
            backup: Backup::Empty,
        }
    }
}

impl Machine {
    pub fn current(&self) -> &Stack {
        &self.stacks[self.pointer]
    }

    pub fn current_mut(&mut self) -> &mut Stack {
        &mut self.stacks[self.pointer]
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Moves to the stack on the left, inserting a new one at the front when
    /// already at stack 0.
    pub fn move_left(&mut self) {
        if self.pointer > 0 {
            self.pointer -= 1;
        } else {
            self.stacks.insert(0, Stack::default());
        }
    }

    /// Moves to the stack on the right, appending a new one past the end.
    pub fn move_right(&mut self) {
        self.pointer += 1;
        if self.pointer == self.stacks.len() {
            self.stacks.push(Stack::default());
        }
    }
}
