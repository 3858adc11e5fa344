//! Input and output collaborators of the engine

use crate::{state::Stack, value::Value};
use num_bigint::BigInt;
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::Write as _,
    io::{self, BufRead, Write},
};

/// Source of input lines.
pub trait Input {
    /// Next line without its trailing newline, `None` once input is exhausted.
    fn read_line(&mut self) -> Option<String>;
}

/// Something produced by an output instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A single character (`o`, `&o`).
    Char(char),
    /// One number rendered as decimal (`u`, function results).
    Number(Value),
    /// A pre-joined rendering of a whole stack (`&u`, implicit final output).
    Text(String),
}

impl Emission {
    fn render(&self, out: &mut String) {
        match self {
            Emission::Char(c) => out.push(*c),
            Emission::Number(value) => {
                let _ = write!(out, "{}", value);
            }
            Emission::Text(text) => out.push_str(text),
        }
    }
}

/// Sink for everything the program outputs.
pub trait Output {
    fn emit(&mut self, emission: Emission) -> io::Result<()>;
}

/// Reads lines from any buffered reader, e.g. standard input.
pub struct LineReader<R> {
    reader: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader { reader }
    }
}

impl LineReader<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        LineReader::new(io::BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> Input for LineReader<R> {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
            Err(err) => {
                log::warn!("reading input failed, treating it as exhausted: {}", err);
                None
            }
        }
    }
}

/// A fixed queue of lines.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInput {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// One line per newline-separated segment of `text`.
    pub fn from_text(text: &str) -> Self {
        ScriptedInput::new(text.lines())
    }
}

impl Input for ScriptedInput {
    fn read_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Input that is always exhausted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl Input for NoInput {
    fn read_line(&mut self) -> Option<String> {
        None
    }
}

/// Input that answers every read with an empty line, so nothing ever
/// blocks on a prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyLines;

impl Input for EmptyLines {
    fn read_line(&mut self) -> Option<String> {
        Some(String::new())
    }
}

/// Renders every emission to a writer and flushes it immediately.
pub struct Writer<W> {
    writer: W,
}

impl<W: Write> Writer<W> {
    pub fn new(writer: W) -> Self {
        Writer { writer }
    }
}

impl Writer<io::Stdout> {
    pub fn stdout() -> Self {
        Writer::new(io::stdout())
    }
}

impl<W: Write> Output for Writer<W> {
    fn emit(&mut self, emission: Emission) -> io::Result<()> {
        let mut rendered = String::new();
        emission.render(&mut rendered);
        self.writer.write_all(rendered.as_bytes())?;
        self.writer.flush()
    }
}

/// Announces every emission on its own line instead of printing it raw, and
/// keeps a transcript of everything that would have been printed.
pub struct Echo<W> {
    writer: W,
    transcript: String,
}

impl<W: Write> Echo<W> {
    pub fn new(writer: W) -> Self {
        Echo {
            writer,
            transcript: String::new(),
        }
    }

    /// Everything emitted so far, rendered as plain output would be.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

impl<W: Write> Output for Echo<W> {
    fn emit(&mut self, emission: Emission) -> io::Result<()> {
        let mut rendered = String::new();
        emission.render(&mut rendered);
        writeln!(self.writer, "outputted: {}", rendered)?;
        self.transcript.push_str(&rendered);
        self.writer.flush()
    }
}

impl Output for String {
    fn emit(&mut self, emission: Emission) -> io::Result<()> {
        emission.render(self);
        Ok(())
    }
}

impl Output for Vec<Emission> {
    fn emit(&mut self, emission: Emission) -> io::Result<()> {
        self.push(emission);
        Ok(())
    }
}

/// Reads from the calling invocation's current stack, one value per line.
pub(crate) struct CallerInput<'s> {
    pub stack: &'s RefCell<Stack>,
}

impl Input for CallerInput<'_> {
    fn read_line(&mut self) -> Option<String> {
        self.stack.borrow_mut().pop().map(|value| value.to_string())
    }
}

/// Pushes whatever a function outputs back onto the caller's current stack.
pub(crate) struct CallerOutput<'s> {
    pub stack: &'s RefCell<Stack>,
}

impl Output for CallerOutput<'_> {
    fn emit(&mut self, emission: Emission) -> io::Result<()> {
        let mut stack = self.stack.borrow_mut();
        match emission {
            Emission::Char(c) => stack.push(c),
            Emission::Number(value) => stack.push(value),
            Emission::Text(text) => {
                for line in text.lines() {
                    match parse_number(line) {
                        Some(value) => stack.push(value),
                        None => stack.extend(line.chars().map(Value::from)),
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parses one line of input as an integer, accepting surrounding whitespace.
pub(crate) fn parse_int(line: &str) -> Option<BigInt> {
    line.trim().parse().ok()
}

fn parse_number(line: &str) -> Option<Value> {
    parse_int(line)
        .map(Value::Int)
        .or_else(|| line.trim().parse::<f64>().ok().map(Value::Real))
}
