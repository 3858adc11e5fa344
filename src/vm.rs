//! Virtual machine that interprets the preprocessed program text directly

use crate::{
    error::{ErrorKind, RuntimeError},
    instruction::Op,
    io::{parse_int, CallerInput, CallerOutput, Emission, Input, Output},
    preprocess::reveal,
    state::{Backup, Machine, Stack},
    value::Value,
};
use num_bigint::{BigInt, RandBigInt};
use std::{cell::RefCell, collections::HashMap, rc::Rc, thread, time::Duration};

/// Function name to its body text.
pub type FunctionTable = HashMap<char, Rc<[char]>>;

/// Nested function calls allowed before a `RecursionError`.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Execution settings shared by an invocation and every function it calls.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Fixed pause before every instruction
    pub delay: Option<Duration>,
    /// How deeply function calls may nest
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            delay: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Why a virtual machine stopped.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Exit {
    /// `;` was executed
    Terminated,
    /// The end of the text was reached and the stack was output
    Finished,
}

/// What an empty stack pop falls back to.
enum Fill {
    Input(Value),
    Zero,
}

/// Virtual machine representation. One exists per invocation: the top-level
/// program and every function call get their own.
pub struct Vm<'p, 'io> {
    code: &'p [char],
    cursor: usize,          // index of the instruction to run next
    pub halt: Option<Exit>, // halt flag
    in_function: bool,      // function bodies output their stack value by value
    depth: usize,           // function calls enclosing this invocation

    machine: Machine,
    functions: FunctionTable,
    input: &'io mut dyn Input,
    output: &'io mut dyn Output,
    options: Options,
}

impl<'p, 'io> Vm<'p, 'io> {
    /// Prepare a top-level invocation of preprocessed `code`.
    pub fn new(
        code: &'p [char],
        input: &'io mut dyn Input,
        output: &'io mut dyn Output,
        options: Options,
    ) -> Self {
        Vm {
            code,
            cursor: 0,
            halt: None,
            in_function: false,
            depth: 0,
            machine: Machine::default(),
            functions: FunctionTable::new(),
            input,
            output,
            options,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.halt.is_none() {
            self.step()?;
        }
        Ok(())
    }

    /// Execute one instruction, or the implicit output once the end of the text is reached.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.halt.is_some() {
            return Ok(());
        }

        let index = self.cursor;
        let Some(&instruction) = self.code.get(index) else {
            self.finish().map_err(|kind| RuntimeError {
                index,
                instruction: None,
                kind,
            })?;
            self.halt = Some(Exit::Finished);
            return Ok(());
        };

        if let Some(delay) = self.options.delay {
            thread::sleep(delay);
        }
        self.trace(instruction);

        if let Err(kind) = self.dispatch(instruction) {
            return Err(RuntimeError {
                index,
                instruction: Some(instruction),
                kind,
            });
        }

        if self.halt.is_none() {
            self.cursor += 1;
        }

        Ok(())
    }

    fn trace(&self, instruction: char) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let stacks: Vec<String> = self.machine.stacks().iter().map(Stack::to_string).collect();
        log::trace!(
            "{} | [{}] | {:?} | {} | {} | {}",
            instruction,
            stacks.join(", "),
            self.machine.backup,
            if self.in_function { "function" } else { "program" },
            self.cursor,
            self.machine.pointer(),
        );
    }

    fn dispatch(&mut self, instruction: char) -> Result<(), ErrorKind> {
        if let Some(body) = self.functions.get(&instruction).cloned() {
            return self.call(instruction, &body);
        }

        // The character names the function defined by the following `{`
        if self.next_char() == Some('{') {
            return Ok(());
        }

        let op = match Op::from_char(instruction) {
            Some(op) => op,
            None => return Ok(()),
        };
        let whole = self.prev_char() == Some('&');

        match op {
            Op::Digit(digit) => self.push(digit as i64),
            Op::Number => self.ins_number()?,
            Op::LoopStart => self.ins_loop_start(),
            Op::LoopEnd => self.ins_loop_end(),
            Op::Break => self.ins_break()?,
            Op::StringLiteral => self.ins_string(),
            Op::CharLiteral => self.ins_char(),
            Op::DefineFunction => self.ins_define()?,
            Op::ReadChars => self.ins_read_chars(),
            Op::ReadNumber if whole => self.dump_input()?,
            Op::ReadNumber => self.ins_read_number()?,
            Op::OutputChar if whole => self.ins_output_chars()?,
            Op::OutputChar => {
                let c = self.pop_strict()?.as_char()?;
                self.output.emit(Emission::Char(c))?;
            }
            Op::OutputNumber if whole => self.ins_output_numbers()?,
            Op::OutputNumber => {
                let value = self.pop_strict()?;
                self.output.emit(Emission::Number(value))?;
            }
            Op::Reverse => {
                self.fill_if_empty()?;
                self.stack_mut().reverse();
            }
            Op::Add if whole => self.ins_sum()?,
            Op::Add => self.binary(Value::add)?,
            Op::Sub => self.binary(Value::sub)?,
            Op::Mul => self.binary(Value::mul)?,
            Op::Div => self.binary(Value::div)?,
            Op::Pow => self.binary(Value::pow)?,
            Op::Mod => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(lhs.rem(rhs)?);
            }
            Op::Less => {
                let rhs = self.pop()?;
                let lhs = self.peek_for_comparison()?;
                self.push(lhs < rhs);
            }
            Op::Greater => {
                let rhs = self.pop()?;
                let lhs = self.peek_for_comparison()?;
                self.push(lhs > rhs);
            }
            Op::Equal => {
                let rhs = self.pop_strict()?;
                let equal = self.stack().peek() == Some(rhs);
                self.push(equal);
            }
            Op::Terminate => self.halt = Some(Exit::Terminated),
            Op::Duplicate if whole => {
                self.fill_if_empty()?;
                let copy = self.stack().as_slice().to_vec();
                self.stack_mut().extend(copy);
            }
            Op::Duplicate => {
                if let Some(top) = self.stack().peek() {
                    self.push(top);
                }
            }
            Op::Pop if whole => self.stack_mut().clear(),
            Op::Pop => {
                self.pop_strict()?;
            }
            Op::Not => {
                let value = self.pop()?;
                self.push(value.is_zero());
            }
            Op::Load => self.ins_load()?,
            Op::Store if whole => {
                self.fill_if_empty()?;
                self.machine.backup = Backup::Snapshot(self.stack().as_slice().to_vec());
            }
            Op::Store => {
                self.machine.backup = match self.stack().peek() {
                    Some(top) => Backup::Value(top),
                    None => Backup::Empty,
                };
            }
            Op::Swap => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(top);
                self.push(below);
            }
            Op::Left => self.machine.move_left(),
            Op::Right => self.machine.move_right(),
            Op::Random => self.ins_random()?,
            Op::Length => {
                let len = self.stack().len() as i64;
                self.push(len);
            }
            Op::DigitCount => {
                let value = self.pop()?;
                self.push(value.to_string().chars().count() as i64);
            }
            Op::Explode => self.ins_explode()?,
            Op::Join => self.ins_join()?,
            Op::Sort => {
                self.fill_if_empty()?;
                self.stack_mut().sort();
            }
            Op::Negate => {
                let value = self.pop()?;
                self.push(value.neg());
            }
            Op::Index => {
                let index = self.pop_strict()?.as_clamped_int()?;
                let value = self.stack().get(index)?;
                self.push(value);
            }
            Op::Range => {
                let high = self.pop()?;
                let mut n = self.pop()?.as_bigint()?.clone();
                let high = high.as_bigint()?;
                while &n <= high {
                    self.push(n.clone());
                    n += 1u32;
                }
            }
            Op::Wait => self.ins_wait()?,
            Op::SwapAt => {
                let a = self.pop_strict()?.as_clamped_int()?;
                let b = self.pop_strict()?.as_clamped_int()?;
                self.stack_mut().swap(b, a)?;
            }
            Op::Increment => {
                let value = self.pop()?;
                self.push(value.add(Value::from(1i64))?);
            }
            Op::Decrement => {
                let value = self.pop()?;
                self.push(value.sub(Value::from(1i64))?);
            }
            Op::Contains => {
                let probe = self.pop_strict()?;
                let found = self.stack().contains(&probe);
                self.push(found);
            }
        }

        Ok(())
    }

    /// Output the remaining stack once the end of the text is reached.
    fn finish(&mut self) -> Result<(), ErrorKind> {
        log::debug!("outputting implicitly");
        if self.in_function {
            for value in self.machine.current().as_slice() {
                self.output.emit(Emission::Number(value.clone()))?;
            }
        } else {
            let rendered: Vec<String> = self.stack().as_slice().iter().map(Value::to_string).collect();
            self.output.emit(Emission::Text(rendered.join(" ")))?;
        }
        Ok(())
    }

    /// Run a function body in a fresh machine. The body reads its input from,
    /// and writes its output to, the caller's current stack.
    fn call(&mut self, name: char, body: &[char]) -> Result<(), ErrorKind> {
        if self.depth >= self.options.max_depth {
            return Err(ErrorKind::RecursionLimit(self.options.max_depth));
        }
        let caller = RefCell::new(std::mem::take(self.machine.current_mut()));

        let result = {
            let mut input = CallerInput { stack: &caller };
            let mut output = CallerOutput { stack: &caller };
            let mut callee = Vm {
                code: body,
                cursor: 0,
                halt: None,
                in_function: true,
                depth: self.depth + 1,
                machine: Machine::default(),
                functions: self.functions.clone(),
                input: &mut input,
                output: &mut output,
                options: self.options,
            };
            callee.run()
        };

        *self.machine.current_mut() = caller.into_inner();
        result.map_err(|err| ErrorKind::Function {
            name,
            source: Box::new(err),
        })
    }

    /// Push the number made of every digit up to the matching `)`
    fn ins_number(&mut self) -> Result<(), ErrorKind> {
        let mut digits = String::new();
        let mut depth = 0;
        for pos in self.cursor + 1..self.code.len() {
            match self.code[pos] {
                '(' => depth += 1,
                ')' if depth > 0 => depth -= 1,
                ')' => {
                    // land on the `)` so it is stepped over as a no-op
                    self.cursor = pos - 1;
                    break;
                }
                c if c.is_ascii_digit() => digits.push(c),
                _ => {}
            }
        }

        if !digits.is_empty() {
            let number = digits
                .parse::<BigInt>()
                .map_err(|_| ErrorKind::Value(format!("{} is not a number", digits)))?;
            self.push(number);
        }
        Ok(())
    }

    /// Skip to the matching `]` if the top of the stack is falsy
    fn ins_loop_start(&mut self) {
        if self.stack().peek().is_some_and(|top| top.is_truthy()) {
            return;
        }
        if let Some(close) = self.find_close(self.cursor + 1, '[', ']') {
            self.cursor = close - 1;
        }
    }

    /// Jump back to just after the matching `[` if the top of the stack is truthy
    fn ins_loop_end(&mut self) {
        if !self.stack().peek().is_some_and(|top| top.is_truthy()) {
            return;
        }
        let mut depth = 0;
        for pos in (0..self.cursor).rev() {
            match self.code[pos] {
                ']' => depth += 1,
                '[' if depth > 0 => depth -= 1,
                '[' => {
                    self.cursor = pos;
                    return;
                }
                _ => {}
            }
        }
    }

    /// Pop N and jump to the next unmatched `]`, N times
    fn ins_break(&mut self) -> Result<(), ErrorKind> {
        let count = self.pop_strict()?.as_clamped_int()?;
        for _ in 0..count.max(0) {
            match self.find_close(self.cursor + 1, '[', ']') {
                Some(close) => self.cursor = close,
                None => break,
            }
        }
        Ok(())
    }

    /// Push the code of every character up to the closing `"`
    fn ins_string(&mut self) {
        let start = self.cursor;
        for pos in start + 1..self.code.len() {
            let c = self.code[pos];
            let escaped = self.code[pos - 1] == '\\';
            match c {
                '"' if escaped => self.push('"'),
                '"' => {
                    self.cursor = pos;
                    return;
                }
                'n' if escaped => self.push('\n'),
                '\\' if matches!(self.code.get(pos + 1).copied(), Some('"' | 'n')) => {}
                c => self.push(reveal(c)),
            }
        }
        // unterminated: the characters run again as instructions
    }

    fn ins_char(&mut self) {
        if let Some(&c) = self.code.get(self.cursor + 1) {
            self.push(reveal(c));
            self.cursor += 1;
        }
    }

    /// Bind the body up to the matching `}` to the preceding character
    fn ins_define(&mut self) -> Result<(), ErrorKind> {
        let name = self.prev_char();
        let start = self.cursor + 1;
        let Some(close) = self.find_close(start, '{', '}') else {
            return Ok(());
        };
        self.cursor = close - 1;

        let body = &self.code[start..close];
        if body.contains(&'i') {
            return Err(ErrorKind::InputInFunction);
        }
        if let Some(name) = name {
            log::debug!("defined function {}", name);
            self.functions.insert(name, Rc::from(body));
        }
        Ok(())
    }

    fn ins_read_chars(&mut self) {
        match self.input.read_line() {
            Some(line) => {
                self.stack_mut().extend(line.chars().map(Value::from));
            }
            None => self.push(0i64),
        }
    }

    fn ins_read_number(&mut self) -> Result<(), ErrorKind> {
        let line = self.take_input();
        if line.is_empty() {
            self.push(0i64);
            return Ok(());
        }
        match parse_int(&line) {
            Some(number) => self.push(number),
            None => return Err(ErrorKind::Input(line)),
        }
        Ok(())
    }

    fn ins_output_chars(&mut self) -> Result<(), ErrorKind> {
        if self.stack().is_empty() {
            let line = self.take_input();
            self.stack_mut().extend(line.chars().map(Value::from));
        }
        for value in self.stack_mut().drain() {
            self.output.emit(Emission::Char(value.as_char()?))?;
        }
        Ok(())
    }

    fn ins_output_numbers(&mut self) -> Result<(), ErrorKind> {
        self.fill_if_empty()?;
        let rendered: Vec<String> = self.stack_mut().drain().iter().map(Value::to_string).collect();
        self.output.emit(Emission::Text(rendered.join("\n")))?;
        Ok(())
    }

    /// Replace the whole stack with its sum
    fn ins_sum(&mut self) -> Result<(), ErrorKind> {
        self.fill_if_empty()?;
        let sum = self
            .stack_mut()
            .drain()
            .into_iter()
            .try_fold(Value::from(0i64), Value::add)?;
        self.push(sum);
        Ok(())
    }

    fn ins_load(&mut self) -> Result<(), ErrorKind> {
        match self.machine.backup.clone() {
            Backup::Snapshot(values) => self.stack_mut().extend(values),
            Backup::Value(value) => self.push(value),
            Backup::Empty => return Err(ErrorKind::BackupCell),
        }
        Ok(())
    }

    fn ins_random(&mut self) -> Result<(), ErrorKind> {
        let (high, low) = self.pop_pair()?;
        let (low, high) = (low.as_bigint()?, high.as_bigint()?);
        if low > high {
            return Err(ErrorKind::Value(format!(
                "empty range for a random number: {} to {}",
                low, high
            )));
        }
        let value = rand::thread_rng().gen_bigint_range(low, &(high + 1u32));
        self.push(value);
        Ok(())
    }

    /// Push every decimal digit of a popped value
    fn ins_explode(&mut self) -> Result<(), ErrorKind> {
        let value = self.pop()?;
        let digits = value
            .to_string()
            .chars()
            .map(|c| c.to_digit(10).map(|d| Value::from(d as i64)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ErrorKind::Value(format!("cannot split {} into digits", value)))?;
        self.stack_mut().extend(digits);
        Ok(())
    }

    /// Replace the whole stack with the number spelled by its values
    fn ins_join(&mut self) -> Result<(), ErrorKind> {
        self.fill_if_empty()?;
        if self.stack().is_empty() {
            return Err(ErrorKind::EmptyStack("cannot join an empty stack"));
        }

        let joined: String = self.stack().as_slice().iter().map(Value::to_string).collect();
        let number = joined
            .parse::<BigInt>()
            .map_err(|_| ErrorKind::Value(format!("cannot join {} into an integer", joined)))?;

        self.stack_mut().clear();
        self.push(number);
        Ok(())
    }

    fn ins_wait(&mut self) -> Result<(), ErrorKind> {
        let value = self.pop()?;
        let seconds = value.as_f64();
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| ErrorKind::Value(format!("cannot wait for {} seconds", value)))?;
        thread::sleep(duration);
        Ok(())
    }

    /// Apply `op` to the two topmost values, `lhs` being the deeper one
    fn binary(&mut self, op: fn(Value, Value) -> Result<Value, ErrorKind>) -> Result<(), ErrorKind> {
        let (rhs, lhs) = self.pop_pair()?;
        self.push(op(lhs, rhs)?);
        Ok(())
    }

    /// Index of the `close` matching an already opened bracket, scanning from `from`
    fn find_close(&self, from: usize, open: char, close: char) -> Option<usize> {
        let mut depth = 0;
        for pos in from..self.code.len() {
            let c = self.code[pos];
            if c == open {
                depth += 1;
            } else if c == close {
                if depth == 0 {
                    return Some(pos);
                }
                depth -= 1;
            }
        }
        None
    }

    fn next_char(&self) -> Option<char> {
        self.code.get(self.cursor + 1).copied()
    }

    fn prev_char(&self) -> Option<char> {
        self.cursor.checked_sub(1).map(|i| self.code[i])
    }

    fn stack(&self) -> &Stack {
        self.machine.current()
    }

    fn stack_mut(&mut self) -> &mut Stack {
        self.machine.current_mut()
    }

    fn push(&mut self, value: impl Into<Value>) {
        self.stack_mut().push(value);
    }

    /// Pop without falling back to input.
    fn pop_strict(&mut self) -> Result<Value, ErrorKind> {
        self.stack_mut()
            .pop()
            .ok_or(ErrorKind::EmptyStack("cannot pop from an empty stack"))
    }

    /// Pop, reading a number from input when the stack is empty and using
    /// zero once input is exhausted.
    fn pop(&mut self) -> Result<Value, ErrorKind> {
        match self.stack_mut().pop() {
            Some(value) => Ok(value),
            None => match self.implicit_fill()? {
                Fill::Input(value) => Ok(value),
                Fill::Zero => Ok(Value::from(0i64)),
            },
        }
    }

    /// Pop two values, top first. A value read from input is placed in front
    /// of the ones popped before it, a zero fill after them.
    fn pop_pair(&mut self) -> Result<(Value, Value), ErrorKind> {
        let mut popped = Vec::with_capacity(2);
        for _ in 0..2 {
            match self.stack_mut().pop() {
                Some(value) => popped.push(value),
                None => match self.implicit_fill()? {
                    Fill::Input(value) => popped.insert(0, value),
                    Fill::Zero => popped.push(Value::from(0i64)),
                },
            }
        }
        let second = popped.swap_remove(1);
        Ok((popped.swap_remove(0), second))
    }

    fn implicit_fill(&mut self) -> Result<Fill, ErrorKind> {
        let line = self.take_input();
        if line.is_empty() {
            log::debug!("stack and input empty, using implicit zero");
            return Ok(Fill::Zero);
        }
        match parse_int(&line) {
            Some(number) => {
                log::debug!("stack empty, using implicit input");
                Ok(Fill::Input(Value::Int(number)))
            }
            None => Err(ErrorKind::Input(line)),
        }
    }

    fn peek_for_comparison(&self) -> Result<Value, ErrorKind> {
        self.stack()
            .peek()
            .ok_or(ErrorKind::EmptyStack("cannot compare with an empty stack"))
    }

    /// Next input line, empty once input is exhausted.
    fn take_input(&mut self) -> String {
        self.input.read_line().unwrap_or_default()
    }

    /// Read every remaining input line as an integer onto the stack.
    fn dump_input(&mut self) -> Result<(), ErrorKind> {
        loop {
            let line = self.take_input();
            if line.is_empty() {
                return Ok(());
            }
            let number = parse_int(&line).ok_or(ErrorKind::Input(line))?;
            self.push(number);
        }
    }

    fn fill_if_empty(&mut self) -> Result<(), ErrorKind> {
        if self.stack().is_empty() {
            self.dump_input()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::{EmptyLines, ScriptedInput},
        program::Program,
    };
    use std::time::Instant;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::from).collect()
    }

    /// Runs `source` to completion and returns the final current stack and the output.
    fn run_with(
        source: &str,
        input: &mut dyn Input,
        options: Options,
    ) -> Result<(Vec<Value>, String), RuntimeError> {
        let program = Program::parse(source).unwrap();
        let mut output = String::new();
        let stack = {
            let mut vm = Vm::new(&program.code, input, &mut output, options);
            vm.run()?;
            vm.machine().current().as_slice().to_vec()
        };
        Ok((stack, output))
    }

    fn run_program(source: &str, input: &[&str]) -> Result<(Vec<Value>, String), RuntimeError> {
        let mut input = ScriptedInput::new(input.iter().copied());
        run_with(source, &mut input, Options::default())
    }

    fn output_of(source: &str) -> String {
        run_program(source, &[]).unwrap().1
    }

    fn stack_of(source: &str) -> Vec<Value> {
        run_program(source, &[]).unwrap().0
    }

    #[test]
    fn push_digit() {
        assert_eq!(output_of("5"), "5");
        assert_eq!(output_of(""), "");
    }

    #[test]
    fn falsy_loop_is_skipped() {
        assert_eq!(output_of("0[5]"), "0");
        assert_eq!(stack_of("0[5]"), ints(&[0]));
        assert_eq!(stack_of("[5]"), ints(&[]));
    }

    #[test]
    fn countdown_loop() {
        assert_eq!(output_of("3[:u,]"), "3210");
        assert_eq!(output_of("2[1[p0]p,]"), "0");
    }

    #[test]
    fn multi_digit_numbers() {
        assert_eq!(stack_of("(123)(4(5)6)()"), ints(&[123, 456]));
    }

    #[test]
    fn string_literals() {
        assert_eq!(stack_of("\"hi\""), ints(&['h' as i64, 'i' as i64]));
        assert_eq!(stack_of("\"a\\nb\""), ints(&['a' as i64, 10, 'b' as i64]));
        assert_eq!(stack_of("\"\\\"\""), ints(&['"' as i64]));
        assert_eq!(stack_of("\"[}\""), ints(&['[' as i64, '}' as i64]));
        assert_eq!(output_of("\"olleh\"&o"), "olleh");
    }

    #[test]
    fn char_literals() {
        assert_eq!(stack_of("'a'('1"), ints(&['a' as i64, '(' as i64, '1' as i64]));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(stack_of("73-"), ints(&[4]));
        assert_eq!(stack_of("73%"), ints(&[1]));
        assert_eq!(stack_of("23^"), ints(&[8]));
        assert_eq!(stack_of("34*2+"), ints(&[14]));
        assert_eq!(output_of("52/"), "2.5");
        assert_eq!(stack_of("5`3,1N"), ints(&[6, 2, -1]));
    }

    #[test]
    fn comparisons() {
        assert_eq!(stack_of("12L"), ints(&[1, 1]));
        assert_eq!(stack_of("12G"), ints(&[1, 0]));
        assert_eq!(stack_of("33="), ints(&[3, 1]));
        assert_eq!(stack_of("3!0!"), ints(&[0, 1]));
    }

    #[test]
    fn stack_shape() {
        assert_eq!(stack_of(":"), ints(&[]));
        assert_eq!(stack_of("4:"), ints(&[4, 4]));
        assert_eq!(stack_of("12&:"), ints(&[1, 2, 1, 2]));
        assert_eq!(stack_of("123p"), ints(&[1, 2]));
        assert_eq!(stack_of("123&p"), ints(&[]));
        assert_eq!(stack_of("12f"), ints(&[2, 1]));
        assert_eq!(stack_of("123r"), ints(&[3, 2, 1]));
        assert_eq!(stack_of("312a"), ints(&[1, 2, 3]));
        assert_eq!(stack_of("567y"), ints(&[5, 6, 7, 3]));
        assert_eq!(stack_of("56702W"), ints(&[7, 6, 5]));
        assert_eq!(stack_of("5671I"), ints(&[5, 6, 7, 6]));
        assert_eq!(stack_of("567(1)~"), ints(&[5, 6, 7, 0]));
        assert_eq!(stack_of("5676~"), ints(&[5, 6, 7, 1]));
    }

    #[test]
    fn digits() {
        assert_eq!(stack_of("(1234)S"), ints(&[1, 2, 3, 4]));
        assert_eq!(stack_of("(1234)c"), ints(&[4]));
        assert_eq!(stack_of("12(34)J"), ints(&[1234]));
        assert_eq!(stack_of("25R"), ints(&[2, 3, 4, 5]));
        assert_eq!(stack_of("52R"), ints(&[]));
    }

    #[test]
    fn integers_grow_without_bound() {
        assert_eq!(
            output_of("\"hello world\"J"),
            "10410110810811132119111114108100"
        );
        assert_eq!(
            output_of("(99)(99)^"),
            "369729637649726772657187905628805440595668764281741102430259972423552570455277523421410650010128232727940978889548326540119429996769494359451621570193644014418071060667659301384999779999159200499899"
        );
        assert_eq!(output_of("(18446744073709551616)`"), "18446744073709551617");
        assert_eq!(output_of("(100000000000000000000)S&+"), "1");
        assert_eq!(output_of("(100000000000000000000)c"), "21");

        let factorial = include_str!("../demos/factorial.ly");
        let (_, output) = run_program(factorial, &["21"]).unwrap();
        assert_eq!(output, "51090942171709440000");
    }

    #[test]
    fn huge_indices_are_out_of_range() {
        let err = run_program("12(99999999999999999999)I", &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IndexOutOfRange { .. }));
        let err = run_program("(99999999999999999999)o", &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Value(_)));
    }

    #[test]
    fn random_in_range() {
        for _ in 0..20 {
            let stack = stack_of("36?");
            assert_eq!(stack.len(), 1);
            assert!(stack[0] >= Value::from(3i64) && stack[0] <= Value::from(6i64));
        }
        assert_eq!(stack_of("44?"), ints(&[4]));
    }

    #[test]
    fn multiple_stacks() {
        assert_eq!(stack_of("1>2<"), ints(&[1]));
        assert_eq!(stack_of("1<2>"), ints(&[1]));
        assert_eq!(stack_of("1<<>"), ints(&[]));
    }

    #[test]
    fn backup() {
        assert_eq!(stack_of("5sp1l"), ints(&[1, 5]));
        assert_eq!(stack_of("12&s&pl"), ints(&[1, 2]));

        let err = run_program("l", &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BackupCell));
        // storing an empty stack empties the backup
        assert!(run_program("5sps1l", &[]).is_err());
    }

    #[test]
    fn wait() {
        assert_eq!(stack_of("10w"), ints(&[1]));
        assert!(matches!(
            run_program("1Nw", &[]).unwrap_err().kind,
            ErrorKind::Value(_)
        ));
    }

    #[test]
    fn delay_between_instructions() {
        let options = Options {
            delay: Some(Duration::from_millis(5)),
            ..Options::default()
        };
        let start = Instant::now();
        let (stack, _) = run_with("12+", &mut ScriptedInput::default(), options).unwrap();
        assert_eq!(stack, ints(&[3]));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn empty_lines_read_as_nothing() {
        let (stack, _) = run_with("i", &mut EmptyLines, Options::default()).unwrap();
        assert_eq!(stack, ints(&[]));
        let (stack, _) = run_with("n&n+", &mut EmptyLines, Options::default()).unwrap();
        assert_eq!(stack, ints(&[0]));
    }

    #[test]
    fn terminate() {
        assert_eq!(output_of("12;3"), "");
        assert_eq!(output_of("12u;3"), "2");
    }

    #[test]
    fn break_leaves_enclosing_loop() {
        assert_eq!(output_of("1[1$9]8"), "1 8");
        assert_eq!(output_of("1[1[2$9]7]8"), "1 1 8");
        assert_eq!(output_of("1[1[1$9]p0]8"), "1 0 8");
        assert_eq!(output_of("0$5"), "5");
    }

    #[test]
    fn implicit_input_fallback() {
        let (stack, output) = run_program("+", &["3"]).unwrap();
        assert_eq!(stack, ints(&[3]));
        assert_eq!(output, "3");

        // the input value is placed in front: 5 - 3
        let (stack, _) = run_program("5-", &["3"]).unwrap();
        assert_eq!(stack, ints(&[2]));

        // both values from input: 7 - 2
        let (stack, _) = run_program("-", &["7", "2"]).unwrap();
        assert_eq!(stack, ints(&[5]));

        let err = run_program("+", &["abc"]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Input(_)));
    }

    #[test]
    fn strict_pops_do_not_read_input() {
        let err = run_program("p", &["3"]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EmptyStack(_)));
        assert_eq!(err.index, 0);
        assert_eq!(err.instruction, Some('p'));
    }

    #[test]
    fn reading_input() {
        let (stack, _) = run_program("i", &["ab"]).unwrap();
        assert_eq!(stack, ints(&['a' as i64, 'b' as i64]));
        let (stack, _) = run_program("i", &[]).unwrap();
        assert_eq!(stack, ints(&[0]));

        let (stack, _) = run_program("nn", &["42"]).unwrap();
        assert_eq!(stack, ints(&[42, 0]));
        let (stack, _) = run_program("&n", &["1", "2", "3"]).unwrap();
        assert_eq!(stack, ints(&[1, 2, 3]));
        assert!(run_program("n", &["x"]).is_err());

        let (_, output) = run_program("&u", &["1", "2"]).unwrap();
        assert_eq!(output, "1\n2");
        let (_, output) = run_program("&+", &["1", "2", "3"]).unwrap();
        assert_eq!(output, "6");
        let (_, output) = run_program("&o;", &["echo"]).unwrap();
        assert_eq!(output, "echo");
    }

    #[test]
    fn output() {
        assert_eq!(output_of("(72)(105)&o"), "Hi");
        assert_eq!(output_of("(72)o1u"), "H1");
        assert!(matches!(
            run_program("o", &[]).unwrap_err().kind,
            ErrorKind::EmptyStack(_)
        ));
    }

    #[test]
    fn function_output_lands_on_caller_stack() {
        let program = Program::parse("a{5}a").unwrap();
        let mut input = ScriptedInput::default();
        let mut output = String::new();
        let mut vm = Vm::new(&program.code, &mut input, &mut output, Options::default());
        vm.run().unwrap();

        assert_eq!(vm.halt, Some(Exit::Finished));
        assert_eq!(vm.machine().current().as_slice(), &ints(&[5])[..]);
        assert_eq!(vm.functions().get(&'a').map(|body| body.len()), Some(1));
    }

    #[test]
    fn function_arguments_come_from_caller_stack() {
        // d doubles its argument
        assert_eq!(stack_of("d{2*}4d"), ints(&[8]));
        // with an empty caller stack the argument falls back to zero
        assert_eq!(stack_of("d{2*}d"), ints(&[0]));
        // character output is pushed back as a code
        assert_eq!(stack_of("c{(65)o}c"), ints(&[65]));
    }

    #[test]
    fn functions_have_their_own_state() {
        // the callee counts its own, empty stack
        assert_eq!(stack_of("12g{y}g"), ints(&[1, 2, 0]));

        // the callee's backup is empty even though the caller's is not
        let err = run_program("1sf{l}f", &[]).unwrap_err();
        match err.kind {
            ErrorKind::Function { source, .. } => {
                assert!(matches!(source.kind, ErrorKind::BackupCell))
            }
            kind => panic!("expected a function error, got {:?}", kind),
        }
    }

    #[test]
    fn functions_call_functions() {
        assert_eq!(stack_of("a{1}b{a`}b"), ints(&[2]));
    }

    #[test]
    fn call_depth_is_limited() {
        let shallow = |max_depth| Options {
            max_depth,
            ..Options::default()
        };
        let (stack, _) = run_with("a{1}b{a}c{b}c", &mut ScriptedInput::default(), shallow(3)).unwrap();
        assert_eq!(stack, ints(&[1]));

        let err = run_with("a{1}b{a}c{b}c", &mut ScriptedInput::default(), shallow(2)).unwrap_err();
        assert_eq!(err.kind.name(), "FunctionError");
        assert!(matches!(err.innermost().kind, ErrorKind::RecursionLimit(2)));
        assert_eq!(err.innermost().instruction, Some('a'));

        let err = run_with("a{1a}a", &mut ScriptedInput::default(), shallow(20)).unwrap_err();
        assert_eq!(err.innermost().kind.name(), "RecursionError");
    }

    #[test]
    fn function_errors_use_body_index() {
        let err = run_program("a{1pp}a", &[]).unwrap_err();
        assert_eq!(err.index, 6);
        assert_eq!(err.instruction, Some('a'));
        match &err.kind {
            ErrorKind::Function { name, source } => {
                assert_eq!(*name, 'a');
                assert_eq!(source.index, 2);
                assert_eq!(source.instruction, Some('p'));
                assert!(matches!(source.kind, ErrorKind::EmptyStack(_)));
            }
            kind => panic!("expected a function error, got {:?}", kind),
        }
    }

    #[test]
    fn functions_cannot_read_lines() {
        let err = run_program("a{i}", &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InputInFunction));
        assert_eq!(err.kind.name(), "FunctionError");
    }

    #[test]
    fn step_by_step() {
        let program = Program::parse("12;").unwrap();
        let mut input = ScriptedInput::default();
        let mut output = String::new();
        let mut vm = Vm::new(&program.code, &mut input, &mut output, Options::default());

        vm.step().unwrap();
        assert_eq!(vm.cursor(), 1);
        assert_eq!(vm.machine().current().as_slice(), &ints(&[1])[..]);
        vm.step().unwrap();
        vm.step().unwrap();
        assert_eq!(vm.halt, Some(Exit::Terminated));
        // further steps do nothing
        vm.step().unwrap();
        assert_eq!(vm.cursor(), 2);
    }

    #[test]
    fn runtime_faults() {
        let kind = |source: &str| run_program(source, &[]).unwrap_err().kind;
        assert!(matches!(kind("10/"), ErrorKind::ZeroDivision(_)));
        assert!(matches!(kind("10%"), ErrorKind::ZeroDivision(_)));
        assert!(matches!(kind("15I"), ErrorKind::IndexOutOfRange { .. }));
        assert!(matches!(kind("52?"), ErrorKind::Value(_)));
        assert!(matches!(kind("J"), ErrorKind::EmptyStack(_)));
        assert!(matches!(kind("1L"), ErrorKind::EmptyStack(_)));
        assert!(matches!(kind("12/o"), ErrorKind::Type(_)));
    }
}
