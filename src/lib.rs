//! Ly is a stack-based esoteric language. A program is a flat sequence of
//! single-character instructions working on a list of stacks.
//!
//! # Example
//!
//! ```text
//! # print the numbers 10 down to 1, one per line
//! (10)[:u(10)o,]
//! ```
//!
//! # Instructions
//!
//! A `&` right before some instructions turns them into a variant working on
//! the whole current stack.
//!
//! | Instruction | Brief   |
//! |-------------|---------|
//! | `0`-`9`     | Push the digit. |
//! | `(`...`)`   | Push the number made of every digit inside the parens. |
//! | `[`         | Skip past the matching `]` if the top of the stack is zero or missing. |
//! | `]`         | Jump back after the matching `[` unless the top of the stack is zero or missing. |
//! | `$`         | Pop N, jump to the next unmatched `]` N times. |
//! | `"`...`"`   | Push the code of every character. `\"` and `\n` are escapes. |
//! | `'`         | Push the code of the next character. |
//! | `F{`...`}`  | Define function `F`. Using `F` later runs the body. |
//! | `i`         | Read a line, push the code of every character. |
//! | `n` / `&n`  | Read a line as a number / read every remaining line as numbers. |
//! | `o` / `&o`  | Pop and output as a character / output the whole stack as characters. |
//! | `u` / `&u`  | Pop and output as a number / output the whole stack, one number per line. |
//! | `+ - * / % ^` | Arithmetic on the two topmost values. `&+` sums the stack. |
//! | `L` `G` `=` | Pop, compare with the new top (`<`, `>`, `==`), push 1 or 0. |
//! | `!`         | Logical not. |
//! | `:` / `&:`  | Duplicate the top / the whole stack. |
//! | `p` / `&p`  | Pop / clear the stack. |
//! | `f`         | Swap the two topmost values. |
//! | `W`         | Pop two indices, swap the values at them. |
//! | `r`         | Reverse the stack. |
//! | `a`         | Sort the stack. |
//! | `y`         | Push the length of the stack. |
//! | `~`         | Pop, push whether the value is still in the stack. |
//! | `I`         | Pop an index, push the value at it. |
//! | `J`         | Join the whole stack into one number. |
//! | `S`         | Pop, push every decimal digit. |
//! | `c`         | Pop, push the number of characters in its decimal form. |
//! | `` ` `` / `,` / `N` | Increment / decrement / negate. |
//! | `R`         | Pop two bounds, push the inclusive range between them. |
//! | `?`         | Pop two bounds, push a random integer between them. |
//! | `<` / `>`   | Move to the stack on the left / right, creating it if needed. |
//! | `s` / `&s`  | Store the top / a copy of the stack in the backup cell. |
//! | `l`         | Load the backup cell onto the stack. |
//! | `w`         | Pop, sleep for that many seconds. |
//! | `;`         | Terminate. |
//! | `#`         | Comment until the end of the line. |
//!
//! # Important notes
//!
//! - Popping from an empty stack reads a number from input instead, or uses
//!   zero once input is exhausted. `o`, `u`, `p`, `=`, `~`, `I`, `W` and `$`
//!   never do this.
//! - Integers have no size limit. `/` always produces a real number.
//! - When the end of the program is reached without `;`, the stack is output
//!   as space separated numbers.
//! - Functions run with fresh stacks. They read their input from the
//!   caller's stack and push their output back onto it.

pub mod brackets;
pub mod error;
pub mod instruction;
pub mod io;
pub mod preprocess;
pub mod program;
pub mod state;
pub mod value;
pub mod vm;

pub use error::{ErrorKind, RuntimeError};
pub use io::{Emission, Input, Output};
pub use program::Program;
pub use vm::{Exit, Options, Vm};

/// Load and run `source` until it terminates.
pub fn interpret(
    source: &str,
    input: &mut dyn Input,
    output: &mut dyn Output,
    options: Options,
) -> anyhow::Result<()> {
    let program = Program::parse(source)?;
    let mut vm = Vm::new(&program.code, input, output, options);
    vm.run()?;
    Ok(())
}

/// Run `source`, reporting whether it completed without an error.
pub fn run(source: &str, input: &mut dyn Input, output: &mut dyn Output) -> bool {
    match interpret(source, input, output, Options::default()) {
        Ok(()) => true,
        Err(err) => {
            log::error!("{:#}", err);
            false
        }
    }
}
