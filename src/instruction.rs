/// Instruction set of the language.
/// ***Function names are looked up before this table and shadow it***
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Op {
    Digit(u8),
    Number,
    LoopStart,
    LoopEnd,
    Break,
    StringLiteral,
    CharLiteral,
    DefineFunction,
    ReadChars,
    ReadNumber,
    OutputChar,
    OutputNumber,
    Reverse,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Less,
    Greater,
    Equal,
    Terminate,
    Duplicate,
    Pop,
    Not,
    Load,
    Store,
    Swap,
    Left,
    Right,
    Random,
    Length,
    DigitCount,
    Explode,
    Join,
    Sort,
    Negate,
    Index,
    Range,
    Wait,
    SwapAt,
    Increment,
    Decrement,
    Contains,
}

impl Op {
    /// Opcode for an instruction character, `None` for a no-op.
    pub fn from_char(c: char) -> Option<Self> {
        let op = match c {
            '0'..='9' => Op::Digit(c as u8 - b'0'),
            '(' => Op::Number,
            '[' => Op::LoopStart,
            ']' => Op::LoopEnd,
            '$' => Op::Break,
            '"' => Op::StringLiteral,
            '\'' => Op::CharLiteral,
            '{' => Op::DefineFunction,
            'i' => Op::ReadChars,
            'n' => Op::ReadNumber,
            'o' => Op::OutputChar,
            'u' => Op::OutputNumber,
            'r' => Op::Reverse,
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            '%' => Op::Mod,
            '^' => Op::Pow,
            'L' => Op::Less,
            'G' => Op::Greater,
            '=' => Op::Equal,
            ';' => Op::Terminate,
            ':' => Op::Duplicate,
            'p' => Op::Pop,
            '!' => Op::Not,
            'l' => Op::Load,
            's' => Op::Store,
            'f' => Op::Swap,
            '<' => Op::Left,
            '>' => Op::Right,
            '?' => Op::Random,
            'y' => Op::Length,
            'c' => Op::DigitCount,
            'S' => Op::Explode,
            'J' => Op::Join,
            'a' => Op::Sort,
            'N' => Op::Negate,
            'I' => Op::Index,
            'R' => Op::Range,
            'w' => Op::Wait,
            'W' => Op::SwapAt,
            '`' => Op::Increment,
            ',' => Op::Decrement,
            '~' => Op::Contains,
            _ => return None,
        };
        Some(op)
    }
}
