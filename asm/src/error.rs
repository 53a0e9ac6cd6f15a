use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, column {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },

    #[error("unterminated string at line {0}")]
    UnterminatedString(usize),

    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("undefined constant: {0}")]
    UndefinedConstant(String),

    #[error("unexpected operator: {0}")]
    UnexpectedOperator(String),

    #[error("expected closing parenthesis")]
    UnclosedParen,

    #[error("unexpected character: '{0}'")]
    UnexpectedChar(char),

    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreprocessError {
    #[error("expected expression after EQU at line {0}")]
    MissingExpression(usize),

    #[error("error evaluating constant '{name}' at line {line}: {source}")]
    Eval {
        name: String,
        line: usize,
        #[source]
        source: ExprError,
    },

    #[error("cannot redefine constant '{name}' at line {line} (previously defined at line {prev})")]
    Redefined {
        name: String,
        line: usize,
        prev: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unknown instruction: {name} at line {line}")]
    UnknownInstruction { name: String, line: usize },

    #[error("unknown directive: {name} at line {line}")]
    UnknownDirective { name: String, line: usize },

    #[error("undefined label: {name} at line {line}")]
    UndefinedLabel { name: String, line: usize },

    #[error("unexpected token: {text} at line {line}")]
    UnexpectedToken { text: String, line: usize },

    #[error("invalid operand: {text} at line {line}")]
    BadOperand { text: String, line: usize },

    #[error("invalid number: {text} at line {line}")]
    InvalidNumber { text: String, line: usize },

    #[error("{name} expects {expected} operand(s), got {got} at line {line}")]
    OperandCount {
        name: String,
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("expected ']' at line {0}")]
    ExpectedBracket(usize),

    #[error("invalid escape sequence '\\{ch}' at line {line}")]
    InvalidEscape { ch: char, line: usize },

    #[error("character '{ch}' (U+{code:04X}) cannot be represented in CP437")]
    Unrepresentable { ch: char, code: u32 },

    #[error("oversized DB value {value} at line {line}")]
    OversizedByte { value: u16, line: usize },

    #[error("cannot emit into the stack segment at line {0}")]
    StackSegment(usize),

    #[error("error in data expression at line {line}: {source}")]
    DataExpr {
        line: usize,
        #[source]
        source: ExprError,
    },

    #[error("inconsistent sizing for label '{label}': predicted {predicted:#06X}, emitted at {emitted:#06X}")]
    SizingMismatch {
        label: String,
        predicted: u16,
        emitted: u16,
    },
}

/// Top-level assembler error, one variant per pipeline stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AsmError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
