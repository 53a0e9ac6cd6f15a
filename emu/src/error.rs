use arch::op::Opcode;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("IP out of bounds: {0:#06X}")]
    IpOutOfBounds(u16),

    #[error("unknown opcode: {0:#04X}")]
    UnknownOpcode(u8),

    #[error("unknown operand type: {0:#04X}")]
    UnknownOperandTag(u8),

    #[error("invalid 16-bit register code: {0}")]
    InvalidReg16(u8),

    #[error("invalid 8-bit register code: {0}")]
    InvalidReg8(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("decode error at IP={ip:#06X}: {source}")]
    Decode {
        ip: u16,
        #[source]
        source: DecodeError,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("division overflow")]
    DivisionOverflow,

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("REP prefix on non-string instruction {0}")]
    RepPrefix(Opcode),

    #[error("invalid port operand")]
    InvalidPortOperand,

    #[error("invalid I/O value operand")]
    InvalidIoOperand,

    #[error("CPU is halted")]
    Halted,
}

/// How a run ended. `Stopped` (host raised the stop signal) and `Limit`
/// (instruction budget exhausted) are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Halted,
    Stopped,
    Limit,
}
