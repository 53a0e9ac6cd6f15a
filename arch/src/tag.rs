use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Operand type tag; the first byte of every operand block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OperandTag {
    None = 0,
    /// 1-byte register code
    Reg16 = 1,
    /// 1-byte register code
    Reg8 = 2,
    /// 2-byte little-endian immediate
    Imm16 = 3,
    /// 1-byte immediate
    Imm8 = 4,
    /// 2-byte direct offset
    Mem = 5,
    /// 1-byte register code + 2-byte displacement
    MemReg = 6,
}
