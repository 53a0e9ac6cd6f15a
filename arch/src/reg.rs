use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumString};

/// 16-bit register slots with their wire codes. Segment registers share the
/// code space with the general registers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, EnumString, Display,
)]
#[repr(u8)]
#[strum(ascii_case_insensitive)]
pub enum Reg16 {
    AX = 0,
    BX = 1,
    CX = 2,
    DX = 3,
    SI = 12,
    DI = 13,
    BP = 14,
    SP = 15,
    CS = 16,
    DS = 17,
    ES = 18,
    SS = 19,
}

/// Byte views aliasing the low/high halves of AX..DX.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, EnumString, Display,
)]
#[repr(u8)]
#[strum(ascii_case_insensitive)]
pub enum Reg8 {
    AL = 4,
    AH = 5,
    BL = 6,
    BH = 7,
    CL = 8,
    CH = 9,
    DL = 10,
    DH = 11,
}

impl Reg16 {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_segment(self) -> bool {
        matches!(self, Reg16::CS | Reg16::DS | Reg16::ES | Reg16::SS)
    }
}

impl Reg8 {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn codes_match_wire_format() {
        assert_eq!(Reg16::AX.code(), 0);
        assert_eq!(Reg16::SP.code(), 15);
        assert_eq!(Reg16::CS.code(), 16);
        assert_eq!(Reg16::SS.code(), 19);
        assert_eq!(Reg8::AL.code(), 4);
        assert_eq!(Reg8::DH.code(), 11);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Reg16::from_str("ax"), Ok(Reg16::AX));
        assert_eq!(Reg16::from_str("Di"), Ok(Reg16::DI));
        assert_eq!(Reg8::from_str("cl"), Ok(Reg8::CL));
        assert!(Reg16::from_str("zz").is_err());
    }

    #[test]
    fn round_trip_codes() {
        for code in [0u8, 1, 2, 3, 12, 13, 14, 15, 16, 17, 18, 19] {
            let reg = Reg16::try_from(code).unwrap();
            assert_eq!(reg.code(), code);
        }
        for code in 4u8..=11 {
            let reg = Reg8::try_from(code).unwrap();
            assert_eq!(reg.code(), code);
        }
    }
}
