use arch::reg::Reg8;

use crate::cpu::Cpu;

/// Scale a 6-bit DAC channel to 8 bits.
pub(crate) fn scale_channel(ch: u8) -> u8 {
    ((ch & 0x3F) as u16 * 255 / 63) as u8
}

impl Cpu {
    /// Software interrupt dispatch. Unknown interrupt numbers and unknown
    /// AH sub-functions are no-ops.
    pub(crate) fn interrupt(&mut self, num: u8) {
        match num {
            0x10 => self.int10_video(),
            0x16 => self.int16_keyboard(),
            0x21 => self.int21_dos(),
            _ => {}
        }
    }

    fn int10_video(&mut self) {
        match self.regs.get8(Reg8::AH) {
            // Set video mode; only mode 13h is meaningful here.
            0x00 => {
                if self.regs.get8(Reg8::AL) == 0x13 {
                    self.sink.mode13h();
                }
            }
            // Palette services.
            0x10 => match self.regs.get8(Reg8::AL) {
                // Single register, BL = index, BH = 6-bit gray value.
                0x00 => {
                    let index = self.regs.get8(Reg8::BL);
                    let gray = scale_channel(self.regs.get8(Reg8::BH));
                    self.sink.palette(index, [gray, gray, gray]);
                }
                // Individual DAC register: BX = index, CL/DH/CH = R/G/B.
                0x10 => {
                    let index = self.regs.bx as u8;
                    let r = scale_channel(self.regs.get8(Reg8::CL));
                    let g = scale_channel(self.regs.get8(Reg8::DH));
                    let b = scale_channel(self.regs.get8(Reg8::CH));
                    self.sink.palette(index, [r, g, b]);
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn int16_keyboard(&mut self) {
        match self.regs.get8(Reg8::AH) {
            // Read keystroke, consuming it. No key pending reads as zero.
            0x00 => match self.keyboard_port().take() {
                Some((scancode, ascii)) => {
                    self.regs.set8(Reg8::AH, scancode);
                    self.regs.set8(Reg8::AL, ascii);
                }
                None => {
                    self.regs.set8(Reg8::AH, 0);
                    self.regs.set8(Reg8::AL, 0);
                }
            },
            // Non-destructive check; ZF clear means a key is waiting.
            0x01 => match self.keyboard_port().peek() {
                Some((scancode, ascii)) => {
                    self.flags.zf = false;
                    self.regs.set8(Reg8::AH, scancode);
                    self.regs.set8(Reg8::AL, ascii);
                }
                None => self.flags.zf = true,
            },
            _ => {}
        }
    }

    fn int21_dos(&mut self) {
        if self.regs.get8(Reg8::AH) == 0x4C {
            self.halted = true;
        }
    }
}
