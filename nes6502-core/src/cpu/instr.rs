//! CPU Addressing Modes and Operations

use crate::{
    cpu::{Cpu, Status},
    mem::Mem,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// List of all CPU official operations, plus `KIL`.
///
/// Undocumented opcodes either decode to a `NOP` that consumes its operand bytes, or to `KIL`.
///
/// # References
///
/// - <https://wiki.nesdev.org/w/index.php/6502_instructions>
/// - <http://archive.6502.org/datasheets/rockwell_r650x_r651x.pdf>
#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms, reason = "more idiomatic for cpu instructions")]
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC, CLD, CLI, CLV, CMP, CPX,
    CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP, JSR, LDA, LDX, LDY, LSR, #[default] NOP, ORA, PHA,
    PHP, PLA, PLP, ROL, ROR, RTI, RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS,
    TYA,
    // Halts the processor on real hardware
    KIL,
}

impl Instr {
    /// Whether the operation writes its effective address. These never pay the page-crossing
    /// cycle since it is already part of their base cycle count.
    #[must_use]
    pub const fn writes_memory(self) -> bool {
        matches!(
            self,
            Self::STA
                | Self::STX
                | Self::STY
                | Self::ASL
                | Self::LSR
                | Self::ROL
                | Self::ROR
                | Self::INC
                | Self::DEC
        )
    }
}

/// CPU Addressing mode.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms, reason = "more idiomatic for cpu addressing modes")]
#[rustfmt::skip]
#[must_use]
pub enum AddrMode {
    // Accumulator and Implied
    ACC, #[default] IMP,
    // Immediate and relative
    IMM, REL,
    // Zero Page
    ZP0, ZPX, ZPY,
    // Absolute
    ABS, ABX, ABY,
    // Indirect
    IND, IDX, IDY,
}

impl AddrMode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u16 {
        match self {
            Self::ACC | Self::IMP => 0,
            Self::IMM | Self::REL | Self::ZP0 | Self::ZPX | Self::ZPY | Self::IDX | Self::IDY => 1,
            Self::ABS | Self::ABX | Self::ABY | Self::IND => 2,
        }
    }

    /// Whether crossing a page while indexing can cost an extra cycle.
    #[must_use]
    pub const fn page_penalty(self) -> bool {
        matches!(self, Self::ABX | Self::ABY | Self::IDY)
    }
}

/// CPU Instruction Reference.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct InstrRef {
    pub opcode: u8,
    pub instr: Instr,
    pub addr_mode: AddrMode,
    pub cycles: u8,
}

impl std::fmt::Display for InstrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        let instr = self.instr;
        #[allow(
            clippy::wildcard_enum_match_arm,
            reason = "only unofficial instructions are marked with a *"
        )]
        let unofficial = match instr {
            Instr::KIL => "*",
            Instr::NOP if self.opcode != 0xEA => "*", // 0xEA is the only official NOP
            _ => "",
        };
        write!(f, "{unofficial}{instr:?}")
    }
}

macro_rules! instr {
    ($opcode:expr, $instr:ident, $addr_mode:ident, $cycles:expr) => {
        InstrRef {
            opcode: $opcode,
            instr: Instr::$instr,
            addr_mode: AddrMode::$addr_mode,
            cycles: $cycles,
        }
    };
}

/// CPU Addressing Modes
///
/// The 6502 can address 64KB from 0x0000 - 0xFFFF. The high byte is usually the page and the
/// low byte the offset into the page. There are 256 total pages of 256 bytes.
impl Cpu {
    /// 16x16 grid of 6502 opcodes. Matches datasheet matrix for easy lookup
    #[rustfmt::skip]
    pub const INSTR_REF: [InstrRef; 256] = [
        instr!(0x00, BRK, IMP, 7), instr!(0x01, ORA, IDX, 6), instr!(0x02, KIL, IMP, 2), instr!(0x03, NOP, IDX, 8), instr!(0x04, NOP, ZP0, 3), instr!(0x05, ORA, ZP0, 3), instr!(0x06, ASL, ZP0, 5), instr!(0x07, NOP, ZP0, 5), instr!(0x08, PHP, IMP, 3), instr!(0x09, ORA, IMM, 2), instr!(0x0A, ASL, ACC, 2), instr!(0x0B, NOP, IMM, 2), instr!(0x0C, NOP, ABS, 4), instr!(0x0D, ORA, ABS, 4), instr!(0x0E, ASL, ABS, 6), instr!(0x0F, NOP, ABS, 6),
        instr!(0x10, BPL, REL, 2), instr!(0x11, ORA, IDY, 5), instr!(0x12, KIL, IMP, 2), instr!(0x13, NOP, IDY, 8), instr!(0x14, NOP, ZPX, 4), instr!(0x15, ORA, ZPX, 4), instr!(0x16, ASL, ZPX, 6), instr!(0x17, NOP, ZPX, 6), instr!(0x18, CLC, IMP, 2), instr!(0x19, ORA, ABY, 4), instr!(0x1A, NOP, IMP, 2), instr!(0x1B, NOP, ABY, 7), instr!(0x1C, NOP, ABX, 4), instr!(0x1D, ORA, ABX, 4), instr!(0x1E, ASL, ABX, 7), instr!(0x1F, NOP, ABX, 7),
        instr!(0x20, JSR, ABS, 6), instr!(0x21, AND, IDX, 6), instr!(0x22, KIL, IMP, 2), instr!(0x23, NOP, IDX, 8), instr!(0x24, BIT, ZP0, 3), instr!(0x25, AND, ZP0, 3), instr!(0x26, ROL, ZP0, 5), instr!(0x27, NOP, ZP0, 5), instr!(0x28, PLP, IMP, 4), instr!(0x29, AND, IMM, 2), instr!(0x2A, ROL, ACC, 2), instr!(0x2B, NOP, IMM, 2), instr!(0x2C, BIT, ABS, 4), instr!(0x2D, AND, ABS, 4), instr!(0x2E, ROL, ABS, 6), instr!(0x2F, NOP, ABS, 6),
        instr!(0x30, BMI, REL, 2), instr!(0x31, AND, IDY, 5), instr!(0x32, KIL, IMP, 2), instr!(0x33, NOP, IDY, 8), instr!(0x34, NOP, ZPX, 4), instr!(0x35, AND, ZPX, 4), instr!(0x36, ROL, ZPX, 6), instr!(0x37, NOP, ZPX, 6), instr!(0x38, SEC, IMP, 2), instr!(0x39, AND, ABY, 4), instr!(0x3A, NOP, IMP, 2), instr!(0x3B, NOP, ABY, 7), instr!(0x3C, NOP, ABX, 4), instr!(0x3D, AND, ABX, 4), instr!(0x3E, ROL, ABX, 7), instr!(0x3F, NOP, ABX, 7),
        instr!(0x40, RTI, IMP, 6), instr!(0x41, EOR, IDX, 6), instr!(0x42, KIL, IMP, 2), instr!(0x43, NOP, IDX, 8), instr!(0x44, NOP, ZP0, 3), instr!(0x45, EOR, ZP0, 3), instr!(0x46, LSR, ZP0, 5), instr!(0x47, NOP, ZP0, 5), instr!(0x48, PHA, IMP, 3), instr!(0x49, EOR, IMM, 2), instr!(0x4A, LSR, ACC, 2), instr!(0x4B, NOP, IMM, 2), instr!(0x4C, JMP, ABS, 3), instr!(0x4D, EOR, ABS, 4), instr!(0x4E, LSR, ABS, 6), instr!(0x4F, NOP, ABS, 6),
        instr!(0x50, BVC, REL, 2), instr!(0x51, EOR, IDY, 5), instr!(0x52, KIL, IMP, 2), instr!(0x53, NOP, IDY, 8), instr!(0x54, NOP, ZPX, 4), instr!(0x55, EOR, ZPX, 4), instr!(0x56, LSR, ZPX, 6), instr!(0x57, NOP, ZPX, 6), instr!(0x58, CLI, IMP, 2), instr!(0x59, EOR, ABY, 4), instr!(0x5A, NOP, IMP, 2), instr!(0x5B, NOP, ABY, 7), instr!(0x5C, NOP, ABX, 4), instr!(0x5D, EOR, ABX, 4), instr!(0x5E, LSR, ABX, 7), instr!(0x5F, NOP, ABX, 7),
        instr!(0x60, RTS, IMP, 6), instr!(0x61, ADC, IDX, 6), instr!(0x62, KIL, IMP, 2), instr!(0x63, NOP, IDX, 8), instr!(0x64, NOP, ZP0, 3), instr!(0x65, ADC, ZP0, 3), instr!(0x66, ROR, ZP0, 5), instr!(0x67, NOP, ZP0, 5), instr!(0x68, PLA, IMP, 4), instr!(0x69, ADC, IMM, 2), instr!(0x6A, ROR, ACC, 2), instr!(0x6B, NOP, IMM, 2), instr!(0x6C, JMP, IND, 5), instr!(0x6D, ADC, ABS, 4), instr!(0x6E, ROR, ABS, 6), instr!(0x6F, NOP, ABS, 6),
        instr!(0x70, BVS, REL, 2), instr!(0x71, ADC, IDY, 5), instr!(0x72, KIL, IMP, 2), instr!(0x73, NOP, IDY, 8), instr!(0x74, NOP, ZPX, 4), instr!(0x75, ADC, ZPX, 4), instr!(0x76, ROR, ZPX, 6), instr!(0x77, NOP, ZPX, 6), instr!(0x78, SEI, IMP, 2), instr!(0x79, ADC, ABY, 4), instr!(0x7A, NOP, IMP, 2), instr!(0x7B, NOP, ABY, 7), instr!(0x7C, NOP, ABX, 4), instr!(0x7D, ADC, ABX, 4), instr!(0x7E, ROR, ABX, 7), instr!(0x7F, NOP, ABX, 7),
        instr!(0x80, NOP, IMM, 2), instr!(0x81, STA, IDX, 6), instr!(0x82, NOP, IMM, 2), instr!(0x83, NOP, IDX, 6), instr!(0x84, STY, ZP0, 3), instr!(0x85, STA, ZP0, 3), instr!(0x86, STX, ZP0, 3), instr!(0x87, NOP, ZP0, 3), instr!(0x88, DEY, IMP, 2), instr!(0x89, NOP, IMM, 2), instr!(0x8A, TXA, IMP, 2), instr!(0x8B, NOP, IMM, 2), instr!(0x8C, STY, ABS, 4), instr!(0x8D, STA, ABS, 4), instr!(0x8E, STX, ABS, 4), instr!(0x8F, NOP, ABS, 4),
        instr!(0x90, BCC, REL, 2), instr!(0x91, STA, IDY, 6), instr!(0x92, KIL, IMP, 2), instr!(0x93, NOP, IDY, 6), instr!(0x94, STY, ZPX, 4), instr!(0x95, STA, ZPX, 4), instr!(0x96, STX, ZPY, 4), instr!(0x97, NOP, ZPY, 4), instr!(0x98, TYA, IMP, 2), instr!(0x99, STA, ABY, 5), instr!(0x9A, TXS, IMP, 2), instr!(0x9B, NOP, ABY, 5), instr!(0x9C, NOP, ABX, 5), instr!(0x9D, STA, ABX, 5), instr!(0x9E, NOP, ABY, 5), instr!(0x9F, NOP, ABY, 5),
        instr!(0xA0, LDY, IMM, 2), instr!(0xA1, LDA, IDX, 6), instr!(0xA2, LDX, IMM, 2), instr!(0xA3, NOP, IDX, 6), instr!(0xA4, LDY, ZP0, 3), instr!(0xA5, LDA, ZP0, 3), instr!(0xA6, LDX, ZP0, 3), instr!(0xA7, NOP, ZP0, 3), instr!(0xA8, TAY, IMP, 2), instr!(0xA9, LDA, IMM, 2), instr!(0xAA, TAX, IMP, 2), instr!(0xAB, NOP, IMM, 2), instr!(0xAC, LDY, ABS, 4), instr!(0xAD, LDA, ABS, 4), instr!(0xAE, LDX, ABS, 4), instr!(0xAF, NOP, ABS, 4),
        instr!(0xB0, BCS, REL, 2), instr!(0xB1, LDA, IDY, 5), instr!(0xB2, KIL, IMP, 2), instr!(0xB3, NOP, IDY, 5), instr!(0xB4, LDY, ZPX, 4), instr!(0xB5, LDA, ZPX, 4), instr!(0xB6, LDX, ZPY, 4), instr!(0xB7, NOP, ZPY, 4), instr!(0xB8, CLV, IMP, 2), instr!(0xB9, LDA, ABY, 4), instr!(0xBA, TSX, IMP, 2), instr!(0xBB, NOP, ABY, 4), instr!(0xBC, LDY, ABX, 4), instr!(0xBD, LDA, ABX, 4), instr!(0xBE, LDX, ABY, 4), instr!(0xBF, NOP, ABY, 4),
        instr!(0xC0, CPY, IMM, 2), instr!(0xC1, CMP, IDX, 6), instr!(0xC2, NOP, IMM, 2), instr!(0xC3, NOP, IDX, 8), instr!(0xC4, CPY, ZP0, 3), instr!(0xC5, CMP, ZP0, 3), instr!(0xC6, DEC, ZP0, 5), instr!(0xC7, NOP, ZP0, 5), instr!(0xC8, INY, IMP, 2), instr!(0xC9, CMP, IMM, 2), instr!(0xCA, DEX, IMP, 2), instr!(0xCB, NOP, IMM, 2), instr!(0xCC, CPY, ABS, 4), instr!(0xCD, CMP, ABS, 4), instr!(0xCE, DEC, ABS, 6), instr!(0xCF, NOP, ABS, 6),
        instr!(0xD0, BNE, REL, 2), instr!(0xD1, CMP, IDY, 5), instr!(0xD2, KIL, IMP, 2), instr!(0xD3, NOP, IDY, 8), instr!(0xD4, NOP, ZPX, 4), instr!(0xD5, CMP, ZPX, 4), instr!(0xD6, DEC, ZPX, 6), instr!(0xD7, NOP, ZPX, 6), instr!(0xD8, CLD, IMP, 2), instr!(0xD9, CMP, ABY, 4), instr!(0xDA, NOP, IMP, 2), instr!(0xDB, NOP, ABY, 7), instr!(0xDC, NOP, ABX, 4), instr!(0xDD, CMP, ABX, 4), instr!(0xDE, DEC, ABX, 7), instr!(0xDF, NOP, ABX, 7),
        instr!(0xE0, CPX, IMM, 2), instr!(0xE1, SBC, IDX, 6), instr!(0xE2, NOP, IMM, 3), instr!(0xE3, NOP, IDX, 8), instr!(0xE4, CPX, ZP0, 3), instr!(0xE5, SBC, ZP0, 3), instr!(0xE6, INC, ZP0, 5), instr!(0xE7, NOP, ZP0, 5), instr!(0xE8, INX, IMP, 2), instr!(0xE9, SBC, IMM, 2), instr!(0xEA, NOP, IMP, 2), instr!(0xEB, NOP, IMM, 2), instr!(0xEC, CPX, ABS, 4), instr!(0xED, SBC, ABS, 4), instr!(0xEE, INC, ABS, 6), instr!(0xEF, NOP, ABS, 6),
        instr!(0xF0, BEQ, REL, 2), instr!(0xF1, SBC, IDY, 5), instr!(0xF2, KIL, IMP, 2), instr!(0xF3, NOP, IDY, 8), instr!(0xF4, NOP, ZPX, 4), instr!(0xF5, SBC, ZPX, 4), instr!(0xF6, INC, ZPX, 6), instr!(0xF7, NOP, ZPX, 6), instr!(0xF8, SED, IMP, 2), instr!(0xF9, SBC, ABY, 4), instr!(0xFA, NOP, IMP, 2), instr!(0xFB, NOP, ABY, 7), instr!(0xFC, NOP, ABX, 4), instr!(0xFD, SBC, ABX, 4), instr!(0xFE, INC, ABX, 7), instr!(0xFF, NOP, ABX, 7),
    ];

    /// Fetches the operand bytes for `addr_mode` and resolves the effective address.
    ///
    /// Returns `None` for accumulator and implied modes, which have nothing to address.
    pub fn fetch_operand(&mut self, addr_mode: AddrMode) -> Option<u16> {
        let addr = match addr_mode {
            AddrMode::ACC | AddrMode::IMP => return None,
            AddrMode::IMM => self.imm(),
            AddrMode::REL => {
                let offset = self.fetch_byte();
                self.rel(offset)
            }
            AddrMode::ZP0 => {
                let zero_addr = self.fetch_byte();
                Self::zp0(zero_addr)
            }
            AddrMode::ZPX => {
                let zero_addr = self.fetch_byte();
                self.zpx(zero_addr)
            }
            AddrMode::ZPY => {
                let zero_addr = self.fetch_byte();
                self.zpy(zero_addr)
            }
            AddrMode::ABS => self.fetch_word(),
            AddrMode::ABX => {
                let base_addr = self.fetch_word();
                self.abx(base_addr)
            }
            AddrMode::ABY => {
                let base_addr = self.fetch_word();
                self.aby(base_addr)
            }
            AddrMode::IND => {
                let addr = self.fetch_word();
                self.ind(addr)
            }
            AddrMode::IDX => {
                let zero_addr = self.fetch_byte();
                self.idx(zero_addr)
            }
            AddrMode::IDY => {
                let zero_addr = self.fetch_byte();
                self.idy(zero_addr)
            }
        };
        Some(addr)
    }

    /// Immediate Mode
    ///
    /// The operand byte itself is the value, so the effective address is where it lives.
    pub fn imm(&mut self) -> u16 {
        let addr = self.pc;
        self.pc = self.pc.wrapping_add(1);
        addr
    }

    /// Relative Mode
    ///
    /// Signed offset from the address following the operand. Only used by branches.
    #[must_use]
    pub fn rel(&self, offset: u8) -> u16 {
        self.pc.wrapping_add_signed(i16::from(offset as i8))
    }

    /// Zero Page Mode
    #[must_use]
    pub fn zp0(zero_addr: u8) -> u16 {
        u16::from(zero_addr)
    }

    /// Zero Page Mode w/ X offset
    ///
    /// The sum wraps within the zero page.
    #[must_use]
    pub fn zpx(&self, zero_addr: u8) -> u16 {
        u16::from(zero_addr.wrapping_add(self.x))
    }

    /// Zero Page Mode w/ Y offset
    #[must_use]
    pub fn zpy(&self, zero_addr: u8) -> u16 {
        u16::from(zero_addr.wrapping_add(self.y))
    }

    /// Absolute Mode w/ X offset
    ///
    /// Flags a page crossing when the low byte carries into the high byte.
    pub fn abx(&mut self, base_addr: u16) -> u16 {
        let addr = base_addr.wrapping_add(u16::from(self.x));
        self.page_crossed = Self::pages_differ(base_addr, addr);
        addr
    }

    /// Absolute Mode w/ Y offset
    pub fn aby(&mut self, base_addr: u16) -> u16 {
        let addr = base_addr.wrapping_add(u16::from(self.y));
        self.page_crossed = Self::pages_differ(base_addr, addr);
        addr
    }

    /// Indirect Mode
    ///
    /// Only used by `JMP`. Reproduces the hardware bug where a pointer at the end of a page
    /// takes its high byte from the start of that same page.
    ///
    /// ```text
    /// JMP ($10FF) reads its low byte from $10FF and its high byte from $1000
    /// ```
    pub fn ind(&mut self, addr: u16) -> u16 {
        if addr & 0x00FF == 0x00FF {
            let lo = self.read(addr);
            let hi = self.read(addr & 0xFF00);
            u16::from_le_bytes([lo, hi])
        } else {
            self.read_u16(addr)
        }
    }

    /// Indexed Indirect Mode, `(zp,X)`
    ///
    /// ```text
    ///  #    address   R/W description
    /// --- ----------- --- ------------------------------------------
    ///  1      PC       R  fetch opcode, increment PC
    ///  2      PC       R  fetch pointer address, increment PC
    ///  3    pointer    R  read from the address, add X to it
    ///  4   pointer+X   R  fetch effective address low
    ///  5  pointer+X+1  R  fetch effective address high
    ///  6    address   R/W read or write the effective address
    /// ```
    ///
    /// Both pointer bytes stay in the zero page.
    pub fn idx(&mut self, zero_addr: u8) -> u16 {
        let ptr = zero_addr.wrapping_add(self.x);
        let lo = self.read(u16::from(ptr));
        let hi = self.read(u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    /// Indirect Indexed Mode, `(zp),Y`
    ///
    /// ```text
    ///  #    address   R/W description
    /// --- ----------- --- ------------------------------------------
    ///  1      PC       R  fetch opcode, increment PC
    ///  2      PC       R  fetch pointer address, increment PC
    ///  3    pointer    R  fetch effective address low
    ///  4   pointer+1   R  fetch effective address high, add Y to low byte
    ///  5   address+Y*  R  read from effective address, fix high byte
    ///  6+  address+Y   R  read from effective address
    /// ```
    ///
    /// The pointer's high byte is fetched from `(zp + 1) & $FF`.
    pub fn idy(&mut self, zero_addr: u8) -> u16 {
        let lo = self.read(u16::from(zero_addr));
        let hi = self.read(u16::from(zero_addr.wrapping_add(1)));
        let base_addr = u16::from_le_bytes([lo, hi]);
        let addr = base_addr.wrapping_add(u16::from(self.y));
        self.page_crossed = Self::pages_differ(base_addr, addr);
        addr
    }
}

/// CPU instructions
impl Cpu {
    /// Dispatches the decoded instruction. The operand must already be resolved.
    pub fn execute(&mut self, instr: Instr) {
        match instr {
            Instr::ADC => self.adc(),
            Instr::AND => self.and(),
            Instr::ASL => self.asl(),
            Instr::BCC => self.bcc(),
            Instr::BCS => self.bcs(),
            Instr::BEQ => self.beq(),
            Instr::BIT => self.bit(),
            Instr::BMI => self.bmi(),
            Instr::BNE => self.bne(),
            Instr::BPL => self.bpl(),
            Instr::BRK => self.brk(),
            Instr::BVC => self.bvc(),
            Instr::BVS => self.bvs(),
            Instr::CLC => self.clc(),
            Instr::CLD => self.cld(),
            Instr::CLI => self.cli(),
            Instr::CLV => self.clv(),
            Instr::CMP => self.cpa(),
            Instr::CPX => self.cpx(),
            Instr::CPY => self.cpy(),
            Instr::DEC => self.dec(),
            Instr::DEX => self.dex(),
            Instr::DEY => self.dey(),
            Instr::EOR => self.eor(),
            Instr::INC => self.inc(),
            Instr::INX => self.inx(),
            Instr::INY => self.iny(),
            Instr::JMP => self.jmp(),
            Instr::JSR => self.jsr(),
            Instr::LDA => self.lda(),
            Instr::LDX => self.ldx(),
            Instr::LDY => self.ldy(),
            Instr::LSR => self.lsr(),
            Instr::NOP => self.nop(),
            Instr::ORA => self.ora(),
            Instr::PHA => self.pha(),
            Instr::PHP => self.php(),
            Instr::PLA => self.pla(),
            Instr::PLP => self.plp(),
            Instr::ROL => self.rol(),
            Instr::ROR => self.ror(),
            Instr::RTI => self.rti(),
            Instr::RTS => self.rts(),
            Instr::SBC => self.sbc(),
            Instr::SEC => self.sec(),
            Instr::SED => self.sed(),
            Instr::SEI => self.sei(),
            Instr::STA => self.sta(),
            Instr::STX => self.stx(),
            Instr::STY => self.sty(),
            Instr::TAX => self.tax(),
            Instr::TAY => self.tay(),
            Instr::TSX => self.tsx(),
            Instr::TXA => self.txa(),
            Instr::TXS => self.txs(),
            Instr::TYA => self.tya(),
            Instr::KIL => self.kil(),
        }
    }

    // Storage opcodes

    /// LDA: Load A with M
    pub fn lda(&mut self) {
        let val = self.read_operand();
        self.set_acc(val);
    }

    /// LDX: Load X with M
    pub fn ldx(&mut self) {
        let val = self.read_operand();
        self.set_x(val);
    }

    /// LDY: Load Y with M
    pub fn ldy(&mut self) {
        let val = self.read_operand();
        self.set_y(val);
    }

    /// STA: Store A into M
    pub fn sta(&mut self) {
        self.write(self.effective_addr(), self.acc);
    }

    /// STX: Store X into M
    pub fn stx(&mut self) {
        self.write(self.effective_addr(), self.x);
    }

    /// STY: Store Y into M
    pub fn sty(&mut self) {
        self.write(self.effective_addr(), self.y);
    }

    /// TAX: Transfer A to X
    pub fn tax(&mut self) {
        self.set_x(self.acc);
    }

    /// TAY: Transfer A to Y
    pub fn tay(&mut self) {
        self.set_y(self.acc);
    }

    /// TSX: Transfer Stack Pointer to X
    pub fn tsx(&mut self) {
        self.set_x(self.sp);
    }

    /// TXA: Transfer X to A
    pub fn txa(&mut self) {
        self.set_acc(self.x);
    }

    /// TXS: Transfer X to Stack Pointer
    pub fn txs(&mut self) {
        self.sp = self.x;
    }

    /// TYA: Transfer Y to A
    pub fn tya(&mut self) {
        self.set_acc(self.y);
    }

    // Arithmetic opcodes

    /// ADC: Add M to A with Carry
    pub fn adc(&mut self) {
        let val = self.read_operand();
        let carry = u16::from(self.status.contains(Status::C));
        self.add(u16::from(val), carry);
    }

    /// SBC: Subtract M from A with Carry
    ///
    /// Adds `0x100 - M - C` to A, so a set carry subtracts one more.
    pub fn sbc(&mut self) {
        let val = self.read_operand();
        let carry = u16::from(self.status.contains(Status::C));
        self.add(0x100 - u16::from(val) - carry, 0);
    }

    fn add(&mut self, val: u16, carry: u16) {
        let sum = u16::from(self.acc) + val + carry;
        let res = sum as u8;
        self.status.set_flag(
            Status::V,
            (self.acc ^ res) & (val as u8 ^ res) & 0x80 != 0,
        );
        self.status.set_flag(Status::C, sum > 0xFF);
        self.set_acc(res);
    }

    /// INC: Increment M by One
    pub fn inc(&mut self) {
        let addr = self.effective_addr();
        let val = self.read(addr).wrapping_add(1);
        self.write(addr, val);
        self.set_zn_status(val);
    }

    /// DEC: Decrement M by One
    pub fn dec(&mut self) {
        let addr = self.effective_addr();
        let val = self.read(addr).wrapping_sub(1);
        self.write(addr, val);
        self.set_zn_status(val);
    }

    /// INX: Increment X by One
    pub fn inx(&mut self) {
        self.set_x(self.x.wrapping_add(1));
    }

    /// INY: Increment Y by One
    pub fn iny(&mut self) {
        self.set_y(self.y.wrapping_add(1));
    }

    /// DEX: Decrement X by One
    pub fn dex(&mut self) {
        self.set_x(self.x.wrapping_sub(1));
    }

    /// DEY: Decrement Y by One
    pub fn dey(&mut self) {
        self.set_y(self.y.wrapping_sub(1));
    }

    // Bitwise opcodes

    /// AND: "And" M with A
    pub fn and(&mut self) {
        let val = self.read_operand();
        self.set_acc(self.acc & val);
    }

    /// EOR: "Exclusive-Or" M with A
    pub fn eor(&mut self) {
        let val = self.read_operand();
        self.set_acc(self.acc ^ val);
    }

    /// ORA: "OR" M with A
    pub fn ora(&mut self) {
        let val = self.read_operand();
        self.set_acc(self.acc | val);
    }

    /// ASL: Shift Left One Bit (M or A)
    pub fn asl(&mut self) {
        let val = self.read_operand();
        self.status.set_flag(Status::C, val & 0x80 != 0);
        self.shift_result(val << 1);
    }

    /// LSR: Shift Right One Bit (M or A)
    pub fn lsr(&mut self) {
        let val = self.read_operand();
        self.status.set_flag(Status::C, val & 0x01 != 0);
        self.shift_result(val >> 1);
    }

    /// ROL: Rotate One Bit Left (M or A)
    pub fn rol(&mut self) {
        let val = self.read_operand();
        let carry = u8::from(self.status.contains(Status::C));
        self.status.set_flag(Status::C, val & 0x80 != 0);
        self.shift_result((val << 1) | carry);
    }

    /// ROR: Rotate One Bit Right (M or A)
    pub fn ror(&mut self) {
        let val = self.read_operand();
        let carry = u8::from(self.status.contains(Status::C));
        self.status.set_flag(Status::C, val & 0x01 != 0);
        self.shift_result((val >> 1) | (carry << 7));
    }

    fn shift_result(&mut self, val: u8) {
        self.write_operand(val);
        self.set_zn_status(val);
    }

    /// BIT: Test Bits in M with A (Affects N, V, and Z)
    pub fn bit(&mut self) {
        let val = self.read_operand();
        self.status.set_flag(Status::Z, self.acc & val == 0);
        self.status.set_flag(Status::N, val & 0x80 != 0);
        self.status.set_flag(Status::V, val & 0x40 != 0);
    }

    // Branch opcodes

    /// BCC: Branch on Carry Clear
    pub fn bcc(&mut self) {
        self.branch(!self.status.contains(Status::C));
    }

    /// BCS: Branch on Carry Set
    pub fn bcs(&mut self) {
        self.branch(self.status.contains(Status::C));
    }

    /// BEQ: Branch on Result Zero
    pub fn beq(&mut self) {
        self.branch(self.status.contains(Status::Z));
    }

    /// BMI: Branch on Result Negative
    pub fn bmi(&mut self) {
        self.branch(self.status.contains(Status::N));
    }

    /// BNE: Branch on Result Not Zero
    pub fn bne(&mut self) {
        self.branch(!self.status.contains(Status::Z));
    }

    /// BPL: Branch on Result Positive
    pub fn bpl(&mut self) {
        self.branch(!self.status.contains(Status::N));
    }

    /// BVC: Branch on Overflow Clear
    pub fn bvc(&mut self) {
        self.branch(!self.status.contains(Status::V));
    }

    /// BVS: Branch on Overflow Set
    pub fn bvs(&mut self) {
        self.branch(self.status.contains(Status::V));
    }

    // A taken branch costs a cycle, plus another when the target is on a different page
    fn branch(&mut self, taken: bool) {
        if !taken {
            return;
        }
        let target = self.effective_addr();
        self.cycle += 1;
        if Self::pages_differ(self.pc, target) {
            self.cycle += 1;
        }
        self.pc = target;
    }

    // Jump opcodes

    /// JMP: Jump to Location
    pub fn jmp(&mut self) {
        self.pc = self.effective_addr();
        self.journal.add_blank();
    }

    /// JSR: Jump to Location Save Return addr
    pub fn jsr(&mut self) {
        self.push_word(self.pc.wrapping_sub(1));
        self.pc = self.effective_addr();
        self.journal.add_blank();
    }

    /// RTI: Return from Interrupt
    pub fn rti(&mut self) {
        self.status = Status::from_bits_retain(self.pull_byte());
        self.pc = self.pull_word();
        self.journal.add_blank();
    }

    /// RTS: Return from Subroutine
    pub fn rts(&mut self) {
        self.pc = self.pull_word().wrapping_add(1);
        self.journal.add_blank();
    }

    // Register opcodes

    /// CLC: Clear Carry Flag
    pub fn clc(&mut self) {
        self.status.clear_flag(Status::C);
    }

    /// SEC: Set Carry Flag
    pub fn sec(&mut self) {
        self.status.set_flag(Status::C, true);
    }

    /// CLD: Clear Decimal Mode
    pub fn cld(&mut self) {
        self.status.clear_flag(Status::D);
    }

    /// SED: Set Decimal Mode
    pub fn sed(&mut self) {
        self.status.set_flag(Status::D, true);
    }

    /// CLI: Clear Interrupt Disable Bit
    pub fn cli(&mut self) {
        self.status.clear_flag(Status::I);
    }

    /// SEI: Set Interrupt Disable Status
    pub fn sei(&mut self) {
        self.status.set_flag(Status::I, true);
    }

    /// CLV: Clear Overflow Flag
    pub fn clv(&mut self) {
        self.status.clear_flag(Status::V);
    }

    // Compare opcodes

    /// CMP: Compare M and A
    pub fn cpa(&mut self) {
        let val = self.read_operand();
        self.compare(self.acc, val);
    }

    /// CPX: Compare M and X
    pub fn cpx(&mut self) {
        let val = self.read_operand();
        self.compare(self.x, val);
    }

    /// CPY: Compare M and Y
    pub fn cpy(&mut self) {
        let val = self.read_operand();
        self.compare(self.y, val);
    }

    fn compare(&mut self, reg: u8, val: u8) {
        self.status.set_flag(Status::C, reg >= val);
        self.set_zn_status(reg.wrapping_sub(val));
    }

    // Stack opcodes

    /// PHP: Push Processor Status on Stack
    pub fn php(&mut self) {
        self.push_byte(self.status.bits());
    }

    /// PLP: Pull Processor Status from Stack
    pub fn plp(&mut self) {
        self.status = Status::from_bits_retain(self.pull_byte());
    }

    /// PHA: Push A on Stack
    pub fn pha(&mut self) {
        self.push_byte(self.acc);
    }

    /// PLA: Pull A from Stack
    pub fn pla(&mut self) {
        let val = self.pull_byte();
        self.set_acc(val);
    }

    // System opcodes

    /// BRK: Force Break Interrupt
    ///
    /// Pushes the address of the byte following the opcode and the status with `B` set.
    pub fn brk(&mut self) {
        self.push_word(self.pc);
        self.push_byte((self.status | Status::B).bits());
        self.status.set_flag(Status::I, true);
        self.pc = self.read_u16(Self::IRQ_VECTOR);
        self.journal.add_blank();
    }

    /// NOP: No Operation
    ///
    /// Operand bytes were already consumed. The target is never read.
    pub fn nop(&mut self) {}

    /// KIL: Halt the processor
    ///
    /// Recovers with a CPU reset instead of locking up.
    pub fn kil(&mut self) {
        let addr = self.pc.wrapping_sub(1);
        warn!(
            "KIL opcode ${:02X} at ${addr:04X}, resetting CPU",
            self.peek(addr)
        );
        self.reset_sequence();
    }
}
