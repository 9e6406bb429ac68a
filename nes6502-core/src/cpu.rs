//! 6502 Central Processing Unit (CPU) implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/CPU>

use crate::{
    bus::Bus,
    common::{Clock, Reset, ResetKind},
    cpu::{
        instr::AddrMode,
        journal::{Entry, Journal},
    },
    mem::Mem,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

pub mod instr;
pub mod journal;

// Status Registers
// https://wiki.nesdev.org/w/index.php/Status_flags
// 7654 3210
// NVUB DIZC
// |||| ||||
// |||| |||+- Carry
// |||| ||+-- Zero
// |||| |+--- Interrupt Disable
// |||| +---- Decimal Mode - Not used in the NES but still has to function
// |||+------ Break - 1 when pushed to stack from PHP/BRK, 0 from IRQ/NMI
// ||+------- Unused
// |+-------- Overflow
// +--------- Negative
bitflags! {
    /// CPU Status Registers.
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Status: u8 {
        const C = 1;      // Carry
        const Z = 1 << 1; // Zero
        const I = 1 << 2; // Disable Interrupt
        const D = 1 << 3; // Decimal Mode
        const B = 1 << 4; // Break
        const U = 1 << 5; // Unused
        const V = 1 << 6; // Overflow
        const N = 1 << 7; // Negative
    }
}

impl Status {
    /// Sets `flag` to `on`, returning `on`.
    pub fn set_flag(&mut self, flag: Self, on: bool) -> bool {
        self.set(flag, on);
        on
    }

    /// Clears `flag`, always returning `false`.
    pub fn clear_flag(&mut self, flag: Self) -> bool {
        self.remove(flag);
        false
    }
}

/// The Central Processing Unit status and registers
#[derive(Clone)]
#[must_use]
pub struct Cpu {
    /// Total number of cycles ran since the last hard reset.
    pub cycle: u64,
    /// Program Counter
    pub pc: u16,
    /// Stack Pointer - Stack is at $0100-$01FF
    pub sp: u8,
    /// Accumulator
    pub acc: u8,
    /// X register
    pub x: u8,
    /// Y register
    pub y: u8,
    pub status: Status,
    pub bus: Bus,
    pub journal: Journal,
    // Effective address of the executing instruction, `None` for accumulator and implied modes
    operand: Option<u16>,
    page_crossed: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Bus::default())
    }
}

impl Cpu {
    pub const NMI_VECTOR: u16 = 0xFFFA; // NMI Vector address
    pub const RESET_VECTOR: u16 = 0xFFFC; // Vector address at reset
    pub const IRQ_VECTOR: u16 = 0xFFFE; // IRQ Vector address
    pub const POWER_ON_STATUS: Status = Status::U.union(Status::B).union(Status::I); // 0x34
    pub const POWER_ON_SP: u8 = 0x00; // Becomes 0xFD after the reset sequence
    pub const INTERRUPT_CYCLES: u64 = 7;
    pub const OAM_DMA_CYCLES: u64 = 513;

    /// Create a powered-off CPU attached to `bus`. The bus contents are left as-is.
    pub fn new(bus: Bus) -> Self {
        Self {
            cycle: 0,
            pc: 0x0000,
            sp: Self::POWER_ON_SP,
            acc: 0x00,
            x: 0x00,
            y: 0x00,
            status: Self::POWER_ON_STATUS,
            bus,
            journal: Journal::default(),
            operand: None,
            page_crossed: false,
        }
    }

    /// Return registers to their power-on values and clear work RAM.
    pub fn power_off(&mut self) {
        trace!("CPU power off");
        self.cycle = 0;
        self.pc = 0x0000;
        self.sp = Self::POWER_ON_SP;
        self.acc = 0x00;
        self.x = 0x00;
        self.y = 0x00;
        self.status = Self::POWER_ON_STATUS;
        self.operand = None;
        self.page_crossed = false;
        self.bus.power_off();
        self.journal.clear();
    }

    /// Non-Maskable Interrupt
    ///
    /// <https://wiki.nesdev.org/w/index.php/NMI>
    pub fn nmi(&mut self) {
        trace!("NMI - PC: ${:04X}, CYC:{}", self.pc, self.cycle);
        self.interrupt(Self::NMI_VECTOR);
    }

    /// Maskable Interrupt Request. Callers check the `I` flag.
    ///
    /// <https://wiki.nesdev.org/w/index.php/IRQ>
    pub fn irq(&mut self) {
        trace!("IRQ - PC: ${:04X}, CYC:{}", self.pc, self.cycle);
        self.interrupt(Self::IRQ_VECTOR);
    }

    // Status is pushed with `B` clear so handlers can tell this apart from BRK
    fn interrupt(&mut self, vector: u16) {
        self.push_word(self.pc);
        self.push_byte((self.status & !Status::B).bits());
        self.status.set_flag(Status::I, true);
        self.pc = self.read_u16(vector);
        self.cycle += Self::INTERRUPT_CYCLES;
        self.journal.add_blank();
    }

    // The CPU part of a reset: three phantom stack pulls, interrupts off, jump through the vector
    fn reset_sequence(&mut self) {
        self.sp = self.sp.wrapping_sub(3);
        self.status.set_flag(Status::I, true);
        self.operand = None;
        self.page_crossed = false;
        self.pc = self.read_u16(Self::RESET_VECTOR);
        self.journal.add_blank();
    }

    // Status Register functions

    /// Set Z if `val` is zero and N from bit 7, returning `val`.
    pub fn set_zn_status(&mut self, val: u8) -> u8 {
        self.status.set_flag(Status::Z, val == 0x00);
        self.status.set_flag(Status::N, val & 0x80 != 0);
        val
    }

    fn set_acc(&mut self, val: u8) {
        self.acc = self.set_zn_status(val);
    }

    fn set_x(&mut self, val: u8) {
        self.x = self.set_zn_status(val);
    }

    fn set_y(&mut self, val: u8) {
        self.y = self.set_zn_status(val);
    }

    // Stack Functions

    /// Push a byte to the stack.
    pub fn push_byte(&mut self, val: u8) {
        self.sp = self.sp.wrapping_sub(1);
        self.write(Self::stack_addr(self.sp), val);
    }

    /// Pull a byte from the stack.
    pub fn pull_byte(&mut self) -> u8 {
        let val = self.read(Self::stack_addr(self.sp));
        self.sp = self.sp.wrapping_add(1);
        val
    }

    /// Peek at the top of the stack.
    #[must_use]
    pub fn peek_stack(&self) -> u8 {
        self.peek(Self::stack_addr(self.sp))
    }

    /// Push a word (two bytes) to the stack, high byte first.
    pub fn push_word(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    /// Pull a word (two bytes) from the stack, low byte first.
    pub fn pull_word(&mut self) -> u16 {
        let lo = self.pull_byte();
        let hi = self.pull_byte();
        u16::from_le_bytes([lo, hi])
    }

    const fn stack_addr(sp: u8) -> u16 {
        0x0100 | sp as u16
    }

    // Memory accesses

    /// Fetch a byte and increments PC by 1.
    pub fn fetch_byte(&mut self) -> u8 {
        let val = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    /// Fetch a 16-bit word and increments PC by 2.
    pub fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte();
        let hi = self.fetch_byte();
        u16::from_le_bytes([lo, hi])
    }

    /// Effective address of the executing instruction.
    #[must_use]
    pub fn effective_addr(&self) -> u16 {
        self.operand.unwrap_or_default()
    }

    /// Read the value the operand refers to, the accumulator for `ACC` mode.
    pub fn read_operand(&mut self) -> u8 {
        match self.operand {
            Some(addr) => self.read(addr),
            None => self.acc,
        }
    }

    /// Write back to where the operand refers to, the accumulator for `ACC` mode.
    pub fn write_operand(&mut self, val: u8) {
        match self.operand {
            Some(addr) => self.write(addr, val),
            None => self.acc = val,
        }
    }

    // Raw operand bytes following the opcode at `pc`, without side effects
    fn peek_operand_bytes(&self, pc: u16, addr_mode: AddrMode) -> u16 {
        let addr = pc.wrapping_add(1);
        match addr_mode.operand_len() {
            0 => 0x0000,
            1 => u16::from(self.peek(addr)),
            _ => u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))]),
        }
    }

    /// Disassemble the instruction at `pc`, returning its text and the address of the next
    /// instruction. Memory is only peeked.
    #[must_use]
    pub fn disassemble(&self, pc: u16) -> (String, u16) {
        let opcode = self.peek(pc);
        let addr_mode = Self::INSTR_REF[usize::from(opcode)].addr_mode;
        let entry = Entry::Instr {
            pc,
            opcode,
            operand: self.peek_operand_bytes(pc, addr_mode),
            hot: false,
        };
        let next_pc = pc.wrapping_add(1 + addr_mode.operand_len());
        (entry.to_string().trim_start().to_string(), next_pc)
    }

    /// Log the next instruction with the current register state.
    pub fn trace_instr(&self) {
        let status = self.status;
        let n = if status.contains(Status::N) { 'N' } else { 'n' };
        let v = if status.contains(Status::V) { 'V' } else { 'v' };
        let d = if status.contains(Status::D) { 'D' } else { 'd' };
        let i = if status.contains(Status::I) { 'I' } else { 'i' };
        let z = if status.contains(Status::Z) { 'Z' } else { 'z' };
        let c = if status.contains(Status::C) { 'C' } else { 'c' };
        let (disasm, _) = self.disassemble(self.pc);
        trace!(
            "{disasm:<36} A:{:02X} X:{:02X} Y:{:02X} P:{n}{v}--{d}{i}{z}{c} SP:{:02X} CYC:{}",
            self.acc,
            self.x,
            self.y,
            self.sp,
            self.cycle,
        );
    }

    // Determines if address a and address b are on different pages
    #[inline]
    #[must_use]
    pub const fn pages_differ(a: u16, b: u16) -> bool {
        a & 0xFF00 != b & 0xFF00
    }
}

impl Clock for Cpu {
    /// Runs the CPU one instruction, returning the number of cycles it took.
    fn clock(&mut self) -> usize {
        #[cfg(feature = "trace")]
        self.trace_instr();

        let start = self.cycle;
        let pc = self.pc;
        let opcode = self.fetch_byte();
        let instr_ref = Self::INSTR_REF[usize::from(opcode)];
        if self.journal.is_enabled() {
            let operand = self.peek_operand_bytes(pc, instr_ref.addr_mode);
            self.journal.push(pc, opcode, operand);
        }

        self.page_crossed = false;
        self.operand = self.fetch_operand(instr_ref.addr_mode);
        self.execute(instr_ref.instr);

        self.cycle += u64::from(instr_ref.cycles);
        if self.page_crossed
            && instr_ref.addr_mode.page_penalty()
            && !instr_ref.instr.writes_memory()
        {
            self.cycle += 1;
        }
        (self.cycle - start) as usize
    }
}

impl Mem for Cpu {
    fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    fn read_u16(&mut self, addr: u16) -> u16 {
        self.bus.read_u16(addr)
    }

    fn peek_u16(&self, addr: u16) -> u16 {
        self.bus.peek_u16(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.bus.write(addr, val);
        if addr == Bus::OAM_DMA {
            // One extra cycle to align on odd cycles
            let stall = Self::OAM_DMA_CYCLES + (self.cycle & 0x01);
            trace!("OAM DMA stall of {stall} cycles - CYC:{}", self.cycle);
            self.cycle += stall;
        }
    }
}

impl Reset for Cpu {
    /// Soft resets keep A, X, Y, status and the cycle count. Hard resets return them to their
    /// power-on values first. Neither writes to the stack.
    fn reset(&mut self, kind: ResetKind) {
        trace!("{kind:?} RESET - CYC:{}", self.cycle);
        if kind == ResetKind::Hard {
            self.acc = 0x00;
            self.x = 0x00;
            self.y = 0x00;
            self.status = Self::POWER_ON_STATUS;
            self.cycle = 0;
        }
        self.bus.reset(kind);
        self.reset_sequence();
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::result::Result<(), fmt::Error> {
        f.debug_struct("Cpu")
            .field("cycle", &self.cycle)
            .field("pc", &format_args!("${:04X}", self.pc))
            .field("sp", &format_args!("${:02X}", self.sp))
            .field("acc", &format_args!("${:02X}", self.acc))
            .field("x", &format_args!("${:02X}", self.x))
            .field("y", &format_args!("${:02X}", self.y))
            .field("status", &self.status)
            .field("bus", &self.bus)
            .field("journal_len", &self.journal.len())
            .finish()
    }
}
