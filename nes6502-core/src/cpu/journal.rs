//! Executed-instruction journal with per-address heat counts.

use crate::cpu::{
    instr::{AddrMode, InstrRef},
    Cpu,
};
use std::{
    collections::{HashMap, VecDeque},
    fmt,
};

/// A single journal record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum Entry {
    /// An executed instruction. `hot` marks the second visit of `pc`.
    Instr {
        pc: u16,
        opcode: u8,
        operand: u16,
        hot: bool,
    },
    /// Separator following a change of control flow.
    Blank,
}

impl Entry {
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self::Instr {
            pc,
            opcode,
            operand,
            hot,
        } = *self
        else {
            return Ok(());
        };
        let instr_ref = Cpu::INSTR_REF[usize::from(opcode)];
        let [lo, hi] = operand.to_le_bytes();
        let marker = if hot { '+' } else { ' ' };
        write!(f, "{marker}${pc:04X} ${opcode:02X} ")?;
        match instr_ref.addr_mode.operand_len() {
            0 => write!(f, "        ")?,
            1 => write!(f, "${lo:02X}     ")?,
            _ => write!(f, "${lo:02X} ${hi:02X} ")?,
        }
        write_operand(f, instr_ref, pc, operand)
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    instr_ref: InstrRef,
    pc: u16,
    operand: u16,
) -> fmt::Result {
    let byte = operand & 0x00FF;
    match instr_ref.addr_mode {
        AddrMode::ACC => write!(f, "{instr_ref} A"),
        AddrMode::IMP => write!(f, "{instr_ref}"),
        AddrMode::IMM => write!(f, "{instr_ref} #${byte:02X}"),
        AddrMode::REL => {
            let target = pc.wrapping_add(2).wrapping_add_signed(i16::from(byte as u8 as i8));
            write!(f, "{instr_ref} ${target:04X}")
        }
        AddrMode::ZP0 => write!(f, "{instr_ref} ${byte:02X}"),
        AddrMode::ZPX => write!(f, "{instr_ref} ${byte:02X},X"),
        AddrMode::ZPY => write!(f, "{instr_ref} ${byte:02X},Y"),
        AddrMode::ABS => write!(f, "{instr_ref} ${operand:04X}"),
        AddrMode::ABX => write!(f, "{instr_ref} ${operand:04X},X"),
        AddrMode::ABY => write!(f, "{instr_ref} ${operand:04X},Y"),
        AddrMode::IND => write!(f, "{instr_ref} (${operand:04X})"),
        AddrMode::IDX => write!(f, "{instr_ref} (${byte:02X},X)"),
        AddrMode::IDY => write!(f, "{instr_ref} (${byte:02X}),Y"),
    }
}

/// Records the first and second visit of every executed address.
///
/// Later visits only bump the heat count, so tight loops show up once as a normal entry followed
/// by one `hot` entry.
#[derive(Debug, Clone)]
#[must_use]
pub struct Journal {
    enabled: bool,
    capacity: usize,
    entries: VecDeque<Entry>,
    heat: HashMap<u16, u32>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Journal {
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Create a disabled journal holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            enabled: false,
            capacity,
            entries: VecDeque::new(),
            heat: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.trim();
    }

    /// Record an executed instruction.
    pub fn push(&mut self, pc: u16, opcode: u8, operand: u16) {
        if !self.enabled {
            return;
        }
        let heat = self.heat.entry(pc).or_insert(0);
        *heat = heat.saturating_add(1);
        let hot = match *heat {
            1 => false,
            2 => true,
            _ => return,
        };
        self.entries.push_back(Entry::Instr {
            pc,
            opcode,
            operand,
            hot,
        });
        self.trim();
    }

    /// Append a separator unless the journal is empty or already ends with one.
    pub fn add_blank(&mut self) {
        if !self.enabled {
            return;
        }
        if matches!(self.entries.back(), Some(entry) if !entry.is_blank()) {
            self.entries.push_back(Entry::Blank);
            self.trim();
        }
    }

    /// Number of times `pc` executed since the last heat reset.
    #[must_use]
    pub fn heat(&self, pc: u16) -> u32 {
        self.heat.get(&pc).copied().unwrap_or(0)
    }

    /// Forget visit counts so addresses are journaled again.
    pub fn reset_heat(&mut self) {
        self.heat.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.heat.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> Journal {
        let mut journal = Journal::default();
        journal.set_enabled(true);
        journal
    }

    #[test]
    fn disabled_records_nothing() {
        let mut journal = Journal::default();
        journal.push(0x8000, 0xEA, 0);
        journal.add_blank();
        assert!(journal.is_empty());
        assert_eq!(journal.heat(0x8000), 0);
    }

    #[test]
    fn second_visit_is_hot_and_later_visits_are_counted() {
        let mut journal = enabled();
        for _ in 0..5 {
            journal.push(0x8000, 0xEA, 0);
        }
        let entries: Vec<_> = journal.entries().copied().collect();
        assert_eq!(
            entries,
            [
                Entry::Instr {
                    pc: 0x8000,
                    opcode: 0xEA,
                    operand: 0,
                    hot: false
                },
                Entry::Instr {
                    pc: 0x8000,
                    opcode: 0xEA,
                    operand: 0,
                    hot: true
                },
            ]
        );
        assert_eq!(journal.heat(0x8000), 5);
    }

    #[test]
    fn blanks_never_repeat() {
        let mut journal = enabled();
        journal.add_blank();
        assert!(journal.is_empty(), "no separator on an empty journal");
        journal.push(0x8000, 0x4C, 0x8000);
        journal.add_blank();
        journal.add_blank();
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn heat_reset_journals_again() {
        let mut journal = enabled();
        journal.push(0x8000, 0xEA, 0);
        journal.push(0x8000, 0xEA, 0);
        journal.push(0x8000, 0xEA, 0);
        journal.reset_heat();
        journal.push(0x8000, 0xEA, 0);
        assert_eq!(journal.len(), 3);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut journal = enabled();
        journal.set_capacity(2);
        journal.push(0x8000, 0xEA, 0);
        journal.push(0x8001, 0xEA, 0);
        journal.push(0x8002, 0xEA, 0);
        let pcs: Vec<_> = journal
            .entries()
            .filter_map(|entry| match entry {
                Entry::Instr { pc, .. } => Some(*pc),
                Entry::Blank => None,
            })
            .collect();
        assert_eq!(pcs, [0x8001, 0x8002]);
    }

    #[test]
    fn display() {
        let lda = Entry::Instr {
            pc: 0x8000,
            opcode: 0xA9,
            operand: 0x0042,
            hot: false,
        };
        assert_eq!(lda.to_string(), " $8000 $A9 $42     LDA #$42");
        let bne = Entry::Instr {
            pc: 0x8010,
            opcode: 0xD0,
            operand: 0x00FE,
            hot: true,
        };
        assert_eq!(bne.to_string(), "+$8010 $D0 $FE     BNE $8010");
        assert_eq!(Entry::Blank.to_string(), "");
    }
}
