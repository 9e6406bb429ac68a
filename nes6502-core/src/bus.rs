//! NES CPU Memory/Data Bus implementation.
//!
//! <http://wiki.nesdev.com/w/index.php/CPU_memory_map>

use crate::{
    common::{Reset, ResetKind},
    mapper::{Mapped, Mapper},
    mem::{Mem, Ram},
    ppu::{Ppu, Registers},
};
use tracing::{debug, trace};

const WRAM_SIZE: usize = 0x0800; // 2K NES Work Ram available to the CPU

/// NES CPU Bus
///
/// Every address resolves to exactly one branch below. Addresses with nothing behind them read
/// as `0` and ignore writes.
///
/// |-----------------| $FFFF |-----------------|
/// | PRG-ROM         |       |                 |
/// |-----------------| $8000 |                 |
/// | PRG-RAM or SRAM |       | Cartridge       |
/// |-----------------| $6000 |                 |
/// | Expansion       |       |                 |
/// |-----------------| $4018 |-----------------|
/// | APU/Input       |       |                 |
/// | Registers       |       |                 |
/// |- - - - - - - - -| $4000 |                 |
/// | PPU Mirrors     |       | I/O Registers   |
/// | $2000-$2007     |       |                 |
/// |- - - - - - - - -| $2008 |                 |
/// | PPU Registers   |       |                 |
/// |-----------------| $2000 |-----------------|
/// | WRAM Mirrors    |       |                 |
/// | $0000-$07FF     |       |                 |
/// |- - - - - - - - -| $0800 |                 |
/// | WRAM            |       | 2K Internal     |
/// |- - - - - - - - -| $0200 | Work RAM        |
/// | Stack           |       |                 |
/// |- - - - - - - - -| $0100 |                 |
/// | Zero Page       |       |                 |
/// |-----------------| $0000 |-----------------|
#[derive(Default, Clone)]
#[must_use]
pub struct Bus {
    pub wram: Ram<WRAM_SIZE>,
    pub ppu: Ppu,
    pub mapper: Mapper,
}

impl Bus {
    pub const WRAM_SIZE: usize = WRAM_SIZE;
    pub const OAM_DMA: u16 = 0x4014;
    pub const CART_START: u16 = 0x4018;

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cartridge, returning the one previously in the slot.
    pub fn load_cart(&mut self, mapper: Mapper) -> Mapper {
        debug!("inserting cartridge: {}", mapper.name());
        std::mem::replace(&mut self.mapper, mapper)
    }

    /// Remove the cartridge, leaving the slot empty.
    pub fn unload_cart(&mut self) -> Mapper {
        let mapper = std::mem::take(&mut self.mapper);
        debug!("removed cartridge: {}", mapper.name());
        mapper
    }

    #[must_use]
    pub fn wram(&self) -> &[u8] {
        self.wram.as_slice()
    }

    fn oam_dma(&mut self, page: u8) {
        let base = u16::from(page) << 8;
        trace!("OAM DMA from ${base:04X}");
        let mut data = [0x00; 256];
        for (offset, val) in (0..=0xFF).zip(data.iter_mut()) {
            *val = self.read(base | offset);
        }
        self.ppu.write_oam_dma(&data);
    }
}

impl Mem for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x07FF => self.wram[usize::from(addr)],
            0x4018..=0xFFFF => self.mapper.cpu_read(addr),
            0x2002 => self.ppu.read_status(),
            0x2004 => self.ppu.read_oamdata(),
            0x2007 => self.ppu.read_data(),
            0x0800..=0x1FFF => self.read(addr & 0x07FF), // WRAM Mirrors
            0x2008..=0x3FFF => self.read(addr & 0x2007), // Ppu Mirrors
            // Write-only PPU registers, APU and joypad stubs
            _ => 0x00,
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x07FF => self.wram[usize::from(addr)],
            0x4018..=0xFFFF => self.mapper.cpu_read(addr),
            0x2002 => self.ppu.peek_status(),
            0x2004 => self.ppu.peek_oamdata(),
            0x2007 => self.ppu.peek_data(),
            0x0800..=0x1FFF => self.peek(addr & 0x07FF), // WRAM Mirrors
            0x2008..=0x3FFF => self.peek(addr & 0x2007), // Ppu Mirrors
            _ => 0x00,
        }
    }

    // Cartridge words come straight from the mapper unless the high byte wraps to $0000
    fn read_u16(&mut self, addr: u16) -> u16 {
        if (Self::CART_START..0xFFFF).contains(&addr) {
            self.mapper.cpu_read_word(addr)
        } else {
            let lo = self.read(addr);
            let hi = self.read(addr.wrapping_add(1));
            u16::from_le_bytes([lo, hi])
        }
    }

    fn peek_u16(&self, addr: u16) -> u16 {
        if (Self::CART_START..0xFFFF).contains(&addr) {
            self.mapper.cpu_read_word(addr)
        } else {
            let lo = self.peek(addr);
            let hi = self.peek(addr.wrapping_add(1));
            u16::from_le_bytes([lo, hi])
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x07FF => self.wram[usize::from(addr)] = val,
            0x4018..=0xFFFF => self.mapper.cpu_write(addr, val),
            0x2000 => self.ppu.write_ctrl(val),
            0x2001 => self.ppu.write_mask(val),
            0x2003 => self.ppu.write_oamaddr(val),
            0x2004 => self.ppu.write_oamdata(val),
            0x2005 => self.ppu.write_scroll(val),
            0x2006 => self.ppu.write_addr(val),
            0x2007 => self.ppu.write_data(val),
            Self::OAM_DMA => self.oam_dma(val),
            0x0800..=0x1FFF => self.write(addr & 0x07FF, val), // WRAM Mirrors
            0x2008..=0x3FFF => self.write(addr & 0x2007, val), // Ppu Mirrors
            // $2002 is read-only. APU and joypad writes are ignored.
            _ => (),
        }
    }
}

impl Bus {
    /// Clears work RAM and PPU state. The cartridge keeps its contents.
    pub fn power_off(&mut self) {
        self.wram.clear();
        self.ppu.reset(ResetKind::Hard);
    }
}

// Work RAM survives both kinds of reset.
impl Reset for Bus {
    fn reset(&mut self, kind: ResetKind) {
        self.ppu.reset(kind);
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("wram", &self.wram)
            .field("ppu", &self.ppu)
            .field("mapper", &self.mapper)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mapper::Nrom;

    #[test]
    fn wram_mirrors() {
        let mut bus = Bus::new();
        bus.write(0x0001, 0x42);
        for addr in [0x0001, 0x0801, 0x1001, 0x1801] {
            assert_eq!(bus.read(addr), 0x42, "${addr:04X}");
        }
        bus.write(0x1FFF, 0x99);
        assert_eq!(bus.read(0x07FF), 0x99);
    }

    #[test]
    fn ppu_register_mirrors() {
        let mut bus = Bus::new();
        bus.write(0x3FFB, 0x10); // OAMADDR
        bus.write(0x3FFC, 0x77); // OAMDATA
        assert_eq!(bus.ppu.oam[0x10], 0x77);
        bus.write(0x2003, 0x10);
        assert_eq!(bus.read(0x200C), 0x77);
    }

    #[test]
    fn unmapped_reads_are_zero() {
        let mut bus = Bus::new();
        for addr in [0x2000, 0x2001, 0x4000, 0x4015, 0x4016, 0x4017, 0x4018, 0x8000, 0xFFFF] {
            assert_eq!(bus.read(addr), 0x00, "${addr:04X}");
        }
        assert_eq!(bus.read_u16(0xFFFC), 0x0000);
    }

    #[test]
    fn word_reads_wrap_and_route() -> anyhow::Result<()> {
        let mut bus = Bus::new();
        bus.write(0x07FF, 0x34);
        bus.write(0x0000, 0x12);
        assert_eq!(bus.read_u16(0x07FF), 0x1234, "$0800 mirrors $0000");

        let mut prg_rom = vec![0x00; Nrom::PRG_ROM_BANK_SIZE];
        prg_rom[0x3FFE] = 0xBC;
        prg_rom[0x3FFF] = 0x9A;
        bus.load_cart(Nrom::load(prg_rom)?);
        assert_eq!(bus.read_u16(0xFFFE), 0x9ABC);
        assert_eq!(bus.peek_u16(0xFFFE), 0x9ABC);
        Ok(())
    }

    #[test]
    fn word_read_at_top_wraps_to_wram() -> anyhow::Result<()> {
        let mut prg_rom = vec![0x00; Nrom::PRG_ROM_BANK_SIZE];
        prg_rom[0x3FFF] = 0x9A;
        let mut bus = Bus::new();
        bus.load_cart(Nrom::with_prg_ram(prg_rom, vec![0x77])?);
        bus.write(0x0000, 0x12);
        assert_eq!(bus.read_u16(0xFFFF), 0x129A);
        assert_eq!(bus.peek_u16(0xFFFF), 0x129A);
        Ok(())
    }

    #[test]
    fn oam_dma_copies_page() {
        let mut bus = Bus::new();
        for offset in 0..=0xFFu16 {
            bus.write(0x0200 | offset, offset as u8 ^ 0xFF);
        }
        bus.write(Bus::OAM_DMA, 0x02);
        assert_eq!(bus.ppu.oam[0x00], 0xFF);
        assert_eq!(bus.ppu.oam[0xFF], 0x00);
    }

    #[test]
    fn reset_keeps_wram_and_power_off_clears_it() {
        let mut bus = Bus::new();
        bus.write(0x0010, 0x55);
        bus.reset(ResetKind::Hard);
        assert_eq!(bus.read(0x0010), 0x55);
        bus.power_off();
        assert_eq!(bus.read(0x0010), 0x00);
    }

    #[test]
    fn cart_swap() -> anyhow::Result<()> {
        let mut bus = Bus::new();
        let old = bus.load_cart(Nrom::load(vec![0xEA; Nrom::PRG_ROM_BANK_SIZE])?);
        assert!(old.is_none());
        assert_eq!(bus.read(0x8000), 0xEA);
        let removed = bus.unload_cart();
        assert!(!removed.is_none());
        assert_eq!(bus.read(0x8000), 0x00);
        Ok(())
    }
}
