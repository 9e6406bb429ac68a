//! Picture Processing Unit (PPU) register port.
//!
//! Only the CPU-visible register file is modeled: latches, OAM and the PPUDATA port over an
//! internal 16K address space. No pixels are generated.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU_registers>

use crate::common::{Reset, ResetKind};
use bitflags::bitflags;
use tracing::trace;

/// CPU-facing PPU registers at `$2000-$2007`, mirrored every 8 bytes up to `$3FFF`.
pub trait Registers {
    /// $2000 PPUCTRL
    fn write_ctrl(&mut self, val: u8);
    /// Write $2001 PPUMASK
    fn write_mask(&mut self, val: u8);
    /// Read $2002 PPUSTATUS
    fn read_status(&mut self) -> u8;
    /// Peek $2002 PPUSTATUS
    fn peek_status(&self) -> u8;
    /// Write $2003 OAMADDR
    fn write_oamaddr(&mut self, val: u8);
    /// Read $2004 OAMDATA
    fn read_oamdata(&mut self) -> u8;
    /// Peek $2004 OAMDATA
    fn peek_oamdata(&self) -> u8;
    /// Write $2004 OAMDATA
    fn write_oamdata(&mut self, val: u8);
    /// Write $2005 PPUSCROLL
    fn write_scroll(&mut self, val: u8);
    /// Write $2006 PPUADDR
    fn write_addr(&mut self, val: u8);
    /// Read $2007 PPUDATA
    fn read_data(&mut self) -> u8;
    /// Peek $2007 PPUDATA
    fn peek_data(&self) -> u8;
    /// Write $2007 PPUDATA
    fn write_data(&mut self, val: u8);
    /// Burst copy of a full page into OAM, triggered by a write to `$4014`.
    fn write_oam_dma(&mut self, data: &[u8; 256]);
}

bitflags! {
    // $2000 PPUCTRL
    //
    // VPHB SINN
    // |||| ||++- Base nametable: $2000, $2400, $2800, $2C00
    // |||| |+--- VRAM address increment: 0 = add 1, 1 = add 32
    // |||| +---- Sprite pattern table: 0 = $0000, 1 = $1000
    // |||+------ Background pattern table: 0 = $0000, 1 = $1000
    // ||+------- Sprite size: 0 = 8x8, 1 = 8x16
    // |+-------- Master/slave select
    // +--------- Generate NMI at the start of vblank
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Ctrl: u8 {
        const NAMETABLE1 = 0x01;
        const NAMETABLE2 = 0x02;
        const VRAM_INCREMENT = 0x04;
        const SPR_SELECT = 0x08;
        const BG_SELECT = 0x10;
        const SPR_HEIGHT = 0x20;
        const MASTER_SLAVE = 0x40;
        const NMI_ENABLE = 0x80;
    }
}

bitflags! {
    // $2002 PPUSTATUS
    //
    // VSO- ----
    // |||
    // ||+------- Sprite overflow
    // |+-------- Sprite 0 hit
    // +--------- In vblank
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Status: u8 {
        const SPR_OVERFLOW = 0x20;
        const SPR_ZERO_HIT = 0x40;
        const VBLANK = 0x80;
    }
}

#[derive(Clone)]
#[must_use]
pub struct Ppu {
    pub ctrl: Ctrl,
    pub mask: u8,
    pub status: Status,
    pub oam_addr: u8,
    pub oam: [u8; 256],
    pub scroll_x: u8,
    pub scroll_y: u8,
    /// Shared first/second write toggle for PPUSCROLL and PPUADDR.
    pub write_latch: bool,
    /// Current PPUDATA address.
    pub vram_addr: u16,
    pub read_buffer: u8,
    vram: Vec<u8>,
    palette: [u8; 32],
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    const VRAM_SIZE: usize = 0x4000;
    const PALETTE_START: u16 = 0x3F00;

    pub fn new() -> Self {
        Self {
            ctrl: Ctrl::empty(),
            mask: 0x00,
            status: Status::empty(),
            oam_addr: 0x00,
            oam: [0x00; 256],
            scroll_x: 0x00,
            scroll_y: 0x00,
            write_latch: false,
            vram_addr: 0x0000,
            read_buffer: 0x00,
            vram: vec![0x00; Self::VRAM_SIZE],
            palette: [0x00; 32],
        }
    }

    #[must_use]
    pub const fn nmi_enabled(&self) -> bool {
        self.ctrl.contains(Ctrl::NMI_ENABLE)
    }

    /// Latch or clear the vblank flag in PPUSTATUS.
    pub fn set_vblank(&mut self, vblank: bool) {
        self.status.set(Status::VBLANK, vblank);
    }

    #[must_use]
    pub const fn vram_increment(&self) -> u16 {
        if self.ctrl.contains(Ctrl::VRAM_INCREMENT) {
            32
        } else {
            1
        }
    }

    const fn palette_index(addr: u16) -> usize {
        // $3F10/$3F14/$3F18/$3F1C mirror the backdrop entries
        let index = (addr & 0x1F) as usize;
        if index >= 0x10 && index & 0x03 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    fn peek_vram(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        if addr >= Self::PALETTE_START {
            self.palette[Self::palette_index(addr)]
        } else {
            self.vram[usize::from(addr)]
        }
    }

    fn write_vram(&mut self, addr: u16, val: u8) {
        let addr = addr & 0x3FFF;
        if addr >= Self::PALETTE_START {
            self.palette[Self::palette_index(addr)] = val;
        } else {
            self.vram[usize::from(addr)] = val;
        }
    }

    fn increment_vram_addr(&mut self) {
        self.vram_addr = self.vram_addr.wrapping_add(self.vram_increment()) & 0x3FFF;
    }
}

impl Registers for Ppu {
    fn write_ctrl(&mut self, val: u8) {
        self.ctrl = Ctrl::from_bits_truncate(val);
    }

    fn write_mask(&mut self, val: u8) {
        self.mask = val;
    }

    // Reading clears vblank and resets the shared write toggle
    fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.status.remove(Status::VBLANK);
        self.write_latch = false;
        status
    }

    fn peek_status(&self) -> u8 {
        self.status.bits()
    }

    fn write_oamaddr(&mut self, val: u8) {
        self.oam_addr = val;
    }

    fn read_oamdata(&mut self) -> u8 {
        self.peek_oamdata()
    }

    fn peek_oamdata(&self) -> u8 {
        self.oam[usize::from(self.oam_addr)]
    }

    fn write_oamdata(&mut self, val: u8) {
        self.oam[usize::from(self.oam_addr)] = val;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    fn write_scroll(&mut self, val: u8) {
        if self.write_latch {
            self.scroll_y = val;
        } else {
            self.scroll_x = val;
        }
        self.write_latch = !self.write_latch;
    }

    // High byte first, then low byte
    fn write_addr(&mut self, val: u8) {
        if self.write_latch {
            self.vram_addr = (self.vram_addr & 0xFF00) | u16::from(val);
        } else {
            self.vram_addr = (u16::from(val & 0x3F) << 8) | (self.vram_addr & 0x00FF);
        }
        self.write_latch = !self.write_latch;
    }

    // Palette reads are immediate, everything else lags one read behind
    fn read_data(&mut self) -> u8 {
        let addr = self.vram_addr;
        let val = self.peek_data();
        // Palette reads still refill the buffer from the nametable underneath
        self.read_buffer = if addr >= Self::PALETTE_START {
            self.peek_vram(addr & 0x2FFF)
        } else {
            self.peek_vram(addr)
        };
        self.increment_vram_addr();
        val
    }

    fn peek_data(&self) -> u8 {
        let addr = self.vram_addr;
        if addr >= Self::PALETTE_START {
            self.peek_vram(addr)
        } else {
            self.read_buffer
        }
    }

    fn write_data(&mut self, val: u8) {
        self.write_vram(self.vram_addr, val);
        self.increment_vram_addr();
    }

    fn write_oam_dma(&mut self, data: &[u8; 256]) {
        trace!("OAM DMA from ${:02X}", self.oam_addr);
        for &val in data {
            self.write_oamdata(val);
        }
    }
}

impl Reset for Ppu {
    fn reset(&mut self, kind: ResetKind) {
        self.ctrl = Ctrl::empty();
        self.mask = 0x00;
        self.scroll_x = 0x00;
        self.scroll_y = 0x00;
        self.write_latch = false;
        self.read_buffer = 0x00;
        if kind == ResetKind::Hard {
            self.status = Status::empty();
            self.oam_addr = 0x00;
            self.vram_addr = 0x0000;
        }
    }
}

impl std::fmt::Debug for Ppu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ppu")
            .field("ctrl", &self.ctrl)
            .field("mask", &format_args!("${:02X}", self.mask))
            .field("status", &self.status)
            .field("oam_addr", &format_args!("${:02X}", self.oam_addr))
            .field("vram_addr", &format_args!("${:04X}", self.vram_addr))
            .field("write_latch", &self.write_latch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_read_clears_vblank_and_latch() {
        let mut ppu = Ppu::new();
        ppu.set_vblank(true);
        ppu.write_scroll(0x10);
        assert!(ppu.write_latch);
        assert_eq!(ppu.read_status(), 0x80);
        assert!(!ppu.write_latch);
        assert_eq!(ppu.read_status(), 0x00);
    }

    #[test]
    fn oamdata_write_increments_address() {
        let mut ppu = Ppu::new();
        ppu.write_oamaddr(0xFF);
        ppu.write_oamdata(0x11);
        ppu.write_oamdata(0x22);
        assert_eq!(ppu.oam[0xFF], 0x11);
        assert_eq!(ppu.oam[0x00], 0x22);
        assert_eq!(ppu.peek_oamdata(), 0x00);
    }

    #[test]
    fn data_reads_are_buffered() {
        let mut ppu = Ppu::new();
        ppu.write_addr(0x21);
        ppu.write_addr(0x08);
        ppu.write_data(0xAB);
        ppu.write_data(0xCD);

        ppu.write_addr(0x21);
        ppu.write_addr(0x08);
        assert_eq!(ppu.read_data(), 0x00, "first read returns the stale buffer");
        assert_eq!(ppu.read_data(), 0xAB);
        assert_eq!(ppu.read_data(), 0xCD);
    }

    #[test]
    fn palette_reads_are_immediate() {
        let mut ppu = Ppu::new();
        ppu.write_addr(0x3F);
        ppu.write_addr(0x01);
        ppu.write_data(0x2C);
        ppu.write_addr(0x3F);
        ppu.write_addr(0x01);
        assert_eq!(ppu.read_data(), 0x2C);
    }

    #[test]
    fn vram_increment_follows_ctrl() {
        let mut ppu = Ppu::new();
        ppu.write_ctrl(Ctrl::VRAM_INCREMENT.bits());
        ppu.write_addr(0x20);
        ppu.write_addr(0x00);
        ppu.write_data(0x01);
        assert_eq!(ppu.vram_addr, 0x2020);
    }

    #[test]
    fn oam_dma_fills_from_oam_addr() {
        let mut ppu = Ppu::new();
        let mut page = [0x00; 256];
        for (i, val) in page.iter_mut().enumerate() {
            *val = i as u8;
        }
        ppu.write_oamaddr(0x04);
        ppu.write_oam_dma(&page);
        assert_eq!(ppu.oam[0x04], 0x00);
        assert_eq!(ppu.oam[0x03], 0xFF);
        assert_eq!(ppu.oam_addr, 0x04);
    }
}
