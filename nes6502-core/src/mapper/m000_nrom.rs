//! `NROM` (Mapper 000)
//!
//! <http://wiki.nesdev.com/w/index.php/NROM>

use crate::{
    error::{Error, Result},
    mapper::{Mapped, Mapper},
};

#[derive(Clone)]
#[must_use]
pub struct Nrom {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
}

impl Nrom {
    pub const PRG_ROM_BANK_SIZE: usize = 16 * 1024;
    pub const PRG_RAM_SIZE: usize = 8 * 1024;

    /// Creates an `NROM` cartridge with 8K of PRG-RAM.
    ///
    /// # Errors
    ///
    /// Errors if `prg_rom` is empty or not a whole number of 16K banks.
    pub fn load(prg_rom: Vec<u8>) -> Result<Mapper> {
        Self::with_prg_ram(prg_rom, vec![0x00; Self::PRG_RAM_SIZE])
    }

    /// Creates an `NROM` cartridge with the given PRG-RAM contents. PRG-RAM larger than 8K is
    /// truncated and an empty PRG-RAM reads as `0`.
    ///
    /// # Errors
    ///
    /// Errors if `prg_rom` is empty or not a whole number of 16K banks.
    pub fn with_prg_ram(prg_rom: Vec<u8>, mut prg_ram: Vec<u8>) -> Result<Mapper> {
        if prg_rom.is_empty() || prg_rom.len() % Self::PRG_ROM_BANK_SIZE != 0 {
            return Err(Error::InvalidPrgRom {
                size: prg_rom.len(),
            });
        }
        prg_ram.truncate(Self::PRG_RAM_SIZE);
        Ok(Self { prg_rom, prg_ram }.into())
    }

    #[must_use]
    pub fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    #[must_use]
    pub fn prg_rom_banks(&self) -> usize {
        self.prg_rom.len() / Self::PRG_ROM_BANK_SIZE
    }

    fn last_bank_offset(&self) -> usize {
        self.prg_rom.len() - Self::PRG_ROM_BANK_SIZE
    }
}

impl Mapped for Nrom {
    // CPU $4018..=$7FFF 8K PRG-RAM, mirrored
    // CPU $8000..=$BFFF 16K PRG-ROM first bank
    // CPU $C000..=$FFFF 16K PRG-ROM last bank (mirror of the first for NROM-128)

    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0xC000..=0xFFFF => {
                let offset = self.last_bank_offset() + usize::from(addr & 0x3FFF);
                self.prg_rom.get(offset).copied().unwrap_or(0x00)
            }
            0x8000..=0xBFFF => self
                .prg_rom
                .get(usize::from(addr & 0x3FFF))
                .copied()
                .unwrap_or(0x00),
            _ => self
                .prg_ram
                .get(usize::from(addr & 0x1FFF))
                .copied()
                .unwrap_or(0x00),
        }
    }

    fn cpu_write(&mut self, addr: u16, val: u8) {
        if addr < 0x8000 {
            if let Some(cell) = self.prg_ram.get_mut(usize::from(addr & 0x1FFF)) {
                *cell = val;
            }
        }
    }
}

impl std::fmt::Debug for Nrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nrom")
            .field("prg_rom_banks", &self.prg_rom_banks())
            .field("prg_ram_len", &self.prg_ram.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_banks() -> Vec<u8> {
        let mut prg_rom = vec![0x00; 2 * Nrom::PRG_ROM_BANK_SIZE];
        prg_rom[0x0000] = 0xAA;
        prg_rom[0x4000] = 0xBB;
        prg_rom[0x7FFF] = 0xCC;
        prg_rom
    }

    #[test]
    fn rejects_invalid_prg_rom() {
        assert!(matches!(
            Nrom::load(vec![]),
            Err(Error::InvalidPrgRom { size: 0 })
        ));
        assert!(matches!(
            Nrom::load(vec![0x00; 0x1000]),
            Err(Error::InvalidPrgRom { size: 0x1000 })
        ));
    }

    #[test]
    fn maps_first_and_last_bank() -> anyhow::Result<()> {
        let mapper = Nrom::load(two_banks())?;
        assert_eq!(mapper.cpu_read(0x8000), 0xAA);
        assert_eq!(mapper.cpu_read(0xC000), 0xBB);
        assert_eq!(mapper.cpu_read(0xFFFF), 0xCC);
        Ok(())
    }

    #[test]
    fn single_bank_is_mirrored() -> anyhow::Result<()> {
        let mut prg_rom = vec![0x00; Nrom::PRG_ROM_BANK_SIZE];
        prg_rom[0x3FFC] = 0x78;
        prg_rom[0x3FFD] = 0x56;
        let mapper = Nrom::load(prg_rom)?;
        assert_eq!(mapper.cpu_read_word(0xFFFC), 0x5678);
        assert_eq!(mapper.cpu_read_word(0xBFFC), 0x5678);
        Ok(())
    }

    #[test]
    fn prg_ram_is_writable_and_rom_is_not() -> anyhow::Result<()> {
        let mut mapper = Nrom::load(two_banks())?;
        mapper.cpu_write(0x6001, 0x21);
        assert_eq!(mapper.cpu_read(0x6001), 0x21);
        assert_eq!(mapper.cpu_read(0x4019), 0x00);
        mapper.cpu_write(0x8000, 0x11);
        assert_eq!(mapper.cpu_read(0x8000), 0xAA);
        Ok(())
    }

    #[test]
    fn missing_prg_ram_reads_zero() -> anyhow::Result<()> {
        let mut mapper = Nrom::with_prg_ram(two_banks(), vec![])?;
        mapper.cpu_write(0x6000, 0x42);
        assert_eq!(mapper.cpu_read(0x6000), 0x00);
        Ok(())
    }
}
