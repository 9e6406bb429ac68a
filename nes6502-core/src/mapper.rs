//! Cartridge contract for the CPU address range `$4018-$FFFF`.
//!
//! <http://wiki.nesdev.com/w/index.php/Mapper>

use enum_dispatch::enum_dispatch;

pub use m000_nrom::Nrom;

pub mod m000_nrom;

/// Cartridge memory as seen from the CPU bus.
///
/// Every address routed here is `>= $4018`. Unmapped reads answer `0` and unmapped writes are
/// discarded.
#[enum_dispatch(Mapper)]
pub trait Mapped {
    fn cpu_read(&self, _addr: u16) -> u8 {
        0x00
    }

    fn cpu_read_word(&self, addr: u16) -> u16 {
        let lo = self.cpu_read(addr);
        let hi = self.cpu_read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn cpu_write(&mut self, _addr: u16, _val: u8) {}
}

#[enum_dispatch]
#[derive(Debug, Clone)]
#[must_use]
pub enum Mapper {
    /// Empty cartridge slot.
    None,
    /// `NROM` (Mapper 000)
    Nrom,
}

impl Mapper {
    pub fn none() -> Self {
        None.into()
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None(_))
    }

    /// Short human-readable name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None(_) => "None",
            Self::Nrom(_) => "NROM",
        }
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::none()
    }
}

/// The null cartridge: every read is `0` and writes go nowhere.
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct None;

impl Mapped for None {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_reads_zero() {
        let mut mapper = Mapper::default();
        assert!(mapper.is_none());
        for addr in [0x4018, 0x6000, 0x8000, 0xFFFC, 0xFFFF] {
            assert_eq!(mapper.cpu_read(addr), 0x00, "${addr:04X}");
        }
        assert_eq!(mapper.cpu_read_word(0xFFFC), 0x0000);
        mapper.cpu_write(0x6000, 0xFF);
        assert_eq!(mapper.cpu_read(0x6000), 0x00, "writes are discarded");
    }
}
