//! Memory access traits and fixed-size RAM.

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

/// A trait that represents memory operations on a 16-bit address space.
pub trait Mem {
    /// Read from the given address.
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    /// Peek from the given address without side effects.
    fn peek(&self, addr: u16) -> u8;

    /// Read two bytes from the given address.
    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Peek two bytes from the given address.
    fn peek_u16(&self, addr: u16) -> u16 {
        let lo = self.peek(addr);
        let hi = self.peek(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write value to the given address.
    fn write(&mut self, addr: u16, val: u8);
}

/// Zero-initialized RAM of `N` bytes, with a Debug implementation that avoids printing the
/// entire contents.
#[derive(Clone)]
#[must_use]
pub struct Ram<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> Ram<N> {
    pub const fn new() -> Self {
        Self { data: [0x00; N] }
    }

    /// Clear all cells to zero.
    pub fn clear(&mut self) {
        self.data.fill(0x00);
    }
}

impl<const N: usize> Default for Ram<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for Ram<N> {
    type Target = [u8; N];
    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<const N: usize> DerefMut for Ram<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<const N: usize> fmt::Debug for Ram<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ram").field("len", &N).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(Ram<0x10>);

    impl Mem for Flat {
        fn peek(&self, addr: u16) -> u8 {
            self.0[usize::from(addr & 0x0F)]
        }

        fn write(&mut self, addr: u16, val: u8) {
            self.0[usize::from(addr & 0x0F)] = val;
        }
    }

    #[test]
    fn word_access_is_little_endian() {
        let mut mem = Flat(Ram::new());
        mem.write(0x00, 0xEF);
        mem.write(0x01, 0xCD);
        assert_eq!(mem.read_u16(0x0000), 0xCDEF);
        assert_eq!(mem.peek_u16(0x0000), 0xCDEF);
    }

    #[test]
    fn word_access_wraps_address() {
        let mut mem = Flat(Ram::new());
        mem.write(0xFFFF, 0x34);
        mem.write(0x0000, 0x12);
        assert_eq!(mem.read_u16(0xFFFF), 0x1234);
    }

    #[test]
    fn ram_starts_zeroed_and_clears() {
        let mut ram = Ram::<0x800>::new();
        assert!(ram.iter().all(|&b| b == 0));
        ram[0x7FF] = 0xAA;
        ram.clear();
        assert_eq!(ram[0x7FF], 0);
    }
}
