#![doc = include_str!("../README.md")]

pub mod bus;
pub mod common;
pub mod control_deck;
pub mod cpu;
pub mod error;
pub mod mapper;
pub mod mem;
pub mod ppu;

pub mod prelude {
    //! The prelude re-exports all the common structs/enums used for driving the CPU.

    pub use crate::{
        bus::Bus,
        common::{Clock, Reset, ResetKind},
        control_deck::{Config, ControlDeck},
        cpu::{instr::InstrRef, Cpu, Status},
        error::{Error, Result},
        mapper::{Mapped, Mapper, Nrom},
        mem::Mem,
        ppu::{Ppu, Registers},
    };
}
