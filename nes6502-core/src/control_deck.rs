use crate::{
    bus::Bus,
    common::{Clock, Reset, ResetKind, NTSC_TICKS_PER_FRAME},
    cpu::{Cpu, Status},
    error::{Error, Result},
    mapper::Mapper,
};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info, trace};

/// Control deck configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct Config {
    /// CPU cycles budgeted per frame. Fractional remainders carry over to the next frame.
    pub ticks_per_frame: f64,
    /// Record executed instructions.
    pub journal: bool,
    /// Maximum journal entries kept.
    pub journal_capacity: usize,
    /// Frames between journal heat resets. `0` never resets.
    pub journal_heat_reset: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ticks_per_frame: NTSC_TICKS_PER_FRAME,
            journal: false,
            journal_capacity: 4096,
            journal_heat_reset: 64,
        }
    }
}

impl Config {
    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Errors if the JSON is malformed or any value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Errors if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Errors if the file can't be read or its contents are invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| Error::io(err, format!("failed to read config {path:?}")))?;
        let config = Self::from_json(&json)?;
        info!("loaded configuration from {path:?}");
        Ok(config)
    }

    /// # Errors
    ///
    /// Errors if `ticks_per_frame` is not a positive finite number or the journal is enabled
    /// with no capacity.
    pub fn validate(&self) -> Result<()> {
        if !self.ticks_per_frame.is_finite() || self.ticks_per_frame <= 0.0 {
            return Err(Error::invalid_config(
                "ticks_per_frame",
                self.ticks_per_frame,
            ));
        }
        if self.journal && self.journal_capacity == 0 {
            return Err(Error::invalid_config(
                "journal_capacity",
                self.journal_capacity,
            ));
        }
        Ok(())
    }
}

/// Represents an NES Control Deck
///
/// Owns the CPU, which in turn owns the bus and the cartridge slot.
#[derive(Debug)]
#[must_use]
pub struct ControlDeck {
    config: Config,
    powered: bool,
    busy: AtomicBool,
    cycles_remaining: f64,
    frame: u32,
    cpu: Cpu,
}

impl Default for ControlDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlDeck {
    /// Create a NES `ControlDeck` with the default configuration.
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    /// Create a NES `ControlDeck` with a configuration.
    ///
    /// # Errors
    ///
    /// Errors if the configuration is invalid.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        let mut cpu = Cpu::new(Bus::new());
        cpu.journal.set_capacity(config.journal_capacity);
        cpu.journal.set_enabled(config.journal);
        Self {
            config,
            powered: false,
            busy: AtomicBool::new(false),
            cycles_remaining: 0.0,
            frame: 0,
            cpu,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn is_powered(&self) -> bool {
        self.powered
    }

    /// Number of frames completed since power on.
    #[must_use]
    pub const fn frame_number(&self) -> u32 {
        self.frame
    }

    /// Hard resets the CPU and starts accepting clocks.
    pub fn power_on(&mut self) {
        debug!("power on");
        self.cold_start();
        self.powered = true;
    }

    // Hard CPU reset with cleared frame counters and journal
    fn cold_start(&mut self) {
        self.cpu.journal.clear();
        self.cpu.reset(ResetKind::Hard);
        self.cycles_remaining = 0.0;
        self.frame = 0;
    }

    /// Returns the CPU to its power-off state and stops accepting clocks.
    pub fn power_off(&mut self) {
        debug!("power off");
        self.cpu.power_off();
        self.cycles_remaining = 0.0;
        self.frame = 0;
        self.powered = false;
    }

    /// Toggles the power switch, returning whether the deck is now powered.
    pub fn press_power(&mut self) -> bool {
        if self.powered {
            self.power_off();
        } else {
            self.power_on();
        }
        self.powered
    }

    /// The front-panel reset button.
    pub fn press_reset(&mut self) {
        debug!("reset pressed");
        self.cpu.reset(ResetKind::Soft);
    }

    /// Inserts a cartridge, returning the previously inserted one.
    pub fn insert_cartridge(&mut self, mapper: Mapper) -> Mapper {
        self.cpu.bus.load_cart(mapper)
    }

    /// Removes the cartridge, leaving the slot empty.
    pub fn remove_cartridge(&mut self) -> Mapper {
        self.cpu.bus.unload_cart()
    }

    /// Signals a non-maskable interrupt.
    pub fn nmi(&mut self) {
        self.cpu.nmi();
    }

    /// Signals an interrupt request, returning whether it was serviced. Requests are ignored
    /// while interrupts are disabled.
    pub fn irq(&mut self) -> bool {
        if self.cpu.status.contains(Status::I) {
            trace!("IRQ ignored, interrupts disabled");
            return false;
        }
        self.cpu.irq();
        true
    }

    /// Steps the control deck one CPU instruction.
    ///
    /// # Errors
    ///
    /// Errors if the control deck is powered off.
    pub fn clock_instr(&mut self) -> Result<usize> {
        if !self.powered {
            return Err(Error::PoweredOff);
        }
        Ok(self.clock())
    }

    /// Steps the control deck an entire frame, returning the number of cycles run.
    ///
    /// Whole instructions run until the frame budget is spent and the overshoot is charged to
    /// the next frame. A call that overlaps a frame already in progress runs nothing and
    /// returns `0`.
    ///
    /// # Errors
    ///
    /// Errors if the control deck is powered off.
    pub fn clock_frame(&mut self) -> Result<usize> {
        if !self.powered {
            return Err(Error::PoweredOff);
        }
        if self.busy.swap(true, Ordering::Acquire) {
            trace!("frame {} already running", self.frame);
            return Ok(0);
        }

        self.cycles_remaining += self.config.ticks_per_frame;
        let mut total_cycles = 0;
        while self.cycles_remaining > 0.0 {
            let cycles = self.cpu.clock();
            total_cycles += cycles;
            self.cycles_remaining -= cycles as f64;
        }
        self.frame = self.frame.wrapping_add(1);
        let heat_reset = self.config.journal_heat_reset;
        if heat_reset > 0 && self.frame % heat_reset == 0 {
            self.cpu.journal.reset_heat();
        }

        self.busy.store(false, Ordering::Release);
        Ok(total_cycles)
    }

    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }
}

impl Clock for ControlDeck {
    /// Steps the control deck a single instruction.
    fn clock(&mut self) -> usize {
        self.cpu.clock()
    }
}

impl Reset for ControlDeck {
    /// Resets the console. Hard resets also clear the frame counters and journal, as a power
    /// cycle does, without changing the power state.
    fn reset(&mut self, kind: ResetKind) {
        match kind {
            ResetKind::Soft => self.cpu.reset(kind),
            ResetKind::Hard => self.cold_start(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cpu::journal::Entry, mapper::Nrom, mem::Mem};

    // JMP $8000 forever, entered through the reset vector
    fn spin_loop() -> anyhow::Result<Mapper> {
        let mut prg_rom = vec![0x00; Nrom::PRG_ROM_BANK_SIZE];
        prg_rom[..3].copy_from_slice(&[0x4C, 0x00, 0x80]);
        prg_rom[0x3FFC..0x3FFE].copy_from_slice(&[0x00, 0x80]);
        Ok(Nrom::load(prg_rom)?)
    }

    fn powered_deck(config: Config) -> anyhow::Result<ControlDeck> {
        let mut deck = ControlDeck::with_config(config)?;
        deck.insert_cartridge(spin_loop()?);
        deck.power_on();
        Ok(deck)
    }

    #[test]
    fn powered_off_deck_refuses_clocks() {
        let mut deck = ControlDeck::new();
        assert!(!deck.is_powered());
        assert!(matches!(deck.clock_frame(), Err(Error::PoweredOff)));
        assert!(matches!(deck.clock_instr(), Err(Error::PoweredOff)));
    }

    #[test]
    fn power_button_toggles() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config::default())?;
        assert_eq!(deck.cpu().pc, 0x8000);
        assert_eq!(deck.cpu().sp, 0xFD);
        deck.clock_frame()?;
        assert!(!deck.press_power());
        assert_eq!(deck.frame_number(), 0);
        assert_eq!(deck.cpu().cycle, 0);
        assert_eq!(deck.cpu().pc, 0x0000);
        assert!(deck.press_power());
        assert_eq!(deck.cpu().pc, 0x8000);
        Ok(())
    }

    #[test]
    fn frame_overshoot_carries() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config::default())?;
        let tpf = deck.config().ticks_per_frame;

        let first = deck.clock_frame()?;
        assert!(first as f64 >= tpf && (first as f64) < tpf + 3.0);
        assert!(deck.cycles_remaining <= 0.0 && deck.cycles_remaining > -3.0);

        let second = deck.clock_frame()?;
        let total = (first + second) as f64;
        assert!((total - 2.0 * tpf).abs() < 3.0, "{total} vs {}", 2.0 * tpf);
        assert_eq!(deck.frame_number(), 2);
        assert_eq!(deck.cpu().cycle as usize, first + second);
        Ok(())
    }

    #[test]
    fn busy_deck_runs_nothing() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config::default())?;
        deck.busy.store(true, Ordering::Release);
        assert_eq!(deck.clock_frame()?, 0);
        assert_eq!(deck.frame_number(), 0);
        assert_eq!(deck.cpu().cycle, 0);

        deck.busy.store(false, Ordering::Release);
        assert!(deck.clock_frame()? > 0);
        assert!(!deck.busy.load(Ordering::Acquire), "released after the frame");
        Ok(())
    }

    #[test]
    fn irq_respects_interrupt_disable() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config::default())?;
        assert!(!deck.irq(), "I is set after reset");
        deck.cpu_mut().status.remove(Status::I);
        assert!(deck.irq());
        assert!(deck.cpu().status.contains(Status::I));
        deck.nmi();
        assert_eq!(deck.cpu().cycle, 14);
        Ok(())
    }

    #[test]
    fn press_reset_is_soft() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config::default())?;
        deck.cpu_mut().write(0x0010, 0x42);
        deck.cpu_mut().acc = 0x33;
        deck.press_reset();
        assert_eq!(deck.cpu().acc, 0x33);
        assert_eq!(deck.cpu().sp, 0xFA);
        assert_eq!(deck.cpu().peek(0x0010), 0x42);
        Ok(())
    }

    #[test]
    fn hard_reset_restarts_frames() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config {
            journal: true,
            ..Config::default()
        })?;
        deck.clock_frame()?;
        deck.cpu_mut().acc = 0x33;
        assert!(!deck.cpu().journal.is_empty());

        deck.reset(ResetKind::Hard);
        assert!(deck.is_powered());
        assert_eq!(deck.frame_number(), 0);
        assert!(deck.cycles_remaining.abs() < f64::EPSILON);
        assert_eq!(deck.cpu().cycle, 0);
        assert_eq!(deck.cpu().acc, 0x00);
        assert_eq!(deck.cpu().pc, 0x8000);
        assert!(deck.cpu().journal.is_empty());
        Ok(())
    }

    #[test]
    fn cartridge_slot() -> anyhow::Result<()> {
        let mut deck = ControlDeck::new();
        assert!(deck.insert_cartridge(spin_loop()?).is_none());
        assert!(!deck.insert_cartridge(spin_loop()?).is_none());
        assert_eq!(deck.remove_cartridge().name(), "NROM");
        assert!(deck.remove_cartridge().is_none());
        Ok(())
    }

    #[test]
    fn journal_heat_resets_on_schedule() -> anyhow::Result<()> {
        let mut deck = powered_deck(Config {
            journal: true,
            journal_heat_reset: 2,
            ..Config::default()
        })?;
        deck.clock_frame()?;
        let entries: Vec<_> = deck.cpu().journal.entries().copied().collect();
        assert!(matches!(
            entries.as_slice(),
            [
                Entry::Instr { pc: 0x8000, hot: false, .. },
                Entry::Blank,
                Entry::Instr { pc: 0x8000, hot: true, .. },
                Entry::Blank,
            ]
        ));
        assert!(deck.cpu().journal.heat(0x8000) > 2);
        deck.clock_frame()?;
        assert_eq!(deck.cpu().journal.heat(0x8000), 0);
        Ok(())
    }

    #[test]
    fn config_round_trip() -> anyhow::Result<()> {
        let config = Config {
            ticks_per_frame: 33_247.5,
            journal: true,
            journal_capacity: 16,
            journal_heat_reset: 0,
        };
        assert_eq!(Config::from_json(&config.to_json()?)?, config);
        assert_eq!(Config::from_json("{}")?, Config::default());
        Ok(())
    }

    #[test]
    fn config_rejects_invalid_values() {
        for json in [
            r#"{"ticks_per_frame": 0.0}"#,
            r#"{"ticks_per_frame": -1.0}"#,
            r#"{"journal": true, "journal_capacity": 0}"#,
        ] {
            assert!(
                matches!(Config::from_json(json), Err(Error::InvalidConfig { .. })),
                "{json}"
            );
        }
        let nan = Config {
            ticks_per_frame: f64::NAN,
            ..Config::default()
        };
        assert!(ControlDeck::with_config(nan).is_err());
        assert!(matches!(
            Config::from_json("{"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn config_load_reports_io_errors() {
        assert!(matches!(
            Config::load("does/not/exist.json"),
            Err(Error::Io { .. })
        ));
    }
}
