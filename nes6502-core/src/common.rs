use serde::{Deserialize, Serialize};

/// NTSC master clock rate in Hz.
pub const NTSC_MASTER_CLOCK_RATE: f64 = 21_477_272.0;
/// NTSC CPU clock divider.
pub const NTSC_CPU_CLOCK_DIVIDER: f64 = 12.0;
/// Frames per second the frame driver is paced at.
pub const FRAME_RATE: f64 = 60.0;
/// CPU cycles in one NTSC frame, including the fractional remainder.
pub const NTSC_TICKS_PER_FRAME: f64 = NTSC_MASTER_CLOCK_RATE / NTSC_CPU_CLOCK_DIVIDER / FRAME_RATE;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ResetKind {
    /// The front-panel reset button.
    Soft,
    /// Power on.
    Hard,
}

pub trait Reset {
    fn reset(&mut self, _kind: ResetKind) {}
}

pub trait Clock {
    /// Runs one unit of work, returning the number of CPU cycles it consumed.
    fn clock(&mut self) -> usize {
        0
    }
}
