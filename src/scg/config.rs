//! System clock selections and configuration values.

use crate::time::Hertz;

use super::registers::ScgRegister;

/// Selectable system clock sources.
///
/// The discriminants are the hardware SCS encodings.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// External system oscillator (SOSC).
    SystemOscillator = 1,
    /// Slow internal RC oscillator (SIRC), nominally 8 MHz.
    SlowIrc = 2,
    /// Fast internal RC oscillator (FIRC), nominally 48 MHz.
    FastIrc = 3,
    /// System PLL (SPLL).
    SystemPll = 6,
}

impl ClockSource {
    pub const fn into_bits(this: Result<Self, u8>) -> u8 {
        match this {
            Ok(v) => v as u8,
            Err(v) => v,
        }
    }

    pub const fn from_bits(v: u8) -> Result<Self, u8> {
        match v {
            1 => Ok(Self::SystemOscillator),
            2 => Ok(Self::SlowIrc),
            3 => Ok(Self::FastIrc),
            6 => Ok(Self::SystemPll),
            _ => Err(v),
        }
    }

    /// Control/status register of this source.
    #[inline(always)]
    pub const fn csr(self) -> ScgRegister {
        match self {
            Self::SystemOscillator => ScgRegister::SoscCsr,
            Self::SlowIrc => ScgRegister::SircCsr,
            Self::FastIrc => ScgRegister::FircCsr,
            Self::SystemPll => ScgRegister::SpllCsr,
        }
    }
}

/// System run modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunMode {
    /// Not yet configured. Never a legal commit target.
    None,
    /// High speed run.
    HighSpeedRun,
    /// Normal run.
    Run,
    /// Very low power run.
    VeryLowPowerRun,
}

impl RunMode {
    /// Clock control register of this mode, if it has one.
    #[inline(always)]
    pub const fn register(self) -> Option<ScgRegister> {
        match self {
            Self::None => None,
            Self::HighSpeedRun => Some(ScgRegister::Hccr),
            Self::Run => Some(ScgRegister::Rccr),
            Self::VeryLowPowerRun => Some(ScgRegister::Vccr),
        }
    }
}

/// System clock divider selection for the core, bus and slow domains.
///
/// The raw encoding is the selector value; the effective divide ratio
/// is the selector plus one.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysClkDiv {
    Div1 = 0,
    Div2,
    Div3,
    Div4,
    Div5,
    Div6,
    Div7,
    Div8,
    Div9,
    Div10,
    Div11,
    Div12,
    Div13,
    Div14,
    Div15,
    Div16,
}

impl SysClkDiv {
    pub const fn into_bits(this: Self) -> u8 {
        this as u8
    }

    pub const fn from_bits(v: u8) -> Self {
        match v & 0xf {
            0 => Self::Div1,
            1 => Self::Div2,
            2 => Self::Div3,
            3 => Self::Div4,
            4 => Self::Div5,
            5 => Self::Div6,
            6 => Self::Div7,
            7 => Self::Div8,
            8 => Self::Div9,
            9 => Self::Div10,
            10 => Self::Div11,
            11 => Self::Div12,
            12 => Self::Div13,
            13 => Self::Div14,
            14 => Self::Div15,
            _ => Self::Div16,
        }
    }

    /// The effective divide ratio.
    #[inline(always)]
    pub const fn ratio(self) -> u32 {
        self as u32 + 1
    }
}

/// A complete system clock configuration for one run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Run mode whose control register receives this configuration.
    pub mode: RunMode,
    /// System clock source.
    pub source: ClockSource,
    /// Core clock divider.
    pub div_core: SysClkDiv,
    /// Bus clock divider.
    pub div_bus: SysClkDiv,
    /// Slow clock divider.
    pub div_slow: SysClkDiv,
}

impl ClockConfig {
    /// Normal run from FIRC, nominally 48 MHz core.
    pub const RUN_FIRC_48MHZ: Self = Self {
        mode: RunMode::Run,
        source: ClockSource::FastIrc,
        div_core: SysClkDiv::Div1,
        div_bus: SysClkDiv::Div1,
        div_slow: SysClkDiv::Div2,
    };

    /// Normal run from the SPLL, nominally 80 MHz core.
    pub const RUN_SPLL_80MHZ: Self = Self {
        mode: RunMode::Run,
        source: ClockSource::SystemPll,
        div_core: SysClkDiv::Div2,
        div_bus: SysClkDiv::Div2,
        div_slow: SysClkDiv::Div3,
    };

    /// Normal run from the SPLL, documented upstream as 64 MHz core.
    ///
    /// The register encoding is identical to [RUN_SPLL_80MHZ](Self::RUN_SPLL_80MHZ);
    /// both cannot be right about the resulting frequency. Kept as-is
    /// until the intended divider set is known.
    pub const RUN_SPLL_64MHZ: Self = Self::RUN_SPLL_80MHZ;

    /// High speed run from the SPLL, nominally 112 MHz core.
    pub const HSRUN_SPLL_112MHZ: Self = Self {
        mode: RunMode::HighSpeedRun,
        source: ClockSource::SystemPll,
        div_core: SysClkDiv::Div1,
        div_bus: SysClkDiv::Div2,
        div_slow: SysClkDiv::Div4,
    };

    /// High speed run from the SPLL, nominally 80 MHz core.
    pub const HSRUN_SPLL_80MHZ: Self = Self {
        mode: RunMode::HighSpeedRun,
        source: ClockSource::SystemPll,
        div_core: SysClkDiv::Div2,
        div_bus: SysClkDiv::Div2,
        div_slow: SysClkDiv::Div3,
    };

    /// Very low power run from SIRC, nominally 4 MHz core.
    pub const VLPR_SIRC_4MHZ: Self = Self {
        mode: RunMode::VeryLowPowerRun,
        source: ClockSource::SlowIrc,
        div_core: SysClkDiv::Div2,
        div_bus: SysClkDiv::Div1,
        div_slow: SysClkDiv::Div4,
    };
}

/// Nominal base frequency of each clock source.
///
/// SIRC and FIRC rates are silicon constants. The oscillator rate
/// depends on the crystal wired to the board, and the PLL rate on how
/// its multiplier is configured, so both are supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceFreqs {
    pub sosc: Hertz,
    pub sirc: Hertz,
    pub firc: Hertz,
    pub spll: Hertz,
}

impl SourceFreqs {
    /// Describe a board by its oscillator and configured PLL rates.
    pub const fn new(sosc: Hertz, spll: Hertz) -> Self {
        Self {
            sosc,
            sirc: Hertz::from_raw(8_000_000),
            firc: Hertz::from_raw(48_000_000),
            spll,
        }
    }

    /// Nominal rate of a source.
    #[inline(always)]
    pub const fn of(&self, source: ClockSource) -> Hertz {
        match source {
            ClockSource::SystemOscillator => self.sosc,
            ClockSource::SlowIrc => self.sirc,
            ClockSource::FastIrc => self.firc,
            ClockSource::SystemPll => self.spll,
        }
    }
}
