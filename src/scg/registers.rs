//! Register-level model of the system clock generator.
//!
//! The driver never touches memory directly; it goes through
//! [ScgRegisters], implemented once for the real memory-mapped block
//! ([ScgBlock]) and once as an in-memory register file in the tests.

use bitfield_struct::bitfield;

use super::config::{ClockSource, SysClkDiv};

/// The named 32-bit cells of the SCG register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScgRegister {
    /// Clock status register, read-only mirror of the active configuration.
    Csr,
    /// Run mode clock control.
    Rccr,
    /// Very low power run mode clock control.
    Vccr,
    /// High speed run mode clock control.
    Hccr,
    /// System oscillator control/status.
    SoscCsr,
    /// Slow IRC control/status.
    SircCsr,
    /// Fast IRC control/status.
    FircCsr,
    /// System PLL control/status.
    SpllCsr,
}

impl ScgRegister {
    /// Byte offset of this register from the SCG base address.
    pub const fn offset(self) -> usize {
        match self {
            Self::Csr => 0x10,
            Self::Rccr => 0x14,
            Self::Vccr => 0x18,
            Self::Hccr => 0x1c,
            Self::SoscCsr => 0x100,
            Self::SircCsr => 0x200,
            Self::FircCsr => 0x300,
            Self::SpllCsr => 0x600,
        }
    }
}

/// Raw access to the SCG register file.
pub trait ScgRegisters {
    /// Read a register.
    fn read(&mut self, reg: ScgRegister) -> u32;

    /// Write a register.
    fn write(&mut self, reg: ScgRegister, value: u32);
}

/// Layout shared by CSR and the three mode control registers.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq)]
pub struct ModeConfig {
    /// Slow clock divider, divide by value + 1.
    #[bits(4, from = SysClkDiv::from_bits, into = SysClkDiv::into_bits)]
    pub divslow: SysClkDiv,
    /// Bus clock divider, divide by value + 1.
    #[bits(4, from = SysClkDiv::from_bits, into = SysClkDiv::into_bits)]
    pub divbus: SysClkDiv,
    #[bits(8)]
    __: u8,
    /// Core clock divider, divide by value + 1.
    #[bits(4, from = SysClkDiv::from_bits, into = SysClkDiv::into_bits)]
    pub divcore: SysClkDiv,
    #[bits(4)]
    __: u8,
    /// System clock source select.
    #[bits(4, from = ClockSource::from_bits, into = ClockSource::into_bits)]
    pub scs: Result<ClockSource, u8>,
    #[bits(4)]
    __: u8,
}

/// Layout shared by the per-source control/status registers.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq)]
pub struct SourceCsr {
    /// Request the source to power up.
    pub en: bool,
    #[bits(22)]
    __: u32,
    /// Control register lock.
    pub lk: bool,
    /// Source is stable and safe to select.
    #[bits(1, access = RO)]
    pub valid: bool,
    /// Source is driving the system clock.
    #[bits(1, access = RO)]
    pub sel: bool,
    /// Source error flag.
    pub err: bool,
    #[bits(5)]
    __: u8,
}

/// The memory-mapped SCG block.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScgBlock {
    _marker: core::marker::PhantomData<()>,
}

impl ScgBlock {
    /// Base address of the SCG register file.
    pub const BASE: usize = 0x4006_4000;

    /// # Safety
    /// This reads and writes the SCG register file; there must be no
    /// other live accessor of these registers.
    #[inline(always)]
    pub unsafe fn steal() -> Self {
        Self {
            _marker: core::marker::PhantomData,
        }
    }
}

impl ScgRegisters for ScgBlock {
    #[inline(always)]
    fn read(&mut self, reg: ScgRegister) -> u32 {
        // safety: offset() only produces valid SCG register addresses
        unsafe { core::ptr::read_volatile((Self::BASE + reg.offset()) as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, reg: ScgRegister, value: u32) {
        // safety: offset() only produces valid SCG register addresses
        unsafe { core::ptr::write_volatile((Self::BASE + reg.offset()) as *mut u32, value) }
    }
}
