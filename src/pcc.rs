//! Peripheral clock control (PCC).
//!
//! One 32-bit control cell per peripheral. Gating is guarded by the
//! read-only presence bit, and a peripheral's functional clock may only
//! be re-selected while its gate is off.

use bitfield_struct::bitfield;

/// An error produced by the PCC driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The peripheral is not present on this device.
    NotPresent,
    /// The operation requires the peripheral's clock gate to be off.
    Enabled,
}

/// Selectable functional clock sources for a peripheral.
///
/// The discriminants are the hardware PCS encodings; each selects the
/// matching source's second async divider output.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeriphClockSel {
    SoscDiv2 = 1,
    SircDiv2 = 2,
    FircDiv2 = 3,
    SpllDiv2 = 6,
}

impl PeriphClockSel {
    pub const fn into_bits(this: Result<Self, u8>) -> u8 {
        match this {
            Ok(v) => v as u8,
            Err(v) => v,
        }
    }

    pub const fn from_bits(v: u8) -> Result<Self, u8> {
        match v {
            1 => Ok(Self::SoscDiv2),
            2 => Ok(Self::SircDiv2),
            3 => Ok(Self::FircDiv2),
            6 => Ok(Self::SpllDiv2),
            _ => Err(v),
        }
    }
}

/// Peripheral clock divider, divide by value + 1.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeriphDiv {
    Div1 = 0,
    Div2,
    Div3,
    Div4,
    Div5,
    Div6,
    Div7,
    Div8,
}

impl PeriphDiv {
    pub const fn into_bits(this: Self) -> u8 {
        this as u8
    }

    pub const fn from_bits(v: u8) -> Self {
        match v & 0x7 {
            0 => Self::Div1,
            1 => Self::Div2,
            2 => Self::Div3,
            3 => Self::Div4,
            4 => Self::Div5,
            5 => Self::Div6,
            6 => Self::Div7,
            _ => Self::Div8,
        }
    }

    /// The effective divide ratio.
    #[inline(always)]
    pub const fn ratio(self) -> u32 {
        self as u32 + 1
    }
}

/// Layout of one PCCn control cell.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq)]
pub struct PeriphControl {
    /// Functional clock divider.
    #[bits(3, from = PeriphDiv::from_bits, into = PeriphDiv::into_bits)]
    pub pcd: PeriphDiv,
    /// Fractional divide (+0.5 on top of the divider).
    pub frac: bool,
    #[bits(20)]
    __: u32,
    /// Functional clock source select.
    #[bits(3, from = PeriphClockSel::from_bits, into = PeriphClockSel::into_bits)]
    pub pcs: Result<PeriphClockSel, u8>,
    #[bits(3)]
    __: u8,
    /// Clock gate control.
    pub cgc: bool,
    /// Peripheral present on this device.
    #[bits(1, access = RO)]
    pub pr: bool,
}

/// Raw access to the PCC register file.
pub trait PccRegisters {
    /// Read a peripheral's control cell.
    fn read(&mut self, periph: Periph) -> u32;

    /// Write a peripheral's control cell.
    fn write(&mut self, periph: Periph, value: u32);
}

/// Gate and functional clock control for individual peripherals.
pub struct Pcc<R> {
    regs: R,
}

impl<R> core::fmt::Debug for Pcc<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Pcc").finish()
    }
}

#[cfg(feature = "defmt")]
impl<R> defmt::Format for Pcc<R> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Pcc");
    }
}

impl Pcc<PccBlock> {
    /// Create the driver over the memory-mapped PCC block.
    ///
    /// # Safety
    /// There must be no other live accessor of the PCC registers.
    #[inline(always)]
    pub unsafe fn steal() -> Self {
        Self::new(PccBlock::steal())
    }
}

impl<R> Pcc<R>
where
    R: PccRegisters,
{
    /// Create the driver from a register file.
    #[inline(always)]
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Release the register file.
    #[inline(always)]
    pub fn release(self) -> R {
        self.regs
    }

    /// Is the peripheral present on this device?
    #[inline]
    pub fn is_present(&mut self, periph: Periph) -> bool {
        PeriphControl::from_bits(self.regs.read(periph)).pr()
    }

    /// Is the peripheral's clock gated on?
    #[inline]
    pub fn is_enabled(&mut self, periph: Periph) -> bool {
        PeriphControl::from_bits(self.regs.read(periph)).cgc()
    }

    /// Gate a peripheral's clock on.
    pub fn enable_clock(&mut self, periph: Periph) -> Result<(), Error> {
        let ctl = PeriphControl::from_bits(self.regs.read(periph));
        if !ctl.pr() {
            return Err(Error::NotPresent);
        }

        self.regs.write(periph, ctl.with_cgc(true).into_bits());
        Ok(())
    }

    /// Gate a peripheral's clock off.
    pub fn disable_clock(&mut self, periph: Periph) -> Result<(), Error> {
        let ctl = PeriphControl::from_bits(self.regs.read(periph));
        if !ctl.pr() {
            return Err(Error::NotPresent);
        }

        self.regs.write(periph, ctl.with_cgc(false).into_bits());
        Ok(())
    }

    /// Select a peripheral's functional clock source and divider.
    ///
    /// `frac` adds half a step on top of the divider, for an effective
    /// divide of `div.ratio() + 0.5`. The hardware only latches these
    /// fields while the gate is off, so an enabled peripheral is
    /// rejected rather than silently ignored.
    pub fn set_clock_config(
        &mut self,
        periph: Periph,
        sel: PeriphClockSel,
        div: PeriphDiv,
        frac: bool,
    ) -> Result<(), Error> {
        let ctl = PeriphControl::from_bits(self.regs.read(periph));
        if !ctl.pr() {
            return Err(Error::NotPresent);
        }
        if ctl.cgc() {
            return Err(Error::Enabled);
        }

        let ctl = ctl.with_pcs(Ok(sel)).with_pcd(div).with_frac(frac);
        self.regs.write(periph, ctl.into_bits());
        Ok(())
    }
}

// one macro pass defines the peripheral set, its cell offsets, and the
// named enable/disable helpers
macro_rules! pcc_periphs {
    {$(($var:ident, $name:ident, $offset:literal)),+ $(,)?} => {
        /// Peripherals with a PCC control cell.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum Periph {
            $($var,)+
        }

        impl Periph {
            /// Byte offset of this peripheral's cell from the PCC base.
            pub const fn offset(self) -> usize {
                match self {
                    $(Self::$var => $offset,)+
                }
            }
        }

        paste::paste! {
            impl<R: PccRegisters> Pcc<R> {
                $(
                    #[inline(always)]
                    #[doc = concat!("Gate the ", stringify!($var), " clock on.")]
                    pub fn [<enable_ $name>](&mut self) -> Result<(), Error> {
                        self.enable_clock(Periph::$var)
                    }

                    #[inline(always)]
                    #[doc = concat!("Gate the ", stringify!($var), " clock off.")]
                    pub fn [<disable_ $name>](&mut self) -> Result<(), Error> {
                        self.disable_clock(Periph::$var)
                    }
                )+
            }
        }
    };
}

pcc_periphs! {
    (Ftfc, ftfc, 0x80),
    (Dmamux, dmamux, 0x84),
    (FlexCan0, flexcan0, 0x90),
    (FlexCan1, flexcan1, 0x94),
    (Ftm3, ftm3, 0x98),
    (Adc1, adc1, 0x9c),
    (FlexCan2, flexcan2, 0xac),
    (Lpspi0, lpspi0, 0xb0),
    (Lpspi1, lpspi1, 0xb4),
    (Lpspi2, lpspi2, 0xb8),
    (Pdb1, pdb1, 0xc4),
    (Crc, crc, 0xc8),
    (Pdb0, pdb0, 0xd8),
    (Lpit, lpit, 0xdc),
    (Ftm0, ftm0, 0xe0),
    (Ftm1, ftm1, 0xe4),
    (Ftm2, ftm2, 0xe8),
    (Adc0, adc0, 0xec),
    (Rtc, rtc, 0xf4),
    (Lptmr0, lptmr0, 0x100),
    (PortA, porta, 0x124),
    (PortB, portb, 0x128),
    (PortC, portc, 0x12c),
    (PortD, portd, 0x130),
    (PortE, porte, 0x134),
    (Sai0, sai0, 0x150),
    (Sai1, sai1, 0x154),
    (FlexIo, flexio, 0x168),
    (Ewm, ewm, 0x184),
    (Lpi2c0, lpi2c0, 0x198),
    (Lpi2c1, lpi2c1, 0x19c),
    (Lpuart0, lpuart0, 0x1a8),
    (Lpuart1, lpuart1, 0x1ac),
    (Lpuart2, lpuart2, 0x1b0),
    (Ftm4, ftm4, 0x1b8),
    (Ftm5, ftm5, 0x1bc),
    (Ftm6, ftm6, 0x1c0),
    (Ftm7, ftm7, 0x1c4),
    (Cmp0, cmp0, 0x1cc),
    (Qspi, qspi, 0x1d8),
    (Enet, enet, 0x1e4),
}

/// The memory-mapped PCC block.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PccBlock {
    _marker: core::marker::PhantomData<()>,
}

impl PccBlock {
    /// Base address of the PCC register file.
    pub const BASE: usize = 0x4006_5000;

    /// # Safety
    /// This reads and writes the PCC register file; there must be no
    /// other live accessor of these registers.
    #[inline(always)]
    pub unsafe fn steal() -> Self {
        Self {
            _marker: core::marker::PhantomData,
        }
    }
}

impl PccRegisters for PccBlock {
    #[inline(always)]
    fn read(&mut self, periph: Periph) -> u32 {
        // safety: offset() only produces valid PCC cell addresses
        unsafe { core::ptr::read_volatile((Self::BASE + periph.offset()) as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, periph: Periph, value: u32) {
        // safety: offset() only produces valid PCC cell addresses
        unsafe { core::ptr::write_volatile((Self::BASE + periph.offset()) as *mut u32, value) }
    }
}
