//! Pin configuration and GPIO data access.
//!
//! A [Pin] pairs a port register seam with one pin index and exposes
//! the per-pin configuration fields (mux, direction, pull, interrupt
//! trigger) plus the data registers, along with the embedded-hal
//! digital traits.

use core::convert::Infallible;

use bitfield_struct::bitfield;
use embedded_hal::digital as hal;

/// The five pin ports.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
}

impl Port {
    const fn from_bits(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::A),
            1 => Some(Self::B),
            2 => Some(Self::C),
            3 => Some(Self::D),
            4 => Some(Self::E),
            _ => None,
        }
    }
}

/// Pins per port.
pub const PINS_PER_PORT: u8 = 18;

/// A packed pin identifier: port in the high byte, pin in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinName {
    port: Port,
    pin: u8,
}

impl PinName {
    /// Name a pin; the pin index must be below [PINS_PER_PORT].
    pub const fn new(port: Port, pin: u8) -> Option<Self> {
        if pin < PINS_PER_PORT {
            Some(Self { port, pin })
        } else {
            None
        }
    }

    /// Decode a packed identifier.
    pub const fn from_bits(bits: u16) -> Option<Self> {
        match Port::from_bits((bits >> 8) as u8) {
            Some(port) => Self::new(port, (bits & 0xff) as u8),
            None => None,
        }
    }

    /// Encode to the packed identifier.
    #[inline(always)]
    pub const fn into_bits(self) -> u16 {
        ((self.port as u16) << 8) | self.pin as u16
    }

    #[inline(always)]
    pub const fn port(self) -> Port {
        self.port
    }

    #[inline(always)]
    pub const fn pin(self) -> u8 {
        self.pin
    }
}

/// Pin function selection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mux {
    /// Pin disabled, analog use.
    Disabled = 0,
    /// General purpose input/output.
    Gpio = 1,
    Alt2 = 2,
    Alt3 = 3,
    Alt4 = 4,
    Alt5 = 5,
    Alt6 = 6,
    Alt7 = 7,
}

impl Mux {
    pub const fn into_bits(this: Self) -> u8 {
        this as u8
    }

    pub const fn from_bits(v: u8) -> Self {
        match v & 0x7 {
            0 => Self::Disabled,
            1 => Self::Gpio,
            2 => Self::Alt2,
            3 => Self::Alt3,
            4 => Self::Alt4,
            5 => Self::Alt5,
            6 => Self::Alt6,
            _ => Self::Alt7,
        }
    }
}

/// Internal pull resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Floating,
    PullUp,
    PullDown,
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

/// Interrupt/DMA trigger condition, the IRQC field encodings.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Disabled = 0,
    DmaRisingEdge = 1,
    DmaFallingEdge = 2,
    DmaEitherEdge = 3,
    LogicZero = 8,
    RisingEdge = 9,
    FallingEdge = 10,
    EitherEdge = 11,
    LogicOne = 12,
}

impl Trigger {
    pub const fn into_bits(this: Result<Self, u8>) -> u8 {
        match this {
            Ok(v) => v as u8,
            Err(v) => v,
        }
    }

    pub const fn from_bits(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::DmaRisingEdge),
            2 => Ok(Self::DmaFallingEdge),
            3 => Ok(Self::DmaEitherEdge),
            8 => Ok(Self::LogicZero),
            9 => Ok(Self::RisingEdge),
            10 => Ok(Self::FallingEdge),
            11 => Ok(Self::EitherEdge),
            12 => Ok(Self::LogicOne),
            _ => Err(v),
        }
    }
}

/// Layout of one pin control register (PCR).
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq)]
pub struct PinControl {
    /// Pull select: up when set, down when clear.
    pub ps: bool,
    /// Pull enable.
    pub pe: bool,
    #[bits(2)]
    __: u8,
    /// Passive filter enable.
    pub pfe: bool,
    __: bool,
    /// High drive strength.
    pub dse: bool,
    __: bool,
    /// Pin function.
    #[bits(3, from = Mux::from_bits, into = Mux::into_bits)]
    pub mux: Mux,
    #[bits(4)]
    __: u8,
    /// Configuration lock.
    pub lk: bool,
    /// Interrupt/DMA trigger.
    #[bits(4, from = Trigger::from_bits, into = Trigger::into_bits)]
    pub irqc: Result<Trigger, u8>,
    #[bits(4)]
    __: u8,
    /// Interrupt status flag, write one to clear.
    pub isf: bool,
    #[bits(7)]
    __: u8,
}

/// The port-wide GPIO data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRegister {
    /// Output data.
    Pdor,
    /// Set output, write-only.
    Psor,
    /// Clear output, write-only.
    Pcor,
    /// Toggle output, write-only.
    Ptor,
    /// Input data, read-only.
    Pdir,
    /// Data direction.
    Pddr,
}

impl DataRegister {
    /// Byte offset of this register from the GPIO port base.
    pub const fn offset(self) -> usize {
        match self {
            Self::Pdor => 0x00,
            Self::Psor => 0x04,
            Self::Pcor => 0x08,
            Self::Ptor => 0x0c,
            Self::Pdir => 0x10,
            Self::Pddr => 0x14,
        }
    }
}

/// Raw access to one port's PCR and GPIO registers.
pub trait PortRegisters {
    /// Read a pin's control register.
    fn read_pcr(&mut self, pin: u8) -> u32;

    /// Write a pin's control register.
    fn write_pcr(&mut self, pin: u8, value: u32);

    /// Read a port-wide data register.
    fn read_data(&mut self, reg: DataRegister) -> u32;

    /// Write a port-wide data register.
    fn write_data(&mut self, reg: DataRegister, value: u32);
}

/// One pin of one port.
pub struct Pin<R> {
    regs: R,
    pin: u8,
}

impl<R> core::fmt::Debug for Pin<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_tuple("Pin").field(&self.pin).finish()
    }
}

#[cfg(feature = "defmt")]
impl<R> defmt::Format for Pin<R> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Pin({})", self.pin);
    }
}

impl Pin<PortBlock> {
    /// Create a pin over the memory-mapped port registers.
    ///
    /// # Safety
    /// There must be no other live accessor of this pin's PCR or of
    /// this pin's bit in the port's data registers. The port-wide SCG
    /// and PCC setup must already have gated the port clock on.
    #[inline(always)]
    pub unsafe fn steal(name: PinName) -> Self {
        Self::new(PortBlock::steal(name.port()), name.pin())
    }
}

impl<R> Pin<R>
where
    R: PortRegisters,
{
    /// Create a pin from a port register file and a pin index.
    ///
    /// Panics if `pin` is not a valid index for the port.
    #[inline(always)]
    pub fn new(regs: R, pin: u8) -> Self {
        assert!(pin < PINS_PER_PORT);
        Self { regs, pin }
    }

    /// Release the port register file.
    #[inline(always)]
    pub fn release(self) -> R {
        self.regs
    }

    #[inline(always)]
    fn mask(&self) -> u32 {
        1 << self.pin
    }

    fn modify_pcr(&mut self, f: impl FnOnce(PinControl) -> PinControl) {
        let value = PinControl::from_bits(self.regs.read_pcr(self.pin));
        self.regs.write_pcr(self.pin, f(value).into_bits());
    }

    /// Select the pin function.
    pub fn set_mux(&mut self, mux: Mux) {
        self.modify_pcr(|pcr| pcr.with_mux(mux));
    }

    /// Select the internal pull resistor.
    pub fn set_pull(&mut self, pull: Pull) {
        self.modify_pcr(|pcr| match pull {
            Pull::Floating => pcr.with_pe(false),
            Pull::PullUp => pcr.with_pe(true).with_ps(true),
            Pull::PullDown => pcr.with_pe(true).with_ps(false),
        });
    }

    /// Select the interrupt/DMA trigger condition.
    pub fn set_trigger(&mut self, trigger: Trigger) {
        self.modify_pcr(|pcr| pcr.with_irqc(Ok(trigger)));
    }

    /// Clear the pin's pending interrupt flag.
    pub fn clear_interrupt_flag(&mut self) {
        self.modify_pcr(|pcr| pcr.with_isf(true));
    }

    /// Set the data direction.
    pub fn set_direction(&mut self, direction: Direction) {
        let pddr = self.regs.read_data(DataRegister::Pddr);
        let pddr = match direction {
            Direction::Input => pddr & !self.mask(),
            Direction::Output => pddr | self.mask(),
        };
        self.regs.write_data(DataRegister::Pddr, pddr);
    }

    /// Drive the output high.
    #[inline]
    pub fn set_high(&mut self) {
        self.regs.write_data(DataRegister::Psor, self.mask());
    }

    /// Drive the output low.
    #[inline]
    pub fn set_low(&mut self) {
        self.regs.write_data(DataRegister::Pcor, self.mask());
    }

    /// Drive the output to a state.
    #[inline]
    pub fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Toggle the output.
    #[inline]
    pub fn toggle(&mut self) {
        self.regs.write_data(DataRegister::Ptor, self.mask());
    }

    /// Is the input high?
    #[inline]
    pub fn is_high(&mut self) -> bool {
        self.regs.read_data(DataRegister::Pdir) & self.mask() != 0
    }

    /// Is the input low?
    #[inline]
    pub fn is_low(&mut self) -> bool {
        !self.is_high()
    }

    /// Is the output set high?
    #[inline]
    pub fn is_set_high(&mut self) -> bool {
        self.regs.read_data(DataRegister::Pdor) & self.mask() != 0
    }

    /// Is the output set low?
    #[inline]
    pub fn is_set_low(&mut self) -> bool {
        !self.is_set_high()
    }
}

impl<R> hal::ErrorType for Pin<R>
where
    R: PortRegisters,
{
    type Error = Infallible;
}

impl<R> hal::InputPin for Pin<R>
where
    R: PortRegisters,
{
    #[inline(always)]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self))
    }

    #[inline(always)]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self))
    }
}

impl<R> hal::OutputPin for Pin<R>
where
    R: PortRegisters,
{
    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self);
        Ok(())
    }

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self);
        Ok(())
    }
}

impl<R> hal::StatefulOutputPin for Pin<R>
where
    R: PortRegisters,
{
    #[inline(always)]
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_high(self))
    }

    #[inline(always)]
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_low(self))
    }

    #[inline(always)]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        Pin::toggle(self);
        Ok(())
    }
}

/// The memory-mapped registers of one port.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortBlock {
    port: Port,
}

impl PortBlock {
    /// # Safety
    /// This reads and writes the port's PCR and GPIO registers; there
    /// must be no other live accessor of them.
    #[inline(always)]
    pub unsafe fn steal(port: Port) -> Self {
        Self { port }
    }

    const fn pcr_base(&self) -> usize {
        match self.port {
            Port::A => 0x4004_9000,
            Port::B => 0x4004_a000,
            Port::C => 0x4004_b000,
            Port::D => 0x4004_c000,
            Port::E => 0x4004_d000,
        }
    }

    const fn gpio_base(&self) -> usize {
        match self.port {
            Port::A => 0x400f_f000,
            Port::B => 0x400f_f040,
            Port::C => 0x400f_f080,
            Port::D => 0x400f_f0c0,
            Port::E => 0x400f_f100,
        }
    }
}

impl PortRegisters for PortBlock {
    #[inline(always)]
    fn read_pcr(&mut self, pin: u8) -> u32 {
        // safety: pin indices stay within the port's PCR array
        unsafe { core::ptr::read_volatile((self.pcr_base() + 4 * pin as usize) as *const u32) }
    }

    #[inline(always)]
    fn write_pcr(&mut self, pin: u8, value: u32) {
        // safety: pin indices stay within the port's PCR array
        unsafe {
            core::ptr::write_volatile((self.pcr_base() + 4 * pin as usize) as *mut u32, value)
        }
    }

    #[inline(always)]
    fn read_data(&mut self, reg: DataRegister) -> u32 {
        // safety: offset() only produces valid GPIO register addresses
        unsafe { core::ptr::read_volatile((self.gpio_base() + reg.offset()) as *const u32) }
    }

    #[inline(always)]
    fn write_data(&mut self, reg: DataRegister, value: u32) {
        // safety: offset() only produces valid GPIO register addresses
        unsafe { core::ptr::write_volatile((self.gpio_base() + reg.offset()) as *mut u32, value) }
    }
}
