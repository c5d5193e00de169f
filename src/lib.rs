#![no_std]

//! Hardware abstraction layer for the NXP S32K144 system-level clocking
//! and pin peripherals.
//!
//! The drivers in this crate are generic over small register-access
//! traits. Every peripheral has one memory-mapped implementation of its
//! trait, obtained with an unsafe `steal` constructor, and the tests run
//! against in-memory register files instead of hardware.

pub mod gpio;
pub mod pcc;
pub mod scg;
pub mod time;
