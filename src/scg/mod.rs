//! System clock generator (SCG) driver.
//!
//! This is boot-time code: it runs before any timer or interrupt
//! infrastructure exists, so every wait in here is a busy poll bounded
//! by a fixed iteration count rather than by wall-clock time.

use crate::time::Hertz;

mod config;
pub use config::*;

pub mod registers;
pub use registers::{ModeConfig, ScgBlock, ScgRegister, ScgRegisters, SourceCsr};

/// Iteration bound shared by every polling loop in this module.
///
/// This counts register reads, not elapsed time; the wall-clock
/// duration of a timeout varies with the CPU clock.
pub const VALID_POLL_LIMIT: u32 = 1_000_000;

/// An error produced by the SCG driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A mode or decoded hardware field outside the defined set.
    InvalidParameter,
    /// A bounded poll exhausted its iteration budget.
    Timeout,
    /// The active source never matched the requested one. Bound
    /// exhaustion and genuine mismatch are not distinguished.
    SwitchIncomplete,
}

/// Produce a mode register value with the source select and the three
/// domain dividers replaced by `config`'s values.
///
/// Pure function. All bits of `snapshot` outside those four fields are
/// preserved.
#[inline]
pub fn assemble(snapshot: u32, config: &ClockConfig) -> ModeConfig {
    ModeConfig::from_bits(snapshot)
        .with_scs(Ok(config.source))
        .with_divcore(config.div_core)
        .with_divbus(config.div_bus)
        .with_divslow(config.div_slow)
}

/// The system clock generator.
pub struct Scg<R> {
    regs: R,
}

impl<R> core::fmt::Debug for Scg<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Scg").finish()
    }
}

#[cfg(feature = "defmt")]
impl<R> defmt::Format for Scg<R> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Scg");
    }
}

impl Scg<ScgBlock> {
    /// Create the driver over the memory-mapped SCG block.
    ///
    /// # Safety
    /// There must be no other live accessor of the SCG registers.
    #[inline(always)]
    pub unsafe fn steal() -> Self {
        Self::new(ScgBlock::steal())
    }
}

impl<R> Scg<R>
where
    R: ScgRegisters,
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

    /// Power up a clock source and wait for it to become valid.
    ///
    /// Sets the enable bit in the source's control/status register,
    /// then polls the valid bit up to [VALID_POLL_LIMIT] times.
    pub fn enable_source(&mut self, source: ClockSource) -> Result<(), Error> {
        let csr = source.csr();
        let value = SourceCsr::from_bits(self.regs.read(csr)).with_en(true);
        self.regs.write(csr, value.into_bits());

        self.wait_source_valid(source)
    }

    /// Wait for an already-enabled source to report valid.
    pub fn wait_source_valid(&mut self, source: ClockSource) -> Result<(), Error> {
        let csr = source.csr();
        for _ in 0..VALID_POLL_LIMIT {
            if SourceCsr::from_bits(self.regs.read(csr)).valid() {
                return Ok(());
            }
        }

        Err(Error::Timeout)
    }

    /// Write an assembled value to a run mode's clock control register.
    ///
    /// The value is written verbatim; validating its fields is the
    /// caller's job. [RunMode::None] is rejected without any write.
    pub fn commit(&mut self, mode: RunMode, value: ModeConfig) -> Result<(), Error> {
        let reg = mode.register().ok_or(Error::InvalidParameter)?;
        self.regs.write(reg, value.into_bits());
        Ok(())
    }

    /// Wait for the active source reported by CSR to match `expected`.
    pub fn verify_switch(&mut self, expected: ClockSource) -> Result<(), Error> {
        for _ in 0..VALID_POLL_LIMIT {
            let csr = ModeConfig::from_bits(self.regs.read(ScgRegister::Csr));
            if csr.scs() == Ok(expected) {
                return Ok(());
            }
        }

        Err(Error::SwitchIncomplete)
    }

    /// Commit a complete clock configuration and confirm the switch.
    ///
    /// The source must already be enabled; this waits for it to report
    /// valid and aborts without touching the mode register if it never
    /// does. On success the mode register holds the assembled value and
    /// CSR reports the requested source as active.
    pub fn set_system_clock_config(&mut self, config: &ClockConfig) -> Result<(), Error> {
        let reg = config.mode.register().ok_or(Error::InvalidParameter)?;

        self.wait_source_valid(config.source)?;

        let snapshot = self.regs.read(reg);
        let value = assemble(snapshot, config);
        self.commit(config.mode, value)?;

        self.verify_switch(config.source)
    }

    /// Enable a configuration's source, then commit and confirm it.
    ///
    /// This is the entry point for the [ClockConfig] presets.
    pub fn apply(&mut self, config: &ClockConfig) -> Result<(), Error> {
        self.enable_source(config.source)?;
        self.set_system_clock_config(config)
    }

    /// The core clock rate, from the live CSR and nominal source rates.
    pub fn core_clock(&mut self, freqs: &SourceFreqs) -> Result<Hertz, Error> {
        let csr = ModeConfig::from_bits(self.regs.read(ScgRegister::Csr));
        let source = csr.scs().map_err(|_| Error::InvalidParameter)?;
        Ok(freqs.of(source) / csr.divcore().ratio())
    }

    /// The bus clock rate, derived from the core clock.
    pub fn bus_clock(&mut self, freqs: &SourceFreqs) -> Result<Hertz, Error> {
        let csr = ModeConfig::from_bits(self.regs.read(ScgRegister::Csr));
        let source = csr.scs().map_err(|_| Error::InvalidParameter)?;
        Ok(freqs.of(source) / csr.divcore().ratio() / csr.divbus().ratio())
    }

    /// The slow clock rate, derived from the core clock.
    pub fn slow_clock(&mut self, freqs: &SourceFreqs) -> Result<Hertz, Error> {
        let csr = ModeConfig::from_bits(self.regs.read(ScgRegister::Csr));
        let source = csr.scs().map_err(|_| Error::InvalidParameter)?;
        Ok(freqs.of(source) / csr.divcore().ratio() / csr.divslow().ratio())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Access {
        Read(ScgRegister),
        Write(ScgRegister, u32),
    }

    /// In-memory SCG register file recording its access trace.
    ///
    /// Only the first few accesses are kept verbatim; polling loops are
    /// followed through the read and write counters.
    struct FakeScg {
        cells: [u32; 8],
        trace: [Option<Access>; 16],
        traced: usize,
        reads: u32,
        writes: u32,
        /// Assert the valid bit of this register once it has been read
        /// this many times.
        valid_after: Option<(ScgRegister, u32)>,
    }

    const VALID_BIT: u32 = 1 << 24;

    fn index(reg: ScgRegister) -> usize {
        match reg {
            ScgRegister::Csr => 0,
            ScgRegister::Rccr => 1,
            ScgRegister::Vccr => 2,
            ScgRegister::Hccr => 3,
            ScgRegister::SoscCsr => 4,
            ScgRegister::SircCsr => 5,
            ScgRegister::FircCsr => 6,
            ScgRegister::SpllCsr => 7,
        }
    }

    impl FakeScg {
        fn new() -> Self {
            Self {
                cells: [0; 8],
                trace: [None; 16],
                traced: 0,
                reads: 0,
                writes: 0,
                valid_after: None,
            }
        }

        fn set(mut self, reg: ScgRegister, value: u32) -> Self {
            self.cells[index(reg)] = value;
            self
        }

        fn valid_after(mut self, reg: ScgRegister, reads: u32) -> Self {
            self.valid_after = Some((reg, reads));
            self
        }

        fn record(&mut self, access: Access) {
            if self.traced < self.trace.len() {
                self.trace[self.traced] = Some(access);
                self.traced += 1;
            }
        }

        fn get(&self, reg: ScgRegister) -> u32 {
            self.cells[index(reg)]
        }
    }

    impl ScgRegisters for FakeScg {
        fn read(&mut self, reg: ScgRegister) -> u32 {
            self.reads += 1;
            if let Some((target, after)) = self.valid_after {
                if target == reg && self.reads >= after {
                    self.cells[index(reg)] |= VALID_BIT;
                }
            }
            self.record(Access::Read(reg));
            self.cells[index(reg)]
        }

        fn write(&mut self, reg: ScgRegister, value: u32) {
            self.writes += 1;
            self.record(Access::Write(reg, value));
            self.cells[index(reg)] = value;
        }
    }

    const ALL_SOURCES: [ClockSource; 4] = [
        ClockSource::SystemOscillator,
        ClockSource::SlowIrc,
        ClockSource::FastIrc,
        ClockSource::SystemPll,
    ];

    #[test]
    fn enable_writes_before_polling() {
        for source in ALL_SOURCES {
            let csr = source.csr();
            let mut scg = Scg::new(FakeScg::new().set(csr, VALID_BIT));

            scg.enable_source(source).unwrap();

            let fake = scg.release();
            // one read-modify-write of the enable bit, then polling reads
            assert_eq!(Some(Access::Read(csr)), fake.trace[0]);
            assert_eq!(Some(Access::Write(csr, VALID_BIT | 1)), fake.trace[1]);
            assert_eq!(Some(Access::Read(csr)), fake.trace[2]);
            assert_eq!(1, fake.writes);
        }
    }

    #[test]
    fn enable_times_out_at_bound() {
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::Timeout),
            scg.enable_source(ClockSource::SystemOscillator)
        );

        let fake = scg.release();
        // the modify read plus exactly the polling budget
        assert_eq!(VALID_POLL_LIMIT + 1, fake.reads);
        // the enable bit stays set even on timeout
        assert_eq!(1, fake.get(ScgRegister::SoscCsr));
    }

    #[test]
    fn enable_sees_late_valid() {
        let fake = FakeScg::new().valid_after(ScgRegister::FircCsr, 500);
        let mut scg = Scg::new(fake);

        scg.enable_source(ClockSource::FastIrc).unwrap();
        assert_eq!(500, scg.release().reads);
    }

    #[test]
    fn assemble_is_deterministic() {
        let config = ClockConfig::HSRUN_SPLL_112MHZ;
        assert_eq!(
            assemble(0xdead_beef, &config),
            assemble(0xdead_beef, &config)
        );
    }

    #[test]
    fn assemble_preserves_unrelated_bits() {
        // everything outside SCS, DIVCORE, DIVBUS and DIVSLOW
        const FIELDS: u32 = 0x0f0f_00ff;

        let config = ClockConfig::VLPR_SIRC_4MHZ;
        for snapshot in [0, 0xffff_ffff, 0xa5a5_a5a5, 0x1234_5678] {
            let value = assemble(snapshot, &config).into_bits();
            assert_eq!(snapshot & !FIELDS, value & !FIELDS);
        }
    }

    #[test]
    fn assemble_firc_run_literal() {
        let value = assemble(0, &ClockConfig::RUN_FIRC_48MHZ);
        assert_eq!(0x0300_0001, value.into_bits());
        assert_eq!(Ok(ClockSource::FastIrc), value.scs());
        assert_eq!(SysClkDiv::Div1, value.divcore());
        assert_eq!(SysClkDiv::Div1, value.divbus());
        assert_eq!(SysClkDiv::Div2, value.divslow());
    }

    #[test]
    fn preset_encodings() {
        let cases = [
            (ClockConfig::RUN_FIRC_48MHZ, ClockSource::FastIrc, 0, 0, 1),
            (ClockConfig::RUN_SPLL_80MHZ, ClockSource::SystemPll, 1, 1, 2),
            (ClockConfig::RUN_SPLL_64MHZ, ClockSource::SystemPll, 1, 1, 2),
            (ClockConfig::HSRUN_SPLL_112MHZ, ClockSource::SystemPll, 0, 1, 3),
            (ClockConfig::HSRUN_SPLL_80MHZ, ClockSource::SystemPll, 1, 1, 2),
            (ClockConfig::VLPR_SIRC_4MHZ, ClockSource::SlowIrc, 1, 0, 3),
        ];

        for (config, source, core, bus, slow) in cases {
            let value = assemble(0, &config);
            assert_eq!(Ok(source), value.scs());
            assert_eq!(core, SysClkDiv::into_bits(value.divcore()));
            assert_eq!(bus, SysClkDiv::into_bits(value.divbus()));
            assert_eq!(slow, SysClkDiv::into_bits(value.divslow()));
        }
    }

    #[test]
    fn commit_rejects_none_mode() {
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::InvalidParameter),
            scg.commit(RunMode::None, ModeConfig::new())
        );
        assert_eq!(0, scg.release().writes);
    }

    #[test]
    fn commit_writes_verbatim() {
        let mut scg = Scg::new(FakeScg::new());

        scg.commit(RunMode::Run, ModeConfig::from_bits(0xffff_ffff))
            .unwrap();

        let fake = scg.release();
        assert_eq!(0xffff_ffff, fake.get(ScgRegister::Rccr));
        assert_eq!(1, fake.writes);
    }

    #[test]
    fn verify_terminates_within_bound() {
        // CSR never changes from reset
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::SwitchIncomplete),
            scg.verify_switch(ClockSource::SystemPll)
        );
        assert_eq!(VALID_POLL_LIMIT, scg.release().reads);
    }

    #[test]
    fn configure_rejects_none_mode_untouched() {
        let config = ClockConfig {
            mode: RunMode::None,
            ..ClockConfig::RUN_FIRC_48MHZ
        };
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::InvalidParameter),
            scg.set_system_clock_config(&config)
        );

        let fake = scg.release();
        assert_eq!(0, fake.reads);
        assert_eq!(0, fake.writes);
    }

    #[test]
    fn configure_aborts_before_commit_on_invalid_source() {
        // FIRC never reports valid; the mode register must stay untouched
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::Timeout),
            scg.set_system_clock_config(&ClockConfig::RUN_FIRC_48MHZ)
        );

        let fake = scg.release();
        assert_eq!(0, fake.writes);
        assert_eq!(0, fake.get(ScgRegister::Rccr));
    }

    #[test]
    fn configure_commits_and_verifies() {
        let fake = FakeScg::new()
            .set(ScgRegister::FircCsr, VALID_BIT | 1)
            // hardware reports the switch as already complete
            .set(ScgRegister::Csr, 0x0300_0001)
            // stale bits outside the four fields must survive
            .set(ScgRegister::Rccr, 0xf0f0_ff00);
        let mut scg = Scg::new(fake);

        scg.set_system_clock_config(&ClockConfig::RUN_FIRC_48MHZ)
            .unwrap();

        let fake = scg.release();
        assert_eq!(0xf3f0_ff01, fake.get(ScgRegister::Rccr));
        assert_eq!(1, fake.writes);
    }

    #[test]
    fn apply_enables_the_source_first() {
        let fake = FakeScg::new()
            .valid_after(ScgRegister::SpllCsr, 2)
            .set(ScgRegister::Csr, 0x0600_0000);
        let mut scg = Scg::new(fake);

        scg.apply(&ClockConfig::HSRUN_SPLL_112MHZ).unwrap();

        let fake = scg.release();
        assert_eq!(Some(Access::Read(ScgRegister::SpllCsr)), fake.trace[0]);
        assert!(matches!(
            fake.trace[1],
            Some(Access::Write(ScgRegister::SpllCsr, _))
        ));
        assert_eq!(0x0600_0013, fake.get(ScgRegister::Hccr));
    }

    #[test]
    fn apply_stops_on_enable_failure() {
        // source never becomes valid
        let mut scg = Scg::new(FakeScg::new());

        assert_eq!(
            Err(Error::Timeout),
            scg.apply(&ClockConfig::VLPR_SIRC_4MHZ)
        );

        let fake = scg.release();
        // only the enable read-modify-write reached the hardware
        assert_eq!(1, fake.writes);
        assert_eq!(0, fake.get(ScgRegister::Vccr));
    }

    #[test]
    fn clock_queries_follow_csr() {
        let freqs = SourceFreqs::new(Hertz::MHz(8), Hertz::MHz(160));

        // FIRC, divcore 1, divbus 1, divslow 2
        let mut scg = Scg::new(FakeScg::new().set(ScgRegister::Csr, 0x0300_0001));
        assert_eq!(Ok(Hertz::MHz(48)), scg.core_clock(&freqs));
        assert_eq!(Ok(Hertz::MHz(48)), scg.bus_clock(&freqs));
        assert_eq!(Ok(Hertz::MHz(24)), scg.slow_clock(&freqs));

        // SPLL, divcore 2, divbus 2, divslow 3
        let mut scg = Scg::new(FakeScg::new().set(ScgRegister::Csr, 0x0601_0012));
        assert_eq!(Ok(Hertz::MHz(80)), scg.core_clock(&freqs));
        assert_eq!(Ok(Hertz::MHz(40)), scg.bus_clock(&freqs));
        assert_eq!(Ok(Hertz::from_raw(26_666_666)), scg.slow_clock(&freqs));
    }

    #[test]
    fn clock_queries_reject_undecodable_source() {
        let freqs = SourceFreqs::new(Hertz::MHz(8), Hertz::MHz(160));
        let mut scg = Scg::new(FakeScg::new().set(ScgRegister::Csr, 0x0500_0000));

        assert_eq!(Err(Error::InvalidParameter), scg.core_clock(&freqs));
        assert_eq!(Err(Error::InvalidParameter), scg.bus_clock(&freqs));
    }
}
