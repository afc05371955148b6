use crate::lcd::hd44780::config::BusTiming;
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::port::{BusWidth, LcdLine, LcdPort};
use crate::lcd::hd44780::{LcdError, LcdResult};
use log::{debug, error, trace};
use std::fmt::{Debug, Formatter};

/// Called on every poll that still finds the controller busy.
pub type YieldHook = Box<dyn FnMut()>;
/// Called with every failure before it's returned.
pub type ErrorHook = Box<dyn FnMut(&LcdError)>;

/// Bus transaction engine: moves bytes over an [LcdPort] and polls the busy flag.
pub struct GpioHD44780Driver<P: LcdPort> {
    port: P,
    timing: BusTiming,
    yield_hook: Option<YieldHook>,
    error_hook: Option<ErrorHook>,
}

impl<P: LcdPort> GpioHD44780Driver<P> {
    pub fn new(port: P, timing: BusTiming) -> Self {
        GpioHD44780Driver {
            port,
            timing,
            yield_hook: None,
            error_hook: None,
        }
    }

    /// Sets what to do between busy polls, e.g. `std::thread::yield_now`.
    ///
    /// Without a hook the engine polls back to back.
    pub fn set_yield_hook(&mut self, hook: impl FnMut() + 'static) {
        self.yield_hook = Some(Box::new(hook));
    }

    /// Sets a hook that sees every failure, e.g. to flag the display for re-initialization.
    pub fn set_error_hook(&mut self, hook: impl FnMut(&LcdError) + 'static) {
        self.error_hook = Some(Box::new(hook));
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    pub fn bus_width(&self) -> BusWidth {
        self.port.bus_width()
    }

    /// Puts the bus into its idle state: data lines released, data register, read mode, enable high.
    pub fn idle(&mut self) -> LcdResult<()> {
        self.port.release_data_lines()?;
        self.port.set_output(LcdLine::Rs, true)?;
        self.port.set_output(LcdLine::Rw, true)?;
        self.port.set_output(LcdLine::En, true)?;
        Ok(())
    }

    /// Polls the busy flag until it clears, at most `max_poll` times.
    ///
    /// Returns the address counter of the first non-busy status.
    ///
    /// # Errors
    /// - `LcdError::BusTimeout` after exactly `max_poll` busy reads.
    pub fn poll_until_ready(&mut self) -> LcdResult<u8> {
        let result = self.poll();
        self.check(result)
    }

    fn poll(&mut self) -> LcdResult<u8> {
        for _ in 0..self.timing.max_poll {
            let status = self.read(false)?;
            if status & 0b10000000 == 0 {
                return Ok(status & 0b01111111);
            }
            if let Some(hook) = self.yield_hook.as_mut() {
                hook();
            }
        }
        error!("Display still busy after {} polls", self.timing.max_poll);
        Err(LcdError::BusTimeout { retries: self.timing.max_poll })
    }

    fn check<T>(&mut self, result: LcdResult<T>) -> LcdResult<T> {
        if let Err(err) = &result {
            self.report_error(err);
        }
        result
    }

    /// One write strobe with `value` on the wired data lines.
    fn strobe_write(&mut self, value: u8) -> LcdResult<()> {
        let wait = self.timing.clock_wait_us;
        self.port.set_output(LcdLine::Rw, false)?;
        self.port.write_data_lines(value)?;
        self.port.delay_us(wait);
        self.port.set_output(LcdLine::En, true)?;
        self.port.delay_us(wait);
        self.port.set_output(LcdLine::En, false)?;
        self.port.delay_us(wait);
        Ok(())
    }

    /// One read strobe, sampling the wired data lines while enable is high.
    fn strobe_read(&mut self) -> LcdResult<u8> {
        let wait = self.timing.clock_wait_us;
        self.port.delay_us(wait);
        self.port.set_output(LcdLine::En, true)?;
        self.port.delay_us(wait);
        let value = self.port.read_data_lines()?;
        self.port.set_output(LcdLine::En, false)?;
        self.port.delay_us(wait);
        Ok(value)
    }

    fn write(&mut self, data: u8, rs: bool) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);
        self.port.set_output(LcdLine::Rs, rs)?;
        match self.bus_width() {
            BusWidth::Eight => self.strobe_write(data)?,
            BusWidth::Four => {
                trace!("Writing HN: {:04b}", data >> 4);
                self.strobe_write(data >> 4)?;
                trace!("Writing LN: {:04b}", data & 0x0F);
                self.strobe_write(data & 0x0F)?;
            }
        }
        Ok(())
    }

    fn send(&mut self, data: u8, rs: bool) -> LcdResult<u8> {
        let result = self.write(data, rs);
        self.check(result)?;
        self.poll_until_ready()
    }

    fn read(&mut self, rs: bool) -> LcdResult<u8> {
        self.port.release_data_lines()?;
        self.port.set_output(LcdLine::Rs, rs)?;
        self.port.set_output(LcdLine::Rw, true)?;
        let data = match self.bus_width() {
            BusWidth::Eight => self.strobe_read()?,
            BusWidth::Four => {
                let high_nibble = self.strobe_read()?;
                let low_nibble = self.strobe_read()?;
                (high_nibble << 4) | (low_nibble & 0x0F)
            }
        };
        trace!("Read data: {:08b}, RS: {}", data, rs);
        Ok(data)
    }

    fn handshake(&mut self) -> LcdResult<()> {
        let init_wait = self.timing.init_wait_ms;
        let eight_bit = self.bus_width() == BusWidth::Eight;
        debug!("Negotiating {} bus", self.bus_width());

        self.idle()?;
        self.port.delay_ms(init_wait);
        self.port.set_output(LcdLine::Rs, false)?;

        // Three times "8-bit" brings the controller into a known state, whatever it was doing.
        let sync = if eight_bit { 0b00110000 } else { 0b0011 };
        for _ in 0..3 {
            self.strobe_write(sync)?;
            self.port.delay_ms(init_wait);
        }
        if !eight_bit {
            // Still read as an 8-bit instruction, so a single nibble switches to 4-bit.
            self.strobe_write(0b0010)?;
        }
        Ok(())
    }
}

impl<P: LcdPort> Debug for GpioHD44780Driver<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpioHD44780Driver")
            .field("port", &self.port)
            .field("timing", &self.timing)
            .field("yield_hook", &self.yield_hook.is_some())
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}

impl<P: LcdPort> HD44780Driver for GpioHD44780Driver<P> {
    fn init(&mut self, two_lines: bool) -> LcdResult<u8> {
        let result = self.handshake();
        self.check(result)?;
        self.function_set(self.bus_width() == BusWidth::Eight, two_lines, false)
    }

    fn report_error(&mut self, err: &LcdError) {
        if let Some(hook) = self.error_hook.as_mut() {
            hook(err);
        }
    }

    fn send_command(&mut self, command: u8) -> LcdResult<u8> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> LcdResult<u8> {
        self.send(data, true)
    }

    fn read_command(&mut self) -> LcdResult<u8> {
        let result = self.read(false);
        self.check(result)
    }

    fn read_data(&mut self) -> LcdResult<u8> {
        let result = self.read(true);
        self.check(result)
    }
}
