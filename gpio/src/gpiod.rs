//! GpiodDriver implementation for driving GPIO lines through the Linux GPIO character device.
//!
//! Each [GpioLine] handed out by the driver re-requests its line whenever the direction changes,
//! since libgpiod fixes the direction of a line request when it is made.
use crate::{GpioDriver, GpioError, GpioLine, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO lines.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            chip,
            used_pins: bits,
        }
    }

    /// Opens the GPIO chip at the given device path, e.g. `/dev/gpiochip0`.
    pub fn open(path: &str) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path)?))
    }

    fn request_input(&self, index: usize) -> GpioResult<gpiod::Lines<gpiod::Input>> {
        let line = self.chip.request_lines(
            gpiod::Options::input([index as u32]).consumer(env!("CARGO_PKG_NAME")),
        )?;
        Ok(line)
    }

    fn request_output(&self, index: usize) -> GpioResult<gpiod::Lines<gpiod::Output>> {
        let line = self.chip.request_lines(
            gpiod::Options::output([index as u32]).consumer(env!("CARGO_PKG_NAME")),
        )?;
        Ok(line)
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_line(&self, index: usize) -> GpioResult<Box<dyn GpioLine + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(GpiodLine {
            driver: self,
            index,
            state: LineState::Released,
        }))
    }
}

enum LineState {
    /// Not requested from the kernel yet.
    Released,
    Input(gpiod::Lines<gpiod::Input>),
    /// The level is cached so reading back an output does not need a second request.
    Output(gpiod::Lines<gpiod::Output>, bool),
}

struct GpiodLine<'a> {
    driver: &'a GpiodDriver,
    index: usize,
    state: LineState,
}

impl Debug for GpiodLine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let direction = match self.state {
            LineState::Released => "released",
            LineState::Input(_) => "input",
            LineState::Output(_, _) => "output",
        };
        write!(f, "{:?}[{}][{}]", self.driver, self.index, direction)
    }
}

impl GpioLine for GpiodLine<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn set_output(&mut self, level: bool) -> GpioResult<()> {
        if let LineState::Output(line, current) = &mut self.state {
            line.set_values([level])?;
            *current = level;
            return Ok(());
        }

        trace!("Line {} -> output", self.index);
        // The old request has to be released before the line can be requested again.
        self.state = LineState::Released;
        let line = self.driver.request_output(self.index)?;
        line.set_values([level])?;
        self.state = LineState::Output(line, level);
        Ok(())
    }

    fn set_input(&mut self) -> GpioResult<()> {
        if let LineState::Input(_) = self.state {
            return Ok(());
        }

        trace!("Line {} -> input", self.index);
        self.state = LineState::Released;
        let line = self.driver.request_input(self.index)?;
        self.state = LineState::Input(line);
        Ok(())
    }

    fn read(&self) -> GpioResult<bool> {
        match &self.state {
            LineState::Input(line) => {
                let values = line.get_values([false])?;
                Ok(values[0])
            }
            LineState::Output(_, level) => Ok(*level),
            LineState::Released => {
                let line = self.driver.request_input(self.index)?;
                let values = line.get_values([false])?;
                Ok(values[0])
            }
        }
    }
}

impl Drop for GpiodLine<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.index, false);
    }
}
