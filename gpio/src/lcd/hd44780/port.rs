//! The wire-level contract between the HD44780 bus engine and the hardware.
use crate::lcd::hd44780::{LcdError, LcdResult};
use crate::{GpioDriver, GpioError, GpioLine, GpioResult, byte_to_levels, levels_to_byte};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::thread::sleep;
use std::time::Duration;

/// The lines of the HD44780 parallel bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LcdLine {
    /// Register select: low for instructions, high for data.
    Rs,
    /// Read/write: low for writing, high for reading.
    Rw,
    /// Enable strobe.
    En,
    /// Data line `n` of the port, counting from the least significant wired line.
    ///
    /// On a 4-bit bus `Data(0)` is wired to the controller's `DB4`.
    Data(u8),
}

impl LcdLine {
    /// Gets the controller-side name of the line, e.g. `EN` or `D5`.
    pub fn name(&self, width: BusWidth) -> String {
        match self {
            LcdLine::Rs => "RS".to_string(),
            LcdLine::Rw => "RW".to_string(),
            LcdLine::En => "EN".to_string(),
            LcdLine::Data(n) => match width {
                BusWidth::Four => format!("D{}", n + 4),
                BusWidth::Eight => format!("D{}", n),
            },
        }
    }
}

/// Width of the data bus between the host and the controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BusWidth {
    /// Four data lines, every byte is sent as two nibbles, high nibble first.
    #[default]
    Four,
    /// Eight data lines, one transfer per byte.
    Eight,
}

impl BusWidth {
    /// Gets the number of wired data lines.
    pub fn lines(&self) -> u8 {
        match self {
            BusWidth::Four => 4,
            BusWidth::Eight => 8,
        }
    }
}

impl TryFrom<u8> for BusWidth {
    type Error = LcdError;

    fn try_from(value: u8) -> LcdResult<Self> {
        match value {
            4 => Ok(BusWidth::Four),
            8 => Ok(BusWidth::Eight),
            _ => Err(LcdError::OutOfRange { what: "bus width", value: value.into() }),
        }
    }
}

impl From<BusWidth> for u8 {
    fn from(width: BusWidth) -> Self {
        width.lines()
    }
}

impl Display for BusWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.lines())
    }
}

/// The port abstraction the bus engine drives.
///
/// Implementations only move levels and directions around; all protocol decisions (which line
/// when, how long to wait) are made by [GpioHD44780Driver](super::GpioHD44780Driver).
pub trait LcdPort: Debug {
    /// Gets the width of the wired data bus.
    fn bus_width(&self) -> BusWidth;

    /// Switches the line to output mode and drives it to `level`.
    fn set_output(&mut self, line: LcdLine, level: bool) -> GpioResult<()>;

    /// Switches the line to input (high impedance) mode.
    fn set_input(&mut self, line: LcdLine) -> GpioResult<()>;

    /// Reads the current level of the line.
    fn read_level(&mut self, line: LcdLine) -> GpioResult<bool>;

    /// Gets the GPIO number the line is wired to, if the port knows it.
    fn pin_number(&self, _line: LcdLine) -> Option<usize> {
        None
    }

    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms.into()));
    }

    /// Gets all the wired lines, control lines first.
    fn lines(&self) -> Vec<LcdLine> {
        let mut lines = vec![LcdLine::Rs, LcdLine::Rw, LcdLine::En];
        lines.extend((0..self.bus_width().lines()).map(LcdLine::Data));
        lines
    }

    /// Drives the data lines with the low bits of `value`, LSb on `Data(0)`.
    fn write_data_lines(&mut self, value: u8) -> GpioResult<()> {
        let lines = self.bus_width().lines();
        for (i, level) in byte_to_levels::<8>(value).into_iter().take(lines.into()).enumerate() {
            self.set_output(LcdLine::Data(i as u8), level)?;
        }
        Ok(())
    }

    /// Releases all data lines so the controller can drive them.
    fn release_data_lines(&mut self) -> GpioResult<()> {
        for i in 0..self.bus_width().lines() {
            self.set_input(LcdLine::Data(i))?;
        }
        Ok(())
    }

    /// Samples the data lines, LSb from `Data(0)`.
    fn read_data_lines(&mut self) -> GpioResult<u8> {
        let levels = (0..self.bus_width().lines())
            .map(|i| self.read_level(LcdLine::Data(i)))
            .collect::<GpioResult<Vec<bool>>>()?;
        Ok(levels_to_byte(&levels))
    }
}

/// GPIO numbers of the display lines.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PinAssignment {
    pub rs: usize,
    pub rw: usize,
    pub en: usize,
    /// 4 or 8 data pins, least significant first.
    pub data: Vec<usize>,
}

#[derive(Debug)]
pub enum GpioLcdBus<'a> {
    Bus8Bit([Box<dyn GpioLine + 'a>; 8]),
    Bus4Bit([Box<dyn GpioLine + 'a>; 4]),
}

/// [LcdPort] implementation on top of [GpioLine]s.
#[derive(Debug)]
pub struct GpioLcdPort<'a> {
    pin_rs: Box<dyn GpioLine + 'a>,
    pin_rw: Box<dyn GpioLine + 'a>,
    pin_en: Box<dyn GpioLine + 'a>,
    data_bus: GpioLcdBus<'a>,
}

impl<'a> GpioLcdPort<'a> {
    pub fn new_4bit(
        pin_rs: Box<dyn GpioLine + 'a>,
        pin_rw: Box<dyn GpioLine + 'a>,
        pin_en: Box<dyn GpioLine + 'a>,
        data_bus: [Box<dyn GpioLine + 'a>; 4],
    ) -> Self {
        GpioLcdPort {
            pin_rs,
            pin_rw,
            pin_en,
            data_bus: GpioLcdBus::Bus4Bit(data_bus),
        }
    }

    pub fn new_8bit(
        pin_rs: Box<dyn GpioLine + 'a>,
        pin_rw: Box<dyn GpioLine + 'a>,
        pin_en: Box<dyn GpioLine + 'a>,
        data_bus: [Box<dyn GpioLine + 'a>; 8],
    ) -> Self {
        GpioLcdPort {
            pin_rs,
            pin_rw,
            pin_en,
            data_bus: GpioLcdBus::Bus8Bit(data_bus),
        }
    }

    /// Claims all the lines of `pins` from the driver.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the number of data pins is neither 4 nor 8.
    /// - Any error of [GpioDriver::get_line].
    pub fn claim<D: GpioDriver + ?Sized>(driver: &'a D, pins: &PinAssignment) -> GpioResult<Self> {
        if pins.data.len() != 4 && pins.data.len() != 8 {
            return Err(GpioError::InvalidArgument);
        }

        let pin_rs = driver.get_line(pins.rs)?;
        let pin_rw = driver.get_line(pins.rw)?;
        let pin_en = driver.get_line(pins.en)?;
        let data = pins
            .data
            .iter()
            .map(|&index| driver.get_line(index))
            .collect::<GpioResult<Vec<_>>>()?;

        let port = if data.len() == 8 {
            let data = data.try_into().map_err(|_| GpioError::InvalidArgument)?;
            Self::new_8bit(pin_rs, pin_rw, pin_en, data)
        } else {
            let data = data.try_into().map_err(|_| GpioError::InvalidArgument)?;
            Self::new_4bit(pin_rs, pin_rw, pin_en, data)
        };
        Ok(port)
    }

    fn line(&self, line: LcdLine) -> GpioResult<&(dyn GpioLine + 'a)> {
        let line = match line {
            LcdLine::Rs => &self.pin_rs,
            LcdLine::Rw => &self.pin_rw,
            LcdLine::En => &self.pin_en,
            LcdLine::Data(n) => match &self.data_bus {
                GpioLcdBus::Bus8Bit(bus) => bus.get(n as usize).ok_or(GpioError::InvalidArgument)?,
                GpioLcdBus::Bus4Bit(bus) => bus.get(n as usize).ok_or(GpioError::InvalidArgument)?,
            },
        };
        Ok(line.as_ref())
    }

    fn line_mut(&mut self, line: LcdLine) -> GpioResult<&mut (dyn GpioLine + 'a)> {
        let line = match line {
            LcdLine::Rs => &mut self.pin_rs,
            LcdLine::Rw => &mut self.pin_rw,
            LcdLine::En => &mut self.pin_en,
            LcdLine::Data(n) => match &mut self.data_bus {
                GpioLcdBus::Bus8Bit(bus) => bus.get_mut(n as usize).ok_or(GpioError::InvalidArgument)?,
                GpioLcdBus::Bus4Bit(bus) => bus.get_mut(n as usize).ok_or(GpioError::InvalidArgument)?,
            },
        };
        Ok(line.as_mut())
    }
}

impl LcdPort for GpioLcdPort<'_> {
    fn bus_width(&self) -> BusWidth {
        match self.data_bus {
            GpioLcdBus::Bus8Bit(_) => BusWidth::Eight,
            GpioLcdBus::Bus4Bit(_) => BusWidth::Four,
        }
    }

    fn set_output(&mut self, line: LcdLine, level: bool) -> GpioResult<()> {
        self.line_mut(line)?.set_output(level)
    }

    fn set_input(&mut self, line: LcdLine) -> GpioResult<()> {
        self.line_mut(line)?.set_input()
    }

    fn read_level(&mut self, line: LcdLine) -> GpioResult<bool> {
        self.line(line)?.read()
    }

    fn pin_number(&self, line: LcdLine) -> Option<usize> {
        self.line(line).ok().map(|line| line.index())
    }
}
