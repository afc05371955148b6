use crate::lcd::hd44780::command::{Command, CommandInfo};
use crate::lcd::hd44780::port::LcdPort;
use crate::lcd::hd44780::session::DisplaySession;
use crate::lcd::hd44780::LcdResult;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Name the status report is headed with.
pub const DISPLAY_NAME: &str = "anlcd";

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PinStatus {
    /// GPIO number, if the port knows it.
    pub number: Option<usize>,
    pub name: String,
    pub high: bool,
}

/// A snapshot of a display for the status endpoint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Status {
    pub name: &'static str,
    pub version: &'static str,
    pub columns: u8,
    pub rows: u8,
    pub pins: Vec<PinStatus>,
    pub commands: Vec<CommandInfo>,
    pub autoscroll: bool,
}

impl<P: LcdPort> DisplaySession<P> {
    /// Takes a [Status] snapshot, sampling the current level of every wired line.
    pub fn status(&mut self) -> LcdResult<Status> {
        let width = self.port().bus_width();
        let mut pins = Vec::new();
        for line in self.port().lines() {
            pins.push(PinStatus {
                number: self.port().pin_number(line),
                name: line.name(width),
                high: self.port_mut().read_level(line)?,
            });
        }

        Ok(Status {
            name: DISPLAY_NAME,
            version: env!("CARGO_PKG_VERSION"),
            columns: self.geometry().columns(),
            rows: self.geometry().rows(),
            pins,
            commands: Command::list().to_vec(),
            autoscroll: self.is_autoscroll(),
        })
    }
}

impl Display for PinStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.number {
            Some(number) => write!(f, "GPIO {:02}: ", number)?,
            None => write!(f, "GPIO --: ")?,
        }
        write!(f, "{} = {}", self.name, if self.high { "high" } else { "low" })
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {}x{} Version: {}", self.name, self.columns, self.rows, self.version)?;
        writeln!(f)?;
        for pin in &self.pins {
            writeln!(f, "{}", pin)?;
        }

        writeln!(f)?;
        writeln!(f, "Valid commands for ioctl():")?;
        for command in &self.commands {
            writeln!(f, "{}:\t{:#010X}", command.name, command.code)?;
        }

        writeln!(f)?;
        writeln!(f, "Auto scroll: {}", if self.autoscroll { "enabled" } else { "disabled" })
    }
}
