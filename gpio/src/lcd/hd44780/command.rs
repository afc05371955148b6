use crate::lcd::hd44780::cgram::CgramGlyph;
use crate::lcd::hd44780::port::LcdPort;
use crate::lcd::hd44780::session::DisplaySession;
use crate::lcd::hd44780::{LcdError, LcdResult};
use log::{debug, error};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Type byte of every command code.
pub const COMMAND_MAGIC: u8 = b'd';

/// Size of the [Command::WriteCgram] payload: the slot followed by eight bitmap rows.
pub const CGRAM_PAYLOAD_SIZE: usize = 9;

const fn io(number: u32) -> u32 {
    (COMMAND_MAGIC as u32) << 8 | number
}

const fn iow(number: u32, size: usize) -> u32 {
    1 << 30 | (size as u32) << 16 | io(number)
}

pub const RESET: u32 = io(0);
pub const SCROLL_UP: u32 = io(1);
pub const SCROLL_DOWN: u32 = io(2);
pub const AUTOSCROLL_ON: u32 = io(3);
pub const AUTOSCROLL_OFF: u32 = io(4);
pub const DISPLAY_ON: u32 = io(5);
pub const DISPLAY_OFF: u32 = io(6);
pub const LOAD_DEFAULT_CGRAM: u32 = io(7);
pub const WRITE_CGRAM: u32 = iow(8, CGRAM_PAYLOAD_SIZE);

/// An out-of-band operation on a display.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    /// Runs the power-on sequence again.
    Reset,
    ScrollUp,
    ScrollDown,
    AutoscrollOn,
    AutoscrollOff,
    DisplayOn,
    DisplayOff,
    /// Loads the configured glyph set into CGRAM again.
    LoadDefaultCgram,
    WriteCgram { slot: u8, glyph: CgramGlyph },
}

/// A supported command as listed in the status report.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub code: u32,
}

const COMMANDS: [CommandInfo; 9] = [
    CommandInfo { name: "AN_DISPLAY_IOC_RESET", code: RESET },
    CommandInfo { name: "AN_DISPLAY_IOC_SCROLL_UP", code: SCROLL_UP },
    CommandInfo { name: "AN_DISPLAY_IOC_SCROLL_DOWN", code: SCROLL_DOWN },
    CommandInfo { name: "AN_DISPLAY_IOC_LOAD_DEFAULT_CGRAM", code: LOAD_DEFAULT_CGRAM },
    CommandInfo { name: "AN_DISPLAY_IOC_WRITE_CGRAM", code: WRITE_CGRAM },
    CommandInfo { name: "AN_DISPLAY_IOC_AUTOSCROLL_ON", code: AUTOSCROLL_ON },
    CommandInfo { name: "AN_DISPLAY_IOC_AUTOSCROLL_OFF", code: AUTOSCROLL_OFF },
    CommandInfo { name: "AN_DISPLAY_IOC_OFF", code: DISPLAY_OFF },
    CommandInfo { name: "AN_DISPLAY_IOC_ON", code: DISPLAY_ON },
];

impl Command {
    /// Gets every supported command in listing order.
    pub fn list() -> &'static [CommandInfo] {
        &COMMANDS
    }

    pub fn code(&self) -> u32 {
        match self {
            Command::Reset => RESET,
            Command::ScrollUp => SCROLL_UP,
            Command::ScrollDown => SCROLL_DOWN,
            Command::AutoscrollOn => AUTOSCROLL_ON,
            Command::AutoscrollOff => AUTOSCROLL_OFF,
            Command::DisplayOn => DISPLAY_ON,
            Command::DisplayOff => DISPLAY_OFF,
            Command::LoadDefaultCgram => LOAD_DEFAULT_CGRAM,
            Command::WriteCgram { .. } => WRITE_CGRAM,
        }
    }

    pub fn name(&self) -> &'static str {
        let code = self.code();
        COMMANDS.iter().find(|info| info.code == code).map_or("", |info| info.name)
    }

    /// Decodes a command from its code and, for [Command::WriteCgram], its packed payload.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` for an unknown code or a payload of the wrong size.
    pub fn decode(code: u32, payload: &[u8]) -> LcdResult<Self> {
        let command = match code {
            RESET => Command::Reset,
            SCROLL_UP => Command::ScrollUp,
            SCROLL_DOWN => Command::ScrollDown,
            AUTOSCROLL_ON => Command::AutoscrollOn,
            AUTOSCROLL_OFF => Command::AutoscrollOff,
            DISPLAY_ON => Command::DisplayOn,
            DISPLAY_OFF => Command::DisplayOff,
            LOAD_DEFAULT_CGRAM => Command::LoadDefaultCgram,
            WRITE_CGRAM => {
                let Ok(packed) = <[u8; CGRAM_PAYLOAD_SIZE]>::try_from(payload) else {
                    return Err(LcdError::OutOfRange { what: "CGRAM payload size", value: payload.len() as u32 });
                };
                let [slot, rows @ ..] = packed;
                Command::WriteCgram { slot, glyph: CgramGlyph(rows) }
            }
            _ => {
                error!("Unknown command {:#010X}", code);
                return Err(LcdError::OutOfRange { what: "command", value: code });
            }
        };
        Ok(command)
    }

    /// Packs the [Command::WriteCgram] payload, empty for every other command.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::WriteCgram { slot, glyph } => {
                let mut payload = Vec::with_capacity(CGRAM_PAYLOAD_SIZE);
                payload.push(*slot);
                payload.extend_from_slice(glyph.rows());
                payload
            }
            _ => Vec::new(),
        }
    }

    /// Runs the command on `session`. The CGRAM commands put the cursor back where it was.
    pub fn execute<P: LcdPort>(&self, session: &mut DisplaySession<P>) -> LcdResult<()> {
        debug!("Executing {}", self);
        let result = match self {
            Command::Reset => session.init(),
            Command::ScrollUp => session.scroll_up(),
            Command::ScrollDown => session.scroll_down(),
            Command::AutoscrollOn => {
                session.set_autoscroll(true);
                Ok(())
            }
            Command::AutoscrollOff => {
                session.set_autoscroll(false);
                Ok(())
            }
            Command::DisplayOn => session.display_on(),
            Command::DisplayOff => session.display_off(),
            Command::LoadDefaultCgram => session.load_default_glyphs(),
            Command::WriteCgram { slot, glyph } => session.write_glyph(*slot, glyph),
        };
        if let Err(err) = &result {
            error!("Executing {} failed: {}", self, err);
        }
        result
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
