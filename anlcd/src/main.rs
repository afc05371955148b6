mod config;

use crate::config::{Wiring, load_display_config};
use anlcd_gpio::gpiod::GpiodDriver;
use anlcd_gpio::lcd::hd44780::{BusWidth, CgramGlyph, Command, DisplaySession, GpioLcdPort, LcdPort};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{debug, info};
use std::io::{Read, Write};
use sysinfo::System;

#[derive(Parser, Debug)]
#[command(name = "anlcd", version, about = "Drive an HD44780 character display as a small terminal.")]
struct Args {
    /// Run the power-on sequence first instead of taking over an initialized display.
    #[arg(long)]
    init: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Write text to the display, standard input if none is given.
    Write {
        text: Option<String>,

        /// Scroll when the text runs past the last row.
        #[arg(long, conflicts_with = "no_autoscroll")]
        autoscroll: bool,

        /// Wrap to the top when the text runs past the last row.
        #[arg(long)]
        no_autoscroll: bool,
    },
    /// Read the screen back as text.
    Read,
    /// Show the wiring, line levels and supported commands.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Initialize the display again.
    Reset,
    ScrollUp,
    ScrollDown,
    AutoscrollOn,
    AutoscrollOff,
    /// Turn the display on.
    On,
    /// Turn the display off, keeping its content.
    Off,
    /// Load the configured glyph set into CGRAM again.
    LoadDefaultCgram,
    /// Write a custom glyph into a CGRAM slot.
    WriteCgram {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=7))]
        slot: u8,

        /// Eight rows of five dots, `#` or `1` lit and `.` or `0` dark.
        #[arg(num_args = 8, required = true, value_parser = parse_glyph_row)]
        rows: Vec<u8>,
    },
    /// Run a command by its ioctl code, with the payload as hex bytes.
    Ioctl {
        #[arg(value_parser = parse_hex)]
        code: u32,

        #[arg(value_parser = parse_hex_byte)]
        payload: Vec<u8>,
    },
}

fn parse_glyph_row(row: &str) -> Result<u8, String> {
    if row.chars().count() != 5 {
        return Err(format!("row {:?} is not 5 dots wide", row));
    }
    row.chars().try_fold(0u8, |bits, dot| match dot {
        '#' | '1' => Ok(bits << 1 | 1),
        '.' | '0' | ' ' => Ok(bits << 1),
        _ => Err(format!("invalid dot {:?}", dot)),
    })
}

fn parse_hex(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|err| err.to_string())
}

fn parse_hex_byte(value: &str) -> Result<u8, String> {
    let code = parse_hex(value)?;
    u8::try_from(code).map_err(|err| err.to_string())
}

fn log_host() {
    const UNKNOWN_STR: &str = "???";

    info!("Running on {}", System::name().as_deref().unwrap_or(UNKNOWN_STR));
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
}

fn run<P: LcdPort>(session: &mut DisplaySession<P>, action: Action) -> eyre::Result<()> {
    let command = match action {
        Action::Write { text, autoscroll, no_autoscroll } => {
            if autoscroll {
                Command::AutoscrollOn.execute(session)?;
            } else if no_autoscroll {
                Command::AutoscrollOff.execute(session)?;
            }
            let bytes = match text {
                Some(text) => text.into_bytes(),
                None => {
                    let mut bytes = Vec::new();
                    std::io::stdin().read_to_end(&mut bytes)?;
                    bytes
                }
            };
            let written = session.write(&bytes)?;
            debug!("Wrote {} byte(s)", written);
            return Ok(());
        }
        Action::Read => {
            let screen = session.read_screen()?;
            std::io::stdout().write_all(&screen)?;
            return Ok(());
        }
        Action::Status { json } => {
            let status = session.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", status);
            }
            return Ok(());
        }
        Action::Reset => Command::Reset,
        Action::ScrollUp => Command::ScrollUp,
        Action::ScrollDown => Command::ScrollDown,
        Action::AutoscrollOn => Command::AutoscrollOn,
        Action::AutoscrollOff => Command::AutoscrollOff,
        Action::On => Command::DisplayOn,
        Action::Off => Command::DisplayOff,
        Action::LoadDefaultCgram => Command::LoadDefaultCgram,
        Action::WriteCgram { slot, rows } => {
            let rows: [u8; 8] = rows.try_into().map_err(|_| eyre::eyre!("A glyph has 8 rows"))?;
            Command::WriteCgram { slot, glyph: CgramGlyph(rows) }
        }
        Action::Ioctl { code, payload } => Command::decode(code, &payload)?,
    };
    command.execute(session)?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();
    let args = Args::parse();

    log_host();

    let wiring = Wiring::from_env()?;
    info!(
        "LCD @ {} RS: {}, RW: {}, EN: {}, Data: {:?}",
        wiring.chip, wiring.pins.rs, wiring.pins.rw, wiring.pins.en, wiring.pins.data
    );

    let mut config = load_display_config()?;
    let bus_width = BusWidth::try_from(wiring.pins.data.len() as u8)?;
    if config.bus_width != bus_width {
        info!("Using a {} bus as wired, not {}", bus_width, config.bus_width);
        config.bus_width = bus_width;
    }
    debug!("{:?}", config);

    let gpio = GpiodDriver::open(&wiring.chip)?;
    let port = GpioLcdPort::claim(&gpio, &wiring.pins)?;
    let mut session = DisplaySession::new(port, config)?;
    session.set_yield_hook(std::thread::yield_now);
    session.set_bell_hook(|| info!("Bell"));

    if args.init {
        session.init()?;
    } else {
        session.attach();
    }

    run(&mut session, args.action)
}
