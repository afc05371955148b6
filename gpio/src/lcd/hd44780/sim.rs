//! A simulated HD44780 on the far side of an [LcdPort].
//!
//! The controller reacts to the enable strobe like the real thing: it samples writes on the
//! falling edge, drives the data lines while enable is high during reads, starts in 8-bit mode
//! after power-on, wraps the address counter at the 2-line boundaries and reports busy for a
//! configurable number of status reads after every transfer.
use crate::GpioResult;
use crate::lcd::hd44780::geometry::Geometry;
use crate::lcd::hd44780::port::{BusWidth, LcdLine, LcdPort};

/// A transfer the controller executed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum SimWrite {
    Command(u8),
    Data(u8),
}

#[derive(Debug)]
pub(crate) struct SimPort {
    width: BusWidth,
    rs: bool,
    rw: bool,
    en: bool,
    /// Levels the host drives onto the data lines.
    driven: u8,
    /// Levels the controller drives during a read.
    output: u8,

    eight_bit: bool,
    two_lines: bool,
    pending_nibble: Option<u8>,
    read_low: bool,
    read_latch: u8,
    ddram: [u8; 128],
    cgram: [u8; 64],
    address: u8,
    cg_address: u8,
    cgram_mode: bool,
    display_control: u8,
    entry_mode: u8,

    busy_for: u32,
    busy_left: u32,
    stuck_busy: bool,
    stuck_address: Option<u8>,

    status_reads: u32,
    write_strobes: usize,
    writes: Vec<SimWrite>,
}

impl SimPort {
    pub(crate) fn new(width: BusWidth) -> Self {
        SimPort {
            width,
            rs: false,
            rw: false,
            en: false,
            driven: 0,
            output: 0,
            eight_bit: true,
            two_lines: false,
            pending_nibble: None,
            read_low: false,
            read_latch: 0,
            ddram: [b' '; 128],
            cgram: [0; 64],
            address: 0,
            cg_address: 0,
            cgram_mode: false,
            display_control: 0,
            entry_mode: 0,
            busy_for: 1,
            busy_left: 0,
            stuck_busy: false,
            stuck_address: None,
            status_reads: 0,
            write_strobes: 0,
            writes: Vec::new(),
        }
    }

    pub(crate) fn address(&self) -> u8 {
        self.address
    }

    pub(crate) fn eight_bit(&self) -> bool {
        self.eight_bit
    }

    pub(crate) fn two_lines(&self) -> bool {
        self.two_lines
    }

    pub(crate) fn display_control(&self) -> u8 {
        self.display_control
    }

    pub(crate) fn entry_mode(&self) -> u8 {
        self.entry_mode
    }

    pub(crate) fn ddram(&self, address: u8) -> u8 {
        self.ddram[usize::from(address & 0x7F)]
    }

    pub(crate) fn cgram_glyph(&self, slot: u8) -> [u8; 8] {
        let start = usize::from(slot) * 8;
        let mut glyph = [0; 8];
        glyph.copy_from_slice(&self.cgram[start..start + 8]);
        glyph
    }

    /// Gets the visible characters of a row as text, one `char` per byte.
    pub(crate) fn row_text(&self, geometry: &Geometry, row: u8) -> String {
        let start = geometry.line_start(row);
        (0..geometry.columns()).map(|column| self.ddram(start + column) as char).collect()
    }

    pub(crate) fn screen(&self, geometry: &Geometry) -> Vec<String> {
        (0..geometry.rows()).map(|row| self.row_text(geometry, row)).collect()
    }

    pub(crate) fn writes(&self) -> &[SimWrite] {
        &self.writes
    }

    pub(crate) fn data_writes(&self) -> Vec<u8> {
        self.writes
            .iter()
            .filter_map(|write| match write {
                SimWrite::Data(c) => Some(*c),
                SimWrite::Command(_) => None,
            })
            .collect()
    }

    pub(crate) fn write_strobes(&self) -> usize {
        self.write_strobes
    }

    pub(crate) fn status_reads(&self) -> u32 {
        self.status_reads
    }

    pub(crate) fn clear_log(&mut self) {
        self.writes.clear();
        self.write_strobes = 0;
        self.status_reads = 0;
    }

    /// Sets how many status reads report busy after each transfer.
    pub(crate) fn set_busy_for(&mut self, reads: u32) {
        self.busy_for = reads;
    }

    pub(crate) fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Makes every DDRAM address set land on `address`.
    pub(crate) fn set_stuck_address(&mut self, address: Option<u8>) {
        self.stuck_address = address;
    }

    fn next_address(&self, address: u8) -> u8 {
        if self.two_lines {
            match address {
                0x27 => 0x40,
                0x67 => 0x00,
                a => (a + 1) & 0x7F,
            }
        } else if address >= 0x4F {
            0
        } else {
            address + 1
        }
    }

    fn status(&mut self) -> u8 {
        self.status_reads += 1;
        let busy = if self.stuck_busy {
            true
        } else if self.busy_left > 0 {
            self.busy_left -= 1;
            true
        } else {
            false
        };
        let counter = if self.cgram_mode { self.cg_address } else { self.address };
        if busy { 0x80 | counter } else { counter }
    }

    fn peek_data(&self) -> u8 {
        if self.cgram_mode {
            self.cgram[usize::from(self.cg_address & 0x3F)]
        } else {
            self.ddram(self.address)
        }
    }

    fn advance(&mut self) {
        if self.cgram_mode {
            self.cg_address = (self.cg_address + 1) & 0x3F;
        } else {
            self.address = self.next_address(self.address);
        }
    }

    fn rising_edge(&mut self) {
        if !self.rw {
            return;
        }
        if self.eight_bit || !self.read_low {
            self.read_latch = if self.rs { self.peek_data() } else { self.status() };
        }
        let latch = self.read_latch;
        let nibble = if self.eight_bit || !self.read_low { latch >> 4 } else { latch & 0x0F };
        self.output = match (self.width, self.eight_bit) {
            (BusWidth::Eight, true) => latch,
            (BusWidth::Eight, false) => nibble << 4,
            (BusWidth::Four, _) => nibble,
        };
    }

    fn falling_edge(&mut self) {
        if self.rw {
            let complete = self.eight_bit || self.read_low;
            if !self.eight_bit {
                self.read_low = !self.read_low;
            }
            if complete && self.rs {
                self.advance();
            }
            return;
        }

        self.write_strobes += 1;
        let (full, nibble) = match self.width {
            BusWidth::Eight => (self.driven, self.driven >> 4),
            BusWidth::Four => ((self.driven & 0x0F) << 4, self.driven & 0x0F),
        };
        let byte = if self.eight_bit {
            full
        } else {
            match self.pending_nibble.take() {
                Some(high) => (high << 4) | nibble,
                None => {
                    self.pending_nibble = Some(nibble);
                    return;
                }
            }
        };
        self.execute(byte);
    }

    fn execute(&mut self, byte: u8) {
        if self.rs {
            self.writes.push(SimWrite::Data(byte));
            if self.cgram_mode {
                self.cgram[usize::from(self.cg_address & 0x3F)] = byte;
            } else {
                self.ddram[usize::from(self.address & 0x7F)] = byte;
            }
            self.advance();
        } else {
            self.writes.push(SimWrite::Command(byte));
            self.instruction(byte);
        }
        self.busy_left = self.busy_for;
    }

    fn instruction(&mut self, byte: u8) {
        if byte & 0x80 != 0 {
            self.address = self.stuck_address.unwrap_or(byte & 0x7F);
            self.cgram_mode = false;
        } else if byte & 0x40 != 0 {
            self.cg_address = byte & 0x3F;
            self.cgram_mode = true;
        } else if byte & 0x20 != 0 {
            let eight_bit = byte & 0x10 != 0;
            if eight_bit != self.eight_bit {
                self.pending_nibble = None;
                self.read_low = false;
            }
            self.eight_bit = eight_bit;
            self.two_lines = byte & 0x08 != 0;
        } else if byte & 0x10 != 0 {
            if byte & 0x08 == 0 {
                self.address = if byte & 0x04 != 0 {
                    self.next_address(self.address)
                } else {
                    self.address.wrapping_sub(1) & 0x7F
                };
            }
        } else if byte & 0x08 != 0 {
            self.display_control = byte & 0x07;
        } else if byte & 0x04 != 0 {
            self.entry_mode = byte & 0x03;
        } else if byte & 0x02 != 0 {
            self.address = 0;
            self.cgram_mode = false;
        } else if byte & 0x01 != 0 {
            self.ddram = [b' '; 128];
            self.address = 0;
            self.cgram_mode = false;
        }
    }
}

impl LcdPort for SimPort {
    fn bus_width(&self) -> BusWidth {
        self.width
    }

    fn set_output(&mut self, line: LcdLine, level: bool) -> GpioResult<()> {
        match line {
            LcdLine::Rs => self.rs = level,
            LcdLine::Rw => self.rw = level,
            LcdLine::En => {
                if level != self.en {
                    self.en = level;
                    if level {
                        self.rising_edge();
                    } else {
                        self.falling_edge();
                    }
                }
            }
            LcdLine::Data(n) => {
                if level {
                    self.driven |= 1 << n;
                } else {
                    self.driven &= !(1 << n);
                }
            }
        }
        Ok(())
    }

    fn set_input(&mut self, _line: LcdLine) -> GpioResult<()> {
        Ok(())
    }

    fn read_level(&mut self, line: LcdLine) -> GpioResult<bool> {
        let level = match line {
            LcdLine::Rs => self.rs,
            LcdLine::Rw => self.rw,
            LcdLine::En => self.en,
            LcdLine::Data(n) if self.en && self.rw => self.output & (1 << n) != 0,
            LcdLine::Data(n) => self.driven & (1 << n) != 0,
        };
        Ok(level)
    }

    fn pin_number(&self, line: LcdLine) -> Option<usize> {
        let pin = match line {
            LcdLine::Rs => 7,
            LcdLine::Rw => 8,
            LcdLine::En => 25,
            LcdLine::Data(n) => 20 + usize::from(n),
        };
        Some(pin)
    }

    fn delay_us(&mut self, _us: u32) {}

    fn delay_ms(&mut self, _ms: u32) {}
}
