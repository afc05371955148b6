//! Translation between input bytes and the controller's character codes.
//!
//! German umlauts, ß, the degree sign and a few optional glyphs don't sit where ASCII or
//! Latin-1 expect them. Input arrives either as UTF-8, where a lead byte ([UMLAUT_INTRODUCER] or
//! [SPECIAL_CHAR_INTRODUCER]) announces the table for the next byte, or as single code page 437
//! bytes.
use crate::lcd::hd44780::config::{Controller, GlyphOptions};
use std::collections::HashMap;

/// UTF-8 lead byte of `ä ö ü ß Ä Ö Ü`.
pub const UMLAUT_INTRODUCER: u8 = 0xC3;
/// UTF-8 lead byte of `° §`.
pub const SPECIAL_CHAR_INTRODUCER: u8 = 0xC2;

/// First CGRAM slot taken by the glyphs loaded at start-up.
pub const CGRAM_EXTRA_OFFSET: u8 = 3;
pub const BACKSLASH_SLOT: u8 = CGRAM_EXTRA_OFFSET + 3;
pub const PARAGRAPH_SLOT: u8 = CGRAM_EXTRA_OFFSET + 4;

pub const POSITION_AE_SMALL: u8 = 0xE1;
pub const POSITION_OE_SMALL: u8 = 0xEF;
pub const POSITION_UE_SMALL: u8 = 0xF5;
pub const POSITION_SS: u8 = 0xE2;
pub const POSITION_DEGREE: u8 = 0xDF;

/// Character codes of the capital umlauts `Ä Ö Ü`.
///
/// The A00 ROM has them, the ST7066U doesn't and gets them loaded into CGRAM.
pub fn capital_umlaut_positions(controller: Controller) -> [u8; 3] {
    match controller {
        Controller::Hd44780 => [0xC4, 0xC6, 0xCC],
        Controller::St7066u => [CGRAM_EXTRA_OFFSET, CGRAM_EXTRA_OFFSET + 1, CGRAM_EXTRA_OFFSET + 2],
    }
}

/// A display character mapped back to input bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReadbackChar {
    Plain(u8),
    /// Trailing byte after [UMLAUT_INTRODUCER].
    Umlaut(u8),
    /// Trailing byte after [SPECIAL_CHAR_INTRODUCER].
    Special(u8),
}

impl ReadbackChar {
    /// Appends the input bytes that produce this character.
    pub fn push_to(&self, out: &mut Vec<u8>) {
        match *self {
            ReadbackChar::Plain(c) => out.push(c),
            ReadbackChar::Umlaut(c) => out.extend_from_slice(&[UMLAUT_INTRODUCER, c]),
            ReadbackChar::Special(c) => out.extend_from_slice(&[SPECIAL_CHAR_INTRODUCER, c]),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Table {
    forward: HashMap<u8, u8>,
    backward: HashMap<u8, u8>,
}

impl Table {
    fn new(entries: &[(u8, u8)]) -> Self {
        let mut table = Table::default();
        for &(input, glyph) in entries {
            table.forward.insert(input, glyph);
            table.backward.insert(glyph, input);
        }
        table
    }

    fn forward(&self, input: u8) -> Option<u8> {
        self.forward.get(&input).copied()
    }

    fn backward(&self, glyph: u8) -> Option<u8> {
        self.backward.get(&glyph).copied()
    }
}

/// The translation tables of one display, fixed at construction.
#[derive(Debug, Clone)]
pub struct CharMap {
    unicode: bool,
    /// Trailing bytes after [UMLAUT_INTRODUCER].
    umlauts: Table,
    /// Trailing bytes after [SPECIAL_CHAR_INTRODUCER].
    special: Table,
    /// Single bytes.
    char8: Table,
}

impl CharMap {
    pub fn new(options: &GlyphOptions) -> Self {
        let [ae_big, oe_big, ue_big] = capital_umlaut_positions(options.controller);

        let mut umlauts = Vec::new();
        let mut special = vec![(0xB0, POSITION_DEGREE)];
        let mut char8 = Vec::new();

        if options.backslash {
            char8.push((b'\\', BACKSLASH_SLOT));
        }
        if options.paragraph {
            special.push((0xA7, PARAGRAPH_SLOT));
        }
        if options.umlauts {
            if options.unicode {
                umlauts.extend_from_slice(&[
                    (0xA4, POSITION_AE_SMALL),
                    (0xB6, POSITION_OE_SMALL),
                    (0xBC, POSITION_UE_SMALL),
                    (0x9F, POSITION_SS),
                    (0x84, ae_big),
                    (0x96, oe_big),
                    (0x9C, ue_big),
                ]);
            } else {
                char8.extend_from_slice(&[
                    (0x84, POSITION_AE_SMALL),
                    (0x8E, ae_big),
                    (0x99, oe_big),
                    (0x94, POSITION_OE_SMALL),
                    (0x81, POSITION_UE_SMALL),
                    (0x9A, ue_big),
                    (0x7E, POSITION_SS),
                ]);
            }
        }

        CharMap {
            unicode: options.unicode,
            umlauts: Table::new(&umlauts),
            special: Table::new(&special),
            char8: Table::new(&char8),
        }
    }

    /// Gets whether the UTF-8 lead bytes switch tables.
    pub fn is_unicode(&self) -> bool {
        self.unicode
    }

    /// Translates a single input byte, unknown bytes pass through unchanged.
    pub fn translate_forward(&self, c: u8) -> u8 {
        self.char8.forward(c).unwrap_or(c)
    }

    /// Looks up the byte following [UMLAUT_INTRODUCER].
    pub fn translate_umlaut(&self, c: u8) -> Option<u8> {
        self.umlauts.forward(c)
    }

    /// Looks up the byte following [SPECIAL_CHAR_INTRODUCER].
    pub fn translate_special(&self, c: u8) -> Option<u8> {
        self.special.forward(c)
    }

    /// Maps a character read from the display back to the input that wrote it.
    pub fn translate_backward(&self, glyph: u8) -> ReadbackChar {
        if let Some(c) = self.char8.backward(glyph) {
            return ReadbackChar::Plain(c);
        }
        if self.unicode {
            if let Some(c) = self.special.backward(glyph) {
                return ReadbackChar::Special(c);
            }
            if let Some(c) = self.umlauts.backward(glyph) {
                return ReadbackChar::Umlaut(c);
            }
        }
        ReadbackChar::Plain(glyph)
    }
}
