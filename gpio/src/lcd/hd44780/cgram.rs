use crate::lcd::hd44780::charmap::{BACKSLASH_SLOT, CGRAM_EXTRA_OFFSET, PARAGRAPH_SLOT};
use crate::lcd::hd44780::config::{Controller, GlyphOptions};
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::{LcdError, LcdResult};
use anlcd_glyph_macro::glyph;
use log::debug;
use serde::{Deserialize, Serialize};

/// Highest CGRAM slot.
pub const MAX_SLOT: u8 = 7;

/// A custom 5x8 character, one byte per dot row from the top, bit 4 is the leftmost dot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct CgramGlyph(pub [u8; 8]);

impl CgramGlyph {
    pub fn rows(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<[u8; 8]> for CgramGlyph {
    fn from(rows: [u8; 8]) -> Self {
        CgramGlyph(rows)
    }
}

pub const GLYPH_AE: CgramGlyph = CgramGlyph(glyph!(
    " # # ",
    " ### ",
    "#   #",
    "#   #",
    "#####",
    "#   #",
    "#   #",
    "     ",
));

pub const GLYPH_OE: CgramGlyph = CgramGlyph(glyph!(
    " # # ",
    " ### ",
    "#   #",
    "#   #",
    "#   #",
    "#   #",
    " ### ",
    "     ",
));

pub const GLYPH_UE: CgramGlyph = CgramGlyph(glyph!(
    " # # ",
    "#   #",
    "#   #",
    "#   #",
    "#   #",
    "#   #",
    " ### ",
    "     ",
));

pub const GLYPH_BACKSLASH: CgramGlyph = CgramGlyph(glyph!(
    "     ",
    "#    ",
    " #   ",
    "  #  ",
    "   # ",
    "    #",
    "     ",
    "     ",
));

pub const GLYPH_PARAGRAPH: CgramGlyph = CgramGlyph(glyph!(
    "  ###",
    " #   ",
    " ### ",
    "#   #",
    " ### ",
    "   # ",
    "###  ",
    "     ",
));

/// Writes `glyph` into CGRAM `slot`, leaving the address counter in CGRAM.
///
/// # Errors
/// - `LcdError::OutOfRange` if `slot` is above [MAX_SLOT], nothing is sent.
/// - The first bus failure, the remaining rows are not written.
pub fn load_glyph<D: HD44780Driver + ?Sized>(driver: &mut D, glyph: &CgramGlyph, slot: u8) -> LcdResult<u8> {
    if slot > MAX_SLOT {
        return Err(LcdError::OutOfRange { what: "CGRAM slot", value: slot.into() });
    }
    debug!("Loading glyph into CGRAM slot {}", slot);
    let mut address = driver.set_cgram_address(slot * 8)?;
    for &row in glyph.rows() {
        address = driver.write_char(row)?;
    }
    Ok(address)
}

/// Gets the glyphs loaded at start-up with their slots.
pub fn predefined_glyphs(options: &GlyphOptions) -> Vec<(u8, CgramGlyph)> {
    let mut glyphs = Vec::new();
    if options.umlauts && options.controller == Controller::St7066u {
        glyphs.push((CGRAM_EXTRA_OFFSET, GLYPH_AE));
        glyphs.push((CGRAM_EXTRA_OFFSET + 1, GLYPH_OE));
        glyphs.push((CGRAM_EXTRA_OFFSET + 2, GLYPH_UE));
    }
    if options.backslash {
        glyphs.push((BACKSLASH_SLOT, GLYPH_BACKSLASH));
    }
    if options.paragraph {
        glyphs.push((PARAGRAPH_SLOT, GLYPH_PARAGRAPH));
    }
    glyphs
}

/// Loads all [predefined_glyphs], stopping at the first failure.
pub fn load_predefined_glyphs<D: HD44780Driver + ?Sized>(driver: &mut D, options: &GlyphOptions) -> LcdResult<()> {
    for (slot, glyph) in predefined_glyphs(options) {
        load_glyph(driver, &glyph, slot)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::config::BusTiming;
    use crate::lcd::hd44780::driver::GpioHD44780Driver;
    use crate::lcd::hd44780::port::BusWidth;
    use crate::lcd::hd44780::sim::SimPort;

    fn driver() -> GpioHD44780Driver<SimPort> {
        let mut driver = GpioHD44780Driver::new(SimPort::new(BusWidth::Four), BusTiming::default());
        driver.init(true).unwrap();
        driver.port_mut().clear_log();
        driver
    }

    #[test]
    fn bitmaps_are_drawn_right() {
        assert_eq!(GLYPH_AE.0, [0b01010, 0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0]);
        assert_eq!(GLYPH_PARAGRAPH.0, [0b00111, 0b01000, 0b01110, 0b10001, 0b01110, 0b00010, 0b11100, 0]);
    }

    #[test]
    fn loads_into_the_slot() {
        let mut driver = driver();
        load_glyph(&mut driver, &GLYPH_UE, 5).unwrap();
        assert_eq!(driver.port().cgram_glyph(5), GLYPH_UE.0);
        assert_eq!(driver.port().cgram_glyph(4), [0; 8]);
    }

    #[test]
    fn slot_8_is_rejected_without_bus_writes() {
        let mut driver = driver();
        let err = load_glyph(&mut driver, &GLYPH_AE, 8).unwrap_err();
        assert_eq!(err, LcdError::OutOfRange { what: "CGRAM slot", value: 8 });
        assert_eq!(driver.port().write_strobes(), 0);
        assert!(driver.port().writes().is_empty());
    }

    #[test]
    fn stops_at_the_first_bus_failure() {
        let mut driver = driver();
        driver.port_mut().set_stuck_busy(true);
        assert!(matches!(load_glyph(&mut driver, &GLYPH_AE, 1), Err(LcdError::BusTimeout { .. })));
        assert_eq!(driver.port().writes().len(), 1);
    }

    #[test]
    fn predefined_set_follows_the_options() {
        assert!(predefined_glyphs(&GlyphOptions::default()).is_empty());

        let options = GlyphOptions {
            controller: Controller::St7066u,
            backslash: true,
            paragraph: true,
            ..GlyphOptions::default()
        };
        let slots: Vec<u8> = predefined_glyphs(&options).iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![3, 4, 5, 6, 7]);

        let mut driver = driver();
        load_predefined_glyphs(&mut driver, &options).unwrap();
        assert_eq!(driver.port().cgram_glyph(3), GLYPH_AE.0);
        assert_eq!(driver.port().cgram_glyph(6), GLYPH_BACKSLASH.0);
    }
}
