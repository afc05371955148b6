use anlcd_gpio::lcd::hd44780::DisplayConfig;
use anlcd_gpio::lcd::hd44780::port::PinAssignment;
use eyre::{WrapErr, eyre};
use std::env::{var, var_os};
use std::ffi::OsStr;
use std::path::Path;

pub const DEFAULT_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_CONFIG_FILE: &str = "anlcd.json";

/// Where the display is wired, read from the environment.
#[derive(Debug, Clone)]
pub struct Wiring {
    pub chip: String,
    pub pins: PinAssignment,
}

fn parse_pin(name: &str) -> eyre::Result<usize> {
    let value = var(name).wrap_err_with(|| format!("{} is not set", name))?;
    value.trim().parse().wrap_err_with(|| format!("{} is not a pin number: {:?}", name, value))
}

/// Parses 4 or 8 pin numbers separated by commas, semicolons or spaces.
pub fn parse_pin_bus(pin_str: &str) -> eyre::Result<Vec<usize>> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<usize>, _>>()?;
    if pins.len() != 4 && pins.len() != 8 {
        return Err(eyre!("Invalid number of data pins: {}", pins.len()));
    }
    Ok(pins)
}

impl Wiring {
    pub fn from_env() -> eyre::Result<Self> {
        let chip = var("ANLCD_GPIO_CHIP").unwrap_or_else(|_| DEFAULT_CHIP.to_string());
        let data = var("ANLCD_PINS_DATA").wrap_err("ANLCD_PINS_DATA is not set")?;
        Ok(Wiring {
            chip,
            pins: PinAssignment {
                rs: parse_pin("ANLCD_PIN_RS")?,
                rw: parse_pin("ANLCD_PIN_RW")?,
                en: parse_pin("ANLCD_PIN_EN")?,
                data: parse_pin_bus(&data)?,
            },
        })
    }
}

/// Loads the display options from the file named by `ANLCD_CONFIG`, defaults if there is none.
pub fn load_display_config() -> eyre::Result<DisplayConfig> {
    let config_str = var_os("ANLCD_CONFIG");
    let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
    let config_path = Path::new(config_str);
    if !config_path.exists() {
        return Ok(DisplayConfig::default());
    }

    let file = std::fs::File::open(config_path)?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).wrap_err_with(|| format!("Invalid config file {}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_and_eight_pins() {
        assert_eq!(parse_pin_bus("5, 6,13 ,19").unwrap(), vec![5, 6, 13, 19]);
        assert_eq!(parse_pin_bus("5 6 13 19 26;16;20;21").unwrap(), vec![5, 6, 13, 19, 26, 16, 20, 21]);
    }

    #[test]
    fn rejects_other_pin_counts() {
        assert!(parse_pin_bus("1,2,3").is_err());
        assert!(parse_pin_bus("").is_err());
        assert!(parse_pin_bus("1,2,x,4").is_err());
    }
}
