//! Startup configuration, read from the environment (and `.env`, via `dotenv`).

use crate::hid::Keycode;
use crate::sampler::LINE_COUNT;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum ConfigError {
    #[error("{key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("GPIO {0} is configured for more than one line")]
    DuplicatePin(usize),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which symbol groups take part in decoding.
///
/// Read by the decoder on every tick, so swapping it between ticks is enough to reconfigure the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceConfig {
    pub numbers_enabled: bool,
    pub letters_enabled: bool,
    pub capitalization_enabled: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            numbers_enabled: false,
            letters_enabled: true,
            capitalization_enabled: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// How long a key or chord is held before it is released.
    pub press_duration: Duration,
    /// Sleep between the end of one tick and the start of the next.
    pub idle_interval: Duration,
    /// Software settle time for the input lines; zero disables it.
    pub settle_time: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            press_duration: Duration::from_millis(100),
            idle_interval: Duration::from_millis(170),
            settle_time: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GpioBackend {
    /// Linux GPIO character device at the given path.
    Gpiod(PathBuf),
    /// Memory-mapped registers through `/dev/gpiomem`.
    GpioMem,
    /// Memory-mapped registers through `/dev/mem` (needs root).
    Mem,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub device: DeviceConfig,
    pub timing: Timing,
    pub backend: GpioBackend,
    pub shortcut_pin: usize,
    /// GPIO lines for dots 1 to 6.
    pub cell_pins: [usize; 6],
    pub hid_device: PathBuf,
    pub shortcut_chord: Vec<Keycode>,
    pub table_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DeviceConfig::default(),
            timing: Timing::default(),
            backend: GpioBackend::Gpiod(PathBuf::from("/dev/gpiochip0")),
            shortcut_pin: 17,
            cell_pins: [5, 6, 13, 19, 26, 12],
            hid_device: PathBuf::from("/dev/hidg0"),
            shortcut_chord: vec![Keycode::LEFT_GUI, Keycode::TAB],
            table_file: None,
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

fn parse_millis(key: &'static str, value: &str) -> ConfigResult<Duration> {
    value
        .trim()
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| invalid(key, value, "expected a whole number of milliseconds"))
}

fn parse_pin(key: &'static str, value: &str) -> ConfigResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a GPIO line number"))
}

fn parse_pin_bus(key: &'static str, value: &str) -> ConfigResult<[usize; 6]> {
    value
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| parse_pin(key, s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| invalid(key, value, "expected exactly 6 GPIO line numbers"))
}

fn invalid(key: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Config::default();

        if let Some(value) = lookup("PIBRAILLE_NUMBERS") {
            config.device.numbers_enabled = parse_bool("PIBRAILLE_NUMBERS", &value)?;
        }
        if let Some(value) = lookup("PIBRAILLE_LETTERS") {
            config.device.letters_enabled = parse_bool("PIBRAILLE_LETTERS", &value)?;
        }
        if let Some(value) = lookup("PIBRAILLE_CAPITALS") {
            config.device.capitalization_enabled = parse_bool("PIBRAILLE_CAPITALS", &value)?;
        }

        if let Some(value) = lookup("PIBRAILLE_PIN_SHORTCUT") {
            config.shortcut_pin = parse_pin("PIBRAILLE_PIN_SHORTCUT", &value)?;
        }
        if let Some(value) = lookup("PIBRAILLE_PINS_CELL") {
            config.cell_pins = parse_pin_bus("PIBRAILLE_PINS_CELL", &value)?;
        }

        if let Some(value) = lookup("PIBRAILLE_GPIO_BACKEND") {
            config.backend = match value.trim().to_ascii_lowercase().as_str() {
                "gpiod" => GpioBackend::Gpiod(PathBuf::from("/dev/gpiochip0")),
                "gpiomem" => GpioBackend::GpioMem,
                "mem" => GpioBackend::Mem,
                _ => return Err(invalid("PIBRAILLE_GPIO_BACKEND", &value, "expected gpiod, gpiomem or mem")),
            };
        }
        if let Some(value) = lookup("PIBRAILLE_GPIO_CHIP") {
            match &mut config.backend {
                GpioBackend::Gpiod(path) => *path = PathBuf::from(value),
                _ => return Err(invalid("PIBRAILLE_GPIO_CHIP", &value, "only used by the gpiod backend")),
            }
        }

        if let Some(value) = lookup("PIBRAILLE_HID_DEVICE") {
            config.hid_device = PathBuf::from(value);
        }
        if let Some(value) = lookup("PIBRAILLE_SHORTCUT") {
            config.shortcut_chord = Keycode::parse_chord(&value)
                .ok_or_else(|| invalid("PIBRAILLE_SHORTCUT", &value, "expected key names joined by '+'"))?;
        }

        if let Some(value) = lookup("PIBRAILLE_PRESS_MS") {
            config.timing.press_duration = parse_millis("PIBRAILLE_PRESS_MS", &value)?;
        }
        if let Some(value) = lookup("PIBRAILLE_IDLE_MS") {
            config.timing.idle_interval = parse_millis("PIBRAILLE_IDLE_MS", &value)?;
        }
        if let Some(value) = lookup("PIBRAILLE_SETTLE_MS") {
            config.timing.settle_time = parse_millis("PIBRAILLE_SETTLE_MS", &value)?;
        }

        config.table_file = lookup("PIBRAILLE_TABLE_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let lines = config.line_indices();
        for (i, pin) in lines.iter().enumerate() {
            if lines[..i].contains(pin) {
                return Err(ConfigError::DuplicatePin(*pin));
            }
        }

        Ok(config)
    }

    /// The GPIO lines in sampling order: the shortcut line, then dots 1 to 6.
    pub fn line_indices(&self) -> [usize; LINE_COUNT] {
        let mut lines = [self.shortcut_pin; LINE_COUNT];
        lines[1..].copy_from_slice(&self.cell_pins);
        lines
    }
}
