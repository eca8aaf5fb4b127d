use dotenv::dotenv;
use log::{debug, info, warn};
use pibraille::braille::SymbolTable;
use pibraille::config::{Config, GpioBackend};
use pibraille::decode::Decoder;
use pibraille::sampler::{InputSampler, InputState, LINE_COUNT};
use pibraille_gpio::gpiod::GpiodDriver;
use pibraille_gpio::raw::RawGpioDriver;
use pibraille_gpio::{GpioActiveLevel, GpioBias, GpioDriver, GpioResult};
use std::thread::sleep;
use sysinfo::System;

const LINE_NAMES: [&str; LINE_COUNT] = ["shortcut", "dot 1", "dot 2", "dot 3", "dot 4", "dot 5", "dot 6"];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let config = Config::from_env()?;
    let table = match &config.table_file {
        Some(path) => SymbolTable::load(path)?,
        None => SymbolTable::builtin(),
    };
    let decoder = Decoder::new(table);

    match &config.backend {
        GpioBackend::Gpiod(chip) => probe(&GpiodDriver::open(chip)?, &config, &decoder),
        GpioBackend::GpioMem => probe(&RawGpioDriver::new_gpiomem()?, &config, &decoder),
        GpioBackend::Mem => probe(&RawGpioDriver::new_mem()?, &config, &decoder),
    }
}

/// Samples the lines exactly like the keyboard does and logs every change, with what would have
/// been typed.
fn probe(gpio: &impl GpioDriver, config: &Config, decoder: &Decoder) -> eyre::Result<()> {
    debug!("{:?} initialized.", gpio);

    let indices = config.line_indices();
    let mut lines = gpio.get_pin_bus(indices)?;
    lines.set_bias(GpioBias::PullDown)?;
    lines.set_active_level(GpioActiveLevel::High)?;
    let lines_in = lines.as_input()?;
    let sampler = InputSampler::new(&*lines_in);

    info!("Probing {:?}, press switches to see them here.", lines_in);

    let mut last = None;
    loop {
        match poll_change(&sampler, &mut last) {
            Err(err) => warn!("Failed to read lines: {}", err),
            Ok(None) => {}
            Ok(Some(state)) => {
                for ((name, index), value) in LINE_NAMES.iter().zip(indices).zip(state.to_lines()) {
                    info!("  {:<8} GPIO{:<2} {}", name, index, if value { "HIGH" } else { "low" });
                }
                let action = decoder.decode(state.shortcut, state.pattern, &config.device);
                info!("{} -> {:?}", state, action);
            }
        }

        sleep(config.timing.idle_interval);
    }
}

/// Takes one snapshot and returns it if it differs from the previous one.
fn poll_change(sampler: &InputSampler, last: &mut Option<InputState>) -> GpioResult<Option<InputState>> {
    let state = sampler.sample()?;
    if *last == Some(state) {
        return Ok(None);
    }
    *last = Some(state);
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pibraille::braille::Pattern;
    use pibraille_gpio::GpioBusInput;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct CountingLines {
        values: Cell<[bool; LINE_COUNT]>,
        reads: Cell<usize>,
    }

    impl GpioBusInput<LINE_COUNT> for CountingLines {
        fn read(&self) -> GpioResult<[bool; LINE_COUNT]> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.values.get())
        }
    }

    #[test]
    fn each_poll_is_one_bus_snapshot() {
        let lines = CountingLines::default();
        let sampler = InputSampler::new(&lines);
        let mut last = None;

        assert_eq!(poll_change(&sampler, &mut last), Ok(Some(InputState::default())));
        assert_eq!(lines.reads.get(), 1);

        lines.values.set([true, false, true, false, false, false, false]);
        let state = poll_change(&sampler, &mut last).unwrap().unwrap();
        assert_eq!(lines.reads.get(), 2);
        assert!(state.shortcut);
        assert_eq!(state.pattern, Pattern::dots(&[2]));
    }

    #[test]
    fn unchanged_snapshots_are_not_reported() {
        let lines = CountingLines::default();
        let sampler = InputSampler::new(&lines);
        let mut last = None;

        poll_change(&sampler, &mut last).unwrap();
        assert_eq!(poll_change(&sampler, &mut last), Ok(None));
        assert_eq!(poll_change(&sampler, &mut last), Ok(None));
    }
}
