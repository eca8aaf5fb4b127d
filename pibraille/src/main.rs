use dotenv::dotenv;
use log::{debug, info};
use pibraille::app::App;
use pibraille::braille::SymbolTable;
use pibraille::config::{Config, GpioBackend};
use pibraille::decode::Decoder;
use pibraille::emit::OutputEmitter;
use pibraille::hid::{HidGadget, Keyboard};
use pibraille::sampler::{InputSampler, LINE_COUNT};
use pibraille_gpio::debounce::TimedDebounce;
use pibraille_gpio::gpiod::GpiodDriver;
use pibraille_gpio::raw::RawGpioDriver;
use pibraille_gpio::{GpioActiveLevel, GpioBias, GpioBusInput, GpioDriver};

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("PiBraille v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    info!("Shortcut @ {}, Cell @ {:?}", config.shortcut_pin, config.cell_pins);
    info!(
        "Numbers: {}, Letters: {}, Capitals: {}",
        config.device.numbers_enabled,
        config.device.letters_enabled,
        config.device.capitalization_enabled,
    );
    info!("Shortcut chord: {:?}", config.shortcut_chord);

    let table = match &config.table_file {
        Some(path) => {
            info!("Loading symbol table from {}", path.display());
            SymbolTable::load(path)?
        }
        None => SymbolTable::builtin(),
    };

    debug!("Opening HID gadget {}...", config.hid_device.display());
    let mut keyboard = HidGadget::open(&config.hid_device)?;
    debug!("{:?} initialized.", keyboard);

    debug!("Initializing GPIO driver...");
    match &config.backend {
        GpioBackend::Gpiod(chip) => run(&GpiodDriver::open(chip)?, &config, table, &mut keyboard),
        GpioBackend::GpioMem => run(&RawGpioDriver::new_gpiomem()?, &config, table, &mut keyboard),
        GpioBackend::Mem => run(&RawGpioDriver::new_mem()?, &config, table, &mut keyboard),
    }
}

fn run(
    gpio: &impl GpioDriver,
    config: &Config,
    table: SymbolTable,
    keyboard: &mut dyn Keyboard,
) -> eyre::Result<()> {
    debug!("{:?} initialized.", gpio);

    debug!("Initializing input lines...");
    let mut lines = gpio.get_pin_bus(config.line_indices())?;
    lines.set_bias(GpioBias::PullDown)?;
    lines.set_active_level(GpioActiveLevel::High)?;
    let lines_in = lines.as_input()?;

    let debounced;
    let input: &dyn GpioBusInput<LINE_COUNT> = if config.timing.settle_time.is_zero() {
        &*lines_in
    } else {
        debounced = TimedDebounce::new(&*lines_in).with_debounce_time(config.timing.settle_time);
        &debounced
    };
    debug!("{:?} initialized.", input);

    let emitter = OutputEmitter::new(keyboard, config.shortcut_chord.clone())
        .with_press_duration(config.timing.press_duration);

    info!("PiBraille initialized.");

    let mut app = App::new(
        config.device,
        InputSampler::new(input),
        Decoder::new(table),
        emitter,
        config.timing.idle_interval,
    );

    app.run()
}
