use pibraille::app::{App, TickError};
use pibraille::braille::{Symbol, SymbolTable};
use pibraille::config::DeviceConfig;
use pibraille::decode::{Action, Decoder};
use pibraille::emit::OutputEmitter;
use pibraille::hid::{HidError, HidGadget, HidResult, Keyboard, Keycode};
use pibraille::sampler::{InputSampler, LINE_COUNT};
use pibraille_gpio::{GpioBusInput, GpioError, GpioResult};
use std::cell::{Cell, RefCell};
use std::io::ErrorKind;
use std::time::Duration;

const T: bool = true;
const F: bool = false;

/// Input lines in sampling order, with an optional queue of read failures.
#[derive(Debug, Default)]
struct FakeLines {
    values: Cell<[bool; LINE_COUNT]>,
    failures: RefCell<Vec<GpioError>>,
}

impl FakeLines {
    fn set(&self, shortcut: bool, cell: [bool; 6]) {
        let mut values = [shortcut; LINE_COUNT];
        values[1..].copy_from_slice(&cell);
        self.values.set(values);
    }
}

impl GpioBusInput<LINE_COUNT> for FakeLines {
    fn read(&self) -> GpioResult<[bool; LINE_COUNT]> {
        if let Some(err) = self.failures.borrow_mut().pop() {
            return Err(err);
        }
        Ok(self.values.get())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Press(Vec<Keycode>),
    Release(Vec<Keycode>),
}

/// Records every call; optionally fails presses after pressing the first key of the chord.
#[derive(Debug, Default)]
struct RecordingKeyboard {
    calls: Vec<Call>,
    held: Vec<Keycode>,
    fail_press_after: Option<usize>,
}

impl Keyboard for RecordingKeyboard {
    fn press(&mut self, keys: &[Keycode]) -> HidResult<()> {
        self.calls.push(Call::Press(keys.to_vec()));
        let count = self.fail_press_after.unwrap_or(keys.len()).min(keys.len());
        self.held.extend_from_slice(&keys[..count]);
        if count < keys.len() {
            return Err(HidError::Io(ErrorKind::BrokenPipe));
        }
        Ok(())
    }

    fn release(&mut self, keys: &[Keycode]) -> HidResult<()> {
        self.calls.push(Call::Release(keys.to_vec()));
        self.held.retain(|key| !keys.contains(key));
        Ok(())
    }
}

fn letters_only() -> DeviceConfig {
    DeviceConfig {
        numbers_enabled: false,
        letters_enabled: true,
        capitalization_enabled: false,
    }
}

fn app<'a>(lines: &'a FakeLines, keyboard: &'a mut dyn Keyboard, config: DeviceConfig) -> App<'a> {
    let emitter = OutputEmitter::new(keyboard, vec![Keycode::LEFT_GUI, Keycode::TAB])
        .with_press_duration(Duration::ZERO);
    App::new(
        config,
        InputSampler::new(lines),
        Decoder::new(SymbolTable::builtin()),
        emitter,
        Duration::ZERO,
    )
}

#[test]
fn dot_one_types_a() {
    let lines = FakeLines::default();
    lines.set(F, [T, F, F, F, F, F]);
    let mut keyboard = RecordingKeyboard::default();

    let action = app(&lines, &mut keyboard, letters_only()).tick().unwrap();

    assert_eq!(action, Action::EmitSymbol(Symbol::Letter('A')));
    let a = Keycode::letter('A').unwrap();
    assert_eq!(keyboard.calls, vec![Call::Press(vec![a]), Call::Release(vec![a])]);
}

#[test]
fn shortcut_line_sends_gui_tab_and_ignores_cell() {
    let mut keyboard = RecordingKeyboard::default();
    let lines = FakeLines::default();

    for cell in [[F; 6], [T; 6], [T, F, F, F, F, F]] {
        lines.set(T, cell);
        let action = app(&lines, &mut keyboard, letters_only()).tick().unwrap();
        assert_eq!(action, Action::EmitShortcut);
    }

    let chord = vec![Keycode::LEFT_GUI, Keycode::TAB];
    assert_eq!(keyboard.calls.len(), 6);
    for pair in keyboard.calls.chunks(2) {
        assert_eq!(pair, [Call::Press(chord.clone()), Call::Release(chord.clone())]);
    }
}

#[test]
fn nothing_enabled_sends_nothing() {
    let lines = FakeLines::default();
    lines.set(F, [F; 6]);
    let mut keyboard = RecordingKeyboard::default();
    let config = DeviceConfig {
        numbers_enabled: false,
        letters_enabled: false,
        capitalization_enabled: false,
    };

    let action = app(&lines, &mut keyboard, config).tick().unwrap();

    assert_eq!(action, Action::NoAction);
    assert!(keyboard.calls.is_empty());
}

#[test]
fn failed_chord_press_is_still_released() {
    let lines = FakeLines::default();
    lines.set(T, [F; 6]);
    let mut keyboard = RecordingKeyboard {
        fail_press_after: Some(1),
        ..RecordingKeyboard::default()
    };

    let result = app(&lines, &mut keyboard, letters_only()).tick();

    assert_eq!(result, Err(TickError::Output(HidError::Io(ErrorKind::BrokenPipe))));
    assert!(keyboard.held.is_empty());
    assert!(matches!(keyboard.calls.last(), Some(Call::Release(_))));
}

#[test]
fn input_failure_skips_only_that_tick() {
    let lines = FakeLines::default();
    lines.set(F, [T, T, F, F, F, F]);
    lines.failures.borrow_mut().push(GpioError::Io(ErrorKind::TimedOut));
    let mut keyboard = RecordingKeyboard::default();
    let mut app = app(&lines, &mut keyboard, letters_only());

    assert_eq!(app.tick(), Err(TickError::Input(GpioError::Io(ErrorKind::TimedOut))));
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Letter('B'))));
    drop(app);

    assert_eq!(keyboard.calls.len(), 2);
}

#[test]
fn numbers_take_precedence_when_both_enabled() {
    let lines = FakeLines::default();
    lines.set(F, [T, T, F, F, F, F]);
    let mut keyboard = RecordingKeyboard::default();
    let config = DeviceConfig {
        numbers_enabled: true,
        letters_enabled: true,
        capitalization_enabled: false,
    };

    let action = app(&lines, &mut keyboard, config).tick().unwrap();

    assert_eq!(action, Action::EmitSymbol(Symbol::Digit(2)));
    assert_eq!(keyboard.calls[0], Call::Press(vec![Keycode::digit(2).unwrap()]));
}

#[test]
fn reconfiguring_between_ticks() {
    let lines = FakeLines::default();
    lines.set(F, [T, F, F, F, F, F]);
    let mut keyboard = RecordingKeyboard::default();
    let mut app = app(&lines, &mut keyboard, letters_only());

    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Letter('A'))));
    app.set_config(DeviceConfig {
        numbers_enabled: true,
        ..*app.config()
    });
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Digit(1))));
}

#[test]
fn capital_sign_then_letter_over_a_real_gadget() {
    let lines = FakeLines::default();
    let mut gadget = HidGadget::new(Vec::new());
    let config = DeviceConfig {
        capitalization_enabled: true,
        ..letters_only()
    };
    let mut app = app(&lines, &mut gadget, config);

    lines.set(F, [F, F, F, F, F, T]);
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Capital)));
    lines.set(F, [F; 6]);
    assert_eq!(app.tick(), Ok(Action::NoAction));
    lines.set(F, [T, T, F, F, F, F]);
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Letter('B'))));
    drop(app);

    let bytes = gadget.into_inner();
    assert_eq!(
        bytes,
        [
            0x02, 0, 0x05, 0, 0, 0, 0, 0, // Left Shift + B
            0x00, 0, 0x00, 0, 0, 0, 0, 0, // all released
        ],
    );
}

#[test]
fn disabling_capitals_drops_a_pending_capital_sign() {
    let lines = FakeLines::default();
    let mut keyboard = RecordingKeyboard::default();
    let config = DeviceConfig {
        capitalization_enabled: true,
        ..letters_only()
    };
    let mut app = app(&lines, &mut keyboard, config);

    lines.set(F, [F, F, F, F, F, T]);
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Capital)));
    app.set_config(letters_only());
    lines.set(F, [T, T, F, F, F, F]);
    assert_eq!(app.tick(), Ok(Action::EmitSymbol(Symbol::Letter('B'))));
    drop(app);

    let b = Keycode::letter('B').unwrap();
    assert_eq!(keyboard.calls, vec![Call::Press(vec![b]), Call::Release(vec![b])]);
}
