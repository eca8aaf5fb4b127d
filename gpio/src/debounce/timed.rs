use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};
use crate::{GpioBusInput, GpioResult};

/// A debounced GPIO bus that only reports a new snapshot once it has been read unchanged for
/// `debounce_time`.
///
/// The whole snapshot is debounced as one value, so a chord of switches that closes over a few
/// milliseconds settles into a single change instead of a run of partial ones.
/// Until the first change settles, the bus reports every line as inactive.
pub struct TimedDebounce<'a, const N: usize> {
    input: &'a dyn GpioBusInput<N>,
    state: Cell<[bool; N]>,
    pending: Cell<Option<([bool; N], Instant)>>,
    pub debounce_time: Duration,
}

impl <'a, const N: usize> TimedDebounce<'a, N> {
    pub fn new(input: &'a dyn GpioBusInput<N>) -> Self {
        Self {
            input,
            state: Cell::new([false; N]),
            pending: Cell::new(None),
            debounce_time: Duration::from_millis(50),
        }
    }

    pub fn with_debounce_time(mut self, debounce_time: Duration) -> Self {
        self.debounce_time = debounce_time;
        self
    }
}

impl<const N: usize> Debug for TimedDebounce<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(debounced)", self.input)
    }
}

impl<const N: usize> GpioBusInput<N> for TimedDebounce<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let previous_state = self.state.get();
        let new_state = self.input.read()?;

        if new_state == previous_state {
            self.pending.set(None);
            return Ok(previous_state);
        }

        let since = match self.pending.get() {
            Some((candidate, since)) if candidate == new_state => since,
            _ => {
                let now = Instant::now();
                self.pending.set(Some((new_state, now)));
                now
            }
        };

        if since.elapsed() >= self.debounce_time {
            self.pending.set(None);
            self.state.set(new_state);
            return Ok(new_state);
        }

        Ok(previous_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[derive(Debug)]
    struct FakeBus(Cell<[bool; 2]>);

    impl FakeBus {
        fn as_input(&self) -> &dyn GpioBusInput<2> {
            self
        }
    }

    impl GpioBusInput<2> for FakeBus {
        fn read(&self) -> GpioResult<[bool; 2]> {
            Ok(self.0.get())
        }
    }

    #[test]
    fn zero_debounce_time_passes_changes_through() {
        let bus = FakeBus(Cell::new([false, false]));
        let debounced = TimedDebounce::new(bus.as_input()).with_debounce_time(Duration::ZERO);

        assert_eq!(debounced.read(), Ok([false, false]));
        bus.0.set([true, false]);
        assert_eq!(debounced.read(), Ok([true, false]));
    }

    #[test]
    fn change_is_held_back_until_settled() {
        let bus = FakeBus(Cell::new([false, false]));
        let debounced = TimedDebounce::new(bus.as_input()).with_debounce_time(Duration::from_millis(30));

        bus.0.set([true, true]);
        assert_eq!(debounced.read(), Ok([false, false]));
        sleep(Duration::from_millis(40));
        assert_eq!(debounced.read(), Ok([true, true]));
    }

    #[test]
    fn bounce_restarts_the_settle_window() {
        let bus = FakeBus(Cell::new([false, false]));
        let debounced = TimedDebounce::new(bus.as_input()).with_debounce_time(Duration::from_millis(30));

        bus.0.set([true, false]);
        assert_eq!(debounced.read(), Ok([false, false]));
        sleep(Duration::from_millis(40));

        // A different candidate appears before the first one was read as settled
        bus.0.set([true, true]);
        assert_eq!(debounced.read(), Ok([false, false]));
        sleep(Duration::from_millis(40));
        assert_eq!(debounced.read(), Ok([true, true]));
    }

    #[test]
    fn glitch_back_to_current_state_is_dropped() {
        let bus = FakeBus(Cell::new([false, false]));
        let debounced = TimedDebounce::new(bus.as_input()).with_debounce_time(Duration::from_millis(30));

        bus.0.set([false, true]);
        assert_eq!(debounced.read(), Ok([false, false]));
        bus.0.set([false, false]);
        assert_eq!(debounced.read(), Ok([false, false]));
        sleep(Duration::from_millis(40));
        bus.0.set([false, true]);
        assert_eq!(debounced.read(), Ok([false, false]));
    }
}
