//! GpiodDriver implementation reading input lines through the Linux GPIO character device.
//!
//! A bus is requested as one line set, so [`GpioBusInput::read`] is a single `GPIO_V2_LINE_GET_VALUES`
//! call and all of its lines are sampled together.
use crate::{
    validate_indices, GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioDriver, GpioError,
    GpioResult,
};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

const CONSUMER: &str = "pibraille";

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO lines.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: BitVec::repeat(false, n),
        }
    }

    /// Opens the chip at `path` (usually `/dev/gpiochip0`).
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        debug!("Opened {} with {} lines", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        validate_indices(indices, self.count()?)?;

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in indices {
            self.used_pins.set_aliased(index, true);
        }
        Ok(())
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;

        Ok(Box::new(GpiodBus {
            driver: self,
            offsets: indices.map(|index| index as u32),
            active_level: GpioActiveLevel::High,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioActiveLevel> for gpiod::Active {
    fn from(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => gpiod::Active::High,
            GpioActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

/// Claimed lines, not yet requested from the kernel.
struct GpiodBus<'a, const N: usize> {
    driver: &'a GpiodDriver,
    offsets: [u32; N],
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

impl<const N: usize> Debug for GpiodBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.offsets)
    }
}

impl<const N: usize> GpioBus<N> for GpiodBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let lines = self.driver.chip.request_lines(
            gpiod::Options::input(self.offsets)
                .consumer(CONSUMER)
                .active(self.active_level.into())
                .bias(self.bias.into()),
        )?;
        debug!("Requested lines {:?} as inputs", self.offsets);
        Ok(Box::new(GpiodBusInput { bus: self, lines }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> Drop for GpiodBus<'_, N> {
    fn drop(&mut self) {
        for &offset in &self.offsets {
            self.driver.used_pins.set_aliased(offset as usize, false);
        }
    }
}

/// Requested lines; one `read` is one kernel call covering all of them.
struct GpiodBusInput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    lines: gpiod::Lines<gpiod::Input>,
}

impl<const N: usize> Debug for GpiodBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let values = self.lines.get_values([false; N])?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn open_accepts_every_path_form() {
        let missing = "/nonexistent/pibraille-gpiochip";
        assert!(matches!(GpiodDriver::open(missing), Err(GpioError::Io(_))));
        assert!(matches!(GpiodDriver::open(Path::new(missing)), Err(GpioError::Io(_))));
        assert!(matches!(GpiodDriver::open(PathBuf::from(missing)), Err(GpioError::Io(_))));
    }
}
