//! Input-side GPIO access for the braille keyboard.
//!
//! Backends hand out buses of lines. A bus reads all of its lines with a single backend call,
//! so every line in a snapshot was sampled at the same instant.

pub mod gpiod;
pub mod debounce;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin bus at the specific indices.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if an index is out of range or listed twice.
    /// - `GpioError::AlreadyInUse` if a pin is claimed by another bus.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Checks that bus indices are in range and pairwise distinct.
pub(crate) fn validate_indices(indices: &[usize], count: usize) -> GpioResult<()> {
    for (i, &index) in indices.iter().enumerate() {
        if index >= count || indices[..i].contains(&index) {
            return Err(GpioError::InvalidArgument);
        }
    }
    Ok(())
}

/// Specifies the active level of the GPIO pin.
///
/// By default, the active level is high.
///
/// Might be software-implemented.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Gets the logical value of a line given its electrical level.
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// Specifies the bias of the GPIO pin.
///
/// Switches wired to 3.3V want `PullDown`, so that an untouched line reads inactive.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// A set of lines claimed together, configured before it is turned into an input.
pub trait GpioBus<const N: usize>: Debug {
    /// Requests the lines as inputs with the current level and bias settings.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;

    /// # Errors
    /// - `GpioError::NotSupported` if the backend cannot invert lines.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// # Errors
    /// - `GpioError::NotSupported` if the backend has no bias control.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    /// Reads every line of the bus, in the order the bus was requested with.
    fn read(&self) -> GpioResult<[bool; N]>;
}

impl<const N: usize> dyn GpioBusInput<N> + '_ {
    /// Reads the values of the GPIO pins in the bus.
    /// Returns them as a bit mask, LSb first.
    pub fn read_mask(&self) -> GpioResult<u64> {
        if N > 64 {
            return Err(GpioError::NotSupported);
        }
        let values = self.read()?;
        let mut mask = 0u64;
        for (i, &value) in values.iter().enumerate() {
            if value {
                mask |= 1 << i;
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct FixedBus(Cell<[bool; 3]>);

    impl GpioBusInput<3> for FixedBus {
        fn read(&self) -> GpioResult<[bool; 3]> {
            Ok(self.0.get())
        }
    }

    #[test]
    fn active_level_inverts_only_when_low() {
        assert!(GpioActiveLevel::High.get_state(true));
        assert!(!GpioActiveLevel::High.get_state(false));
        assert!(!GpioActiveLevel::Low.get_state(true));
        assert!(GpioActiveLevel::Low.get_state(false));
    }

    #[test]
    fn read_mask_is_lsb_first() {
        let bus = FixedBus(Cell::new([true, false, true]));
        let bus: &dyn GpioBusInput<3> = &bus;
        assert_eq!(bus.read_mask(), Ok(0b101));
    }

    #[test]
    fn indices_must_be_distinct_and_in_range() {
        assert_eq!(validate_indices(&[0, 1, 2], 3), Ok(()));
        assert_eq!(validate_indices(&[0, 3], 3), Err(GpioError::InvalidArgument));
        assert_eq!(validate_indices(&[1, 2, 1], 3), Err(GpioError::InvalidArgument));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err: GpioError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(err, GpioError::Io(std::io::ErrorKind::PermissionDenied));
    }
}
