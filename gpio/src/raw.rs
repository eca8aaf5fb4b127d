use crate::{validate_indices, GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioDriver, GpioError, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// Register-level driver for the BCM2711 GPIO block, mapped through `/dev/gpiomem` or `/dev/mem`.
///
/// Only the input side is used: pin function select, level and pull-up/pull-down control.
pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u64 = 0xFE200000;

    const PIN_COUNT: usize = 58;

    // Word offsets into the register block
    const GPFSEL0: usize = 0x00 / 4;
    const GPLEV0: usize = 0x34 / 4;
    const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4 / 4;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
                .offset(offset)
                .len(4096)
                .map_raw(&file)?;

        debug!("Mapped GPIO registers from {}", path);

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which exposes it at offset 0 and needs no root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE)
    }

    fn read_register(&self, word: usize) -> u32 {
        let mmap = self.mmap.as_ptr() as *const u32;
        unsafe { mmap.add(word).read_volatile() }
    }

    fn write_register(&self, word: usize, value: u32) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        unsafe { mmap.add(word).write_volatile(value) }
    }

    /// Switches the pin to function 0 (input).
    pub(crate) fn raw_set_input(&self, pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let word = Self::GPFSEL0 + pin_index / 10;
        let shift = (pin_index % 10) * 3;

        let register_value = self.read_register(word) & !(0b111 << shift);
        self.write_register(word, register_value);
        Ok(())
    }

    /// Reads both GPLEV banks, one volatile load each. Bit `n` is the level of pin `n`.
    pub(crate) fn raw_read_levels(&self) -> u64 {
        let low = self.read_register(Self::GPLEV0) as u64;
        let high = self.read_register(Self::GPLEV0 + 1) as u64;
        low | (high << 32)
    }

    pub(crate) fn raw_set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let bias_value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };

        let word = Self::GPIO_PUP_PDN_CNTRL_REG0 + pin_index / 16;
        let shift = (pin_index % 16) * 2;
        let mut register_value = self.read_register(word);
        register_value &= !(0b11 << shift);
        register_value |= bias_value << shift;
        self.write_register(word, register_value);

        Ok(())
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        validate_indices(indices, Self::PIN_COUNT)?;

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in indices {
            self.used_pins.set_aliased(index, true);
            self.raw_set_input(index)?;
            self.raw_set_bias(index, GpioBias::None)?;
        }
        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin_bus<const N: usize>(&self, indices: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;

        Ok(Box::new(RawGpioBus {
            driver: self,
            pin_indices: indices,
            active_level: GpioActiveLevel::High,
        }))
    }
}

struct RawGpioBus<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
    active_level: GpioActiveLevel,
}

impl<const N: usize> Debug for RawGpioBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for RawGpioBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.raw_set_input(pin_index)?;
        }
        Ok(Box::new(RawGpioBusInput { bus: self }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        for &pin_index in &self.pin_indices {
            self.driver.raw_set_bias(pin_index, bias)?;
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawGpioBus<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            self.driver.used_pins.set_aliased(pin_index, false);
        }
    }
}

struct RawGpioBusInput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for RawGpioBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let levels = self.bus.driver.raw_read_levels();
        Ok(pick_levels(levels, &self.bus.pin_indices, self.bus.active_level))
    }
}

/// Picks the bus lines out of one snapshot of the level registers.
fn pick_levels<const N: usize>(levels: u64, pin_indices: &[usize; N], active_level: GpioActiveLevel) -> [bool; N] {
    pin_indices.map(|pin_index| active_level.get_state((levels >> pin_index) & 1 != 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_come_from_both_banks_in_bus_order() {
        let levels = (1 << 17) | (1 << 5) | (1 << 40);
        assert_eq!(
            pick_levels(levels, &[17, 5, 6, 40], GpioActiveLevel::High),
            [true, true, false, true],
        );
    }

    #[test]
    fn active_low_inverts_every_line() {
        assert_eq!(pick_levels(1 << 3, &[3, 4], GpioActiveLevel::Low), [false, true]);
    }
}
