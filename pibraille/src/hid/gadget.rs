use crate::hid::{HidResult, Keyboard, KeyboardReport, Keycode};
use log::{debug, trace};
use std::fmt::{Debug, Formatter};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A keyboard backed by a Linux USB gadget HID function (`/dev/hidgN`), or any other byte sink.
///
/// Keeps the set of held keys and writes the full report after every press or release.
pub struct HidGadget<W: Write> {
    writer: W,
    report: KeyboardReport,
}

impl HidGadget<File> {
    /// Opens the gadget's character device for writing.
    pub fn open(path: impl AsRef<Path>) -> HidResult<Self> {
        let file = OpenOptions::new().write(true).open(path.as_ref())?;
        debug!("Opened HID gadget {}", path.as_ref().display());
        Ok(Self::new(file))
    }
}

impl<W: Write> HidGadget<W> {
    pub fn new(writer: W) -> Self {
        HidGadget {
            writer,
            report: KeyboardReport::default(),
        }
    }

    /// The keys currently held, as last sent to the host.
    pub fn report(&self) -> &KeyboardReport {
        &self.report
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self) -> HidResult<()> {
        let bytes = self.report.to_bytes();
        trace!("HID report {:02X?}", bytes);
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Debug for HidGadget<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HidGadget({:?})", self.report)
    }
}

impl<W: Write> Keyboard for HidGadget<W> {
    fn press(&mut self, keys: &[Keycode]) -> HidResult<()> {
        // Keys added before a rollover stay held and are still reported, so a release can undo them.
        let added = keys.iter().try_for_each(|&key| self.report.add(key));
        let sent = self.send();
        added.and(sent)
    }

    fn release(&mut self, keys: &[Keycode]) -> HidResult<()> {
        for &key in keys {
            self.report.remove(key);
        }
        self.send()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::HidError;
    use std::io;

    fn reports(bytes: &[u8]) -> Vec<[u8; 8]> {
        bytes
            .chunks(KeyboardReport::SIZE)
            .map(|chunk| chunk.try_into().unwrap())
            .collect()
    }

    #[test]
    fn chord_press_and_release() {
        let mut gadget = HidGadget::new(Vec::new());
        gadget.press(&[Keycode::LEFT_GUI, Keycode::TAB]).unwrap();
        gadget.release(&[Keycode::LEFT_GUI, Keycode::TAB]).unwrap();

        assert!(gadget.report().is_empty());
        assert_eq!(
            reports(&gadget.into_inner()),
            vec![
                [0x08, 0, 0x2B, 0, 0, 0, 0, 0],
                [0x00, 0, 0x00, 0, 0, 0, 0, 0],
            ],
        );
    }

    #[test]
    fn overlapping_keys_release_independently() {
        let mut gadget = HidGadget::new(Vec::new());
        gadget.press(&[Keycode::LEFT_SHIFT, Keycode::A]).unwrap();
        gadget.press(&[Keycode::TAB]).unwrap();
        gadget.release(&[Keycode::LEFT_SHIFT, Keycode::A]).unwrap();

        assert_eq!(gadget.report().to_bytes(), [0, 0, 0, 0x2B, 0, 0, 0, 0]);
    }

    #[test]
    fn rollover_still_reports_and_can_be_released() {
        let mut gadget = HidGadget::new(Vec::new());
        let keys: Vec<_> = "ABCDEFG".chars().filter_map(Keycode::letter).collect();

        assert_eq!(gadget.press(&keys), Err(HidError::Rollover));
        assert_eq!(gadget.report().keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);

        gadget.release(&keys).unwrap();
        assert!(gadget.report().is_empty());
        assert_eq!(reports(&gadget.into_inner()).len(), 2);
    }

    #[derive(Debug)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_surface_as_io() {
        let mut gadget = HidGadget::new(BrokenPipe);
        assert_eq!(gadget.press(&[Keycode::A]), Err(HidError::Io(io::ErrorKind::BrokenPipe)));
        // The held state is still tracked, so a later release clears it
        let _ = gadget.release(&[Keycode::A]);
        assert!(gadget.report().is_empty());
    }
}
