//! Six-switch braille keyboard for a Linux board acting as a USB HID gadget.
//!
//! Every tick the seven input lines are sampled at once, decoded into at most one [`decode::Action`]
//! and typed on the host through the [`hid::Keyboard`] capability.

pub mod app;
pub mod braille;
pub mod config;
pub mod decode;
pub mod emit;
pub mod hid;
pub mod sampler;
