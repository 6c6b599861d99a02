//! Application Layer
//!
//! The device controller and the pieces it wires together.

pub mod bindings;
pub mod controller;
pub mod relays;

pub use bindings::InputBindings;
pub use controller::{DeviceContext, DeviceController, Hardware, TickSummary};
pub use relays::RelayBank;
