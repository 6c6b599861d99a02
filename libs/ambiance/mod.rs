//! # Ambiance
//!
//! Device logic for the installation's nodes, built on `roomsockets`.
//!
//! - **Animation Supervisor**: one interruptible LED routine at a time, each
//!   on its own thread, replaced atomically on the next command
//! - **Routines and scenes**: fills, pulses, blinks, transitions, rainbow,
//!   sequenced into named scenes started by trigger payloads
//! - **Hardware seams**: LED strip, relay bank and input traits with host and
//!   in-memory implementations
//! - **DeviceController**: owns the route manager, supervisor and hardware
//!   and runs the tick loop

pub mod animation;
pub mod application;
pub mod infrastructure;

pub use animation::{AnimationContext, AnimationSupervisor, Palette, Rgb, Routine, Scene, Zone};
pub use application::{DeviceContext, DeviceController, Hardware, InputBindings, RelayBank, TickSummary};
pub use infrastructure::{init_tracing, ConfigError, NodeConfig, ShutdownManager};
