//! Infrastructure Layer
//!
//! Configuration, logging, shutdown and the hardware seams the device logic
//! drives.

pub mod config;
pub mod hardware;
pub mod logging;
pub mod shutdown;

pub use config::{ConfigError, NodeConfig};
pub use hardware::{
    ChannelInputs, HardwareError, HostRelays, InputEvent, InputSource, LedStrip, LoggingStrip, MemoryStrip,
    NoInputs, RelayDriver,
};
pub use logging::init_tracing;
pub use shutdown::ShutdownManager;
