//! RoomLink - Installation Node Library
//!
//! Re-exports the socket core and the device logic, plus the helpers the
//! node binaries share.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config path, supervised runner)
//! - **ambiance**: Device logic: animations, hardware seams, controller (re-exported from workspace)
//! - **roomsockets**: Multi-route WebSocket client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use roomlink::bin_common::{load_config_from_env, supervise, ConfigType, RunConfig};
//! use roomlink::ambiance::{DeviceController, Hardware, NodeConfig};
//! ```

// Re-export workspace libraries for convenience
pub use ambiance;
pub use roomsockets;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{config_from_args, load_config_from_env, parse_args, ConfigType};
    pub use runner::{supervise, RunConfig, DEFAULT_RESTART_DELAY};
}
