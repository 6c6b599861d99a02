//! # RoomSockets Manager
//!
//! Owner of a device's routes and of the reconnection state machine.

pub mod manager;

pub use manager::{Delivery, InboundMessage, ManagerEvent, PollReport, RouteFailure, RouteManager};
