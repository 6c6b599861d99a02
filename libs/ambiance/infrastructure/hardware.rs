//! Hardware seams
//!
//! LED strips, relay banks and discrete inputs sit behind small traits so
//! the same device logic runs against real drivers, a host simulation or a
//! test double.

use crate::animation::Rgb;
use crossbeam_channel::{Receiver, TryRecvError};
use thiserror::Error;
use tracing::{debug, info, trace};

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Pixel {index} out of range (strip has {len})")]
    PixelOutOfRange { index: usize, len: usize },

    #[error("Relay {index} out of range (bank has {count})")]
    RelayOutOfRange { index: usize, count: usize },

    #[error("Bus error: {0}")]
    Bus(String),
}

/// Addressable LED strip; writes are buffered until `flush`
pub trait LedStrip: Send {
    fn len(&self) -> usize;

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), HardwareError>;

    fn flush(&mut self) -> Result<(), HardwareError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bank of on/off outputs, indexed from 0
pub trait RelayDriver: Send {
    fn count(&self) -> usize;

    fn set(&mut self, index: usize, on: bool) -> Result<(), HardwareError>;
}

/// Discrete events from readers and buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// An RFID card id was read
    Card(String),
    Button { name: String, pressed: bool },
}

/// Polled once per tick by the controller
pub trait InputSource: Send {
    fn poll(&mut self) -> Option<InputEvent>;
}

/// One recorded pixel write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelWrite {
    /// Name of the writing thread
    pub writer: String,
    pub index: usize,
    pub color: Rgb,
}

/// In-memory strip; optionally records every write with its thread name
pub struct MemoryStrip {
    pixels: Vec<Rgb>,
    flushes: usize,
    log: Option<Vec<PixelWrite>>,
}

impl MemoryStrip {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Rgb::BLACK; len],
            flushes: 0,
            log: None,
        }
    }

    pub fn recording(len: usize) -> Self {
        Self {
            log: Some(Vec::new()),
            ..Self::new(len)
        }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn writes(&self) -> &[PixelWrite] {
        self.log.as_deref().unwrap_or(&[])
    }
}

impl LedStrip for MemoryStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), HardwareError> {
        let len = self.pixels.len();
        let pixel = self
            .pixels
            .get_mut(index)
            .ok_or(HardwareError::PixelOutOfRange { index, len })?;
        *pixel = color;
        if let Some(log) = self.log.as_mut() {
            log.push(PixelWrite {
                writer: std::thread::current().name().unwrap_or("unnamed").to_string(),
                index,
                color,
            });
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HardwareError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Host stand-in for a strip: keeps a buffer and traces every frame
pub struct LoggingStrip {
    inner: MemoryStrip,
}

impl LoggingStrip {
    pub fn new(len: usize) -> Self {
        Self {
            inner: MemoryStrip::new(len),
        }
    }
}

impl LedStrip for LoggingStrip {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), HardwareError> {
        self.inner.set_pixel(index, color)
    }

    fn flush(&mut self) -> Result<(), HardwareError> {
        self.inner.flush()?;
        let lit = self.inner.pixels().iter().filter(|p| !p.is_black()).count();
        trace!("[STRIP] frame {}: {}/{} lit", self.inner.flushes(), lit, self.inner.len());
        Ok(())
    }
}

/// Host relay bank: remembers states and logs switches
pub struct HostRelays {
    states: Vec<bool>,
}

impl HostRelays {
    pub fn new(count: usize) -> Self {
        Self {
            states: vec![false; count],
        }
    }

    pub fn states(&self) -> &[bool] {
        &self.states
    }
}

impl RelayDriver for HostRelays {
    fn count(&self) -> usize {
        self.states.len()
    }

    fn set(&mut self, index: usize, on: bool) -> Result<(), HardwareError> {
        let count = self.states.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(HardwareError::RelayOutOfRange { index, count })?;
        *state = on;
        info!("[RELAY] relay{} -> {}", index + 1, if on { "on" } else { "off" });
        Ok(())
    }
}

pub struct NoInputs;

impl InputSource for NoInputs {
    fn poll(&mut self) -> Option<InputEvent> {
        None
    }
}

/// Inputs fed from another thread (stdin reader, test harness, reader driver)
pub struct ChannelInputs {
    rx: Receiver<InputEvent>,
    closed: bool,
}

impl ChannelInputs {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx, closed: false }
    }
}

impl InputSource for ChannelInputs {
    fn poll(&mut self) -> Option<InputEvent> {
        if self.closed {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("Input channel closed");
                self.closed = true;
                None
            }
        }
    }
}

/// Parse one line of simulated input: `card <id>`, `press <name>`, `release <name>`
pub fn parse_input_line(line: &str) -> Option<InputEvent> {
    let (verb, arg) = line.trim().split_once(char::is_whitespace)?;
    let arg = arg.trim();
    if arg.is_empty() {
        return None;
    }
    match verb {
        "card" => Some(InputEvent::Card(arg.to_string())),
        "press" => Some(InputEvent::Button {
            name: arg.to_string(),
            pressed: true,
        }),
        "release" => Some(InputEvent::Button {
            name: arg.to_string(),
            pressed: false,
        }),
        _ => None,
    }
}
