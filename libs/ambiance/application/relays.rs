//! Relay bank shared between topic handlers and the reconnection resync

use crate::infrastructure::hardware::RelayDriver;
use parking_lot::Mutex;
use roomsockets::{protocol, LogicError, OutputSync};
use std::sync::Arc;
use tracing::warn;

struct Bank {
    driver: Box<dyn RelayDriver>,
    states: Vec<bool>,
}

/// Relays numbered from 1, announcing every state they take
#[derive(Clone)]
pub struct RelayBank {
    inner: Arc<Mutex<Bank>>,
    names: Arc<Vec<String>>,
    device: String,
    destinations: Vec<String>,
}

impl RelayBank {
    pub fn new(
        device: impl Into<String>,
        notify: Option<String>,
        names: Vec<String>,
        driver: Box<dyn RelayDriver>,
    ) -> Self {
        let count = driver.count();
        if names.len() > count {
            warn!("{} relay names for a bank of {}, extra names ignored", names.len(), count);
        }
        Self {
            inner: Arc::new(Mutex::new(Bank {
                driver,
                states: vec![false; count],
            })),
            names: Arc::new(names),
            device: device.into(),
            destinations: notify.into_iter().collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.lock().states.len()
    }

    /// Configured name of relay `number`, if any
    pub fn name(&self, number: usize) -> Option<&str> {
        number.checked_sub(1).and_then(|i| self.names.get(i)).map(String::as_str)
    }

    pub fn states(&self) -> Vec<bool> {
        self.inner.lock().states.clone()
    }

    /// Switch relay `number` and return its announcement
    pub fn set(&self, number: usize, on: bool) -> Result<String, LogicError> {
        let topic = topic_for(number);
        let mut bank = self.inner.lock();
        let index = number
            .checked_sub(1)
            .filter(|i| *i < bank.states.len())
            .ok_or_else(|| LogicError::Handler {
                topic: topic.clone(),
                reason: format!("no such relay (bank has {})", bank.states.len()),
            })?;

        bank.driver.set(index, on).map_err(|e| LogicError::Handler {
            topic: topic.clone(),
            reason: e.to_string(),
        })?;
        bank.states[index] = on;
        Ok(self.announcement(number, on))
    }

    /// `{device}=>[{notify}]=>relayN#state`
    pub fn announcement(&self, number: usize, on: bool) -> String {
        protocol::format(&self.device, &self.destinations, &topic_for(number), if on { "true" } else { "false" })
    }
}

impl OutputSync for RelayBank {
    fn resync_messages(&self) -> Vec<String> {
        self.states()
            .into_iter()
            .enumerate()
            .map(|(i, on)| self.announcement(i + 1, on))
            .collect()
    }
}

pub fn topic_for(number: usize) -> String {
    format!("relay{}", number)
}

/// Accepts true/false, on/off and 1/0
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}
