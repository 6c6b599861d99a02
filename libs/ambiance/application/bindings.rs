//! Input bindings: card reads and button presses to outbound envelopes

use crate::infrastructure::config::NodeConfig;
use crate::infrastructure::hardware::InputEvent;
use roomsockets::Envelope;
use std::collections::BTreeMap;
use tracing::debug;

/// Topic used for cards without a binding
pub const UNBOUND_CARD_TOPIC: &str = "card";

pub struct InputBindings {
    device: String,
    destinations: Vec<String>,
    cards: BTreeMap<String, String>,
    buttons: BTreeMap<String, String>,
}

impl InputBindings {
    pub fn new(
        device: impl Into<String>,
        notify: Option<String>,
        cards: BTreeMap<String, String>,
        buttons: BTreeMap<String, String>,
    ) -> Self {
        Self {
            device: device.into(),
            destinations: notify.into_iter().collect(),
            cards,
            buttons,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.device_name.clone(),
            config.notify.clone(),
            config.cards.clone(),
            config.buttons.clone(),
        )
    }

    /// Envelope to send for `event`, if any
    ///
    /// Unbound cards are still reported as `card#<id>`; unbound buttons and
    /// releases send nothing.
    pub fn envelope_for(&self, event: &InputEvent) -> Option<String> {
        let payload = match event {
            InputEvent::Card(id) => match self.cards.get(id) {
                Some(payload) => payload.clone(),
                None => format!("{}#{}", UNBOUND_CARD_TOPIC, id),
            },
            InputEvent::Button { name, pressed: true } => match self.buttons.get(name) {
                Some(payload) => payload.clone(),
                None => {
                    debug!("Button '{}' has no binding", name);
                    return None;
                }
            },
            InputEvent::Button { pressed: false, .. } => return None,
        };

        let (topic, value) = match payload.split_once('#') {
            Some((topic, value)) => (topic.to_string(), Some(value.to_string())),
            None => (payload, None),
        };
        let envelope = Envelope {
            sender: self.device.clone(),
            destinations: self.destinations.clone(),
            topic,
            value,
        };
        Some(envelope.to_string())
    }
}
