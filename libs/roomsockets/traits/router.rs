//! Topic dispatch
//!
//! Inbound text is reduced to `(topic, value)` by the envelope protocol and
//! looked up in an explicit table populated at startup. Two match styles are
//! supported:
//!
//! - **Exact**: the topic equals the key (`relay1#true` → `"relay1"`)
//! - **Contains**: the key appears anywhere in the payload after the last
//!   `=>` (`"rfid"` matches `rfid_volcano#ok`)
//!
//! Entries are tried in registration order and the first match wins.
//! Unmatched topics are logged and dropped.

use crate::protocol::parse_topic_value;
use crate::traits::LogicError;
use tracing::{debug, warn};

/// How a table entry recognizes its messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicMatch {
    Exact(String),
    Contains(String),
}

impl TopicMatch {
    pub fn exact(topic: impl Into<String>) -> Self {
        TopicMatch::Exact(topic.into())
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        TopicMatch::Contains(fragment.into())
    }

    fn matches(&self, topic: &str, payload: &str) -> bool {
        match self {
            TopicMatch::Exact(key) => topic == key,
            TopicMatch::Contains(fragment) => payload.contains(fragment.as_str()),
        }
    }
}

/// A message as seen by a handler
#[derive(Debug, Clone, Copy)]
pub struct TopicMessage<'a> {
    /// Route the message arrived on
    pub route: &'a str,
    pub topic: &'a str,
    pub value: Option<&'a str>,
    /// Text after the last `=>`
    pub payload: &'a str,
    /// The full inbound text
    pub raw: &'a str,
}

/// Handler invoked for matching messages
///
/// Runs on the tick loop, so it must not block. Long work belongs in an
/// animation or another thread.
pub trait TopicHandler<C>: Send {
    fn handle(&mut self, ctx: &mut C, message: &TopicMessage<'_>) -> Result<(), LogicError>;
}

struct FnHandler<F>(F);

impl<C, F> TopicHandler<C> for FnHandler<F>
where
    F: FnMut(&mut C, &TopicMessage<'_>) -> Result<(), LogicError> + Send,
{
    fn handle(&mut self, ctx: &mut C, message: &TopicMessage<'_>) -> Result<(), LogicError> {
        (self.0)(ctx, message)
    }
}

/// What happened to one dispatched message
#[derive(Debug)]
pub enum DispatchOutcome {
    Handled,
    Unmatched,
    Failed(LogicError),
}

/// Ordered topic → handler table over a device context `C`
pub struct TopicRouter<C> {
    entries: Vec<(TopicMatch, Box<dyn TopicHandler<C>>)>,
}

impl<C> Default for TopicRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TopicRouter<C> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a closure
    pub fn on<F>(&mut self, matcher: TopicMatch, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &TopicMessage<'_>) -> Result<(), LogicError> + Send + 'static,
        C: 'static,
    {
        self.entries.push((matcher, Box::new(FnHandler(handler))));
        self
    }

    /// Register a handler object
    pub fn on_handler<H>(&mut self, matcher: TopicMatch, handler: H) -> &mut Self
    where
        H: TopicHandler<C> + 'static,
    {
        self.entries.push((matcher, Box::new(handler)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `raw` and run the first matching handler
    pub fn dispatch(&mut self, ctx: &mut C, route: &str, raw: &str) -> DispatchOutcome {
        let Some(tv) = parse_topic_value(raw) else {
            debug!("Ignoring empty message on '{}'", route);
            return DispatchOutcome::Unmatched;
        };

        let message = TopicMessage {
            route,
            topic: tv.topic,
            value: tv.value,
            payload: tv.payload,
            raw,
        };

        let Some((_, handler)) = self
            .entries
            .iter_mut()
            .find(|(matcher, _)| matcher.matches(message.topic, message.payload))
        else {
            let err = LogicError::UnknownTopic(message.topic.to_string());
            warn!("{} (route '{}'), dropping", err, route);
            return DispatchOutcome::Unmatched;
        };

        match handler.handle(ctx, &message) {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                warn!("Handler for '{}' failed: {}", message.topic, e);
                DispatchOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Seen {
        calls: Vec<String>,
    }

    fn router() -> TopicRouter<Seen> {
        let mut router = TopicRouter::new();
        router
            .on(TopicMatch::exact("relay1"), |seen: &mut Seen, msg| {
                seen.calls.push(format!("relay1={}", msg.value.unwrap_or("-")));
                Ok(())
            })
            .on(TopicMatch::contains("rfid"), |seen: &mut Seen, msg| {
                seen.calls.push(format!("rfid:{}", msg.payload));
                Ok(())
            })
            .on(TopicMatch::exact("broken"), |_: &mut Seen, msg| {
                Err(LogicError::Handler {
                    topic: msg.topic.to_string(),
                    reason: "no".into(),
                })
            });
        router
    }

    #[test]
    fn test_exact_and_contains() {
        let mut router = router();
        let mut seen = Seen::default();

        assert!(matches!(
            router.dispatch(&mut seen, "message", "hub=>[me]=>relay1#true"),
            DispatchOutcome::Handled
        ));
        assert!(matches!(
            router.dispatch(&mut seen, "message", "maze=>[me]=>rfid_volcano#ok"),
            DispatchOutcome::Handled
        ));
        assert_eq!(seen.calls, vec!["relay1=true", "rfid:rfid_volcano#ok"]);
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = router();
        router.on(TopicMatch::exact("relay1"), |seen: &mut Seen, _| {
            seen.calls.push("second".into());
            Ok(())
        });
        let mut seen = Seen::default();
        router.dispatch(&mut seen, "message", "relay1#false");
        assert_eq!(seen.calls, vec!["relay1=false"]);
    }

    #[test]
    fn test_unmatched_and_failed_are_not_fatal() {
        let mut router = router();
        let mut seen = Seen::default();

        assert!(matches!(
            router.dispatch(&mut seen, "connect", "Hello from hub"),
            DispatchOutcome::Unmatched
        ));
        assert!(matches!(router.dispatch(&mut seen, "message", ""), DispatchOutcome::Unmatched));
        assert!(matches!(
            router.dispatch(&mut seen, "message", "broken#1"),
            DispatchOutcome::Failed(LogicError::Handler { .. })
        ));
        assert!(seen.calls.is_empty());
    }
}
