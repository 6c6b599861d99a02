pub mod envelope;

pub use envelope::{format, parse_topic_value, Envelope, TopicValue, SECTION_SEPARATOR, VALUE_SEPARATOR};
