/// Trait for devices whose outputs must be announced whenever they connect
///
/// The hub has no way to learn a relay's or a lock's real state on its
/// own, so whenever every route comes up (the first start included) the
/// manager sends each envelope returned here on the "message" route.
pub trait OutputSync: Send + Sync {
    /// Envelopes describing the current outward state, in send order
    fn resync_messages(&self) -> Vec<String>;
}

/// Output sync for devices without side-effecting outputs
pub struct NoOutputs;

impl OutputSync for NoOutputs {
    fn resync_messages(&self) -> Vec<String> {
        Vec::new()
    }
}
