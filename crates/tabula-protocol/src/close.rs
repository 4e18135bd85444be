//! Close-code classification.
//!
//! Code 1000 is an intentional shutdown and suppresses the automatic
//! reconnect; any other code (or a missing close frame) is abnormal and
//! schedules a retry.

/// RFC 6455 normal-closure code.
pub const NORMAL_CLOSURE: u16 = 1000;

/// How a connection ended, from the reconnect policy's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseKind {
    /// Intentional shutdown; do not retry.
    Normal,
    /// Anything else; schedule a reconnect.
    Abnormal,
}

impl CloseKind {
    /// Classify a close code. `None` means the stream ended without a close
    /// frame, which counts as abnormal.
    #[must_use]
    pub fn classify(code: Option<u16>) -> Self {
        match code {
            Some(NORMAL_CLOSURE) => Self::Normal,
            _ => Self::Abnormal,
        }
    }
}
