//! Node-level error type.

use thiserror::Error;

/// Errors returned by [`ExecutableNode::execute`](crate::ExecutableNode::execute).
///
/// The executor uses the variant to decide retry behaviour:
/// - `Retryable` — the node is executed again after an exponential back-off.
/// - `Fatal`     — the run stops on this node and the cursor stays put.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Transient failure (rate limit, timeout, ...).
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; retrying cannot help.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl NodeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(msg) | Self::Fatal(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_and_message() {
        let transient = NodeError::Retryable("rate limited".into());
        assert!(transient.is_retryable());
        assert_eq!(transient.message(), "rate limited");
        assert_eq!(transient.to_string(), "retryable node error: rate limited");

        assert!(!NodeError::Fatal("bad prompt".into()).is_retryable());
    }
}
