// # Retry Classifier
//
// Decides whether a remote API error is worth retrying.
//
// The remote exposes soft, advisory locking: concurrent writers are rejected
// with an error rather than queued, so the client has to retry with backoff
// instead of treating rejection as final. The API returns no structured error
// codes, only message strings, so classification is substring matching against
// a set of known transient-failure signatures. All signature strings live in
// this one type; call sites never do their own matching.

use crate::error::Error;

/// Transient-failure signatures observed from the remote API.
///
/// Covers advisory lock contention, in-progress action conflicts, generic
/// internal errors and transport-level resets.
pub const DEFAULT_TRANSIENT_SIGNATURES: &[&str] = &[
    "Internal error occurred, please contact our support",
    "has an action running, no modification is allowed",
    "DNS Entries are currently being saved",
    "Error setting Dns Entries",
    "is locked",
    "connection reset by peer",
    "unexpected EOF",
];

/// Outcome of classifying one error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Transient; the retry driver may attempt again after backoff
    Retryable,
    /// Permanent; surface immediately, no retry
    Permanent,
}

/// Classifies remote errors as retryable or permanent by message content.
///
/// Classification is a pure function of the rendered error message: the same
/// message always yields the same outcome. Error *type* is deliberately not
/// consulted, since the remote client wraps everything in opaque strings.
#[derive(Debug, Clone)]
pub struct RetryClassifier {
    signatures: Vec<String>,
}

impl RetryClassifier {
    /// Create a classifier with the default transient signature set
    pub fn new() -> Self {
        Self {
            signatures: DEFAULT_TRANSIENT_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Create a classifier with no signatures (everything is permanent)
    pub fn empty() -> Self {
        Self {
            signatures: Vec::new(),
        }
    }

    /// Add a transient signature, returning the classifier (builder style)
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signatures.push(signature.into());
        self
    }

    /// Add transient signatures from an iterator
    pub fn with_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures.extend(signatures.into_iter().map(Into::into));
        self
    }

    /// Classify an error by matching its message against known signatures
    pub fn classify(&self, error: &Error) -> Classification {
        let message = error.to_string();
        if self.signatures.iter().any(|s| message.contains(s.as_str())) {
            Classification::Retryable
        } else {
            Classification::Permanent
        }
    }

    /// Convenience predicate for [`classify`](Self::classify)
    pub fn is_retryable(&self, error: &Error) -> bool {
        self.classify(error) == Classification::Retryable
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_is_retryable() {
        let classifier = RetryClassifier::new();
        let err = Error::api("Internal error occurred, please contact our support");
        assert_eq!(classifier.classify(&err), Classification::Retryable);
    }

    #[test]
    fn action_running_is_retryable() {
        let classifier = RetryClassifier::new();
        let err = Error::api("VPS 'example-vps' has an action running, no modification is allowed");
        assert_eq!(classifier.classify(&err), Classification::Retryable);
    }

    #[test]
    fn unknown_message_is_permanent() {
        let classifier = RetryClassifier::new();
        let err = Error::invalid_input("Incorrect ID format, expected `domain/type/name`");
        assert_eq!(classifier.classify(&err), Classification::Permanent);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = RetryClassifier::new();
        let err = Error::api("DNS Entries are currently being saved");
        let first = classifier.classify(&err);
        for _ in 0..100 {
            assert_eq!(classifier.classify(&err), first);
        }
    }

    #[test]
    fn custom_signature_extends_defaults() {
        let classifier = RetryClassifier::new().with_signature("please slow down");
        let err = Error::api("rate limited: please slow down");
        assert!(classifier.is_retryable(&err));

        // Defaults still apply
        let err = Error::api("Error setting Dns Entries");
        assert!(classifier.is_retryable(&err));
    }

    #[test]
    fn empty_classifier_treats_everything_as_permanent() {
        let classifier = RetryClassifier::empty();
        let err = Error::api("Internal error occurred, please contact our support");
        assert_eq!(classifier.classify(&err), Classification::Permanent);
    }

    #[test]
    fn classification_matches_content_not_variant() {
        // The same message is classified identically regardless of which
        // error variant carries it.
        let classifier = RetryClassifier::new();
        let as_api = Error::api("domain example.com is locked");
        let as_other = Error::Other("domain example.com is locked".to_string());
        assert_eq!(classifier.classify(&as_api), classifier.classify(&as_other));
    }
}
