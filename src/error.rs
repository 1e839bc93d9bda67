use thiserror::Error;

/// Shown to the user when a failure carries no message of its own.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// A failure reported by an identity provider, mailer or document store.
///
/// `message` is the backend's own wording and is what the user ends up seeing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ExternalError {
    fn from(err: reqwest::Error) -> Self {
        ExternalError::new(err.to_string())
    }
}

impl From<sqlx::Error> for ExternalError {
    fn from(err: sqlx::Error) -> Self {
        ExternalError::new(err.to_string())
    }
}

impl From<lettre::error::Error> for ExternalError {
    fn from(err: lettre::error::Error) -> Self {
        ExternalError::new(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for ExternalError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        ExternalError::new(err.to_string())
    }
}

impl From<lettre::address::AddressError> for ExternalError {
    fn from(err: lettre::address::AddressError) -> Self {
        ExternalError::new(err.to_string())
    }
}

impl From<serde_json::Error> for ExternalError {
    fn from(err: serde_json::Error) -> Self {
        ExternalError::new(err.to_string())
    }
}

/// Outcome of a failed submission, one variant per external step.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("{0}")]
    AccountCreation(#[source] ExternalError),

    /// The account exists but the verification message was not sent.
    #[error("{source}")]
    VerificationDispatch {
        uid: String,
        #[source]
        source: ExternalError,
    },

    /// The account exists but its profile document was not written.
    #[error("{source}")]
    ProfileWrite {
        uid: String,
        #[source]
        source: ExternalError,
    },
}

impl SignupError {
    /// Single flattened message for the user; the step is not revealed.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Uid of the provider account left without a profile, if any.
    pub fn orphaned_uid(&self) -> Option<&str> {
        match self {
            SignupError::AccountCreation(_) => None,
            SignupError::VerificationDispatch { uid, .. } | SignupError::ProfileWrite { uid, .. } => {
                Some(uid)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_is_the_raw_provider_message() {
        let err = SignupError::AccountCreation(ExternalError::new(
            "Firebase: Error (auth/email-already-in-use).",
        ));
        assert_eq!(err.user_message(), "Firebase: Error (auth/email-already-in-use).");
        assert_eq!(err.orphaned_uid(), None);
    }

    #[test]
    fn empty_message_falls_back() {
        let err = SignupError::ProfileWrite {
            uid: "abc".into(),
            source: ExternalError::new(""),
        };
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
        assert_eq!(err.orphaned_uid(), Some("abc"));
    }
}
