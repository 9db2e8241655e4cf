use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("assessment provider request failed: {0}")]
    Transport(String),
    #[error("assessment provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode assessment provider response: {0}")]
    Decode(String),
    #[error("profile payload has no grid scores")]
    MissingGridData,
    #[error("image rendering failed: {0}")]
    Render(String),
}

impl ProviderError {
    /// Whether the failure came from talking to the remote API rather than
    /// from the data we handed it.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. } | Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderError;

    #[test]
    fn upstream_classification() {
        assert!(ProviderError::Transport("connection reset".to_owned()).is_upstream());
        assert!(ProviderError::Status { status: 502, body: String::new() }.is_upstream());
        assert!(!ProviderError::MissingGridData.is_upstream());
        assert!(!ProviderError::Render("encoder".to_owned()).is_upstream());
    }

    #[test]
    fn status_message_includes_code_and_body() {
        let error = ProviderError::Status { status: 401, body: "bad key".to_owned() };
        assert_eq!(error.to_string(), "assessment provider returned 401: bad key");
    }
}
