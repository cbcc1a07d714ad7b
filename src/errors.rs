use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Bridge error: {0}")]
    PlatformError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unsupported firmware version: {0}")]
    UnsupportedVersion(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// Whether this error is the locator's not-found-yet signal, the one
    /// condition a polling wait is allowed to keep retrying on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AutomationError::ElementNotFound(_))
    }
}
