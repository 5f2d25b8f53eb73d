/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required environment variable {var} is not set")]
    Missing { var: &'static str },

    #[error("Required environment variable {var} is empty")]
    Empty { var: &'static str },

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Name of the environment variable that failed validation.
    pub fn var(&self) -> &'static str {
        match self {
            Self::Missing { var } | Self::Empty { var } | Self::Invalid { var, .. } => var,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
