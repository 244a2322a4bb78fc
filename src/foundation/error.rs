/// Convenience result type used across the crate.
pub type FlatlandResult<T> = Result<T, FlatlandError>;

/// Top-level error taxonomy used by session APIs.
#[derive(thiserror::Error, Debug)]
pub enum FlatlandError {
    /// Invalid user-provided parameters or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Capture or encoder acquisition failed; the session never starts ticking.
    #[error("acquisition error: {0}")]
    Acquisition(String),

    /// The simulation collaborator failed while the session was running.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Encoding or payload delivery failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Session lifecycle contract violation.
    #[error("session error: {0}")]
    Session(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlatlandError {
    /// Build a [`FlatlandError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlatlandError::Acquisition`] value.
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    /// Build a [`FlatlandError::Simulation`] value.
    pub fn simulation(msg: impl Into<String>) -> Self {
        Self::Simulation(msg.into())
    }

    /// Build a [`FlatlandError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`FlatlandError::Session`] value.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}
