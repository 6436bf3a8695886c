/// Convenience result type used across lexreel.
pub type LexreelResult<T> = Result<T, LexreelError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Per-item synthesis failures may be downgraded to warnings by the run's
/// failure policy; everything else propagates as-is and aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum LexreelError {
    /// Invalid configuration or caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// No content exists for the requested date and kind.
    #[error("no content: {0}")]
    NotFound(String),

    /// Missing or undecodable asset (template image, font file, audio file).
    #[error("io error: {0}")]
    Io(String),

    /// Font face or text layout failure.
    #[error("render error: {0}")]
    Render(String),

    /// The speech synthesis collaborator failed.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// The video encoding collaborator failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The concatenation collaborator failed.
    #[error("concatenation error: {0}")]
    Concatenation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LexreelError {
    /// Build a [`LexreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LexreelError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`LexreelError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`LexreelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`LexreelError::Synthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Build a [`LexreelError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`LexreelError::Concatenation`] value.
    pub fn concatenation(msg: impl Into<String>) -> Self {
        Self::Concatenation(msg.into())
    }
}
