use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported file type: {0}. Please use JPEG, PNG, GIF, or WebP.")]
    UnsupportedMediaType(String),

    #[error("Anthropic API key is missing. Set ANTHROPIC_API_KEY in the environment or a .env file.")]
    MissingCredential,

    #[error("Invalid response format from Anthropic API: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Could not recover feedback from model reply (missing: {})", .missing.join(", "))]
    UnparseableResponse { missing: Vec<&'static str> },

    #[error("AI provider error: {0}")]
    AiProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

// Serialized as the Display string so errors can sit next to feedback in JSON output.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
