use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid input: {field} {constraint}")]
    InvalidInput {
        field: &'static str,
        constraint: String,
    },

    #[error("Unknown soil type: '{0}'")]
    UnknownSoilType(String),

    #[error("Unknown crop: '{0}'")]
    UnknownCrop(String),

    #[error("Prediction skipped: {0}")]
    PredictionSkipped(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AdvisorError {
    pub fn invalid(field: &'static str, constraint: impl Into<String>) -> Self {
        AdvisorError::InvalidInput {
            field,
            constraint: constraint.into(),
        }
    }

    /// Errors that only affect the statistical branch of a request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AdvisorError::PredictionSkipped(_))
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
