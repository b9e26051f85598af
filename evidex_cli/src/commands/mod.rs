pub mod probe;
pub mod profiles;
pub mod research;
pub mod sources;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Source '{0}' not found (see `evidex sources`)")]
    SourceNotFound(String),

    #[error("Profile '{0}' not found (see `evidex profiles`)")]
    ProfileNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] evidex_core::error::PipelineError),

    #[error("Source error: {0}")]
    Source(#[from] evidex_core::error::SourceError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] evidex_core::synthesis::SynthesisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
