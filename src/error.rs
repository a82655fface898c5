use std::path::PathBuf;

/// Fatal startup errors.
///
/// Everything in this enum means the process must halt rather than run
/// partially configured; runtime failures degrade instead (tool errors are
/// returned to the model as text, agent failures become tagged chat
/// answers).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("prompt template not found: {0}")]
    MissingTemplate(PathBuf),

    #[error("failed to read prompt template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no API key found: set GEMINI_API_KEY or GOOGLE_API_KEY")]
    MissingApiKey,
}
