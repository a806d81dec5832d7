/// Sum-type error taxonomy for the engine. Adapter code (`store`, `market`)
/// uses `anyhow::Error` internally and maps into one of these variants at
/// the boundary it crosses back into the core.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("malformed bracket: {0}")]
    MalformedBracket(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("conflicting name: {0}")]
    ConflictingName(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream market error: {0}")]
    Upstream(String),

    #[error("market service unavailable: {0}")]
    Unavailable(String),

    #[error("market service misconfigured: {0}")]
    Misconfigured(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
