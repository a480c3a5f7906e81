use thiserror::Error;

/// Broken preconditions of the geometry helpers. These abort the whole
/// transformation; nothing upstream tries to recover from them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("cannot normalize a zero-length vector")]
    ZeroLengthVector,

    #[error("line {line:?}: only XY motion commands can be split")]
    NotAnXyMove { line: Option<usize> },

    #[error("line {line:?}: extrusion must be relative to split or slope a move")]
    AbsoluteExtrusion { line: Option<usize> },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
