//! Error types
//!
//! [`SourceError`] covers data source access (files, parsing, missing layers).
//! [`PipelineError`] is what a stage sequence reports back to its caller.

use std::fmt;
use std::io;

/// Error type for data source operations
#[derive(Debug)]
pub enum SourceError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// Parse error (invalid RON metadata)
    Parse(ron::error::SpannedError),
    /// Serialization error (writing RON metadata)
    Serialize(ron::Error),
    /// Requested layer is not known to the source
    NotFound(String),
    /// Buffer does not match the declared grid extent or encoding
    Format(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(err) => write!(f, "Source IO error: {}", err),
            SourceError::Parse(err) => write!(f, "Source parse error: {}", err),
            SourceError::Serialize(err) => write!(f, "Source serialize error: {}", err),
            SourceError::NotFound(id) => write!(f, "Layer not found: {}", id),
            SourceError::Format(msg) => write!(f, "Invalid voxel buffer: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(err) => Some(err),
            SourceError::Parse(err) => Some(err),
            SourceError::Serialize(err) => Some(err),
            SourceError::NotFound(_) => None,
            SourceError::Format(_) => None,
        }
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl From<ron::error::SpannedError> for SourceError {
    fn from(err: ron::error::SpannedError) -> Self {
        SourceError::Parse(err)
    }
}

impl From<ron::Error> for SourceError {
    fn from(err: ron::Error) -> Self {
        SourceError::Serialize(err)
    }
}

/// Error reported by a pipeline stage sequence or a parameter edit
#[derive(Debug)]
pub enum PipelineError {
    /// The data source failed to deliver metadata or a voxel buffer
    LoadFailure(SourceError),
    /// Segment clipping or SDF derivation failed
    DerivationFailure(String),
    /// Render was invoked without the fields the current mode needs
    RenderPrecondition(String),
    /// Layer id not present in the volume metadata
    UnknownLayer(String),
    /// Parameter value outside its domain
    InvalidParam(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LoadFailure(err) => write!(f, "Load failed: {}", err),
            PipelineError::DerivationFailure(msg) => write!(f, "Derivation failed: {}", msg),
            PipelineError::RenderPrecondition(msg) => write!(f, "Render precondition: {}", msg),
            PipelineError::UnknownLayer(id) => write!(f, "Unknown layer: {}", id),
            PipelineError::InvalidParam(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::LoadFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        PipelineError::LoadFailure(err)
    }
}
