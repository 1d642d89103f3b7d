//! Error types for asset loading.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Which attribute sequence a face corner points into.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AttributeKind {
    Position,
    Texcoord,
    Normal,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeKind::Position => "position",
            AttributeKind::Texcoord => "texcoord",
            AttributeKind::Normal => "normal",
        })
    }
}

/// Errors raised while reading meshes, material libraries and textures.
/// Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("cannot open {}: {source}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("malformed record on line {line} ({reason}): '{text}'")]
    MalformedRecord {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("face on line {line} has {corners} corners; only 3 or 4 are supported")]
    UnsupportedFaceArity { line: usize, corners: usize },

    #[error("{attribute} index {index} on line {line} is outside the pool (len={len})")]
    DanglingIndexReference {
        line: usize,
        attribute: AttributeKind,
        index: i64,
        len: usize,
    },

    #[error("too many unique vertices for 32-bit indices (>{})", u32::MAX)]
    TooManyVertices,

    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl AssetError {
    pub(crate) fn malformed(line: usize, text: &str, reason: impl Into<String>) -> Self {
        AssetError::MalformedRecord {
            line,
            text: text.to_owned(),
            reason: reason.into(),
        }
    }

    /// Line the error was raised on, when it refers to a text record.
    pub fn line(&self) -> Option<usize> {
        match self {
            AssetError::Io { line, .. }
            | AssetError::MalformedRecord { line, .. }
            | AssetError::UnsupportedFaceArity { line, .. }
            | AssetError::DanglingIndexReference { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;
