/// Error types for geometry, loading and settings
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the math kernel and mesh operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Normalizing a vector whose length is (nearly) zero or not finite.
    #[error("cannot normalize a zero-length or non-finite vector")]
    DegenerateVector,

    /// Face with a vertex count other than 3 or 4.
    #[error("face {face} has {arity} vertices, only triangles and quads are supported")]
    UnsupportedFaceArity {
        /// Index of the offending face.
        face: usize,
        /// Its vertex count.
        arity: usize,
    },

    /// Homogeneous point with w too close to zero for a perspective divide.
    #[error("cannot divide by w = {w}")]
    DivideByZeroW {
        /// The offending w component.
        w: f32,
    },

    /// Face whose first three points are collinear (or has fewer than three).
    #[error("face {face} is degenerate, no normal can be computed")]
    DegenerateFace {
        /// Index of the offending face.
        face: usize,
    },

    /// Vertex index past the end of the position buffer.
    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// The per-face counts do not add up to the index buffer length.
    #[error("face vertex counts sum to {expected}, index buffer holds {got}")]
    FaceCountMismatch {
        /// Sum of the per-face counts.
        expected: usize,
        /// Length of the index buffer.
        got: usize,
    },
}

/// Result type for geometry operations.
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;

/// Errors raised while loading OBJ or MAP files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be opened.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Description of what was wrong.
        message: String,
    },

    /// Face index that does not reference a loaded vertex.
    #[error("line {line}: face index {index} does not reference a vertex")]
    InvalidIndex {
        /// 1-based line number.
        line: usize,
        /// The index as written in the file.
        index: i64,
    },

    /// Block structure error in a MAP file.
    #[error("line {line}: map structure error: {message}")]
    MapStructure {
        /// 1-based line number.
        line: usize,
        /// Description of the structural problem.
        message: String,
    },

    /// The loaded data violates a mesh invariant.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl LoadError {
    /// Create a `Parse` error at the given line.
    #[must_use]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a `MapStructure` error at the given line.
    #[must_use]
    pub fn map_structure(line: usize, message: impl Into<String>) -> Self {
        Self::MapStructure {
            line,
            message: message.into(),
        }
    }
}

/// Result type for loaders.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors raised while reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed settings JSON.
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}
