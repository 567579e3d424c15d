use std::path::{Path, PathBuf};

/// Convenience result type used across og-gen.
pub type OgResult<T> = Result<T, OgError>;

/// Error taxonomy for reading documents, rendering cards, and writing outputs.
#[derive(thiserror::Error, Debug)]
pub enum OgError {
    /// A required invocation argument was absent or empty.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// The input document does not exist.
    #[error("file not found at {}", path.display())]
    NotFound { path: PathBuf },

    /// Front matter could not be parsed or serialized.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Layout, font, SVG, rasterization, or PNG encoding failed.
    #[error("render error: {0}")]
    RenderFailure(String),

    /// Creating a directory or writing a file failed. The io error is the source.
    #[error("write error at {}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OgError {
    /// Build an [`OgError::MissingArgument`] value.
    pub fn missing_argument(msg: impl Into<String>) -> Self {
        Self::MissingArgument(msg.into())
    }

    /// Build an [`OgError::NotFound`] value.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Build an [`OgError::Metadata`] value.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Build an [`OgError::RenderFailure`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::RenderFailure(msg.into())
    }

    /// Build an [`OgError::WriteFailure`] value.
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Map a read error on `path`, turning `NotFound` into [`OgError::NotFound`].
    pub fn from_read(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::not_found(path);
        }
        Self::Other(anyhow::Error::new(err).context(format!("read '{}'", path.as_ref().display())))
    }
}
