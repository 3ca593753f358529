use crate::layers::LayerId;
use thiserror::Error;

/// Errors surfaced by the composition engine.
///
/// Every destructive operation either succeeds completely or returns one of
/// these with the session left exactly as it was.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The bytes could not be interpreted as an image.
    #[error("failed to decode image")]
    DecodeFailure(#[source] image::ImageError),

    /// No drawing surface could be produced or encoded.
    #[error("bake failed: {0}")]
    BakeFailure(String),

    /// A scale factor was requested against a zero-sized image or display.
    #[error("invalid geometry: {width}x{height}")]
    GeometryInvalid { width: f32, height: f32 },

    /// The image synthesis collaborator returned nothing usable.
    #[error("image synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),

    /// The project store collaborator rejected an operation.
    #[error("project store: {0}")]
    Store(String),

    #[error("failed to read asset")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;
