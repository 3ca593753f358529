//! Layered composition and edit history for product mockups.
//!
//! An [`EditorSession`] holds one base image with its live filters, text and
//! overlay layers, crop box and selection mask. Commits flatten those into a
//! new PNG through [`compose::bake`] and record it in an undo/redo history.

pub mod compose;
pub mod error;
pub mod filters;
pub mod history;
pub mod image_store;
pub mod layers;
pub mod project;
pub mod state;
pub mod text;
pub mod tools;
pub mod variations;

pub use compose::Scale;
pub use error::{EditorError, Result};
pub use filters::{FilterKind, FilterState};
pub use history::EditHistory;
pub use image_store::{ImageBuffer, ImageStore, MimeType};
pub use layers::{LayerId, LayerKind, OverlayPatch, Selection, TextLayer, TextPatch};
pub use project::{AspectRatio, ImageSynthesizer, Project, ProjectStore};
pub use state::{DragTarget, EditorSession, EditorSettings};
pub use text::FontFamily;
pub use tools::{HandleType, ToolState};
pub use variations::VariationStore;
