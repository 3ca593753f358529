pub mod crop;
pub mod mask;
pub mod transform;

pub use crop::{CropTool, Region};
pub use mask::MaskTool;
pub use transform::HandleType;

use crate::layers::Selection;

/// The one interaction that may be active at a time.
pub enum ToolState {
    None,
    Cropping(CropTool),
    Masking(MaskTool),
    LayerSelected(Selection),
}

impl ToolState {
    pub fn name(&self) -> &str {
        match self {
            ToolState::None => "None",
            ToolState::Cropping(_) => "Crop",
            ToolState::Masking(_) => "Mask",
            ToolState::LayerSelected(_) => "Layer",
        }
    }

    pub fn selection(&self) -> Option<Selection> {
        match self {
            ToolState::LayerSelected(s) => Some(*s),
            _ => None,
        }
    }

    pub fn crop(&self) -> Option<&CropTool> {
        match self {
            ToolState::Cropping(c) => Some(c),
            _ => None,
        }
    }

    pub fn mask(&self) -> Option<&MaskTool> {
        match self {
            ToolState::Masking(m) => Some(m),
            _ => None,
        }
    }
}
