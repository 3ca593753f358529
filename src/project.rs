//! Projects and the collaborators the engine talks to: image synthesis,
//! project storage and asset loading.

use crate::error::{EditorError, Result};
use crate::image_store::{ImageBuffer, ImageStore};
use crate::variations::VariationStore;
use image::Rgba;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Width of the aspect-ratio guide canvas.
pub const ASPECT_GUIDE_WIDTH: u32 = 512;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape4x3,
    Portrait3x4,
    Widescreen16x9,
    Tall9x16,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Widescreen16x9,
        AspectRatio::Tall9x16,
    ];

    pub fn parts(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape4x3 => (4, 3),
            AspectRatio::Portrait3x4 => (3, 4),
            AspectRatio::Widescreen16x9 => (16, 9),
            AspectRatio::Tall9x16 => (9, 16),
        }
    }

    /// Solid mid-gray canvas with this ratio, handed to the synthesizer as a
    /// shape hint.
    pub fn aspect_guide(self) -> Result<ImageBuffer> {
        let (w, h) = self.parts();
        let height = (ASPECT_GUIDE_WIDTH as f32 * h as f32 / w as f32).round() as u32;
        ImageStore::filled(ASPECT_GUIDE_WIDTH, height, Rgba([0x80, 0x80, 0x80, 255])).encode()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.parts();
        write!(f, "{}:{}", w, h)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.to_string() == s.trim())
            .ok_or_else(|| format!("unsupported aspect ratio: {}", s))
    }
}

/// A stored mockup: its current image plus the renders around it.
#[derive(Clone, Debug)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub image: ImageBuffer,
    /// The image the project was first generated from, if any.
    pub source_image: Option<ImageBuffer>,
    pub variations: VariationStore,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: ImageBuffer) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prompt: String::new(),
            image,
            source_image: None,
            variations: VariationStore::default(),
        }
    }

    /// Makes `image` the main image; the previous one joins the variations.
    pub fn replace_main_image(&mut self, image: ImageBuffer) {
        if self.image.same_content(&image) {
            return;
        }
        self.variations.on_main_image_changed(&self.image, &image);
        self.image = image;
    }

    pub fn add_variations(&mut self, incoming: &[ImageBuffer]) {
        self.variations.add(incoming);
    }

    pub fn record_edit(&mut self, instructions: &str) {
        if self.prompt.is_empty() {
            self.prompt = format!("EDIT: {}", instructions);
        } else {
            self.prompt = format!("{}\nEDIT: {}", self.prompt, instructions);
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            variation_count: self.variations.len(),
        }
    }
}

/// Listing entry without image payloads.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub variation_count: usize,
}

#[derive(Clone, Debug)]
pub struct EditRequest {
    pub image: ImageBuffer,
    pub instructions: String,
    pub style_reference: Option<ImageBuffer>,
    /// White marks the area to change; `None` edits everywhere.
    pub mask: Option<ImageBuffer>,
}

#[derive(Clone, Debug)]
pub struct VariationRequest {
    pub image: ImageBuffer,
    pub instructions: String,
    pub count: usize,
    pub aspect_guide: Option<ImageBuffer>,
}

/// Generates images. Implementations may call out to a remote model.
pub trait ImageSynthesizer {
    fn edit(&mut self, request: &EditRequest) -> Result<ImageBuffer>;

    /// Should return `request.count` images; fewer is accepted, none is a
    /// failure.
    fn variations(&mut self, request: &VariationRequest) -> Result<Vec<ImageBuffer>>;
}

/// Asks `synth` for variations, rejecting an empty answer.
pub fn request_variations(
    synth: &mut dyn ImageSynthesizer,
    request: &VariationRequest,
) -> Result<Vec<ImageBuffer>> {
    let images = synth.variations(request)?;
    if images.is_empty() {
        log::warn!("Synthesizer returned no variations");
        return Err(EditorError::SynthesisFailure(
            "no variations were generated".to_string(),
        ));
    }
    Ok(images)
}

pub trait ProjectStore {
    fn put(&mut self, project: &Project) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<Project>>;
    fn delete(&mut self, id: &str) -> Result<()>;
    fn list(&self) -> Result<Vec<ProjectSummary>>;
}

/// Keeps projects in memory, ordered by id.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: BTreeMap<String, Project>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn put(&mut self, project: &Project) -> Result<()> {
        if project.id.is_empty() {
            return Err(EditorError::Store("project id must not be empty".to_string()));
        }
        log::debug!("Store: put {}", project.id);
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.get(id).cloned())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        match self.projects.remove(id) {
            Some(_) => Ok(()),
            None => Err(EditorError::Store(format!("no project {}", id))),
        }
    }

    fn list(&self) -> Result<Vec<ProjectSummary>> {
        Ok(self.projects.values().map(Project::summary).collect())
    }
}

/// Turns user files into validated image buffers.
pub trait AssetLoader {
    fn load(&self, path: &Path) -> Result<ImageBuffer>;
}

pub struct FileAssetLoader;

impl AssetLoader for FileAssetLoader {
    fn load(&self, path: &Path) -> Result<ImageBuffer> {
        let bytes = std::fs::read(path)?;
        let image = ImageBuffer::sniff(bytes)?;
        log::info!(
            "Loaded {} ({}x{}, {})",
            path.display(),
            image.width(),
            image.height(),
            image.mime()
        );
        Ok(image)
    }
}
