use crate::image_store::ImageBuffer;
use std::collections::HashSet;

/// Most variations a project keeps.
pub const MAX_VARIATIONS: usize = 10;

/// Stable merge: `incoming` first, then `existing`, keeping the first copy of
/// every distinct image and at most `cap` entries.
pub fn merge(existing: &[ImageBuffer], incoming: &[ImageBuffer], cap: usize) -> Vec<ImageBuffer> {
    let mut seen: HashSet<&[u8]> = HashSet::new();
    incoming
        .iter()
        .chain(existing)
        .filter(|&image| seen.insert(image.bytes()))
        .take(cap)
        .cloned()
        .collect()
}

/// Alternate renders attached to a project, most relevant first.
#[derive(Clone, Debug)]
pub struct VariationStore {
    items: Vec<ImageBuffer>,
    cap: usize,
}

impl Default for VariationStore {
    fn default() -> Self {
        Self::new(MAX_VARIATIONS)
    }
}

impl VariationStore {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
        }
    }

    pub fn add(&mut self, incoming: &[ImageBuffer]) {
        self.items = merge(&self.items, incoming, self.cap);
        log::debug!("Variations: merged {} -> {}", incoming.len(), self.items.len());
    }

    /// The main image moved from `previous` to `current`: the old one becomes
    /// a variation and the new one leaves the set.
    pub fn on_main_image_changed(&mut self, previous: &ImageBuffer, current: &ImageBuffer) {
        if previous.same_content(current) {
            return;
        }
        let mut merged = merge(&self.items, std::slice::from_ref(previous), usize::MAX);
        merged.retain(|image| !image.same_content(current));
        merged.truncate(self.cap);
        self.items = merged;
        log::debug!("Variations: main image changed, {} kept", self.items.len());
    }

    pub fn items(&self) -> &[ImageBuffer] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, image: &ImageBuffer) -> bool {
        self.items.iter().any(|i| i.same_content(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_store::ImageStore;
    use image::Rgba;

    fn img(shade: u8) -> ImageBuffer {
        ImageStore::filled(3, 3, Rgba([shade, 0, 0, 255])).encode().unwrap()
    }

    #[test]
    fn incoming_duplicates_take_the_incoming_position() {
        let (a, b, c) = (img(1), img(2), img(3));
        let merged = merge(&[a.clone(), b.clone()], &[b.clone(), c.clone()], MAX_VARIATIONS);
        assert_eq!(merged, vec![b, c, a]);
    }

    #[test]
    fn merge_caps_and_never_repeats() {
        let existing: Vec<_> = (0..8).map(img).collect();
        let incoming: Vec<_> = (4..12).chain(4..6).map(img).collect();
        let merged = merge(&existing, &incoming, MAX_VARIATIONS);
        assert_eq!(merged.len(), MAX_VARIATIONS);
        for (i, x) in merged.iter().enumerate() {
            for y in &merged[i + 1..] {
                assert!(!x.same_content(y));
            }
        }
        assert_eq!(merged[0], img(4));
    }

    #[test]
    fn main_image_change_swaps_old_main_in_and_new_main_out() {
        let (old_main, new_main, v) = (img(10), img(20), img(30));
        let mut store = VariationStore::default();
        store.add(&[new_main.clone(), v.clone()]);
        store.on_main_image_changed(&old_main, &new_main);
        assert_eq!(store.items(), &[old_main, v]);
        assert!(!store.contains(&new_main));
    }

    #[test]
    fn unchanged_main_image_is_ignored() {
        let mut store = VariationStore::default();
        store.add(&[img(1)]);
        store.on_main_image_changed(&img(5), &img(5));
        assert_eq!(store.items(), &[img(1)]);
    }
}
