use crate::image_store::ImageBuffer;

/// Linear undo/redo over committed image states.
///
/// Entries live in an append-only log. `len` marks how much of it is live:
/// a push after an undo overwrites the slot after `index` and resets `len`,
/// so abandoned redo states are never reachable again.
///
/// Slots past `len` keep their images allocated until a later push
/// overwrites them or [`EditHistory::reset`] clears the log. At most the
/// deepest undo chain seen since the last reset is retained this way.
pub struct EditHistory {
    entries: Vec<ImageBuffer>,
    len: usize,
    index: usize,
}

impl EditHistory {
    /// A history always holds at least the state it was seeded with.
    pub fn new(initial: ImageBuffer) -> Self {
        Self {
            entries: vec![initial],
            len: 1,
            index: 0,
        }
    }

    pub fn push(&mut self, image: ImageBuffer) {
        let slot = self.index + 1;
        if slot < self.entries.len() {
            self.entries[slot] = image;
        } else {
            self.entries.push(image);
        }
        if self.len > slot {
            log::debug!("History: dropping {} redo state(s)", self.len - slot);
        }
        self.len = slot + 1;
        self.index = slot;
        log::debug!("History: commit {} of {}", self.index + 1, self.len);
    }

    pub fn undo(&mut self) -> &ImageBuffer {
        if self.can_undo() {
            self.index -= 1;
        }
        self.current()
    }

    pub fn redo(&mut self) -> &ImageBuffer {
        if self.can_redo() {
            self.index += 1;
        }
        self.current()
    }

    pub fn current(&self) -> &ImageBuffer {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.len
    }

    /// Live entries, oldest first.
    pub fn entries(&self) -> &[ImageBuffer] {
        &self.entries[..self.len]
    }

    /// Starts over from a different base image.
    pub fn reset(&mut self, initial: ImageBuffer) {
        self.entries.clear();
        self.entries.push(initial);
        self.len = 1;
        self.index = 0;
        log::debug!("History: reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_store::ImageStore;
    use image::Rgba;

    fn img(shade: u8) -> ImageBuffer {
        ImageStore::filled(2, 2, Rgba([shade, shade, shade, 255]))
            .encode()
            .unwrap()
    }

    #[test]
    fn push_after_undo_discards_future() {
        let (i0, i1, i2, i3) = (img(0), img(1), img(2), img(3));
        let mut history = EditHistory::new(i0.clone());
        history.push(i1.clone());
        history.push(i2.clone());
        assert_eq!(history.index(), 2);

        assert_eq!(history.undo(), &i1);
        assert_eq!(history.index(), 1);

        history.push(i3.clone());
        assert_eq!(history.entries(), &[i0, i1, i3.clone()]);
        assert_eq!(history.index(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.redo(), &i3);
    }

    #[test]
    fn abandoned_states_are_hidden_and_reused() {
        let i2 = img(2);
        let mut history = EditHistory::new(img(0));
        history.push(img(1));
        history.push(i2.clone());
        history.undo();
        history.undo();
        history.push(img(3));
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries.len(), 3);
        assert!(history.entries().iter().all(|e| !e.same_content(&i2)));
        assert!(!history.can_redo());

        history.push(img(4));
        assert_eq!(history.len(), 3);
        assert_eq!(history.entries.len(), 3);

        history.reset(img(9));
        assert_eq!(history.entries.len(), 1);
    }

    #[test]
    fn undo_and_redo_at_the_ends_are_no_ops() {
        let mut history = EditHistory::new(img(0));
        assert_eq!(history.undo(), &img(0));
        assert_eq!(history.redo(), &img(0));
        assert_eq!(history.index(), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn index_stays_in_range_for_mixed_sequences() {
        let mut history = EditHistory::new(img(0));
        // 0 = push, 1 = undo, 2 = redo
        let ops = [0, 0, 1, 1, 1, 2, 0, 2, 2, 1, 0, 0, 1, 2, 2, 1, 1, 1, 1, 0];
        for (n, op) in ops.into_iter().enumerate() {
            match op {
                0 => {
                    let before = history.index();
                    history.push(img(n as u8 + 10));
                    assert_eq!(history.len(), before + 2);
                }
                1 => {
                    history.undo();
                }
                _ => {
                    history.redo();
                }
            }
            assert!(history.index() < history.len());
        }
    }

    #[test]
    fn reset_seeds_a_single_entry() {
        let mut history = EditHistory::new(img(0));
        history.push(img(1));
        history.reset(img(9));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), &img(9));
        assert!(!history.can_undo());
    }
}
