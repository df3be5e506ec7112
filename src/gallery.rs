use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Idle,
    Exporting,
    Done(PathBuf),
    Failed(String),
}

/// One framed screenshot in the gallery. Pixels are behind an `Arc` so an
/// export job can snapshot them without copying the whole image.
#[derive(Debug, Clone)]
pub struct ScreenshotItem {
    pub id: Uuid,
    pub file_name: String,
    pub caption: String,
    pub pixels: Arc<RgbaImage>,
    pub original_width: u32,
    pub original_height: u32,
    pub added_at: DateTime<Utc>,
    pub status: ExportStatus,
}

impl ScreenshotItem {
    pub fn new(file_name: String, pixels: Arc<RgbaImage>) -> Self {
        let (width, height) = pixels.dimensions();

        Self {
            id: Uuid::new_v4(),
            file_name,
            caption: String::new(),
            pixels,
            original_width: width,
            original_height: height,
            added_at: Utc::now(),
            status: ExportStatus::Idle,
        }
    }

    pub fn start_export(&mut self) {
        self.status = ExportStatus::Exporting;
    }

    pub fn complete_export(&mut self, path: PathBuf) {
        self.status = ExportStatus::Done(path);
    }

    pub fn fail_export(&mut self, error: String) {
        self.status = ExportStatus::Failed(error);
    }
}

/// Ordered item store addressed by id. Image replacement swaps in a whole
/// new record (keeping id, caption and insertion time) so nothing derived
/// from the old pixels can survive it.
pub struct Gallery {
    items: Vec<ScreenshotItem>,
}

impl Gallery {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn add_item(&mut self, item: ScreenshotItem) -> Uuid {
        let id = item.id;
        self.items.push(item);
        id
    }

    pub fn items(&self) -> &[ScreenshotItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [ScreenshotItem] {
        &mut self.items
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut ScreenshotItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Atomically replace an item's image. Returns false if the id is gone
    /// (the item list never shrinks today, but a failed lookup must not
    /// touch anything).
    pub fn replace_image(&mut self, id: Uuid, file_name: String, pixels: Arc<RgbaImage>) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };

        let old = &self.items[index];
        let mut replacement = ScreenshotItem::new(file_name, pixels);
        replacement.id = old.id;
        replacement.caption = old.caption.clone();
        replacement.added_at = old.added_at;
        self.items[index] = replacement;
        true
    }

    pub fn get_stats(&self) -> GalleryStats {
        let total = self.items.len();
        let exporting = self
            .items
            .iter()
            .filter(|item| matches!(item.status, ExportStatus::Exporting))
            .count();
        let done = self
            .items
            .iter()
            .filter(|item| matches!(item.status, ExportStatus::Done(_)))
            .count();
        let failed = self
            .items
            .iter()
            .filter(|item| matches!(item.status, ExportStatus::Failed(_)))
            .count();

        GalleryStats {
            total,
            exporting,
            done,
            failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GalleryStats {
    pub total: usize,
    pub exporting: usize,
    pub done: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_placement;

    fn pixels(w: u32, h: u32) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(w, h))
    }

    #[test]
    fn new_item_reads_dimensions_from_pixels() {
        let item = ScreenshotItem::new("a.png".to_string(), pixels(640, 480));
        assert_eq!(item.original_width, 640);
        assert_eq!(item.original_height, 480);
        assert_eq!(item.status, ExportStatus::Idle);
        assert!(item.caption.is_empty());
    }

    #[test]
    fn replace_keeps_id_and_caption_but_swaps_dimensions() {
        let mut gallery = Gallery::new();
        let mut item = ScreenshotItem::new("a.png".to_string(), pixels(1000, 1000));
        item.caption = "hello".to_string();
        let id = gallery.add_item(item);

        assert!(gallery.replace_image(id, "b.png".to_string(), pixels(2000, 1000)));

        let replaced = gallery.get_mut(id).unwrap();
        assert_eq!(replaced.id, id);
        assert_eq!(replaced.caption, "hello");
        assert_eq!(replaced.file_name, "b.png");
        assert_eq!(replaced.original_width, 2000);
        assert_eq!(replaced.original_height, 1000);
        assert_eq!(replaced.status, ExportStatus::Idle);
    }

    #[test]
    fn replace_of_unknown_id_changes_nothing() {
        let mut gallery = Gallery::new();
        gallery.add_item(ScreenshotItem::new("a.png".to_string(), pixels(10, 10)));
        assert!(!gallery.replace_image(Uuid::new_v4(), "b.png".to_string(), pixels(20, 20)));
        assert_eq!(gallery.items()[0].original_width, 10);
    }

    #[test]
    fn placement_after_replace_depends_only_on_new_dimensions() {
        let mut gallery = Gallery::new();
        let id = gallery.add_item(ScreenshotItem::new("a.png".to_string(), pixels(1000, 1000)));
        gallery.replace_image(id, "b.png".to_string(), pixels(2000, 1000));

        let item = gallery.get_mut(id).unwrap();
        let p = compute_placement(
            item.original_width as f32,
            item.original_height as f32,
            1320.0,
            2868.0,
            0.0,
        );
        // Identical to placing a fresh 2000x1000 image: no residue from the
        // square image that was there before.
        assert!((p.height - 2868.0).abs() < 1e-3);
        assert!((p.width - 5736.0).abs() < 1e-3);
    }

    #[test]
    fn stats_follow_item_statuses() {
        let mut gallery = Gallery::new();
        let a = gallery.add_item(ScreenshotItem::new("a.png".to_string(), pixels(10, 10)));
        let b = gallery.add_item(ScreenshotItem::new("b.png".to_string(), pixels(10, 10)));
        gallery.add_item(ScreenshotItem::new("c.png".to_string(), pixels(10, 10)));

        gallery.get_mut(a).unwrap().start_export();
        gallery
            .get_mut(b)
            .unwrap()
            .fail_export("decode error".to_string());

        let stats = gallery.get_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.exporting, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.done, 0);
    }
}
