use image::RgbaImage;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::compositor::Compositor;
use crate::image_io;

/// Results of background work, drained by the UI once per frame.
#[derive(Debug)]
pub enum AppEvent {
    ImageLoaded {
        file_name: String,
        pixels: Arc<RgbaImage>,
    },
    ImageReplaced {
        id: Uuid,
        file_name: String,
        pixels: Arc<RgbaImage>,
    },
    ExportFinished {
        id: Uuid,
        path: PathBuf,
    },
    ExportFailed {
        id: Uuid,
        message: String,
    },
}

fn display_name(path: &PathBuf) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Decode a newly added file off the UI thread. A failed decode only logs;
/// no gallery item ever appears for it.
pub fn spawn_import(
    rt: &Runtime,
    ctx: egui::Context,
    event_tx: Sender<AppEvent>,
    log_tx: UnboundedSender<String>,
    path: PathBuf,
) {
    rt.spawn(async move {
        let file_name = display_name(&path);
        let decode_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || image_io::load_rgba(&decode_path)).await;

        match decoded {
            Ok(Ok(pixels)) => {
                let (w, h) = pixels.dimensions();
                let _ = log_tx.send(format!("➕ Added {} ({}x{})", file_name, w, h));
                let _ = event_tx.send(AppEvent::ImageLoaded {
                    file_name,
                    pixels: Arc::new(pixels),
                });
            }
            Ok(Err(e)) => {
                log::warn!("Failed to decode {}: {}", path.display(), e);
                let _ = log_tx.send(format!("❌ Could not read {}: {}", file_name, e));
            }
            Err(e) => {
                let _ = log_tx.send(format!("❌ Decode task died for {}: {}", file_name, e));
            }
        }
        ctx.request_repaint();
    });
}

/// Decode a replacement image for an existing item. On failure the item
/// keeps its current image.
pub fn spawn_replace(
    rt: &Runtime,
    ctx: egui::Context,
    event_tx: Sender<AppEvent>,
    log_tx: UnboundedSender<String>,
    id: Uuid,
    path: PathBuf,
) {
    rt.spawn(async move {
        let file_name = display_name(&path);
        let decode_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || image_io::load_rgba(&decode_path)).await;

        match decoded {
            Ok(Ok(pixels)) => {
                let (w, h) = pixels.dimensions();
                let _ = log_tx.send(format!("🔄 Replaced image with {} ({}x{})", file_name, w, h));
                let _ = event_tx.send(AppEvent::ImageReplaced {
                    id,
                    file_name,
                    pixels: Arc::new(pixels),
                });
            }
            Ok(Err(e)) => {
                log::warn!("Failed to decode replacement {}: {}", path.display(), e);
                let _ = log_tx.send(format!("❌ Could not read {}: {}", file_name, e));
            }
            Err(e) => {
                let _ = log_tx.send(format!("❌ Decode task died for {}: {}", file_name, e));
            }
        }
        ctx.request_repaint();
    });
}

/// Render one item at export resolution and write the PNG. The item's
/// pixels and caption are snapshotted up front, so edits made while the
/// export runs do not bleed into the file.
pub fn spawn_export(
    rt: &Runtime,
    ctx: egui::Context,
    event_tx: Sender<AppEvent>,
    log_tx: UnboundedSender<String>,
    compositor: Arc<Compositor>,
    id: Uuid,
    file_name: String,
    pixels: Arc<RgbaImage>,
    caption: String,
    export_dir: PathBuf,
) {
    rt.spawn(async move {
        let _ = log_tx.send(format!("⬆ Exporting {}...", file_name));

        let result = tokio::task::spawn_blocking(move || {
            let rendered = compositor.render(&pixels, &caption);
            let path = image_io::unique_export_path(&export_dir);
            image_io::save_png(&rendered, &path).map(|_| path)
        })
        .await;

        match result {
            Ok(Ok(path)) => {
                let _ = log_tx.send(format!("✅ Exported {} -> {}", file_name, path.display()));
                let _ = event_tx.send(AppEvent::ExportFinished { id, path });
            }
            Ok(Err(e)) => {
                log::error!("Export of {} failed: {}", file_name, e);
                let _ = log_tx.send(format!("❌ Export failed for {}: {}", file_name, e));
                let _ = event_tx.send(AppEvent::ExportFailed {
                    id,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let _ = event_tx.send(AppEvent::ExportFailed {
                    id,
                    message: format!("export task died: {}", e),
                });
            }
        }
        ctx.request_repaint();
    });
}
