use crate::compositor::Compositor;
use crate::gallery::{ExportStatus, Gallery, ScreenshotItem};
use crate::image_io;
use crate::jobs::{self, AppEvent};
use crate::layout::{chunk_caption, compute_placement, FrameSpec, PREVIEW_SCALE};
use crate::ui_theme::StudioTheme;
use eframe::egui::{self, Color32, Rounding};
use egui_extras::{Size, StripBuilder};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Extensions offered in the file pickers, matching `image_io::is_image_file`.
const PICKER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Largest edge of a preview texture uploaded to the GPU. Source images can
/// be much bigger than any preview ever shows them.
const PREVIEW_TEXTURE_MAX: u32 = 1024;

const MAX_LOGS: usize = 1000;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub export_dir: Option<String>,
}

pub struct FramerApp {
    // Configuration
    export_dir: Option<PathBuf>,
    config_path: PathBuf,

    // Core state
    gallery: Gallery,
    compositor: Arc<Compositor>,

    // UI state
    logs: Vec<String>,
    new_logs_count: usize,
    textures: HashMap<Uuid, egui::TextureHandle>,

    // Runtime
    runtime: tokio::runtime::Runtime,

    // Channels
    log_sender: mpsc::UnboundedSender<String>,
    log_receiver: mpsc::UnboundedReceiver<String>,
    event_sender: std_mpsc::Sender<AppEvent>,
    event_receiver: std_mpsc::Receiver<AppEvent>,

    // UI Theme
    theme: StudioTheme,
}

/// Deferred per-item button actions, applied after the gallery loop so the
/// item borrow is released first.
enum ItemAction {
    Replace(Uuid),
    Export(Uuid),
}

impl FramerApp {
    pub fn new() -> Self {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
        let (log_sender, log_receiver) = mpsc::unbounded_channel::<String>();
        let (event_sender, event_receiver) = std_mpsc::channel();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("AppShotFramer");

        if !config_dir.exists() {
            if let Err(e) = fs::create_dir_all(&config_dir) {
                log::warn!("Failed to create config directory: {}", e);
            }
        }

        let config_path = config_dir.join("config.json");
        let config = Self::load_config(&config_path).unwrap_or_default();

        let theme = StudioTheme::default();
        let compositor = Arc::new(Compositor::new(FrameSpec::default()));

        Self {
            export_dir: config.export_dir.map(PathBuf::from),
            config_path,
            gallery: Gallery::new(),
            compositor,
            logs: Vec::new(),
            new_logs_count: 0,
            textures: HashMap::new(),
            runtime,
            log_sender,
            log_receiver,
            event_sender,
            event_receiver,
            theme,
        }
    }

    fn load_config(path: &PathBuf) -> Option<AppConfig> {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        log::info!("Loaded config from {:?}", path);
                        Some(config)
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config: {}", e);
                        None
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file: {}", e);
                    None
                }
            }
        } else {
            None
        }
    }

    fn save_config(&self) {
        let config = AppConfig {
            export_dir: self
                .export_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        };

        match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.config_path, json) {
                    log::warn!("Failed to save config: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize config: {}", e);
            }
        }
    }

    fn add_images(&mut self, ctx: &egui::Context) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", PICKER_EXTENSIONS)
            .pick_files()
        {
            for path in paths {
                self.import_file(ctx, path);
            }
        }
    }

    fn import_file(&mut self, ctx: &egui::Context, path: PathBuf) {
        if !image_io::is_image_file(&path) {
            self.logs
                .push(format!("⚠ Skipped non-image file: {}", path.display()));
            return;
        }
        jobs::spawn_import(
            &self.runtime,
            ctx.clone(),
            self.event_sender.clone(),
            self.log_sender.clone(),
            path,
        );
    }

    fn replace_image(&mut self, ctx: &egui::Context, id: Uuid) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", PICKER_EXTENSIONS)
            .pick_file()
        {
            if !image_io::is_image_file(&path) {
                self.logs
                    .push(format!("⚠ Skipped non-image file: {}", path.display()));
                return;
            }
            jobs::spawn_replace(
                &self.runtime,
                ctx.clone(),
                self.event_sender.clone(),
                self.log_sender.clone(),
                id,
                path,
            );
        }
    }

    fn export_item(&mut self, ctx: &egui::Context, id: Uuid) {
        let Some(export_dir) = self.export_dir.clone() else {
            self.logs
                .push("Please choose an export folder first".to_string());
            return;
        };

        let Some(item) = self.gallery.get_mut(id) else {
            return;
        };
        if item.status == ExportStatus::Exporting {
            return;
        }
        item.start_export();

        jobs::spawn_export(
            &self.runtime,
            ctx.clone(),
            self.event_sender.clone(),
            self.log_sender.clone(),
            self.compositor.clone(),
            item.id,
            item.file_name.clone(),
            item.pixels.clone(),
            item.caption.clone(),
            export_dir,
        );
    }

    fn select_export_folder(&mut self) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            self.logs.push(format!("Export folder: {}", path.display()));
            self.export_dir = Some(path);
            self.save_config();
        }
    }

    /// Build GPU preview textures for items that do not have one yet.
    fn ensure_textures(&mut self, ctx: &egui::Context) {
        let missing: Vec<(Uuid, Arc<RgbaImage>)> = self
            .gallery
            .items()
            .iter()
            .filter(|item| !self.textures.contains_key(&item.id))
            .map(|item| (item.id, item.pixels.clone()))
            .collect();

        for (id, pixels) in missing {
            let texture = ctx.load_texture(
                format!("preview-{}", id),
                preview_color_image(&pixels),
                egui::TextureOptions::LINEAR,
            );
            self.textures.insert(id, texture);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                AppEvent::ImageLoaded { file_name, pixels } => {
                    self.gallery
                        .add_item(ScreenshotItem::new(file_name, pixels));
                }
                AppEvent::ImageReplaced {
                    id,
                    file_name,
                    pixels,
                } => {
                    if self.gallery.replace_image(id, file_name, pixels) {
                        // The old preview texture shows the old image
                        self.textures.remove(&id);
                    }
                }
                AppEvent::ExportFinished { id, path } => {
                    if let Some(item) = self.gallery.get_mut(id) {
                        item.complete_export(path);
                    }
                }
                AppEvent::ExportFailed { id, message } => {
                    if let Some(item) = self.gallery.get_mut(id) {
                        item.fail_export(message);
                    }
                }
            }
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(log_msg) = self.log_receiver.try_recv() {
            self.logs.push(log_msg);
            self.new_logs_count += 1;
        }

        // Limit logs buffer size
        if self.logs.len() > MAX_LOGS {
            let remove_count = self.logs.len() - MAX_LOGS;
            self.logs.drain(0..remove_count);
        }
    }
}

impl eframe::App for FramerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply the theme
        self.theme.apply_to_ctx(ctx);

        self.drain_events();
        self.drain_logs();

        // Whole-window drag-and-drop intake
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        for path in dropped {
            self.import_file(ctx, path);
        }

        self.ensure_textures(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.padding_medium);

            self.show_header(ui, ctx);

            // Gallery fills the window; logs keep a fixed strip at the bottom
            let logs_height = 150.0;
            let gallery_height = (ui.available_height() - logs_height).max(0.0);

            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width(), gallery_height),
                egui::Layout::top_down(egui::Align::LEFT),
                |ui| {
                    self.show_gallery(ui, ctx);
                },
            );

            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width(), ui.available_height()),
                egui::Layout::top_down(egui::Align::LEFT),
                |ui| {
                    self.show_logs_panel(ui);
                },
            );
        });
    }
}

impl FramerApp {
    fn show_header(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let frame = self.theme.card_frame_borderless();
        frame.show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("AppShot Framer")
                        .size(20.0)
                        .strong()
                        .color(self.theme.text_primary),
                );

                ui.add_space(self.theme.spacing_large);

                if ui
                    .add_sized([110.0, 28.0], egui::Button::new("Add Images"))
                    .clicked()
                {
                    self.add_images(ctx);
                }

                ui.add_space(self.theme.spacing_large);

                // Export folder display + picker
                let raw_folder_text = if let Some(ref folder) = self.export_dir {
                    folder.display().to_string()
                } else {
                    "No export folder selected".to_string()
                };
                let folder_text = Self::shorten_with_front_ellipsis(&raw_folder_text, 38);

                ui.label(
                    egui::RichText::new(folder_text)
                        .size(12.0)
                        .color(self.theme.text_secondary),
                );

                if ui
                    .add_sized([110.0, 28.0], egui::Button::new("Export Folder"))
                    .clicked()
                {
                    self.select_export_folder();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let hovering_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
                    let hint = if hovering_files {
                        egui::RichText::new("Drop to add images")
                            .size(13.0)
                            .color(self.theme.accent)
                    } else {
                        egui::RichText::new("Drag images anywhere in this window")
                            .size(13.0)
                            .color(self.theme.text_muted)
                    };
                    ui.label(hint);
                });
            });
        });
        ui.add_space(self.theme.spacing_medium);
    }

    fn show_gallery(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let frame = self.theme.card_frame_borderless();
        let mut actions: Vec<ItemAction> = Vec::new();

        frame.show(ui, |ui| {
            if self.gallery.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("No screenshots yet — add images to get started")
                            .size(14.0)
                            .color(self.theme.text_muted),
                    );
                });
                return;
            }

            self.show_stats_row(ui);
            ui.add_space(self.theme.spacing_medium);

            let spec = *self.compositor.spec();
            let export_ready = self.export_dir.is_some();
            let theme = &self.theme;
            let textures = &self.textures;
            let gallery = &mut self.gallery;

            egui::ScrollArea::vertical()
                .id_salt("gallery_scroll")
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        for item in gallery.items_mut() {
                            show_item_card(
                                ui,
                                theme,
                                &spec,
                                textures.get(&item.id),
                                item,
                                export_ready,
                                &mut actions,
                            );
                        }
                    });
                });
        });
        ui.add_space(self.theme.spacing_medium);

        for action in actions {
            match action {
                ItemAction::Replace(id) => self.replace_image(ctx, id),
                ItemAction::Export(id) => self.export_item(ctx, id),
            }
        }
    }

    fn show_stats_row(&self, ui: &mut egui::Ui) {
        let stats = self.gallery.get_stats();

        ui.horizontal(|ui| {
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width() / 4.0, ui.available_height()),
                egui::Layout::centered_and_justified(egui::Direction::TopDown),
                |ui| self.show_stat_item(ui, "Total", stats.total, self.theme.text_primary),
            );
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width() / 3.0, ui.available_height()),
                egui::Layout::centered_and_justified(egui::Direction::TopDown),
                |ui| self.show_stat_item(ui, "Exporting", stats.exporting, self.theme.warning),
            );
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width() / 2.0, ui.available_height()),
                egui::Layout::centered_and_justified(egui::Direction::TopDown),
                |ui| self.show_stat_item(ui, "Done", stats.done, self.theme.success),
            );
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width(), ui.available_height()),
                egui::Layout::centered_and_justified(egui::Direction::TopDown),
                |ui| self.show_stat_item(ui, "Failed", stats.failed, self.theme.error),
            );
        });
    }

    fn show_stat_item(&self, ui: &mut egui::Ui, label: &str, count: usize, color: Color32) {
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(format!("{}", count))
                    .size(20.0)
                    .color(color)
                    .strong(),
            );
            ui.label(
                egui::RichText::new(label)
                    .size(12.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_logs_panel(&mut self, ui: &mut egui::Ui) {
        let frame = self.theme.card_frame_borderless();
        frame.show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("Logs")
                        .size(16.0)
                        .strong()
                        .color(self.theme.text_primary),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.new_logs_count > 0 {
                        ui.label(
                            egui::RichText::new(format!("{} new", self.new_logs_count))
                                .size(12.0)
                                .color(self.theme.accent),
                        );
                    }
                });
            });
            ui.add_space(self.theme.spacing_small);

            egui::ScrollArea::vertical()
                .id_salt("logs_scroll")
                .stick_to_bottom(true)
                .auto_shrink([false; 2])
                .max_height(ui.available_height())
                .show(ui, |ui| {
                    if self.logs.is_empty() {
                        ui.centered_and_justified(|ui| {
                            ui.label(
                                egui::RichText::new("No logs yet")
                                    .size(14.0)
                                    .color(self.theme.text_muted),
                            );
                        });
                    } else {
                        for (i, log) in self.logs.iter().enumerate() {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(
                                    egui::RichText::new(format!("{:>3}", i + 1))
                                        .size(10.0)
                                        .color(self.theme.text_muted),
                                );
                                ui.add_space(self.theme.spacing_small);
                                ui.label(
                                    egui::RichText::new(log)
                                        .size(12.0)
                                        .color(self.theme.text_secondary),
                                );
                            });
                        }
                    }
                });

            // Reset new logs count after displaying
            if self.new_logs_count > 0 {
                self.new_logs_count = 0;
            }
        });
    }

    fn shorten_with_front_ellipsis(text: &str, max_chars: usize) -> String {
        let char_count = text.chars().count();
        if char_count <= max_chars {
            return text.to_string();
        }

        let chars: Vec<char> = text.chars().collect();
        let start = char_count.saturating_sub(max_chars);
        let tail: String = chars[start..].iter().collect();

        format!("...{}", tail)
    }
}

/// One gallery card: phone preview, caption editor, replace/export buttons
/// and the status line.
fn show_item_card(
    ui: &mut egui::Ui,
    theme: &StudioTheme,
    spec: &FrameSpec,
    texture: Option<&egui::TextureHandle>,
    item: &mut ScreenshotItem,
    export_ready: bool,
    actions: &mut Vec<ItemAction>,
) {
    let card_width = spec.target_w as f32 * PREVIEW_SCALE;

    theme.card_frame().show(ui, |ui| {
        ui.vertical(|ui| {
            ui.set_width(card_width);

            draw_phone_preview(ui, spec, texture, item);
            ui.add_space(theme.spacing_small);

            ui.add(
                egui::TextEdit::multiline(&mut item.caption)
                    .desired_rows(2)
                    .desired_width(card_width)
                    .hint_text("Caption text..."),
            );
            ui.add_space(theme.spacing_small);

            ui.allocate_ui(egui::Vec2::new(card_width, 28.0), |ui| {
                StripBuilder::new(ui)
                    .size(Size::remainder())
                    .size(Size::remainder())
                    .horizontal(|mut strip| {
                        strip.cell(|ui| {
                            if ui
                                .add_sized(
                                    [ui.available_width(), 26.0],
                                    egui::Button::new(
                                        egui::RichText::new("Replace Image").size(12.0),
                                    ),
                                )
                                .clicked()
                            {
                                actions.push(ItemAction::Replace(item.id));
                            }
                        });
                        strip.cell(|ui| {
                            let exporting = item.status == ExportStatus::Exporting;
                            let enabled = export_ready && !exporting;
                            if ui
                                .add_enabled(
                                    enabled,
                                    egui::Button::new(egui::RichText::new("Export PNG").size(12.0))
                                        .min_size(egui::Vec2::new(ui.available_width(), 26.0)),
                                )
                                .clicked()
                            {
                                actions.push(ItemAction::Export(item.id));
                            }
                        });
                    });
            });

            ui.add_space(theme.spacing_small);
            let (status_text, status_color) = theme.status_label(&item.status);
            ui.label(
                egui::RichText::new(status_text)
                    .size(12.0)
                    .color(status_color),
            );
        });
    });
}

/// Draw the phone frame preview with the egui painter. This is the same
/// geometry the exporter rasterizes — one `FrameSpec`, one placement
/// formula — at `PREVIEW_SCALE` instead of export scale.
fn draw_phone_preview(
    ui: &mut egui::Ui,
    spec: &FrameSpec,
    texture: Option<&egui::TextureHandle>,
    item: &ScreenshotItem,
) {
    let scale = PREVIEW_SCALE;
    let size = egui::vec2(spec.target_w as f32 * scale, spec.target_h as f32 * scale);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    let painter = ui.painter_at(rect);

    // Device body
    painter.rect_filled(
        rect,
        Rounding::same(spec.corner_radius * scale),
        Color32::BLACK,
    );

    // Screen
    let border = spec.border * scale;
    let screen = rect.shrink(border);
    painter.rect_filled(
        screen,
        Rounding::same(spec.screen_radius * scale),
        Color32::WHITE,
    );

    // Cover-fit image, clipped to the screen
    if let Some(texture) = texture {
        let place = compute_placement(
            item.original_width as f32,
            item.original_height as f32,
            spec.target_w as f32,
            spec.target_h as f32,
            spec.border,
        )
        .scaled(scale);
        let image_rect = egui::Rect::from_min_size(
            rect.min + egui::vec2(place.x, place.y),
            egui::vec2(place.width, place.height),
        );
        let clipped = painter.with_clip_rect(screen);
        clipped.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    }

    // Notch, rounded on the bottom corners only
    let notch_w = rect.width() * spec.notch_width_frac;
    let notch_rect = egui::Rect::from_min_size(
        egui::pos2(rect.center().x - notch_w / 2.0, rect.min.y),
        egui::vec2(notch_w, spec.notch_height * scale),
    );
    painter.rect_filled(
        notch_rect,
        Rounding {
            nw: 0.0,
            ne: 0.0,
            sw: spec.notch_radius * scale,
            se: spec.notch_radius * scale,
        },
        Color32::BLACK,
    );

    // Earpiece
    let ear_w = spec.earpiece_width * scale;
    let ear_rect = egui::Rect::from_min_size(
        egui::pos2(
            rect.center().x - ear_w / 2.0,
            rect.min.y + spec.earpiece_top * scale,
        ),
        egui::vec2(ear_w, spec.earpiece_height * scale),
    );
    painter.rect_filled(
        ear_rect,
        Rounding::same(spec.earpiece_radius * scale),
        Color32::from_rgb(26, 26, 26),
    );

    // Caption lines on top
    let lines = chunk_caption(&item.caption, spec.caption_chunk);
    let font_size = spec.caption_size * scale;
    // egui's line metrics differ slightly from the export rasterizer; close
    // enough for a preview
    let line_height = font_size * 1.2;
    for (i, line) in lines.iter().enumerate() {
        painter.text(
            egui::pos2(
                rect.center().x,
                rect.min.y + spec.caption_top * scale + i as f32 * line_height,
            ),
            egui::Align2::CENTER_TOP,
            line,
            egui::FontId::proportional(font_size),
            Color32::BLACK,
        );
    }
}

/// Convert decoded pixels into a bounded-size egui texture image.
fn preview_color_image(pixels: &RgbaImage) -> egui::ColorImage {
    let (w, h) = pixels.dimensions();
    let longest = w.max(h);

    let resized;
    let img: &RgbaImage = if longest > PREVIEW_TEXTURE_MAX {
        let k = PREVIEW_TEXTURE_MAX as f32 / longest as f32;
        resized = image::imageops::resize(
            pixels,
            ((w as f32 * k).round() as u32).max(1),
            ((h as f32 * k).round() as u32).max(1),
            image::imageops::FilterType::Triangle,
        );
        &resized
    } else {
        pixels
    };

    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw())
}
