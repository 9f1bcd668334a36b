//! Certificate image rendering.
//!
//! [`TemplateRenderer`] draws three text lines and a footer onto a PNG
//! template. Text is left-anchored and vertically centered on its
//! coordinate; the footer is centered horizontally near the bottom edge.
//! Rendering is deterministic: the same request always produces the same
//! file name, and an existing file is overwritten.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use markus_core::participant::ParticipantRecord;
use markus_core::roll::{display_event_name, roman_year};

use crate::error::RenderError;

/// Default template location.
pub const DEFAULT_TEMPLATE_PATH: &str = "assets/Participation.png";

/// Fonts tried after the configured one, in order.
pub const FALLBACK_FONTS: &[&str] = &[
    "fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/arialbd.ttf",
];

/// Footer drawn on every certificate.
pub const FOOTER_TEXT: &str = "CT-PG Association Club | CT-PG Coding Club";

/// Everything printed on one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Roll number (used for the file name).
    pub roll_no: String,
    /// Participant name.
    pub name: String,
    /// Department.
    pub department: String,
    /// Year or cohort.
    pub year: String,
    /// Event name as stored.
    pub event: String,
}

impl CertificateRequest {
    /// Builds a request from a stored record.
    #[must_use]
    pub fn from_record(record: &ParticipantRecord) -> Self {
        Self {
            roll_no: record.roll_no.clone(),
            name: record.name.clone(),
            department: record.department.clone(),
            year: record.year.clone(),
            event: record.event.clone(),
        }
    }

    /// Uppercased name line.
    #[must_use]
    pub fn name_line(&self) -> String {
        self.name.trim().to_uppercase()
    }

    /// `"<DEPT> <YEAR> YEAR"`, or `"<YEAR> YEAR"` without a department.
    #[must_use]
    pub fn department_line(&self) -> String {
        let year = roman_year(self.year.trim());
        let department = self.department.trim();
        let line = if department.is_empty() {
            format!("{year} Year")
        } else {
            format!("{department} {year} Year")
        };
        line.to_uppercase()
    }

    /// Cleaned, uppercased event line.
    #[must_use]
    pub fn event_line(&self) -> String {
        display_event_name(&self.event).to_uppercase()
    }

    /// Output file name: `<ROLL>_<EVENT>_<TAG>.png` with characters outside
    /// `[A-Za-z0-9-]` replaced by `_`.
    ///
    /// `TAG` is the first 8 hex digits of the SHA-1 of the raw event key, so
    /// events that sanitize to the same text still get distinct files.
    #[must_use]
    pub fn file_name(&self) -> String {
        let digest = Sha1::digest(self.event.as_bytes());
        format!(
            "{}_{}_{}.png",
            sanitize(&self.roll_no.to_uppercase()),
            sanitize(&self.event),
            &hex::encode(digest)[..8]
        )
    }
}

fn sanitize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Produces a local certificate file for a request.
///
/// Implementations are synchronous and CPU-bound; async callers run them on
/// the blocking pool.
pub trait ArtifactRenderer: Send + Sync + 'static {
    /// Renders the certificate and returns the written file path.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template or font is unavailable or the
    /// image cannot be written.
    fn render(&self, request: &CertificateRequest) -> Result<PathBuf, RenderError>;
}

/// Text position and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSlot {
    /// Left edge, in pixels.
    pub x: i32,
    /// Vertical center, in pixels.
    pub y: i32,
    /// Font size, in pixels.
    pub size: f32,
}

/// Where each line goes on the template.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLayout {
    /// Participant name.
    pub name: TextSlot,
    /// Department and year.
    pub department: TextSlot,
    /// Event.
    pub event: TextSlot,
    /// Footer font size.
    pub footer_size: f32,
    /// Footer center distance from the bottom edge.
    pub footer_offset: i32,
    /// Footer text.
    pub footer: String,
}

impl Default for RenderLayout {
    fn default() -> Self {
        Self {
            name: TextSlot {
                x: 1064,
                y: 786,
                size: 45.0,
            },
            department: TextSlot {
                x: 315,
                y: 865,
                size: 35.0,
            },
            event: TextSlot {
                x: 1264,
                y: 865,
                size: 35.0,
            },
            footer_size: 25.0,
            footer_offset: 50,
            footer: FOOTER_TEXT.to_string(),
        }
    }
}

/// Renders certificates from a PNG template.
pub struct TemplateRenderer {
    template_path: PathBuf,
    output_dir: PathBuf,
    fonts: Vec<PathBuf>,
    layout: RenderLayout,
    font: OnceLock<FontVec>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("template_path", &self.template_path)
            .field("output_dir", &self.output_dir)
            .field("fonts", &self.fonts)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Creates a renderer. `font` is tried before the built-in fallbacks.
    #[must_use]
    pub fn new(
        template_path: impl Into<PathBuf>,
        font: Option<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let fonts = font
            .into_iter()
            .chain(FALLBACK_FONTS.iter().map(PathBuf::from))
            .collect();
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            fonts,
            layout: RenderLayout::default(),
            font: OnceLock::new(),
        }
    }

    /// Replaces the font candidate list.
    #[must_use]
    pub fn with_font_candidates(mut self, fonts: Vec<PathBuf>) -> Self {
        self.fonts = fonts;
        self
    }

    /// Replaces the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: RenderLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the first loadable candidate font, loading it once.
    fn font(&self) -> Result<&FontVec, RenderError> {
        if let Some(font) = self.font.get() {
            return Ok(font);
        }
        for path in &self.fonts {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    info!(font = %path.display(), "loaded certificate font");
                    let _ = self.font.set(font);
                    break;
                }
                Err(err) => debug!(font = %path.display(), error = %err, "unusable font"),
            }
        }
        self.font.get().ok_or_else(|| RenderError::FontMissing {
            tried: self.fonts.clone(),
        })
    }
}

fn draw_left_middle(canvas: &mut RgbaImage, font: &FontVec, slot: TextSlot, text: &str) {
    let scale = PxScale::from(slot.size);
    let (_, height) = text_size(scale, font, text);
    let top = slot.y - i32::try_from(height / 2).unwrap_or(0);
    draw_text_mut(canvas, Rgba([0, 0, 0, 255]), slot.x, top, scale, font, text);
}

impl ArtifactRenderer for TemplateRenderer {
    fn render(&self, request: &CertificateRequest) -> Result<PathBuf, RenderError> {
        if !self.template_path.is_file() {
            return Err(RenderError::TemplateMissing {
                path: self.template_path.clone(),
            });
        }
        let font = self.font()?;
        let mut canvas = image::open(&self.template_path)?.to_rgba8();

        let layout = &self.layout;
        draw_left_middle(&mut canvas, font, layout.name, &request.name_line());
        draw_left_middle(&mut canvas, font, layout.department, &request.department_line());
        draw_left_middle(&mut canvas, font, layout.event, &request.event_line());

        let footer_scale = PxScale::from(layout.footer_size);
        let (footer_w, footer_h) = text_size(footer_scale, font, &layout.footer);
        let width = i32::try_from(canvas.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(canvas.height()).unwrap_or(i32::MAX);
        let footer_x = width / 2 - i32::try_from(footer_w / 2).unwrap_or(0);
        let footer_y = height - layout.footer_offset - i32::try_from(footer_h / 2).unwrap_or(0);
        draw_text_mut(
            &mut canvas,
            Rgba([0, 0, 0, 255]),
            footer_x,
            footer_y,
            footer_scale,
            font,
            &layout.footer,
        );

        std::fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let path = self.output_dir.join(request.file_name());
        canvas.save(&path)?;
        debug!(path = %path.display(), "certificate rendered");
        Ok(path)
    }
}
