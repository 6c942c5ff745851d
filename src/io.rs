use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasError, CanvasState, check_dimensions};
use crate::selection::SelectionRect;
use crate::settings::EngineSettings;
use crate::{log_err, log_info};

// ============================================================================
// PNG stream boundary
// ============================================================================

/// Decode a PNG stream into straight-alpha RGBA.
pub fn decode_png<R: Read>(mut reader: R) -> Result<RgbaImage, CanvasError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .map_err(|e| CanvasError::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Encode straight-alpha RGBA as PNG into `writer`.
pub fn encode_png<W: Write>(img: &RgbaImage, writer: W) -> Result<(), CanvasError> {
    PngEncoder::new(writer)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => CanvasError::Io(io),
            other => CanvasError::Encode(other.to_string()),
        })
}

/// Replace the canvas with a decoded PNG stream. The stream is decoded and
/// validated in full first; on any error the canvas is left exactly as it was.
pub fn load_from<R: Read>(canvas: &mut CanvasState, reader: R) -> Result<(), CanvasError> {
    let img = decode_png(reader).inspect_err(|e| {
        log_err!("PNG load failed: {}", e);
    })?;
    canvas.replace_image(img)
}

/// Encode the composited canvas as PNG.
pub fn save_to<W: Write>(canvas: &CanvasState, writer: W) -> Result<(), CanvasError> {
    encode_png(&canvas.composite(), writer)
}

// ============================================================================
// File helpers
// ============================================================================

pub fn load_png_file(canvas: &mut CanvasState, path: &Path) -> Result<(), CanvasError> {
    let file = File::open(path)?;
    load_from(canvas, BufReader::new(file))?;
    log_info!("Loaded {} ({}x{})", path.display(), canvas.width(), canvas.height());
    Ok(())
}

pub fn save_png_file(canvas: &CanvasState, path: &Path) -> Result<(), CanvasError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    save_to(canvas, &mut writer)?;
    writer.flush()?;
    log_info!("Saved {}", path.display());
    Ok(())
}

fn is_project_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PROJECT_EXTENSION))
}

/// Open a `.pxe` project or a PNG into a fresh canvas.
pub fn open_canvas(path: &Path, settings: &EngineSettings) -> Result<CanvasState, CanvasError> {
    let mut canvas = CanvasState::with_settings(settings.default_width, settings.default_height, settings)?;
    if is_project_path(path) {
        load_project(&mut canvas, path)?;
    } else {
        load_png_file(&mut canvas, path)?;
    }
    Ok(canvas)
}

/// Save as a `.pxe` project or a PNG depending on the extension.
pub fn save_canvas(canvas: &CanvasState, path: &Path) -> Result<(), CanvasError> {
    if is_project_path(path) {
        save_project(canvas, path)
    } else {
        save_png_file(canvas, path)
    }
}

// ============================================================================
// .pxe project files
// ============================================================================

pub const PROJECT_EXTENSION: &str = "pxe";
const PROJECT_MAGIC: &str = "PXE1";

/// Serialised session: base pixels plus the committed selection.
/// The preview layer is never stored.
#[derive(Serialize, Deserialize)]
struct ProjectFile {
    magic: String,
    width: u32,
    height: u32,
    /// Straight RGBA, row-major.
    pixels: Vec<u8>,
    selection: Vec<SelectionRect>,
}

pub fn write_project<W: Write>(canvas: &CanvasState, writer: W) -> Result<(), CanvasError> {
    let project = ProjectFile {
        magic: PROJECT_MAGIC.to_string(),
        width: canvas.width(),
        height: canvas.height(),
        pixels: canvas.base().as_image().as_raw().clone(),
        selection: canvas.selection_regions().to_vec(),
    };
    bincode::serialize_into(writer, &project)?;
    Ok(())
}

/// Decode and validate a project, then swap it into `canvas` in one step.
pub fn read_project<R: Read>(canvas: &mut CanvasState, mut reader: R) -> Result<(), CanvasError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;

    // bincode writes a String as an 8-byte length then the bytes,
    // so the 4-char magic sits at 8..12.
    if raw.len() < 12 {
        return Err(CanvasError::Project("File too small".into()));
    }
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != PROJECT_MAGIC {
        return Err(CanvasError::Project(format!("Unknown magic '{}'", magic)));
    }

    let project: ProjectFile = bincode::deserialize(&raw)?;
    check_dimensions(project.width, project.height, canvas.max_pixels())?;
    let img = RgbaImage::from_raw(project.width, project.height, project.pixels).ok_or_else(|| {
        CanvasError::Project(format!(
            "Pixel data does not match {}x{}",
            project.width, project.height
        ))
    })?;

    canvas.replace_image(img)?;
    canvas.set_selection_regions(&project.selection);
    Ok(())
}

pub fn save_project(canvas: &CanvasState, path: &Path) -> Result<(), CanvasError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_project(canvas, &mut writer)?;
    writer.flush()?;
    log_info!("Saved project {}", path.display());
    Ok(())
}

pub fn load_project(canvas: &mut CanvasState, path: &Path) -> Result<(), CanvasError> {
    let file = File::open(path)?;
    read_project(canvas, BufReader::new(file)).inspect_err(|e| {
        log_err!("Project load failed for {}: {}", path.display(), e);
    })?;
    log_info!("Loaded project {} ({}x{})", path.display(), canvas.width(), canvas.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::color::{BLACK, rgba};
    use crate::selection::SelectionMode;

    #[test]
    fn png_stream_round_trip_is_exact() {
        let mut c = CanvasState::new(3, 2).unwrap();
        c.write_pixel(0, 0, rgba(10, 20, 30, 40));
        c.write_pixel(2, 1, BLACK);
        let mut bytes = Vec::new();
        save_to(&c, &mut bytes).unwrap();

        let mut d = CanvasState::new(1, 1).unwrap();
        load_from(&mut d, bytes.as_slice()).unwrap();
        assert_eq!((d.width(), d.height()), (3, 2));
        assert_eq!(d.base(), c.base());
    }

    #[test]
    fn garbage_stream_leaves_canvas_untouched() {
        let mut c = CanvasState::new(2, 2).unwrap();
        c.write_pixel(1, 1, BLACK);
        let err = load_from(&mut c, &b"definitely not a png"[..]).unwrap_err();
        assert!(matches!(err, CanvasError::Decode(_)));
        assert_eq!((c.width(), c.height()), (2, 2));
        assert_eq!(c.read_pixel(1, 1), Some(BLACK));
    }

    #[test]
    fn project_stream_keeps_selection() {
        let mut c = CanvasState::new(4, 4).unwrap();
        c.write_pixel(3, 0, BLACK);
        c.select_rect(0, 0, 1, 1, SelectionMode::Replace);
        let mut bytes = Vec::new();
        write_project(&c, &mut bytes).unwrap();

        let mut d = CanvasState::new(2, 2).unwrap();
        read_project(&mut d, bytes.as_slice()).unwrap();
        assert_eq!(d.read_pixel(3, 0), Some(BLACK));
        assert_eq!(d.selection_regions(), c.selection_regions());
    }

    #[test]
    fn project_with_wrong_magic_is_rejected() {
        let mut bytes = Vec::new();
        bincode::serialize_into(
            &mut bytes,
            &ProjectFile {
                magic: "NOPE".into(),
                width: 1,
                height: 1,
                pixels: vec![0; 4],
                selection: Vec::new(),
            },
        )
        .unwrap();
        let mut c = CanvasState::new(2, 2).unwrap();
        assert!(matches!(read_project(&mut c, bytes.as_slice()), Err(CanvasError::Project(_))));
        assert_eq!(c.width(), 2);
    }

    #[test]
    fn project_with_short_pixels_is_rejected() {
        let mut bytes = Vec::new();
        bincode::serialize_into(
            &mut bytes,
            &ProjectFile {
                magic: PROJECT_MAGIC.into(),
                width: 2,
                height: 2,
                pixels: vec![0; 4],
                selection: Vec::new(),
            },
        )
        .unwrap();
        let mut c = CanvasState::new(3, 3).unwrap();
        assert!(read_project(&mut c, bytes.as_slice()).is_err());
        assert_eq!(c.width(), 3);
    }
}
