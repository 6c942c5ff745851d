//! Raster editing engine for a pixel-art editor: a base pixel grid with a
//! transient preview overlay, region-growing tools, line and shape
//! rasterizers, and a rectangle-list selection.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod selection;
pub mod settings;

pub use canvas::{CanvasError, CanvasState, PixelBuffer};
pub use components::colors::Palette;
pub use components::tools::{Modifiers, MouseButton, ShapeMode, Tool, ToolProperties, ToolsPanel};
pub use ops::color::{Color, TRANSPARENT};
pub use selection::{Selection, SelectionMode, SelectionRect};
pub use settings::EngineSettings;
