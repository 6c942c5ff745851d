use crate::canvas::CanvasState;
use crate::ops::color::{BLACK, Color, TRANSPARENT, WHITE, with_alpha_capped};
use crate::selection::SelectionMode;
use crate::settings::EngineSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pencil,
    StraightLine,
    Rectangle,
    Ellipse,
    Selection,
    MagicWand,
    Fill,
    Eraser,
    ColorPicker,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pencil,
            Tool::StraightLine,
            Tool::Rectangle,
            Tool::Ellipse,
            Tool::Selection,
            Tool::MagicWand,
            Tool::Fill,
            Tool::Eraser,
            Tool::ColorPicker,
        ]
    }
}

/// How closed shapes (rectangle, ellipse) are painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShapeMode {
    #[default]
    BorderAndFill,
    BorderOnly,
    FillOnly,
}

impl ShapeMode {
    pub fn draws_border(&self) -> bool {
        matches!(self, ShapeMode::BorderAndFill | ShapeMode::BorderOnly)
    }

    pub fn draws_fill(&self) -> bool {
        matches!(self, ShapeMode::BorderAndFill | ShapeMode::FillOnly)
    }

    /// `both`, `border` or `fill`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Some(ShapeMode::BorderAndFill),
            "border" => Some(ShapeMode::BorderOnly),
            "fill" => Some(ShapeMode::FillOnly),
            _ => None,
        }
    }
}

/// Which pointer button drives a gesture. Primary paints with the primary
/// colour, secondary with the secondary colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false, alt: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true, alt: false };
    pub const ALT: Modifiers = Modifiers { ctrl: false, alt: true };

    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_modifiers(self.ctrl, self.alt)
    }
}

#[derive(Clone, Debug)]
pub struct ToolProperties {
    pub primary: Color,
    pub secondary: Color,
    /// Manhattan RGBA distance for wand / fill / similar-erase (0 = exact).
    pub tolerance: u32,
    pub shape_mode: ShapeMode,
    pub antialiased: bool,
    /// Hover footprint diameter in pixels.
    pub brush_size: u32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            primary: BLACK,
            secondary: WHITE,
            tolerance: 0,
            shape_mode: ShapeMode::BorderAndFill,
            antialiased: false,
            brush_size: 1,
        }
    }
}

impl ToolProperties {
    /// Defaults with the tolerance and antialiasing presets from `settings`.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            tolerance: settings.default_tolerance,
            antialiased: settings.antialiasing,
            ..Self::default()
        }
    }

    pub fn color_for(&self, button: MouseButton) -> Color {
        match button {
            MouseButton::Primary => self.primary,
            MouseButton::Secondary => self.secondary,
        }
    }

    /// The colour of the *other* button (shape fill).
    pub fn other_color(&self, button: MouseButton) -> Color {
        match button {
            MouseButton::Primary => self.secondary,
            MouseButton::Secondary => self.primary,
        }
    }
}

/// Per-gesture bookkeeping between `start` and `end`.
#[derive(Clone, Debug, Default)]
struct ToolState {
    /// Last plotted pixel for freehand tools.
    last_pos: Option<(i32, i32)>,
    /// Drag anchor for shape and selection tools.
    anchor: Option<(i32, i32)>,
    button: MouseButton,
}

/// Turns `start` / `update` / `end` pointer gestures into canvas operations
/// for the active tool. Coordinates are canvas pixels and may lie off canvas.
#[derive(Clone, Debug, Default)]
pub struct ToolsPanel {
    pub active_tool: Tool,
    pub properties: ToolProperties,
    tool_state: ToolState,
    /// Colour read by the last ColorPicker click; `None` if it hit nothing.
    pub last_picked_color: Option<Color>,
}

impl ToolsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &EngineSettings) -> Self {
        Self { properties: ToolProperties::from_settings(settings), ..Self::default() }
    }

    /// Switch tools, abandoning any gesture in progress. An unfinished
    /// selection drag is dropped rather than committed.
    pub fn set_tool(&mut self, canvas: &mut CanvasState, tool: Tool) {
        if self.active_tool != tool {
            if self.active_tool == Tool::Selection && self.tool_state.anchor.is_some() {
                canvas.selection_cancel();
            }
            self.tool_state = ToolState::default();
            canvas.clear_preview();
        }
        self.active_tool = tool;
    }

    pub fn is_active(&self) -> bool {
        self.tool_state.anchor.is_some() || self.tool_state.last_pos.is_some()
    }

    // ---- gesture entry points -------------------------------------------------

    pub fn start(
        &mut self,
        canvas: &mut CanvasState,
        x: i32,
        y: i32,
        button: MouseButton,
        modifiers: Modifiers,
    ) {
        self.tool_state = ToolState { last_pos: None, anchor: Some((x, y)), button };
        let props = &self.properties;

        match self.active_tool {
            Tool::Pencil => {
                canvas.clear_preview();
                canvas.write_pixel(x, y, props.color_for(button));
                self.tool_state.last_pos = Some((x, y));
            }
            Tool::Eraser => {
                canvas.clear_preview();
                match button {
                    MouseButton::Primary => {
                        canvas.write_pixel(x, y, TRANSPARENT);
                        self.tool_state.last_pos = Some((x, y));
                    }
                    MouseButton::Secondary => {
                        canvas.erase_similar(x, y, props.tolerance);
                    }
                }
            }
            Tool::Fill => {
                let color = props.color_for(button);
                if props.tolerance == 0 {
                    canvas.flood_fill(x, y, color);
                } else {
                    canvas.replace_similar(x, y, color, props.tolerance);
                }
                self.tool_state.anchor = None;
            }
            Tool::StraightLine | Tool::Rectangle | Tool::Ellipse => {
                self.draw_shape_preview(canvas, x, y);
            }
            Tool::Selection => {
                canvas.selection_start(x, y, modifiers.selection_mode());
            }
            Tool::MagicWand => {
                canvas.magic_wand_select(x, y, props.tolerance, modifiers.selection_mode());
                self.tool_state.anchor = None;
            }
            Tool::ColorPicker => {
                self.pick(canvas, x, y, button);
                self.tool_state.anchor = None;
            }
        }
    }

    pub fn update(
        &mut self,
        canvas: &mut CanvasState,
        x: i32,
        y: i32,
        _button: MouseButton,
        _modifiers: Modifiers,
    ) {
        if self.tool_state.anchor.is_none() {
            return;
        }
        match self.active_tool {
            Tool::Pencil | Tool::Eraser => self.continue_stroke(canvas, x, y),
            Tool::StraightLine | Tool::Rectangle | Tool::Ellipse => {
                self.draw_shape_preview(canvas, x, y);
            }
            Tool::Selection => canvas.selection_update(x, y),
            Tool::ColorPicker => self.pick(canvas, x, y, self.tool_state.button),
            Tool::Fill | Tool::MagicWand => {}
        }
    }

    pub fn end(
        &mut self,
        canvas: &mut CanvasState,
        x: i32,
        y: i32,
        _button: MouseButton,
        _modifiers: Modifiers,
    ) {
        if self.tool_state.anchor.is_none() {
            return;
        }
        match self.active_tool {
            Tool::Pencil | Tool::Eraser => self.continue_stroke(canvas, x, y),
            Tool::StraightLine | Tool::Rectangle | Tool::Ellipse => {
                canvas.clear_preview();
                self.commit_shape(canvas, x, y);
            }
            Tool::Selection => canvas.selection_end(x, y),
            Tool::ColorPicker | Tool::Fill | Tool::MagicWand => {}
        }
        self.tool_state = ToolState::default();
    }

    /// Pointer moved with no button held: show the brush footprint for
    /// freehand tools.
    pub fn hover(&mut self, canvas: &mut CanvasState, x: i32, y: i32) {
        if self.is_active() {
            return;
        }
        let cap = canvas.preview_alpha();
        let size = self.properties.brush_size;
        match self.active_tool {
            Tool::Pencil => canvas.update_preview(x, y, with_alpha_capped(self.properties.primary, cap), size),
            Tool::Eraser => canvas.update_preview(x, y, with_alpha_capped(WHITE, cap), size),
            _ => {}
        }
    }

    /// Pointer left the canvas.
    pub fn leave(&mut self, canvas: &mut CanvasState) {
        if !self.is_active() {
            canvas.clear_preview();
        }
    }

    // ---- helpers --------------------------------------------------------------

    /// Freehand segment from the previous point so fast drags leave no gaps.
    fn continue_stroke(&mut self, canvas: &mut CanvasState, x: i32, y: i32) {
        let button = self.tool_state.button;
        if self.active_tool == Tool::Eraser && button == MouseButton::Secondary {
            canvas.erase_similar(x, y, self.properties.tolerance);
            return;
        }
        let color = if self.active_tool == Tool::Eraser {
            TRANSPARENT
        } else {
            self.properties.color_for(button)
        };
        let (px, py) = self.tool_state.last_pos.unwrap_or((x, y));
        canvas.draw_line(px, py, x, y, color, false);
        self.tool_state.last_pos = Some((x, y));
    }

    fn draw_shape_preview(&self, canvas: &mut CanvasState, x: i32, y: i32) {
        let Some((ax, ay)) = self.tool_state.anchor else { return };
        let props = &self.properties;
        let button = self.tool_state.button;
        let border = props.color_for(button);
        let fill = props.other_color(button);
        let mode = props.shape_mode;
        match self.active_tool {
            Tool::StraightLine => canvas.draw_line_preview(ax, ay, x, y, border, props.antialiased),
            Tool::Rectangle => {
                canvas.draw_rectangle_preview(ax, ay, x, y, border, fill, mode.draws_border(), mode.draws_fill())
            }
            Tool::Ellipse => canvas.draw_ellipse_preview(
                ax,
                ay,
                x,
                y,
                border,
                fill,
                mode.draws_border(),
                mode.draws_fill(),
                props.antialiased,
            ),
            _ => {}
        }
    }

    fn commit_shape(&self, canvas: &mut CanvasState, x: i32, y: i32) {
        let Some((ax, ay)) = self.tool_state.anchor else { return };
        let props = &self.properties;
        let button = self.tool_state.button;
        let border = props.color_for(button);
        let fill = props.other_color(button);
        let mode = props.shape_mode;
        match self.active_tool {
            Tool::StraightLine => canvas.draw_line(ax, ay, x, y, border, props.antialiased),
            Tool::Rectangle => {
                canvas.draw_rectangle(ax, ay, x, y, border, fill, mode.draws_border(), mode.draws_fill())
            }
            Tool::Ellipse => canvas.draw_ellipse(
                ax,
                ay,
                x,
                y,
                border,
                fill,
                mode.draws_border(),
                mode.draws_fill(),
                props.antialiased,
            ),
            _ => {}
        }
    }

    fn pick(&mut self, canvas: &CanvasState, x: i32, y: i32, button: MouseButton) {
        self.last_picked_color = canvas.pick_color(x, y);
        if let Some(c) = self.last_picked_color {
            match button {
                MouseButton::Primary => self.properties.primary = c,
                MouseButton::Secondary => self.properties.secondary = c,
            }
        }
    }
}
