// ============================================================================
// OPERATION SCRIPT — one canvas command per line for headless batch runs
// ============================================================================
//
//   # comment
//   pixel   x y color
//   fill    x y color
//   replace x y color tolerance
//   erase   x y tolerance
//   line    x0 y0 x1 y1 color [aa]
//   rect    x0 y0 x1 y1 border fill [both|border|fill]
//   ellipse x0 y0 x1 y1 border fill [both|border|fill] [aa]
//   select  [replace|add|subtract] x0 y0 x1 y1
//   wand    x y tolerance [replace|add|subtract]
//   select-all | deselect | delete
//
// Colours are `#RRGGBB` or `#RRGGBBAA`.

use std::fmt;

use crate::canvas::CanvasState;
use crate::components::tools::ShapeMode;
use crate::ops::color::{Color, parse_hex};
use crate::selection::SelectionMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pixel { x: i32, y: i32, color: Color },
    Fill { x: i32, y: i32, color: Color },
    Replace { x: i32, y: i32, color: Color, tolerance: u32 },
    Erase { x: i32, y: i32, tolerance: u32 },
    Line { x0: i32, y0: i32, x1: i32, y1: i32, color: Color, antialiased: bool },
    Rect { x0: i32, y0: i32, x1: i32, y1: i32, border: Color, fill: Color, mode: ShapeMode },
    Ellipse {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        border: Color,
        fill: Color,
        mode: ShapeMode,
        antialiased: bool,
    },
    Select { mode: SelectionMode, x0: i32, y0: i32, x1: i32, y1: i32 },
    Wand { x: i32, y: i32, tolerance: u32, mode: SelectionMode },
    SelectAll,
    Deselect,
    Delete,
}

/// Token cursor for one source line.
struct Args<'a> {
    line: usize,
    name: &'a str,
    tokens: std::slice::Iter<'a, &'a str>,
}

impl<'a> Args<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str, ScriptError> {
        self.tokens
            .next()
            .copied()
            .ok_or_else(|| ScriptError::new(self.line, format!("'{}' is missing {}", self.name, what)))
    }

    fn int(&mut self, what: &str) -> Result<i32, ScriptError> {
        let tok = self.next(what)?;
        tok.parse()
            .map_err(|_| ScriptError::new(self.line, format!("{} must be an integer, got '{}'", what, tok)))
    }

    fn tolerance(&mut self) -> Result<u32, ScriptError> {
        let tok = self.next("a tolerance")?;
        tok.parse().map_err(|_| {
            ScriptError::new(self.line, format!("tolerance must be a non-negative integer, got '{}'", tok))
        })
    }

    fn color(&mut self, what: &str) -> Result<Color, ScriptError> {
        let tok = self.next(what)?;
        parse_hex(tok).ok_or_else(|| {
            ScriptError::new(self.line, format!("{} must be #RRGGBB or #RRGGBBAA, got '{}'", what, tok))
        })
    }

    fn coords(&mut self) -> Result<(i32, i32, i32, i32), ScriptError> {
        Ok((self.int("x0")?, self.int("y0")?, self.int("x1")?, self.int("y1")?))
    }

    fn rest(&mut self) -> Vec<&'a str> {
        self.tokens.by_ref().copied().collect()
    }

    fn done(&mut self) -> Result<(), ScriptError> {
        match self.tokens.next() {
            Some(extra) => Err(ScriptError::new(
                self.line,
                format!("unexpected '{}' after '{}'", extra, self.name),
            )),
            None => Ok(()),
        }
    }

    /// Trailing `[both|border|fill]` and, when allowed, `[aa]` flags.
    fn shape_flags(&mut self, allow_aa: bool) -> Result<(ShapeMode, bool), ScriptError> {
        let mut mode = ShapeMode::BorderAndFill;
        let mut aa = false;
        for tok in self.rest() {
            if allow_aa && tok.eq_ignore_ascii_case("aa") {
                aa = true;
            } else if let Some(m) = ShapeMode::parse(tok) {
                mode = m;
            } else {
                return Err(ScriptError::new(self.line, format!("unknown option '{}'", tok)));
            }
        }
        Ok((mode, aa))
    }
}

/// Parse one non-empty, non-comment line.
fn parse_line(line: usize, text: &str) -> Result<Command, ScriptError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((&name, rest)) = tokens.split_first() else {
        return Err(ScriptError::new(line, "empty command"));
    };
    let mut a = Args { line, name, tokens: rest.iter() };

    let cmd = match name.to_ascii_lowercase().as_str() {
        "pixel" => Command::Pixel { x: a.int("x")?, y: a.int("y")?, color: a.color("a colour")? },
        "fill" => Command::Fill { x: a.int("x")?, y: a.int("y")?, color: a.color("a colour")? },
        "replace" => Command::Replace {
            x: a.int("x")?,
            y: a.int("y")?,
            color: a.color("a colour")?,
            tolerance: a.tolerance()?,
        },
        "erase" => Command::Erase { x: a.int("x")?, y: a.int("y")?, tolerance: a.tolerance()? },
        "line" => {
            let (x0, y0, x1, y1) = a.coords()?;
            let color = a.color("a colour")?;
            let antialiased = match a.rest().as_slice() {
                [] => false,
                [flag] if flag.eq_ignore_ascii_case("aa") => true,
                [other, ..] => {
                    return Err(ScriptError::new(line, format!("unknown option '{}'", other)));
                }
            };
            Command::Line { x0, y0, x1, y1, color, antialiased }
        }
        "rect" => {
            let (x0, y0, x1, y1) = a.coords()?;
            let border = a.color("a border colour")?;
            let fill = a.color("a fill colour")?;
            let (mode, _) = a.shape_flags(false)?;
            Command::Rect { x0, y0, x1, y1, border, fill, mode }
        }
        "ellipse" => {
            let (x0, y0, x1, y1) = a.coords()?;
            let border = a.color("a border colour")?;
            let fill = a.color("a fill colour")?;
            let (mode, antialiased) = a.shape_flags(true)?;
            Command::Ellipse { x0, y0, x1, y1, border, fill, mode, antialiased }
        }
        "select" => {
            // optional leading mode
            let rest = a.rest();
            let (mode, nums) = match rest.first().and_then(|t| SelectionMode::parse(t)) {
                Some(m) => (m, &rest[1..]),
                None => (SelectionMode::Replace, &rest[..]),
            };
            let mut b = Args { line, name, tokens: nums.iter() };
            let (x0, y0, x1, y1) = b.coords()?;
            b.done()?;
            Command::Select { mode, x0, y0, x1, y1 }
        }
        "wand" => {
            let x = a.int("x")?;
            let y = a.int("y")?;
            let tolerance = a.tolerance()?;
            let mode = match a.rest().as_slice() {
                [] => SelectionMode::Replace,
                [m] => SelectionMode::parse(m)
                    .ok_or_else(|| ScriptError::new(line, format!("unknown selection mode '{}'", m)))?,
                [_, extra, ..] => {
                    return Err(ScriptError::new(line, format!("unexpected '{}' after 'wand'", extra)));
                }
            };
            Command::Wand { x, y, tolerance, mode }
        }
        "select-all" => Command::SelectAll,
        "deselect" => Command::Deselect,
        "delete" => Command::Delete,
        _ => return Err(ScriptError::new(line, format!("unknown command '{}'", name))),
    };
    a.done()?;
    Ok(cmd)
}

/// Parse a whole script. Blank lines and lines starting with `#` are skipped.
pub fn parse_script(source: &str) -> Result<Vec<(usize, Command)>, ScriptError> {
    let mut commands = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        commands.push((i + 1, parse_line(i + 1, text)?));
    }
    Ok(commands)
}

/// Apply one command to the canvas.
pub fn execute(canvas: &mut CanvasState, cmd: &Command) {
    match *cmd {
        Command::Pixel { x, y, color } => {
            canvas.write_pixel(x, y, color);
        }
        Command::Fill { x, y, color } => {
            canvas.flood_fill(x, y, color);
        }
        Command::Replace { x, y, color, tolerance } => {
            canvas.replace_similar(x, y, color, tolerance);
        }
        Command::Erase { x, y, tolerance } => {
            canvas.erase_similar(x, y, tolerance);
        }
        Command::Line { x0, y0, x1, y1, color, antialiased } => {
            canvas.draw_line(x0, y0, x1, y1, color, antialiased);
        }
        Command::Rect { x0, y0, x1, y1, border, fill, mode } => {
            canvas.draw_rectangle(x0, y0, x1, y1, border, fill, mode.draws_border(), mode.draws_fill());
        }
        Command::Ellipse { x0, y0, x1, y1, border, fill, mode, antialiased } => {
            canvas.draw_ellipse(
                x0,
                y0,
                x1,
                y1,
                border,
                fill,
                mode.draws_border(),
                mode.draws_fill(),
                antialiased,
            );
        }
        Command::Select { mode, x0, y0, x1, y1 } => canvas.select_rect(x0, y0, x1, y1, mode),
        Command::Wand { x, y, tolerance, mode } => canvas.magic_wand_select(x, y, tolerance, mode),
        Command::SelectAll => canvas.select_all(),
        Command::Deselect => canvas.deselect(),
        Command::Delete => canvas.delete_selection(),
    }
}

/// Parse then run `source` against `canvas`. Nothing is applied if parsing
/// fails. Returns the number of commands executed.
pub fn run_script(canvas: &mut CanvasState, source: &str) -> Result<usize, ScriptError> {
    let commands = parse_script(source)?;
    for (_, cmd) in &commands {
        execute(canvas, cmd);
    }
    Ok(commands.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::color::{BLACK, TRANSPARENT, WHITE, rgb};

    #[test]
    fn parses_every_command() {
        let src = "\
# header
pixel 1 2 #ff0000
fill 0 0 #00FF0080
replace 1 1 #000000 12
erase 3 3 0
line 0 0 4 4 #000000 aa
rect 0 0 3 3 #000000 #ffffff border
ellipse 0 0 4 4 #000000 #ffffff aa fill

select add 0 0 2 2
select 1 1 3 3
wand 2 2 5 subtract
select-all
deselect
delete
";
        let cmds = parse_script(src).unwrap();
        assert_eq!(cmds.len(), 13);
        assert_eq!(cmds[0], (2, Command::Pixel { x: 1, y: 2, color: rgb(255, 0, 0) }));
        assert!(matches!(cmds[4].1, Command::Line { antialiased: true, .. }));
        assert!(matches!(cmds[5].1, Command::Rect { mode: ShapeMode::BorderOnly, .. }));
        assert!(matches!(
            cmds[6].1,
            Command::Ellipse { mode: ShapeMode::FillOnly, antialiased: true, .. }
        ));
        assert_eq!(cmds[7].0, 10);
        assert!(matches!(cmds[7].1, Command::Select { mode: SelectionMode::Add, .. }));
        assert!(matches!(cmds[8].1, Command::Select { mode: SelectionMode::Replace, x0: 1, .. }));
        assert!(matches!(cmds[9].1, Command::Wand { mode: SelectionMode::Subtract, tolerance: 5, .. }));
    }

    #[test]
    fn unknown_command_reports_line() {
        let err = parse_script("pixel 0 0 #000000\n\nsparkle 1 2\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("sparkle"));
        assert_eq!(err.to_string(), "line 3: unknown command 'sparkle'");
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert_eq!(parse_script("pixel 0 #000000").unwrap_err().line, 1);
        assert!(parse_script("pixel 0 0 red").is_err());
        assert!(parse_script("erase 0 0 -3").is_err());
        assert!(parse_script("line 0 0 1 1 #000000 blur").is_err());
        assert!(parse_script("rect 0 0 1 1 #000000 #ffffff aa").is_err());
        assert!(parse_script("deselect now").is_err());
        assert!(parse_script("select add 0 0 1").is_err());
    }

    #[test]
    fn failed_parse_applies_nothing() {
        let mut c = CanvasState::new(2, 2).unwrap();
        assert!(run_script(&mut c, "pixel 0 0 #000000\nbogus").is_err());
        assert_eq!(c.read_pixel(0, 0), Some(TRANSPARENT));
    }

    #[test]
    fn runs_against_canvas() {
        let mut c = CanvasState::new(5, 5).unwrap();
        let n = run_script(
            &mut c,
            "rect 0 0 4 4 #000000 #FFFFFF\nfill 2 2 #FF0000\nselect 0 0 0 0\ndelete\n",
        )
        .unwrap();
        assert_eq!(n, 4);
        assert_eq!(c.read_pixel(2, 2), Some(rgb(255, 0, 0)));
        assert_eq!(c.read_pixel(4, 4), Some(BLACK));
        assert_eq!(c.read_pixel(0, 0), Some(TRANSPARENT));
        assert!(!c.has_selection());
        assert_ne!(c.read_pixel(2, 2), Some(WHITE));
    }
}
