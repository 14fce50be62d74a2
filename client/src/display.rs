use std::fmt::Write;

use canvas::{Region, REGION_SIZE};

const CURSOR_UP: &str = "\u{1b}[A";
const CURSOR_DOWN: &str = "\u{1b}[B";
const CURSOR_RIGHT: &str = "\u{1b}[C";
const PROMPT: &str = ">: ";
const CELL: &str = "██";
/// Wide enough to blank out any previous status line.
const LINE_WIDTH: usize = 104;
/// Blank lines printed before the very first frame so it does not scroll over the shell.
const LEADING_LINES: usize = 10;

/// Terminal view of the active region.
///
/// Frames are built as strings so the caller can print them while holding the display
/// lock; a full frame and a single-cell patch must never interleave.
#[derive(Debug, Default)]
pub struct Display {
    message: String,
    /// Lines printed by the last full frame, `None` before the first one.
    lines_drawn: Option<usize>,
}

impl Display {
    pub fn new() -> Display {
        Display::default()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Redraws everything: grid, region label, status line and prompt.
    pub fn render_full(&mut self, region: Option<&Region>) -> String {
        let blank = " ".repeat(LINE_WIDTH);
        let mut frame = String::from("\n");
        match region {
            Some(region) => {
                let cells = region.snapshot();
                for row in cells.chunks(REGION_SIZE) {
                    for cell in row {
                        frame.push_str(&cell.value.paint(CELL));
                    }
                    frame.push('\n');
                }
                let (rx, ry) = region.coords();
                let _ = writeln!(frame, "{blank}\rdisplaying: region ({rx}, {ry})");
            }
            None => {
                let _ = writeln!(frame, "{blank}\rdisplaying: nothing");
            }
        }
        let _ = writeln!(frame, "{blank}\rmessage: {}", self.message);
        for _ in 0..2 {
            frame.push_str(&blank);
            frame.push('\n');
        }

        let lines = frame.matches('\n').count();
        let prefix = match self.lines_drawn {
            Some(previous) => CURSOR_UP.repeat(previous),
            None => "\n".repeat(LEADING_LINES),
        };
        self.lines_drawn = Some(lines);
        format!("{prefix}{frame}{blank}\r{PROMPT}")
    }

    /// Repaints one cell in place and puts the cursor back on the prompt.
    ///
    /// `None` until a full frame has been drawn, or when the cell is outside the region.
    pub fn render_cell(&self, region: &Region, cx: i32, cy: i32) -> Option<String> {
        let lines = self.lines_drawn?;
        let cell = region.cell(cx, cy)?;
        let ups = lines.checked_sub(cy as usize + 1)?;

        let mut patch = CURSOR_UP.repeat(ups);
        patch.push('\r');
        patch.push_str(&CURSOR_RIGHT.repeat(cx as usize * 2));
        patch.push_str(&cell.value.paint(CELL));
        patch.push_str(&CURSOR_DOWN.repeat(ups));
        patch.push('\r');
        patch.push_str(PROMPT);
        Some(patch)
    }
}

#[cfg(test)]
mod tests {
    use canvas::{Canvas, Color};

    use super::*;

    #[test]
    fn full_frame_layout() {
        let canvas = Canvas::new();
        let region = canvas.set_active(3, -4);
        canvas.set_cell_value(&region, 0, 0, Color::Red);
        let mut display = Display::new();
        display.set_message("hello");

        let first = display.render_full(Some(&region));
        assert!(first.starts_with(&"\n".repeat(LEADING_LINES)));
        assert!(first.contains("displaying: region (3, -4)"));
        assert!(first.contains("message: hello"));
        assert!(first.contains(&Color::Red.paint(CELL)));
        assert!(first.ends_with(PROMPT));

        let second = display.render_full(Some(&region));
        let grid_and_footer = 1 + REGION_SIZE + 1 + 1 + 2;
        assert!(second.starts_with(&CURSOR_UP.repeat(grid_and_footer)));
        assert!(!second.starts_with(&CURSOR_UP.repeat(grid_and_footer + 1)));
    }

    #[test]
    fn cell_patch_needs_a_full_frame_first() {
        let canvas = Canvas::new();
        let region = canvas.set_active(0, 0);
        canvas.set_cell_value(&region, 2, 0, Color::Blue);
        let mut display = Display::new();
        assert_eq!(display.render_cell(&region, 2, 0), None);

        display.render_full(Some(&region));
        let patch = display.render_cell(&region, 2, 0).unwrap();
        let ups = 1 + REGION_SIZE + 1 + 1 + 2 - 1;
        assert!(patch.starts_with(&format!("{}\r{}", CURSOR_UP.repeat(ups), CURSOR_RIGHT.repeat(4))));
        assert!(patch.contains(&Color::Blue.paint(CELL)));
        assert!(patch.ends_with(&format!("{}\r{PROMPT}", CURSOR_DOWN.repeat(ups))));
        assert_eq!(display.render_cell(&region, 50, 0), None);
    }
}
