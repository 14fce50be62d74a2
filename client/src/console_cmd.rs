use std::{path::Path, str::FromStr};

use anyhow::{bail, Context};
use canvas::{shapes, Color, Direction, DrawReport, RequestMode, SyncEngine};

use crate::experiment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCmd {
    View { rx: i32, ry: i32 },
    Move (Direction),
    Set { x: i32, y: i32, color: Color },
    Rect { x1: i32, y1: i32, x2: i32, y2: i32, color: Color },
    Checker { x1: i32, y1: i32, x2: i32, y2: i32, first: Color, second: Color },
    /// `fill` is `None` when the fill type was not recognised; that draws an outline.
    Circle { x: i32, y: i32, radius: i32, fill: Option<bool>, color: Color },
    WriteTest { experiment: u32, writes: usize },
    Store { server: u32, experiment: u32, expected: u32 },
}

impl ConsoleCmd {
    pub fn parse(input: &str) -> anyhow::Result<ConsoleCmd> {
        let input = input.trim().to_lowercase();
        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts.first().copied().unwrap_or_default();
        let args = parts.get(1..).unwrap_or_default();

        let cmd = match command {
            "view" => {
                let [rx, ry] = args else { bail!("usage: 'view x y' (x and y are region coordinates)") };
                let (rx, ry) = coords(rx, ry).context("error: invalid region coordinates")?;
                ConsoleCmd::View { rx, ry }
            }
            "move" => {
                let [direction] = args else { bail!("usage: 'move direction' (direction: up, down, left, right)") };
                let direction = Direction::from_str(direction).map_err(|e| anyhow::anyhow!("error: {e}"))?;
                ConsoleCmd::Move(direction)
            }
            "set" => {
                let [x, y, color] = args else { bail!("usage: 'set x y color'") };
                let (x, y) = coords(x, y).context("error: invalid cell coordinates")?;
                ConsoleCmd::Set { x, y, color: color_arg(color)? }
            }
            "rect" => {
                let [x1, y1, x2, y2, color] = args else {
                    bail!("usage: 'rect x1 y1 x2 y2 color' (x1, y1 = cell1 coords and x2, y2 = cell2 coords)")
                };
                let ((x1, y1), (x2, y2)) = coords(x1, y1).zip(coords(x2, y2)).context("error: invalid cell coordinates")?;
                ConsoleCmd::Rect { x1, y1, x2, y2, color: color_arg(color)? }
            }
            "checker" => {
                let [x1, y1, x2, y2, first, second] = args else {
                    bail!("usage: 'checker x1 y1 x2 y2 color1 color2' (x1, y1 = cell1 coords and x2, y2 = cell2 coords)")
                };
                let ((x1, y1), (x2, y2)) = coords(x1, y1).zip(coords(x2, y2)).context("error: invalid cell coordinates")?;
                ConsoleCmd::Checker { x1, y1, x2, y2, first: color_arg(first)?, second: color_arg(second)? }
            }
            "circle" => {
                let [x, y, radius, fill, color] = args else {
                    bail!("usage: 'circle x y r fill_type color' (x, y = cell coords, r = radius, fill_type = fill or line)")
                };
                let ((x, y), radius) = coords(x, y)
                    .zip(radius.parse::<i32>().ok())
                    .context("error: invalid cell coordinates or radius")?;
                if !(1..=shapes::MAX_RADIUS).contains(&radius) {
                    bail!("error: invalid radius, please enter a positive integer up to {}", shapes::MAX_RADIUS);
                }
                let fill = match *fill {
                    "fill" | "solid" => Some(true),
                    "line" => Some(false),
                    _ => None,
                };
                ConsoleCmd::Circle { x, y, radius, fill, color: color_arg(color)? }
            }
            "write_test" => {
                let [experiment, writes] = args else { bail!("usage: 'write_test experiment_num num_writes'") };
                ConsoleCmd::WriteTest {
                    experiment: experiment.parse().context("error: invalid experiment number")?,
                    writes: writes.parse().context("error: invalid number of writes")?,
                }
            }
            "store" => {
                let [server, experiment, expected] = args else { bail!("usage: 'store server_id experiment_num updates_expected'") };
                ConsoleCmd::Store {
                    server: server.parse().context("error: invalid server id")?,
                    experiment: experiment.parse().context("error: invalid experiment number")?,
                    expected: expected.parse().context("error: invalid number of expected updates")?,
                }
            }
            _ => bail!("error: invalid command, please use 'set', 'move', 'view', 'rect', 'checker', or 'circle'"),
        };
        Ok(cmd)
    }

    /// Runs the command. The returned string, if any, becomes the status line.
    ///
    /// Engine failures come back as [`canvas::SyncError`] inside the `anyhow::Error`, so the
    /// caller can tell fatal ones apart.
    pub async fn execute(self, engine: &SyncEngine, output_dir: &Path) -> anyhow::Result<Option<String>> {
        match self {
            ConsoleCmd::View { rx, ry } => engine.open_region(rx, ry).await?,
            ConsoleCmd::Move(direction) => engine.move_view(direction).await?,
            ConsoleCmd::Set { x, y, color } => engine.set_cell(x, y, color, RequestMode::Sync).await?,
            ConsoleCmd::Rect { x1, y1, x2, y2, color } => {
                let cells = shapes::rect(x1, y1, x2, y2).into_iter().map(|(x, y)| (x, y, color)).collect();
                return Ok(draw_message(engine.set_cells(cells).await?));
            }
            ConsoleCmd::Checker { x1, y1, x2, y2, first, second } => {
                return Ok(draw_message(engine.set_cells(shapes::checker(x1, y1, x2, y2, first, second)).await?));
            }
            ConsoleCmd::Circle { x, y, radius, fill, color } => {
                let cells = shapes::circle(x, y, radius, fill.unwrap_or(false))
                    .into_iter()
                    .map(|(x, y)| (x, y, color))
                    .collect();
                let report = engine.set_cells(cells).await?;
                if fill.is_none() {
                    return Ok(Some("invalid fill_type, defaulting to 'line'".to_string()));
                }
                return Ok(draw_message(report));
            }
            ConsoleCmd::WriteTest { experiment, writes } => {
                let path = experiment::write_test(engine, output_dir, experiment, writes).await?;
                return Ok(Some(format!("wrote {writes} cells, timestamp saved to {}", path.display())));
            }
            ConsoleCmd::Store { server, experiment, expected } => {
                let log = engine.update_log();
                let path = experiment::store_updates(output_dir, server, experiment, expected, &log).await?;
                return Ok(Some(format!("saved {} updates to {}", log.len(), path.display())));
            }
        }
        Ok(None)
    }
}

fn coords(x: &str, y: &str) -> Option<(i32, i32)> {
    Some((x.parse().ok()?, y.parse().ok()?))
}

fn color_arg(name: &str) -> anyhow::Result<Color> {
    name.parse().map_err(|_| anyhow::anyhow!("error: invalid color {name:?}"))
}

fn draw_message(report: DrawReport) -> Option<String> {
    if report.skipped == 0 && report.failed == 0 {
        return None;
    }
    Some(format!(
        "drew {} cells, {} outside the region, {} failed",
        report.written, report.skipped, report.failed
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_drawing_commands() {
        assert_eq!(ConsoleCmd::parse("view -1 2\n").unwrap(), ConsoleCmd::View { rx: -1, ry: 2 });
        assert_eq!(ConsoleCmd::parse("MOVE Left").unwrap(), ConsoleCmd::Move(Direction::Left));
        assert_eq!(ConsoleCmd::parse("set 5 5 red").unwrap(), ConsoleCmd::Set { x: 5, y: 5, color: Color::Red });
        assert_eq!(
            ConsoleCmd::parse("rect 1 1 0 0 blue").unwrap(),
            ConsoleCmd::Rect { x1: 1, y1: 1, x2: 0, y2: 0, color: Color::Blue }
        );
        assert_eq!(
            ConsoleCmd::parse("checker 0 0 3 3 black  yellow").unwrap(),
            ConsoleCmd::Checker { x1: 0, y1: 0, x2: 3, y2: 3, first: Color::Black, second: Color::Yellow }
        );
        assert_eq!(
            ConsoleCmd::parse("circle 10 10 4 solid green").unwrap(),
            ConsoleCmd::Circle { x: 10, y: 10, radius: 4, fill: Some(true), color: Color::Green }
        );
        assert_eq!(
            ConsoleCmd::parse("circle 10 10 4 dotted green").unwrap(),
            ConsoleCmd::Circle { x: 10, y: 10, radius: 4, fill: None, color: Color::Green }
        );
        assert_eq!(ConsoleCmd::parse("store 1 2 300").unwrap(), ConsoleCmd::Store { server: 1, experiment: 2, expected: 300 });
    }

    #[test]
    fn errors_are_one_line_messages() {
        let message = |input: &str| ConsoleCmd::parse(input).unwrap_err().to_string();
        assert_eq!(message("set 1 2"), "usage: 'set x y color'");
        assert_eq!(message("set a 2 red"), "error: invalid cell coordinates");
        assert_eq!(message("set 1 2 magenta"), "error: invalid color \"magenta\"");
        assert_eq!(message("circle 1 1 0 line red"), "error: invalid radius, please enter a positive integer up to 4096");
        assert_eq!(message("circle 10 10 1073741825 line red"), "error: invalid radius, please enter a positive integer up to 4096");
        assert_eq!(message("circle 10 10 99999999999 line red"), "error: invalid cell coordinates or radius");
        assert!(message("move north").starts_with("error: invalid direction"));
        assert!(message("").starts_with("error: invalid command"));
        assert!(message("erase 1 1").starts_with("error: invalid command"));
    }

    #[tokio::test]
    async fn oversized_shapes_only_touch_the_region() {
        let cluster = canvas::MemoryCluster::new();
        let (sender, _events) = canvas::event_channel();
        let service = std::sync::Arc::new(cluster.connect_with(sender.clone()));
        let (engine, _view) = SyncEngine::new(service, &canvas::SyncConfig::testing(), sender);
        engine.open_region(0, 0).await.unwrap();

        let cmd = ConsoleCmd::parse("rect 40 45 100000 100000 red").unwrap();
        assert_eq!(cmd.execute(&engine, Path::new(".")).await.unwrap(), None);
        assert_eq!(cluster.children("/canvas/region_0,0/cells").len(), 10 * 5);

        let cmd = ConsoleCmd::parse("circle 25 25 4096 fill blue").unwrap();
        assert_eq!(cmd.execute(&engine, Path::new(".")).await.unwrap(), None);
        assert_eq!(cluster.children("/canvas/region_0,0/cells").len(), canvas::REGION_SIZE * canvas::REGION_SIZE);
    }
}
