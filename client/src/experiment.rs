//! Latency experiment helpers: timed bulk writes on one client and the arrival log of
//! remote updates on another.

use std::path::{Path, PathBuf};

use anyhow::Context;
use canvas::{Color, SyncEngine, REGION_SIZE};

pub const OUTPUT_DIR: &str = "experiment_output";

/// The first `writes` cells of a region in row-major order, all red.
pub fn write_test_cells(writes: usize) -> Vec<(i32, i32, Color)> {
    (0..REGION_SIZE as i32)
        .flat_map(|y| (0..REGION_SIZE as i32).map(move |x| (x, y, Color::Red)))
        .take(writes)
        .collect()
}

/// Writes the cells of [`write_test_cells`] to the active region, then records the time
/// the last write completed.
pub async fn write_test(engine: &SyncEngine, dir: &Path, experiment: u32, writes: usize) -> anyhow::Result<PathBuf> {
    let report = engine.set_cells(write_test_cells(writes)).await?;
    let finished = chrono::Utc::now().timestamp_millis();
    tracing::info!(experiment, ?report, finished, "write test done");

    let path = dir.join(format!("write_{writes}_{experiment}.txt"));
    save(&path, finished.to_string()).await?;
    Ok(path)
}

pub async fn store_updates(dir: &Path, server: u32, experiment: u32, expected: u32, log: &[i64]) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("updates_{server}_{experiment}_{expected}.txt"));
    save(&path, format_update_log(log)).await?;
    Ok(path)
}

/// One `index,timestamp` line per update, indices starting at 1.
pub fn format_update_log(log: &[i64]) -> String {
    log.iter()
        .enumerate()
        .map(|(i, timestamp)| format!("{},{timestamp}\n", i + 1))
        .collect()
}

async fn save(path: &Path, content: String) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.with_context(|| format!("failed to create {}", dir.display()))?;
    }
    tokio::fs::write(path, content).await.with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use canvas::{event_channel, MemoryCluster, SyncConfig};

    use super::*;

    #[test]
    fn write_test_cells_wrap_rows() {
        let cells = write_test_cells(52);
        assert_eq!(cells.len(), 52);
        assert_eq!(cells[0], (0, 0, Color::Red));
        assert_eq!(cells[49], (49, 0, Color::Red));
        assert_eq!(cells[51], (1, 1, Color::Red));
        assert_eq!(write_test_cells(10_000).len(), REGION_SIZE * REGION_SIZE);
    }

    #[test]
    fn update_log_lines() {
        assert_eq!(format_update_log(&[]), "");
        assert_eq!(format_update_log(&[1700000000000, 1700000000042]), "1,1700000000000\n2,1700000000042\n");
    }

    #[tokio::test]
    async fn write_test_saves_the_completion_time() {
        let dir = std::env::temp_dir().join(format!("canvas_client_experiment_{}", std::process::id()));
        let cluster = MemoryCluster::new();
        let (sender, _events) = event_channel();
        let service = Arc::new(cluster.connect_with(sender.clone()));
        let (engine, _view) = SyncEngine::new(service, &SyncConfig::testing(), sender);
        engine.open_region(0, 0).await.unwrap();

        let path = write_test(&engine, &dir, 3, 60).await.unwrap();

        assert_eq!(path, dir.join("write_60_3.txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.parse::<i64>().unwrap() > 0);
        assert_eq!(cluster.children("/canvas/region_0,0/cells").len(), 60);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
