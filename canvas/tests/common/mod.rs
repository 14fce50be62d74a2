use std::{sync::Arc, time::Duration};

use canvas::{event_channel, EventReceiver, MemoryCluster, MemoryService, SyncConfig, SyncEngine, ViewReceiver, ViewUpdate};

/// Enable tracing with the RUST_LOG environment variable.
///
/// Defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .with_test_writer()
        .try_init();
}

/// One client session on a shared cluster, with both of its channels exposed.
pub struct TestClient {
    pub engine: SyncEngine,
    pub service: Arc<MemoryService>,
    pub events: EventReceiver,
    pub view: ViewReceiver,
}

impl TestClient {
    pub fn connect(cluster: &MemoryCluster) -> TestClient {
        Self::connect_with_config(cluster, SyncConfig::testing())
    }

    pub fn connect_with_config(cluster: &MemoryCluster, config: SyncConfig) -> TestClient {
        enable_tracing();
        let (sender, events) = event_channel();
        let service = Arc::new(cluster.connect_with(sender.clone()));
        let (engine, view) = SyncEngine::new(service.clone(), &config, sender);
        TestClient { engine, service, events, view }
    }

    /// Handles events until none has arrived for a while.
    pub async fn pump(&mut self) {
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await {
            self.engine.handle_event(event).await.unwrap();
        }
    }

    pub fn take_view_updates(&mut self) -> Vec<ViewUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.view.try_recv() {
            updates.push(update);
        }
        updates
    }

    pub fn total_calls(&self) -> usize {
        ["exists", "get_data", "get_children", "create", "set_data"]
            .iter()
            .map(|op| self.service.calls(op))
            .sum()
    }
}
