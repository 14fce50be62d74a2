use std::sync::Arc;

use msgs::{CreateMode, ServiceError};

use crate::{color::Color, config::SyncConfig, error::SyncError, path_codec, retry::RetryPolicy, service::{Coordination, Event, EventSender}};

/// Cell nodes outlive the session that wrote them; the canvas belongs to the service.
pub const CELL_MODE: CreateMode = CreateMode::Persistent;

/// Whether a request blocks its caller until the reply, or completes on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Sync,
    Async,
}

/// Issues cell and region requests against the coordination service.
///
/// Synchronous requests go through the shared [`RetryPolicy`]. Asynchronous requests are
/// spawned onto the runtime and report back on the event channel: reads with
/// [`Event::DataLoaded`], failed writes with [`Event::WriteFailed`].
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn Coordination>,
    retry: Arc<RetryPolicy>,
    completions: EventSender,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn Coordination>, config: &SyncConfig, completions: EventSender) -> Dispatcher {
        Dispatcher {
            service,
            retry: Arc::new(RetryPolicy::new(config.retry_limit, config.retry_backoff)),
            completions,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.retry.consecutive_failures()
    }

    /// Makes sure the root, region and cells nodes of region (rx, ry) exist.
    pub async fn ensure_namespace(&self, rx: i32, ry: i32) -> Result<(), SyncError> {
        let paths = [
            path_codec::ROOT_PATH.to_string(),
            path_codec::region_path(rx, ry),
            path_codec::cells_path(rx, ry),
        ];
        for path in &paths {
            self.ensure_node(path).await?;
        }
        Ok(())
    }

    async fn ensure_node(&self, path: &str) -> Result<(), SyncError> {
        if self.retry.run(path, || self.service.exists(path, false)).await? {
            return Ok(());
        }
        match self.retry.run(path, || self.service.create(path, CreateMode::Persistent, None)).await {
            Ok(_) => {
                tracing::debug!(path, "created");
                Ok(())
            }
            Err(SyncError::Rejected { source: ServiceError::NodeExists, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn read_children(&self, path: &str, watch: bool) -> Result<Vec<String>, SyncError> {
        self.retry.run(path, || self.service.get_children(path, watch)).await
    }

    /// `Ok(None)` when the cell node does not exist.
    pub async fn read_cell_sync(&self, path: &str, watch: bool) -> Result<Option<Color>, SyncError> {
        let data = self.retry.run(path, || self.service.get_data(path, watch)).await?;
        Ok(data.map(|data| Color::from_payload(Some(&data))))
    }

    pub fn read_cell_async(&self, path: String, watch: bool) {
        let service = self.service.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = service.get_data(&path, watch).await;
            if completions.send(Event::DataLoaded { path, result }).is_err() {
                tracing::debug!("event channel closed, dropping read completion");
            }
        });
    }

    /// Sets the cell if it exists, creates it with `color` otherwise.
    ///
    /// Losing a create race to another client is accepted as is: the cell then holds
    /// whatever the winner wrote.
    pub async fn write_cell_sync(&self, path: &str, color: Color) -> Result<(), SyncError> {
        let data = color.to_bytes();
        if self.retry.run(path, || self.service.exists(path, false)).await? {
            return self.retry.run(path, || self.service.set_data(path, &data)).await;
        }
        match self.retry.run(path, || self.service.create(path, CELL_MODE, Some(&data))).await {
            Ok(_) => Ok(()),
            Err(SyncError::Rejected { source: ServiceError::NodeExists, .. }) => {
                tracing::debug!(path, "cell created concurrently by another client");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Fire-and-forget write: create, falling back to set when the node already exists.
    pub fn write_cell_async(&self, path: String, color: Color) {
        let service = self.service.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let data = color.to_bytes();
            let result = match service.create(&path, CELL_MODE, Some(&data)).await {
                Ok(_) => Ok(()),
                Err(ServiceError::NodeExists) => service.set_data(&path, &data).await,
                Err(e) => Err(e),
            };
            if let Err(error) = result {
                let _ = completions.send(Event::WriteFailed { path, error });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::{memory_service::MemoryCluster, service::event_channel};

    use super::*;

    fn dispatcher(cluster: &MemoryCluster) -> (Dispatcher, Arc<crate::memory_service::MemoryService>) {
        let (service, _notifications) = cluster.connect();
        let service = Arc::new(service);
        let (completions, _) = event_channel();
        (Dispatcher::new(service.clone(), &SyncConfig::testing(), completions), service)
    }

    #[tokio::test]
    async fn ensure_namespace_is_idempotent() {
        let cluster = MemoryCluster::new();
        let (dispatcher, service) = dispatcher(&cluster);

        dispatcher.ensure_namespace(1, -2).await.unwrap();
        let nodes = cluster.node_count();
        dispatcher.ensure_namespace(1, -2).await.unwrap();

        assert_eq!(cluster.node_count(), nodes);
        assert_eq!(cluster.children("/canvas"), vec!["region_1,-2".to_string()]);
        assert_eq!(cluster.children("/canvas/region_1,-2"), vec!["cells".to_string()]);
        assert_eq!(service.calls("create"), 3);
    }

    #[tokio::test]
    async fn sync_write_then_read() {
        let cluster = MemoryCluster::new();
        let (dispatcher, _service) = dispatcher(&cluster);
        dispatcher.ensure_namespace(0, 0).await.unwrap();
        let path = path_codec::cell_path(0, 0, 5, 5);

        assert_eq!(dispatcher.read_cell_sync(&path, false).await, Ok(None));
        dispatcher.write_cell_sync(&path, Color::Red).await.unwrap();
        assert_eq!(dispatcher.read_cell_sync(&path, false).await, Ok(Some(Color::Red)));
        dispatcher.write_cell_sync(&path, Color::Green).await.unwrap();
        assert_eq!(dispatcher.read_cell_sync(&path, false).await, Ok(Some(Color::Green)));
    }

    #[tokio::test]
    async fn async_write_reports_failures_on_the_event_channel() {
        let cluster = MemoryCluster::new();
        let (service, _notifications) = cluster.connect();
        let (completions, mut events) = event_channel();
        let dispatcher = Dispatcher::new(Arc::new(service), &SyncConfig::testing(), completions);

        // no namespace yet, so the parent is missing
        let path = path_codec::cell_path(0, 0, 1, 1);
        dispatcher.write_cell_async(path.clone(), Color::Blue);
        assert_eq!(events.recv().await, Some(Event::WriteFailed { path, error: ServiceError::NoNode }));
    }

    #[tokio::test]
    async fn async_read_completes_with_the_originating_path() {
        let cluster = MemoryCluster::new();
        let (service, _notifications) = cluster.connect();
        let (completions, mut events) = event_channel();
        let dispatcher = Dispatcher::new(Arc::new(service), &SyncConfig::testing(), completions);
        dispatcher.ensure_namespace(0, 0).await.unwrap();
        let path = path_codec::cell_path(0, 0, 3, 4);
        dispatcher.write_cell_sync(&path, Color::Cyan).await.unwrap();

        dispatcher.read_cell_async(path.clone(), true);
        assert_eq!(events.recv().await, Some(Event::DataLoaded { path, result: Ok(Some(b"CYAN".to_vec())) }));
    }
}
