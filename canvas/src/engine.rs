use std::{str::FromStr, sync::Arc};

use msgs::{ErrorClass, ServiceError};
use parking_lot::Mutex;
use tokio::{sync::{mpsc, Semaphore}, task::JoinSet};

use crate::{
    cache::{in_region, Canvas, Region},
    color::Color,
    config::SyncConfig,
    dispatcher::{Dispatcher, RequestMode},
    error::SyncError,
    path_codec,
    service::{Coordination, Event, EventReceiver, EventSender, SessionState},
};

/// What the display has to redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// The active region changed or was refreshed as a whole.
    Full,
    /// One cell of the active region changed.
    Cell { cx: i32, cy: i32 },
    /// A one-line message to show under the grid.
    Status(String),
}

pub type ViewSender = mpsc::UnboundedSender<ViewUpdate>;
pub type ViewReceiver = mpsc::UnboundedReceiver<ViewUpdate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction {0:?}, please use 'up', 'down', 'left', or 'right'")]
pub struct UnknownDirection(pub String);

impl Direction {
    /// Region offset of one step. `y` grows downwards.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// Outcome of a multi-cell write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub written: usize,
    /// Points outside the region, never sent.
    pub skipped: usize,
    pub failed: usize,
}

/// Keeps the local [`Canvas`] in sync with the coordination service.
///
/// One engine exists per session. It is a cheap handle: clones share the cache, the
/// dispatcher and the view channel, so commands can run on their own tasks while
/// [`SyncEngine::run`] consumes notifications.
#[derive(Clone)]
pub struct SyncEngine {
    canvas: Arc<Canvas>,
    dispatcher: Dispatcher,
    view: ViewSender,
    update_log: Arc<Mutex<Vec<i64>>>,
    max_parallel_writes: usize,
}

impl SyncEngine {
    /// `events` must be the channel the service delivers its notifications on, so that
    /// asynchronous completions are ordered with them.
    pub fn new(service: Arc<dyn Coordination>, config: &SyncConfig, events: EventSender) -> (SyncEngine, ViewReceiver) {
        let (view, view_receiver) = mpsc::unbounded_channel();
        let engine = SyncEngine {
            canvas: Arc::new(Canvas::new()),
            dispatcher: Dispatcher::new(service, config, events),
            view,
            update_log: Arc::new(Mutex::new(Vec::new())),
            max_parallel_writes: config.max_parallel_writes.max(1),
        };
        (engine, view_receiver)
    }

    pub fn canvas(&self) -> &Arc<Canvas> {
        &self.canvas
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Milliseconds since the epoch of every asynchronous read completion so far.
    pub fn update_log(&self) -> Vec<i64> {
        self.update_log.lock().clone()
    }

    pub fn status(&self, message: impl Into<String>) {
        let _ = self.view.send(ViewUpdate::Status(message.into()));
    }

    pub fn redraw(&self) {
        let _ = self.view.send(ViewUpdate::Full);
    }

    /// Makes (rx, ry) the active region and brings it up to date.
    ///
    /// The first time a region is opened its cells are read synchronously, so the view is
    /// complete once this returns. Reopening only reads cells that appeared since.
    pub async fn open_region(&self, rx: i32, ry: i32) -> Result<(), SyncError> {
        let region = self.canvas.set_active(rx, ry);
        self.dispatcher.ensure_namespace(rx, ry).await?;
        let mode = if region.is_discovered() { RequestMode::Async } else { RequestMode::Sync };
        self.refresh_region(&region, mode).await?;
        let _ = self.view.send(ViewUpdate::Full);
        Ok(())
    }

    pub async fn move_view(&self, direction: Direction) -> Result<(), SyncError> {
        let (rx, ry) = self.canvas.active().ok_or(SyncError::NoActiveRegion)?.coords();
        let (dx, dy) = direction.offset();
        self.open_region(rx.saturating_add(dx), ry.saturating_add(dy)).await
    }

    /// Lists the region's cells, re-arming the child watch, and reads every cell name not
    /// seen on the previous listing.
    ///
    /// Names count as seen once listed, so a cell whose read fails here is not read again
    /// while its name stays in the listing.
    async fn refresh_region(&self, region: &Region, mode: RequestMode) -> Result<(), SyncError> {
        let mut listing = self.dispatcher.read_children(&region.cells_path(), true).await?;
        listing.sort_by_key(|name| path_codec::parse_cell_name(name).map(|(cx, cy)| (cy, cx)));

        for name in region.take_new_names(&listing) {
            let (cx, cy) = match path_codec::parse_cell_name(name) {
                Some((cx, cy)) if in_region(cx, cy) => (cx, cy),
                Some((cx, cy)) => {
                    self.status(format!("error: tried to update cell ({cx}, {cy}) which is outside the region"));
                    continue;
                }
                None => {
                    tracing::warn!(name = %name, region = ?region.coords(), "ignoring malformed cell name");
                    continue;
                }
            };
            let path = region.cell_path(cx, cy);
            match mode {
                RequestMode::Sync => match self.dispatcher.read_cell_sync(&path, true).await {
                    Ok(Some(color)) => {
                        self.canvas.set_cell_value(region, cx, cy, color);
                        self.redraw_cell(region, cx, cy);
                    }
                    Ok(None) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => self.status(format!("error: {e}")),
                },
                RequestMode::Async => self.dispatcher.read_cell_async(path, true),
            }
        }
        Ok(())
    }

    /// Writes one cell of the active region.
    ///
    /// A synchronous write updates the cache as soon as the service accepted it. An
    /// asynchronous one returns immediately and relies on the watches to bring the value back.
    pub async fn set_cell(&self, cx: i32, cy: i32, color: Color, mode: RequestMode) -> Result<(), SyncError> {
        if !in_region(cx, cy) {
            return Err(SyncError::CellOutOfRange { cx, cy });
        }
        let region = self.canvas.active().ok_or(SyncError::NoActiveRegion)?;
        let path = region.cell_path(cx, cy);
        match mode {
            RequestMode::Sync => {
                self.dispatcher.write_cell_sync(&path, color).await?;
                self.canvas.set_cell_value(&region, cx, cy, color);
                self.redraw_cell(&region, cx, cy);
            }
            RequestMode::Async => self.dispatcher.write_cell_async(path, color),
        }
        Ok(())
    }

    /// Writes many cells concurrently, at most `max_parallel_writes` at a time.
    ///
    /// There is no atomicity across cells. A fatal error stops the remaining writes and is
    /// returned; other failures are counted in the report.
    pub async fn set_cells(&self, cells: Vec<(i32, i32, Color)>) -> Result<DrawReport, SyncError> {
        let permits = Arc::new(Semaphore::new(self.max_parallel_writes));
        let mut report = DrawReport::default();
        let mut writes = JoinSet::new();

        for (cx, cy, color) in cells {
            if !in_region(cx, cy) {
                report.skipped += 1;
                continue;
            }
            let engine = self.clone();
            let permits = permits.clone();
            writes.spawn(async move {
                let _permit = permits.acquire_owned().await;
                engine.set_cell(cx, cy, color, RequestMode::Sync).await
            });
        }

        while let Some(joined) = writes.join_next().await {
            match joined {
                Ok(Ok(())) => report.written += 1,
                Ok(Err(e)) if e.is_fatal() => {
                    writes.abort_all();
                    return Err(e);
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "cell write failed");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cell write task failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Consumes notifications and completions until the channel closes or a fatal error.
    ///
    /// Child listings are refreshed on their own tasks so that a slow or retrying listing
    /// does not hold up the notifications behind it.
    pub async fn run(&self, mut events: EventReceiver) -> Result<(), SyncError> {
        let mut refreshes = JoinSet::new();
        loop {
            tokio::select! {
                Some(joined) = refreshes.join_next(), if !refreshes.is_empty() => {
                    match joined {
                        Ok(result) => result?,
                        Err(e) => tracing::warn!(error = %e, "region refresh task failed"),
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else { return Ok(()) };
                    match event {
                        Event::ChildrenChanged(_) => {
                            let engine = self.clone();
                            refreshes.spawn(async move { engine.handle_event(event).await });
                        }
                        event => self.handle_event(event).await?,
                    }
                }
            }
        }
    }

    /// Applies one notification or completion. Only fatal errors are returned; everything
    /// else is reported on the view channel.
    pub async fn handle_event(&self, event: Event) -> Result<(), SyncError> {
        tracing::debug!(?event, "handling event");
        match event {
            Event::ChildrenChanged(path) => {
                let Some(region) = self.canvas.lookup_by_path(&path) else {
                    tracing::debug!(%path, "child notification for unknown region");
                    return Ok(());
                };
                self.report(self.refresh_region(&region, RequestMode::Async).await)?;
                if self.canvas.is_active(&region) {
                    let _ = self.view.send(ViewUpdate::Full);
                }
            }
            Event::DataChanged(path) => {
                let Some(region) = self.canvas.lookup_by_path(&path) else { return Ok(()) };
                if !self.canvas.is_active(&region) {
                    return Ok(());
                }
                match path_codec::cell_coords_from_path(&path) {
                    Some((cx, cy)) if in_region(cx, cy) => self.dispatcher.read_cell_async(path, true),
                    Some((cx, cy)) => self.status(format!("error: tried to update cell ({cx}, {cy}) which is outside the region")),
                    None => tracing::warn!(%path, "data notification for a non-cell path"),
                }
            }
            Event::DataLoaded { path, result } => {
                self.update_log.lock().push(chrono::Utc::now().timestamp_millis());
                match result {
                    Ok(data) => self.apply_loaded(&path, data.as_deref()),
                    Err(error) => self.service_failure(&path, error)?,
                }
            }
            Event::WriteFailed { path, error } => self.service_failure(&path, error)?,
            Event::SessionState(state) => match state {
                SessionState::Connected | SessionState::Disconnected => {
                    tracing::info!(?state, "session state changed");
                    self.status(format!("coordination session state was updated: {state:?}"));
                }
                SessionState::Expired => return Err(SyncError::SessionLost(ServiceError::SessionExpired)),
                SessionState::AuthFailed => return Err(SyncError::SessionLost(ServiceError::AuthFailed)),
            },
            Event::SessionClosed(error) => return Err(SyncError::SessionLost(error)),
        }
        Ok(())
    }

    fn apply_loaded(&self, path: &str, data: Option<&[u8]>) {
        let (Some(region), Some((cx, cy))) = (self.canvas.lookup_by_path(path), path_codec::cell_coords_from_path(path)) else {
            tracing::warn!(path, "read completion for an unknown cell");
            return;
        };
        if !self.canvas.set_cell_value(&region, cx, cy, Color::from_payload(data)) {
            self.status(format!("error: tried to update cell ({cx}, {cy}) which is outside the region"));
            return;
        }
        self.redraw_cell(&region, cx, cy);
    }

    fn service_failure(&self, path: &str, error: ServiceError) -> Result<(), SyncError> {
        if error.class() == ErrorClass::Session {
            return Err(SyncError::SessionLost(error));
        }
        tracing::warn!(path, %error, "asynchronous request failed");
        self.status(format!("error: request for {path} failed: {error}"));
        Ok(())
    }

    fn report(&self, result: Result<(), SyncError>) -> Result<(), SyncError> {
        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.status(format!("error: {e}"));
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn redraw_cell(&self, region: &Region, cx: i32, cy: i32) {
        if self.canvas.is_active(region) {
            let _ = self.view.send(ViewUpdate::Cell { cx, cy });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions() {
        assert_eq!("UP".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("left".parse::<Direction>().map(Direction::offset), Ok((-1, 0)));
        assert!("north".parse::<Direction>().is_err());
    }
}
