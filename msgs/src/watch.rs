#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Fires when the node is created, has its data set, or is removed.
    Data,
    /// Fires when a child of the node is created or removed.
    Children,
}

impl WatchKind {
    pub fn from_u32(index: u32) -> Option<WatchKind> {
        match index {
            0 => Some(WatchKind::Data),
            1 => Some(WatchKind::Children),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            WatchKind::Data => 0,
            WatchKind::Children => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub kind: WatchKind,
    pub path: String,
}
