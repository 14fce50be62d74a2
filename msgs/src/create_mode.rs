#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    Persistent,
    /// Removed by the server when the creating session closes.
    Ephemeral,
}

impl CreateMode {
    pub fn from_u32(index: u32) -> Option<CreateMode> {
        match index {
            0 => Some(CreateMode::Persistent),
            1 => Some(CreateMode::Ephemeral),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            CreateMode::Persistent => 0,
            CreateMode::Ephemeral => 1,
        }
    }
}
