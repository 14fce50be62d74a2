/// How a failed service call must be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection-class failure, worth retrying after a backoff.
    Transient,
    /// The node was already in the requested state (create race).
    Conflict,
    /// The session is gone; nothing more can be done with it.
    Session,
    /// The request itself was unacceptable. Retrying will not help.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("connection to the coordination service was lost")]
    ConnectionLoss,
    #[error("operation timed out")]
    OperationTimeout,
    #[error("node does not exist")]
    NoNode,
    #[error("node already exists")]
    NodeExists,
    #[error("session expired")]
    SessionExpired,
    #[error("authentication failed")]
    AuthFailed,
    #[error("bad arguments")]
    BadArguments,
    #[error("could not marshal request")]
    Marshalling,
    #[error("ephemeral nodes may not have children")]
    NoChildrenForEphemerals,
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ServiceError::ConnectionLoss
            | ServiceError::OperationTimeout
            | ServiceError::NoNode => ErrorClass::Transient,
            ServiceError::NodeExists => ErrorClass::Conflict,
            ServiceError::SessionExpired | ServiceError::AuthFailed => ErrorClass::Session,
            ServiceError::BadArguments
            | ServiceError::Marshalling
            | ServiceError::NoChildrenForEphemerals => ErrorClass::Rejected,
        }
    }

    pub fn from_u32(code: u32) -> Option<ServiceError> {
        match code {
            1 => Some(ServiceError::ConnectionLoss),
            2 => Some(ServiceError::OperationTimeout),
            3 => Some(ServiceError::NoNode),
            4 => Some(ServiceError::NodeExists),
            5 => Some(ServiceError::SessionExpired),
            6 => Some(ServiceError::AuthFailed),
            7 => Some(ServiceError::BadArguments),
            8 => Some(ServiceError::Marshalling),
            9 => Some(ServiceError::NoChildrenForEphemerals),
            _ => None,
        }
    }

    /// Wire code. Zero is reserved for success.
    pub fn as_u32(&self) -> u32 {
        match self {
            ServiceError::ConnectionLoss => 1,
            ServiceError::OperationTimeout => 2,
            ServiceError::NoNode => 3,
            ServiceError::NodeExists => 4,
            ServiceError::SessionExpired => 5,
            ServiceError::AuthFailed => 6,
            ServiceError::BadArguments => 7,
            ServiceError::Marshalling => 8,
            ServiceError::NoChildrenForEphemerals => 9,
        }
    }
}
