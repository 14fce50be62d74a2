pub mod client_server_msg;
pub mod codec;
pub mod create_mode;
pub mod dequeue;
pub mod discover_server;
pub mod error_code;
pub mod namespace;
pub mod server_client_msg;
pub mod server_connection_process;
pub mod watch;

pub use create_mode::CreateMode;
pub use error_code::{ErrorClass, ServiceError};
pub use watch::{WatchKind, WatchedEvent};
