use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use mdns_sd::{ServiceDaemon, ServiceEvent};

/// mDNS instance name the coordination server announces itself under.
pub const SERVICE_NAME: &str = "canvas-coord";

pub fn service_type() -> String {
    format!("_{SERVICE_NAME}._tcp.local.")
}

/// Blocks until a coordination server is resolved on the local network or `timeout` elapses.
pub fn find_local_server_ip(timeout: Duration) -> anyhow::Result<String> {
    let mdns = ServiceDaemon::new().context("failed to create mdns daemon")?;
    let receiver = mdns.browse(&service_type()).context("failed to browse")?;
    let deadline = Instant::now() + timeout;

    let found = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Ok(event) = receiver.recv_timeout(remaining) else { break None };
        if let ServiceEvent::ServiceResolved(info) = event {
            let Some(addr) = info.get_addresses().iter().next().copied() else { continue };
            let port = info.get_port();
            break Some(format!("{addr}:{port}"));
        }
    };

    if let Err(e) = mdns.shutdown() {
        tracing::debug!(?e, "mdns shutdown failed");
    }

    match found {
        Some(addr) => Ok(addr),
        None => bail!("no coordination server found on the local network"),
    }
}
