use std::net::IpAddr;

use anyhow::Context;
use mdns_sd::{ServiceDaemon, ServiceInfo};

/// Announces `_{instance_name}._tcp.local.` at `ip:port`. The daemon stops announcing when dropped or shut down.
pub fn register_msdn(ip: IpAddr, port: u16, instance_name: &str, properties: &[(&str, &str)]) -> anyhow::Result<ServiceDaemon> {
    let mdns = ServiceDaemon::new().context("failed to create mdns daemon")?;

    let service_type = format!("_{instance_name}._tcp.local.");
    let host_name = format!("{ip}.local.");

    let my_service = ServiceInfo::new(
        &service_type,
        instance_name,
        &host_name,
        ip,
        port,
        properties,
    ).context("invalid service info")?;

    mdns.register(my_service).context("failed to register service")?;
    Ok(mdns)
}
