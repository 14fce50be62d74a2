use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use local_ip_address::local_ip;
use msgs::discover_server::SERVICE_NAME;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::client_db::ClientDb;

mod client_db;
mod coordinator;

#[derive(Parser, Debug)]
#[command(version, about = "coordination service holding the shared canvas namespace")]
struct Args {
    /// Port to accept client sessions on.
    #[arg(long, default_value_t = 2181)]
    port: u16,

    /// Do not announce the server on mDNS.
    #[arg(long)]
    no_mdns: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let port = args.port;

    let addr = SocketAddr::new(IpAddr::from(Ipv4Addr::UNSPECIFIED), port);
    let listener = TcpListener::bind(addr).await?;

    let my_local_ip = local_ip()?;
    let _mdns = if args.no_mdns {
        None
    } else {
        Some(discoverable_service::register_msdn(my_local_ip, port, SERVICE_NAME, &[("root", "/canvas")])?)
    };

    tracing::info!("server started at ip: {my_local_ip}:{port}");

    let mut client_db = ClientDb::new();

    loop {
        let (socket, addr) = listener.accept().await?;
        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!(%e, "could not set nodelay");
        }
        client_db.new_client(socket, addr);
    }
}
