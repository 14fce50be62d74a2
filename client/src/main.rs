use std::{fs::OpenOptions, io::Write, path::{Path, PathBuf}, sync::Arc, time::Duration};

use anyhow::Context;
use canvas::{event_channel, Coordination, MemoryCluster, SyncConfig, SyncEngine, SyncError, ViewReceiver, ViewUpdate};
use clap::Parser;
use console_cmd::ConsoleCmd;
use console_input::console_input_thread;
use display::Display;
use msgs::discover_server::find_local_server_ip;
use parking_lot::Mutex;
use remote_service::RemoteService;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod console_cmd;
mod console_input;
mod display;
mod experiment;
mod remote_service;

#[derive(Parser, Debug)]
#[command(version, about = "terminal client for the shared canvas")]
struct Args {
    /// Coordination server as host:port. Looked up over mDNS when omitted.
    #[arg(long)]
    server: Option<String>,

    /// Run against an in-process namespace instead of a server.
    #[arg(long, conflicts_with = "server")]
    offline: bool,

    /// How long to look for a server over mDNS.
    #[arg(long, default_value_t = 5)]
    discovery_timeout_secs: u64,

    #[arg(long, default_value_t = 5)]
    retry_limit: u32,

    #[arg(long, default_value_t = 5000)]
    retry_backoff_ms: u64,

    #[arg(long, default_value_t = 10000)]
    request_timeout_ms: u64,

    /// Upper bound on concurrent cell writes of one drawing command.
    #[arg(long, default_value_t = 64)]
    max_parallel_writes: usize,

    /// The terminal belongs to the canvas, so logs go here.
    #[arg(long, default_value = "canvas_client.log")]
    log_file: PathBuf,
}

impl Args {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            retry_limit: self.retry_limit,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_parallel_writes: self.max_parallel_writes,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = init_tracing(&args.log_file) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    match run(args).await {
        Ok(()) => tracing::info!("end of input, exiting"),
        Err(e) => {
            tracing::error!("{e:#}");
            println!();
            eprintln!("error: {e:#}, exiting...");
            let code = e.downcast_ref::<SyncError>().map_or(1, |error| error.exit_code().max(1));
            std::process::exit(code);
        }
    }
}

fn init_tracing(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.sync_config();
    let (events_sender, events) = event_channel();

    let service: Arc<dyn Coordination> = if args.offline {
        tracing::info!("running offline");
        Arc::new(MemoryCluster::new().connect_with(events_sender.clone()))
    } else {
        let addr = match args.server {
            Some(addr) => addr,
            None => {
                let timeout = Duration::from_secs(args.discovery_timeout_secs);
                tokio::task::spawn_blocking(move || find_local_server_ip(timeout)).await??
            }
        };
        Arc::new(RemoteService::connect(&addr, events_sender.clone(), config.request_timeout).await?)
    };

    let (engine, view) = SyncEngine::new(service, &config, events_sender);
    let display = Arc::new(Mutex::new(Display::new()));
    tokio::spawn(display_loop(engine.clone(), view, display.clone()));

    let (fatal_sender, mut fatal) = mpsc::unbounded_channel::<SyncError>();
    {
        let engine = engine.clone();
        let fatal_sender = fatal_sender.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run(events).await {
                let _ = fatal_sender.send(e);
            }
        });
    }

    engine.open_region(0, 0).await?;

    let output_dir = PathBuf::from(experiment::OUTPUT_DIR);
    let mut console = console_input_thread();
    loop {
        tokio::select! {
            Some(error) = fatal.recv() => return Err(error.into()),
            line = console.recv() => {
                let Some(line) = line else { break };
                {
                    // the echoed input line gets overwritten by the next frame
                    let _display = display.lock();
                    print!("\u{1b}[A");
                    let _ = std::io::stdout().flush();
                }
                tokio::spawn(run_command(engine.clone(), line, output_dir.clone(), fatal_sender.clone()));
            }
        }
    }
    Ok(())
}

async fn run_command(engine: SyncEngine, line: String, output_dir: PathBuf, fatal: mpsc::UnboundedSender<SyncError>) {
    let cmd = match ConsoleCmd::parse(&line) {
        Ok(cmd) => cmd,
        Err(e) => {
            engine.status(e.to_string());
            return;
        }
    };
    tracing::debug!(?cmd, "running command");

    match cmd.execute(&engine, &output_dir).await {
        Ok(Some(message)) => engine.status(message),
        Ok(None) => engine.redraw(),
        Err(e) => match e.downcast::<SyncError>() {
            Ok(error) if error.is_fatal() => {
                let _ = fatal.send(error);
            }
            Ok(error) => engine.status(format!("error: {error}")),
            Err(e) => engine.status(format!("error: {e:#}")),
        },
    }
}

async fn display_loop(engine: SyncEngine, mut view: ViewReceiver, display: Arc<Mutex<Display>>) {
    while let Some(update) = view.recv().await {
        let active = engine.canvas().active();
        let mut display = display.lock();
        let output = match update {
            ViewUpdate::Full => Some(display.render_full(active.as_deref())),
            ViewUpdate::Cell { cx, cy } => active.and_then(|region| display.render_cell(&region, cx, cy)),
            ViewUpdate::Status(message) => {
                display.set_message(message);
                Some(display.render_full(active.as_deref()))
            }
        };
        if let Some(output) = output {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(output.as_bytes());
            let _ = stdout.flush();
        }
    }
}
