/* 📖 # What does the CLI do?

1. Read `volbrowse.toml` (or the file given with `--config`)
2. Register the configured volumes in an in-memory directory
3. Serve the volume API over HTTP until the process is stopped

`--host` and `--port` override the `[server]` section of the config file.
A volume that cannot be registered is logged and skipped rather than aborting startup.

Exit codes:
- 0: Server stopped normally
- 1: Error (config not readable or invalid, server could not bind)
*/

use std::process;

use clap::Parser;
use tracing::{error, info};

use volbrowse_base::pal::http::HttpServerConfig;
use volbrowse_base::tracing::init_tracing;
use volbrowse_base::{FilePath, PalHandle, RealPal, VolbrowseResult};
use volbrowse_engine::{
    ApiService, ContentAccessor, DirectoryHandle, InMemoryVolumeDirectory, VOLUMES_BASE_PATH,
    VolumeBrowser, load_config, register_volumes,
};

/// Serve volume metadata and content browsing over HTTP.
#[derive(Debug, Parser)]
#[command(name = "volbrowse", version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "volbrowse.toml")]
    config: String,

    /// Host address to bind to, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

fn run(args: Args) -> VolbrowseResult<()> {
    let pal = PalHandle::new(RealPal::new());
    let config = load_config(&pal, &FilePath::from(args.config.as_str()))?;

    let directory = DirectoryHandle::new(InMemoryVolumeDirectory::new());
    let registered = register_volumes(&config, &directory);
    info!(
        registered,
        configured = config.volumes.len(),
        "Volumes registered"
    );

    let browser = VolumeBrowser::new(
        directory,
        config.browse.resolver(),
        ContentAccessor::new(pal.clone()),
    );
    let service = ApiService::new(browser);

    let host = args.host.unwrap_or(config.server.host);
    let mut server_config = HttpServerConfig::new(host.clone());
    if let Some(port) = args.port.or(config.server.port) {
        server_config = server_config.with_port(port);
    }

    let handle = pal.start_http_server(Box::new(service), server_config)?;
    info!(
        "Serving volumes at http://{}{}",
        handle.address(&host),
        VOLUMES_BASE_PATH
    );
    handle.join();
    Ok(())
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(Args::parse()) {
        error!(error = ?e, "volbrowse failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
