//! Handler for the `serve` command

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::error::Result;

/// Run the HTTP API until interrupted
pub fn handle_serve_command(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    output: &OutputFormatter,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    output.info(&format!(
        "Serving fixhub on http://{}:{}",
        config.server.host, config.server.port
    ));
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::api::serve(&config))
}
