//! Serve command implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use feedsift::{serve, Pipeline};
use feedsift_expr::Environment;
use feedsift_feed::HttpFeedSource;

use super::{CommandContext, Result};

/// Runs the HTTP filtering proxy until interrupted.
///
/// `port` overrides `server.port` from the config file.
pub async fn execute(ctx: &CommandContext, port: Option<u16>) -> Result<()> {
    let env = Arc::new(Environment::new()?);
    let timeout = ctx.config.fetch.timeout();
    let pipeline =
        Pipeline::new(env, Arc::new(HttpFeedSource::new(timeout))).with_deadline(timeout);

    let port = port.unwrap_or(ctx.config.server.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    if !ctx.quiet && !ctx.json_output {
        eprintln!("Serving on http://{}", addr);
    }
    serve(pipeline, addr).await?;
    Ok(())
}
