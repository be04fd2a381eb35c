use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::{routing::get, Router};
use bkc_core::{chrono::FixedOffset, config::offset_arg};
use clap::Parser;
use log::info;

mod route;

/// Serve the Brisbane Kids events as a subscribable iCalendar feed.
#[derive(Debug, Parser)]
pub struct Arguments {
    /// the JSON file with the extracted event records, read on every request
    pub records: PathBuf,
    /// the port to listen on
    #[arg(long, default_value_t = 8008)]
    pub port: u16,
    /// offset for times published without one
    #[arg(long, value_parser = offset_arg, default_value = "+10:00")]
    pub default_offset: FixedOffset,
}

/// Shared by all requests, never mutated.
#[derive(Debug, Clone)]
pub struct AppState {
    pub records: PathBuf,
    pub default_utc_offset: FixedOffset,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Arguments::parse();
    let state = AppState {
        records: args.records,
        default_utc_offset: args.default_offset,
    };
    let app = Router::new()
        .route("/calendar", get(route::calendar::handler))
        .route("/calendar/utc", get(route::calendar::utc::handler))
        .with_state(Arc::new(state));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("serving the calendar on http://{addr}/calendar");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
