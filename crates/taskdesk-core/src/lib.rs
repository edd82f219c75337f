pub mod cli;
pub mod commands;
pub mod config;
pub mod http;
pub mod render;
pub mod runtime;
pub mod storage;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use taskdesk_shared::{
  Gateway,
  SessionStore
};
use tracing::{
  debug,
  info,
  warn
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdesk CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  debug!(api_url = %cfg.api_url, "effective configuration");

  let session_file =
    config::resolve_session_file(
      &cfg,
      cli.session.as_deref()
    )
    .context(
      "failed to resolve session file"
    )?;

  let transport =
    http::HttpTransport::new(&cfg)?;
  let gateway = Gateway::new(
    transport,
    SessionStore::new(
      storage::FileStorage::new(
        &session_file
      )
    )
  )
  .with_session_expired(|| {
    warn!(
      "session expired; log in again"
    )
  });

  let renderer =
    render::Renderer::new(&cfg);
  let mut console =
    commands::Console::stdio();

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  runtime.block_on(commands::dispatch(
    gateway,
    &cfg,
    &renderer,
    &mut console,
    cli.action
  ))?;

  info!("done");
  Ok(())
}
