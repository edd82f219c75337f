use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use taskdesk_shared::Settings;
use tracing::{
  debug,
  info
};

pub const DEFAULT_API_URL: &str =
  "http://localhost:8000/api";
pub const CONFIG_ENV: &str =
  "TASKDESK_CONFIG";
pub const API_URL_ENV: &str =
  "TASKDESK_API_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub api_url:            String,
  pub session_file:       Option<PathBuf>,
  pub timeout_secs:       u64,
  pub color:              bool,
  pub search_debounce_ms: u64,
  pub message_ttl_secs:   u64,
  #[serde(skip)]
  pub loaded_from:        Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url:            DEFAULT_API_URL
        .to_string(),
      session_file:       None,
      timeout_secs:       30,
      color:              true,
      search_debounce_ms: 500,
      message_ttl_secs:   3,
      loaded_from:        None
    }
  }
}

impl Config {
  /// Reads the config file, then applies `TASKDESK_API_URL`.
  ///
  /// An explicit path must exist. The default location is optional,
  /// and `TASKDESK_CONFIG=/dev/null` skips the file entirely.
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = match resolve_config_path(
      config_override
    )? {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        Self::from_file(&path)?
      }
      | None => {
        debug!(
          "no config file found; using \
           defaults"
        );
        Self::default()
      }
    };

    if let Ok(url) =
      std::env::var(API_URL_ENV)
      && !url.trim().is_empty()
    {
      debug!(api_url = %url, "api url taken from environment");
      cfg.api_url = url;
    }

    Ok(cfg)
  }

  pub fn from_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg = Self::parse(&text)
      .with_context(|| {
        format!(
          "invalid config file {}",
          path.display()
        )
      })?;
    cfg.loaded_from =
      Some(path.to_path_buf());
    Ok(cfg)
  }

  pub fn parse(
    text: &str
  ) -> anyhow::Result<Self> {
    let cfg: Self = toml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
  }

  /// Applies `key=value` pairs from `--rc`. Later pairs win.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self.set(&key, &value)?;
    }
    self.validate()
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match key {
      | "api_url" => {
        self.api_url = value.to_string()
      }
      | "session_file" => {
        self.session_file =
          Some(PathBuf::from(value))
      }
      | "timeout_secs" => {
        self.timeout_secs =
          parse_number(key, value)?
      }
      | "color" => {
        self.color = parse_bool(value)
          .ok_or_else(|| {
            anyhow!(
              "invalid color setting: \
               {value}"
            )
          })?
      }
      | "search_debounce_ms" => {
        self.search_debounce_ms =
          parse_number(key, value)?
      }
      | "message_ttl_secs" => {
        self.message_ttl_secs =
          parse_number(key, value)?
      }
      | other => {
        return Err(anyhow!(
          "unknown config key: {other}"
        ));
      }
    }
    Ok(())
  }

  fn validate(&self) -> anyhow::Result<()> {
    let url = self.api_url.trim();
    if !(url.starts_with("http://")
      || url.starts_with("https://"))
    {
      return Err(anyhow!(
        "api_url must start with http:// \
         or https://, got: {url}"
      ));
    }
    Ok(())
  }

  /// `api_url` without a trailing slash.
  pub fn base_url(&self) -> &str {
    self.api_url.trim().trim_end_matches('/')
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn settings(&self) -> Settings {
    Settings {
      search_debounce: Duration::from_millis(
        self.search_debounce_ms
      ),
      message_ttl:     Duration::from_secs(
        self.message_ttl_secs
      )
    }
  }
}

/// `--session`, then `session_file`, then
/// `<data dir>/taskdesk/session.json`.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_session_file(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(expand_tilde(path));
  }
  if let Some(path) = &cfg.session_file {
    return Ok(expand_tilde(path));
  }
  let base = dirs::data_local_dir()
    .or_else(dirs::home_dir)
    .ok_or_else(|| {
      anyhow!(
        "cannot determine a data \
         directory for the session file"
      )
    })?;
  Ok(base
    .join("taskdesk")
    .join("session.json"))
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_tilde(path)));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  let Some(config_dir) = dirs::config_dir()
  else {
    return Ok(None);
  };
  let candidate = config_dir
    .join("taskdesk")
    .join("config.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_number<N>(
  key: &str,
  value: &str
) -> anyhow::Result<N>
where
  N: std::str::FromStr,
  N::Err: std::fmt::Display
{
  value.trim().parse::<N>().map_err(|err| {
    anyhow!(
      "invalid value for {key}: \
       {value} ({err})"
    )
  })
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on" | "true" => {
      Some(true)
    }
    | "0" | "n" | "no" | "off" | "false" => {
      Some(false)
    }
    | _ => None
  }
}

#[cfg(test)]
mod config_tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let cfg =
      Config::parse("").expect("parse");
    assert_eq!(cfg, Config::default());
    assert_eq!(
      cfg.base_url(),
      "http://localhost:8000/api"
    );
    assert_eq!(
      cfg.settings(),
      Settings::default()
    );
  }

  #[test]
  fn file_values_and_overrides_apply_in_order()
  {
    let mut cfg = Config::parse(
      "api_url = \"https://tasks.example.com/api/\"\n\
       color = false\n"
    )
    .expect("parse");
    assert_eq!(
      cfg.base_url(),
      "https://tasks.example.com/api"
    );
    assert!(!cfg.color);

    cfg
      .apply_overrides([
        (
          "color".to_string(),
          "on".to_string()
        ),
        (
          "search_debounce_ms".to_string(),
          "250".to_string()
        ),
      ])
      .expect("overrides");

    assert!(cfg.color);
    assert_eq!(
      cfg.settings().search_debounce,
      Duration::from_millis(250)
    );
  }

  #[test]
  fn unknown_keys_and_bad_urls_are_rejected()
  {
    assert!(
      Config::parse("colour = true").is_err()
    );
    assert!(
      Config::parse("page_size = 20").is_err()
    );
    assert!(
      Config::parse("api_url = \"ftp://x\"")
        .is_err()
    );

    let mut cfg = Config::default();
    assert!(
      cfg
        .apply_overrides([(
          "nope".to_string(),
          "1".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides([(
          "page_size".to_string(),
          "20".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn session_flag_beats_config_value() {
    let cfg = Config {
      session_file: Some(PathBuf::from(
        "/tmp/from-config.json"
      )),
      ..Config::default()
    };
    assert_eq!(
      resolve_session_file(&cfg, None)
        .expect("resolve"),
      PathBuf::from("/tmp/from-config.json")
    );
    assert_eq!(
      resolve_session_file(
        &cfg,
        Some(Path::new("/tmp/flag.json"))
      )
      .expect("resolve"),
      PathBuf::from("/tmp/flag.json")
    );
  }
}
