use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdesk_shared::{StatusFilter, TaskId, TaskPriority};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdesk",
    version,
    about = "Terminal client for a Taskdesk server",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Alternate config file.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Alternate session file.
    #[arg(long = "session", global = true)]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// Log in and store the session.
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account, then log in with it.
    Register(RegisterArgs),
    /// Forget the stored session.
    Logout,
    /// Show the logged in user.
    Whoami,
    /// Show or change profile details.
    Profile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Change the account password.
    Passwd,
    /// List tasks, newest first.
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show one task in full.
    Show { id: TaskId },
    /// Create a task.
    Add(TaskArgs),
    /// Replace fields of a task; omitted fields keep their value.
    Edit {
        id: TaskId,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Change only the priority of a task.
    Prioritize { id: TaskId, level: TaskPriority },
    /// Mark a task completed.
    Done { id: TaskId },
    /// Mark a task pending again.
    Undone { id: TaskId },
    /// Delete a task.
    #[command(alias = "rm")]
    Delete {
        id: TaskId,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Show completion statistics.
    Stats,
}

#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// `pending` or `completed`.
    #[arg(long)]
    pub status: Option<StatusFilter>,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TaskArgs {
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    #[arg(short, long, default_value_t = TaskPriority::Medium)]
    pub priority: TaskPriority,
    /// Due date as YYYY-MM-DD.
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct EditArgs {
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub priority: Option<TaskPriority>,
    /// Due date as YYYY-MM-DD.
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date.
    #[arg(long)]
    pub clear_due: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn parse(args: &[&str]) -> GlobalCli {
        GlobalCli::try_parse_from(std::iter::once("taskdesk").chain(args.iter().copied()))
            .expect("parse")
    }

    #[test]
    fn list_flags_parse_into_typed_values() {
        let cli = parse(&["list", "--status", "completed", "--search", "milk", "--page", "2"]);
        assert_eq!(
            cli.action,
            Action::List(ListArgs {
                page: 2,
                status: Some(StatusFilter::Completed),
                search: Some("milk".to_string()),
            })
        );
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = parse(&["stats", "-vv", "--rc", "color=false"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.rc_overrides,
            vec![KeyVal {
                key: "color".to_string(),
                value: "false".to_string(),
            }]
        );
    }

    #[test]
    fn add_defaults_to_medium_priority() {
        let cli = parse(&["add", "Buy milk", "--due", "2026-12-01"]);
        let Action::Add(args) = cli.action else {
            panic!("expected add");
        };
        assert_eq!(args.priority, TaskPriority::Medium);
        assert_eq!(args.due.as_deref(), Some("2026-12-01"));
    }

    #[test]
    fn bad_priority_is_a_parse_error() {
        assert!(
            GlobalCli::try_parse_from(["taskdesk", "prioritize", "4", "urgent"]).is_err()
        );
        assert!(GlobalCli::try_parse_from(["taskdesk", "edit", "4", "--due", "x", "--clear-due"]).is_err());
    }

    #[test]
    fn rc_override_requires_equals() {
        assert!("color".parse::<KeyVal>().is_err());
    }
}
