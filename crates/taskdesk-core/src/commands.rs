use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow, bail};
use chrono::{Local, Utc};
use taskdesk_shared::validate::{TaskDraft, validate_password_change};
use taskdesk_shared::{
    ApiError, AuthClient, BannerKind, Controller, Gateway, ListState, Msg, PasswordChange,
    ProfileUpdate, RegisterRequest, Storage, TaskClient, TaskPatch, Transport,
};
use tracing::{debug, info};

use crate::cli::{Action, EditArgs, ListArgs, RegisterArgs, TaskArgs};
use crate::config::Config;
use crate::render::Renderer;
use crate::runtime::Runtime;

/// Line-oriented prompts plus the output stream.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// Asks `label` and returns the answer without its line ending.
    pub fn prompt(&mut self, label: &str) -> anyhow::Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed reading from stdin")?;
        if read == 0 {
            bail!("input ended while asking for {label}");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn value_or_prompt(&mut self, value: Option<String>, label: &str) -> anyhow::Result<String> {
        match value {
            Some(value) => Ok(value),
            None => self.prompt(label),
        }
    }

    pub fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.prompt(&format!("{question} [y/N]"))?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

#[tracing::instrument(skip_all)]
pub async fn dispatch<T, S, R, W>(
    gateway: Gateway<T, S>,
    cfg: &Config,
    renderer: &Renderer,
    console: &mut Console<R, W>,
    action: Action,
) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
    R: BufRead,
    W: Write,
{
    let mut runtime = Runtime::new(Controller::new(cfg.settings()), gateway);

    match action {
        Action::Login { username, password } => {
            let username = console.value_or_prompt(username, "Username")?;
            let password = console.value_or_prompt(password, "Password")?;
            runtime
                .dispatch(Msg::LoginSubmitted { username, password })
                .await;
            finish_auth(&runtime, renderer, console)?;
            show_list(&runtime, renderer, console)
        }
        Action::Register(args) => {
            let request = read_registration(console, args)?;
            runtime.dispatch(Msg::ShowRegister).await;
            runtime.dispatch(Msg::RegisterSubmitted(request)).await;
            finish_auth(&runtime, renderer, console)?;
            show_list(&runtime, renderer, console)
        }
        Action::Logout => {
            runtime.dispatch(Msg::LogoutRequested).await;
            writeln!(console.out(), "Logged out.")?;
            Ok(())
        }
        Action::Whoami => {
            require_session(&runtime)?;
            let user = AuthClient::new(runtime.gateway()).me().await?;
            renderer.user(console.out(), &user)
        }
        Action::Profile {
            email,
            first_name,
            last_name,
        } => {
            require_session(&runtime)?;
            let auth = AuthClient::new(runtime.gateway());
            let update = ProfileUpdate {
                email,
                first_name,
                last_name,
            };
            let user = if update.is_empty() {
                auth.me().await?
            } else {
                let user = auth.update_profile(&update).await?;
                writeln!(console.out(), "Profile updated.")?;
                user
            };
            renderer.user(console.out(), &user)
        }
        Action::Passwd => {
            require_session(&runtime)?;
            let change = PasswordChange {
                old_password: console.prompt("Current password")?,
                new_password: console.prompt("New password")?,
                new_password2: console.prompt("Repeat new password")?,
            };
            if let Err(errors) = validate_password_change(&change) {
                renderer.field_errors(console.out(), &errors)?;
                bail!("password not changed");
            }
            AuthClient::new(runtime.gateway())
                .change_password(&change)
                .await
                .map_err(|err| report_api_error(renderer, console, err))?;
            writeln!(console.out(), "Password changed.")?;
            Ok(())
        }
        Action::List(args) => {
            open_list(&mut runtime, args).await?;
            show_list(&runtime, renderer, console)
        }
        Action::Show { id } => {
            require_session(&runtime)?;
            let task = TaskClient::new(runtime.gateway()).get(id).await?;
            renderer.task_info(console.out(), &task, Utc::now())
        }
        Action::Add(args) => {
            start_session(&mut runtime).await?;
            runtime.dispatch(Msg::DraftEdited(new_draft(args))).await;
            submit_draft(&mut runtime, renderer, console).await
        }
        Action::Edit { id, fields } => {
            start_session(&mut runtime).await?;
            let task = TaskClient::new(runtime.gateway()).get(id).await?;
            runtime.dispatch(Msg::EditRequested(task)).await;
            let draft = apply_edit(runtime.controller().draft().clone(), fields);
            runtime.dispatch(Msg::DraftEdited(draft)).await;
            submit_draft(&mut runtime, renderer, console).await
        }
        Action::Prioritize { id, level } => {
            require_session(&runtime)?;
            let patch = TaskPatch {
                priority: Some(level),
                ..TaskPatch::default()
            };
            let task = TaskClient::new(runtime.gateway()).patch(id, &patch).await?;
            info!(id, priority = %level, "priority changed");
            writeln!(console.out(), "Task {} priority set to {}.", task.id, task.priority.label())?;
            Ok(())
        }
        Action::Done { id } => {
            start_session(&mut runtime).await?;
            runtime
                .dispatch(Msg::SetComplete { id, complete: true })
                .await;
            finish_mutation(&runtime, renderer, console)
        }
        Action::Undone { id } => {
            start_session(&mut runtime).await?;
            runtime
                .dispatch(Msg::SetComplete { id, complete: false })
                .await;
            finish_mutation(&runtime, renderer, console)
        }
        Action::Delete { id, yes } => {
            start_session(&mut runtime).await?;
            runtime.dispatch(Msg::DeleteRequested(id)).await;
            if !yes && !console.confirm(&format!("Delete task {id}?"))? {
                runtime.dispatch(Msg::DeleteCancelled).await;
                writeln!(console.out(), "Nothing deleted.")?;
                return Ok(());
            }
            runtime.dispatch(Msg::DeleteConfirmed).await;
            finish_mutation(&runtime, renderer, console)
        }
        Action::Stats => {
            require_session(&runtime)?;
            let stats = TaskClient::new(runtime.gateway()).statistics().await?;
            renderer.statistics(console.out(), &stats)
        }
    }
}

fn require_session<T, S>(runtime: &Runtime<T, S>) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
{
    if runtime.gateway().session().is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("not logged in; run `taskdesk login` first"))
    }
}

/// Restores the stored session and loads the first page.
async fn start_session<T, S>(runtime: &mut Runtime<T, S>) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
{
    require_session(runtime)?;
    runtime.dispatch(Msg::Started { has_session: true }).await;
    if !runtime.controller().is_authenticated() {
        bail!("stored session was rejected; run `taskdesk login` again");
    }
    Ok(())
}

async fn open_list<T, S>(runtime: &mut Runtime<T, S>, args: ListArgs) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
{
    require_session(runtime)?;
    // Recorded before login, so the first fetch already carries them.
    runtime.dispatch(Msg::FilterChanged(args.status)).await;
    if let Some(search) = args.search {
        runtime.dispatch(Msg::SearchChanged(search)).await;
    }
    start_session(runtime).await?;
    if args.page > 1 {
        runtime.dispatch(Msg::PageRequested(args.page)).await;
    }
    runtime.settle().await;
    Ok(())
}

fn finish_auth<T, S, R, W>(
    runtime: &Runtime<T, S>,
    renderer: &Renderer,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
    R: BufRead,
    W: Write,
{
    let controller = runtime.controller();
    if let Some(user) = controller.user().filter(|_| controller.is_authenticated()) {
        writeln!(console.out(), "Logged in as {}.", user.display_name())?;
        return Ok(());
    }
    renderer.field_errors(console.out(), controller.auth_fields())?;
    Err(anyhow!(
        controller
            .auth_error()
            .unwrap_or("please correct the fields above")
            .to_string()
    ))
}

fn show_list<T, S, R, W>(
    runtime: &Runtime<T, S>,
    renderer: &Renderer,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
    R: BufRead,
    W: Write,
{
    let controller = runtime.controller();
    if let ListState::Errored(message) = controller.list_state() {
        bail!("{message}");
    }
    let out = console.out();
    renderer.task_table(out, controller.tasks(), Utc::now())?;
    renderer.page_footer(out, controller.query().page, controller.total_pages())?;
    if let Some(stats) = controller.statistics() {
        renderer.statistics(out, stats)?;
    }
    Ok(())
}

async fn submit_draft<T, S, R, W>(
    runtime: &mut Runtime<T, S>,
    renderer: &Renderer,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
    R: BufRead,
    W: Write,
{
    let today = Local::now().date_naive();
    runtime.dispatch(Msg::SubmitDraft { today }).await;

    let errors = runtime.controller().draft_errors();
    if !errors.is_empty() {
        renderer.field_errors(console.out(), errors)?;
        if runtime.controller().banner().is_none() {
            bail!("task not saved");
        }
    }
    finish_mutation(runtime, renderer, console)
}

fn finish_mutation<T, S, R, W>(
    runtime: &Runtime<T, S>,
    renderer: &Renderer,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    T: Transport,
    S: Storage,
    R: BufRead,
    W: Write,
{
    let controller = runtime.controller();
    let Some(banner) = controller.banner() else {
        debug!("mutation produced no banner");
        return Ok(());
    };
    if banner.kind == BannerKind::Error {
        bail!("{}", banner.text);
    }
    renderer.banner(console.out(), banner)?;
    show_list(runtime, renderer, console)
}

fn report_api_error<R, W>(
    renderer: &Renderer,
    console: &mut Console<R, W>,
    err: ApiError,
) -> anyhow::Error
where
    R: BufRead,
    W: Write,
{
    if let Some(fields) = err.field_errors()
        && let Err(write_err) = renderer.field_errors(console.out(), fields)
    {
        return write_err;
    }
    anyhow::Error::new(err)
}

fn read_registration<R, W>(
    console: &mut Console<R, W>,
    args: RegisterArgs,
) -> anyhow::Result<RegisterRequest>
where
    R: BufRead,
    W: Write,
{
    Ok(RegisterRequest {
        username: console.value_or_prompt(args.username, "Username")?,
        email: console.value_or_prompt(args.email, "Email")?,
        first_name: console.value_or_prompt(args.first_name, "First name")?,
        last_name: console.value_or_prompt(args.last_name, "Last name")?,
        password: console.prompt("Password")?,
        password2: console.prompt("Repeat password")?,
    })
}

fn new_draft(args: TaskArgs) -> TaskDraft {
    TaskDraft {
        title: args.title,
        description: args.description,
        priority: args.priority,
        due_date: args.due.unwrap_or_default(),
    }
}

fn apply_edit(mut draft: TaskDraft, fields: EditArgs) -> TaskDraft {
    if let Some(title) = fields.title {
        draft.title = title;
    }
    if let Some(description) = fields.description {
        draft.description = description;
    }
    if let Some(priority) = fields.priority {
        draft.priority = priority;
    }
    if fields.clear_due {
        draft.due_date.clear();
    } else if let Some(due) = fields.due {
        draft.due_date = due;
    }
    draft
}
