//! Interactive terminal front end.
//!
//! Each input line is parsed into a [`Command`] and run to completion before
//! the next line is read. Failures are printed as a one-line alert and the
//! shell keeps going.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

use crate::app::App;
use crate::calculator::{format_number, Field};
use crate::config::{Credentials, Lifecycle};
use crate::error::{AppError, AppResult};
use crate::session::AuthView;
use crate::types::HistoryEntry;

const HELP: &str = "\
Account:
  login <user> <password>   log in
  register <user> <password> create an account
  toggle                    switch between the login and register forms
  logout                    log out and clear local data
Calculator:
  area <m2>                 floor area (at least 1)
  people <n>                number of occupants (at least 1)
  appliances <n>            number of appliances (at least 0)
  obs <text>                observation saved with the calculation
  calc                      calculate the BTU estimate
  save                      save the calculation to your history
  show                      show the form and any edit in progress
History:
  list                      show visible history
  raw                       show every entry, hidden ones included
  refresh                   reload history from the server
  edit <id>                 start editing an entry
  action <text>             change the text of the entry being edited
  note <text>               change the observation of the entry being edited
  submit                    save the edit
  cancel                    discard the edit
  delete <id>               remove an entry
Other:
  help                      show this text
  quit                      leave";

/// One user action, parsed from a line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Register { username: String, password: String },
    Toggle,
    Logout,
    Set(Field, String),
    Obs(String),
    Calc,
    Save,
    Show,
    List,
    Raw,
    Refresh,
    Edit(String),
    Action(String),
    Note(String),
    Submit,
    Cancel,
    Delete(String),
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> AppResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "login" => {
                let (username, password) = two_args(rest, "login <user> <password>")?;
                Command::Login { username, password }
            }
            "register" => {
                let (username, password) = two_args(rest, "register <user> <password>")?;
                Command::Register { username, password }
            }
            "toggle" => Command::Toggle,
            "logout" => Command::Logout,
            "area" => Command::Set(Field::Area, rest.to_string()),
            "people" => Command::Set(Field::People, rest.to_string()),
            "appliances" => Command::Set(Field::Appliances, rest.to_string()),
            "obs" => Command::Obs(rest.to_string()),
            "calc" => Command::Calc,
            "save" => Command::Save,
            "show" => Command::Show,
            "list" => Command::List,
            "raw" => Command::Raw,
            "refresh" => Command::Refresh,
            "edit" => Command::Edit(one_arg(rest, "edit <id>")?),
            "action" => Command::Action(rest.to_string()),
            "note" => Command::Note(rest.to_string()),
            "submit" => Command::Submit,
            "cancel" => Command::Cancel,
            "delete" => Command::Delete(one_arg(rest, "delete <id>")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(AppError::validation(format!(
                    "Unknown command '{}'. Type 'help' for a list.",
                    other
                )))
            }
        };
        Ok(Some(command))
    }

    /// Command word, for logging without arguments such as passwords
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Toggle => "toggle",
            Command::Logout => "logout",
            Command::Set(Field::Area, _) => "area",
            Command::Set(Field::People, _) => "people",
            Command::Set(Field::Appliances, _) => "appliances",
            Command::Obs(_) => "obs",
            Command::Calc => "calc",
            Command::Save => "save",
            Command::Show => "show",
            Command::List => "list",
            Command::Raw => "raw",
            Command::Refresh => "refresh",
            Command::Edit(_) => "edit",
            Command::Action(_) => "action",
            Command::Note(_) => "note",
            Command::Submit => "submit",
            Command::Cancel => "cancel",
            Command::Delete(_) => "delete",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

fn one_arg(rest: &str, usage: &str) -> AppResult<String> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [arg] => Ok(arg.to_string()),
        _ => Err(AppError::validation(format!("Usage: {}", usage))),
    }
}

fn two_args(rest: &str, usage: &str) -> AppResult<(String, String)> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [a, b] => Ok((a.to_string(), b.to_string())),
        _ => Err(AppError::validation(format!("Usage: {}", usage))),
    }
}

/// Run one command against the app and return the lines to print.
///
/// `confirmed` answers the removal prompt for `Delete`; it is ignored by
/// every other command.
pub async fn dispatch(app: &App, command: Command, confirmed: bool) -> AppResult<Vec<String>> {
    let lines = match command {
        Command::Login { username, password } => {
            let user = app.login(&username, &password).await?;
            vec![
                format!("Welcome, {}!", user.username),
                format!("{} calculation(s) in your history.", app.visible_count()),
            ]
        }
        Command::Register { username, password } => {
            app.register(&username, &password).await?;
            vec!["Account created. You can log in now.".to_string()]
        }
        Command::Toggle => match app.toggle_auth_view() {
            Some(AuthView::Login) => vec!["Login form. Use: login <user> <password>".to_string()],
            Some(AuthView::Register) => {
                vec!["Register form. Use: register <user> <password>".to_string()]
            }
            None => vec!["Already logged in.".to_string()],
        },
        Command::Logout => {
            app.logout().await?;
            vec!["Logged out.".to_string()]
        }
        Command::Set(field, value) => {
            app.set_field(field, &value)?;
            Vec::new()
        }
        Command::Obs(text) => {
            app.set_observation(&text)?;
            Vec::new()
        }
        Command::Calc => {
            let btu = app.calculate()?;
            vec![format!("Calculated BTU: {}", format_number(btu))]
        }
        Command::Save => {
            let entry = app.save().await?;
            vec![format!("Saved as entry {}.", entry.id)]
        }
        Command::Show => {
            require_login(app)?;
            render_form(app)
        }
        Command::List => {
            require_login(app)?;
            render_history(&app.visible_history(), app.visible_count())
        }
        Command::Raw => {
            require_login(app)?;
            render_raw(&app.raw_history())
        }
        Command::Refresh => {
            let count = app.refresh_history().await;
            vec![format!("{} entries loaded.", count)]
        }
        Command::Edit(label) => {
            let id = app.find_entry_id(&label)?;
            let draft = app.begin_edit(&id)?;
            vec![
                format!("Editing entry {}.", draft.id),
                format!("  action: {}", draft.action),
                format!("  obs:    {}", draft.obs),
                "Use 'action', 'note', then 'submit' or 'cancel'.".to_string(),
            ]
        }
        Command::Action(text) => {
            app.set_edit_action(&text)?;
            Vec::new()
        }
        Command::Note(text) => {
            app.set_edit_obs(&text)?;
            Vec::new()
        }
        Command::Submit => {
            let id = app.submit_edit().await?;
            vec![format!("Entry {} saved.", id)]
        }
        Command::Cancel => match app.cancel_edit() {
            Some(draft) => vec![format!("Edit of entry {} discarded.", draft.id)],
            None => Vec::new(),
        },
        Command::Delete(label) => {
            let id = app.find_entry_id(&label)?;
            if app.remove(&id, |_| confirmed).await? {
                match app.lifecycle() {
                    Lifecycle::Rest => vec![format!("Entry {} deleted.", id)],
                    Lifecycle::Soft => vec![format!("Entry {} hidden.", id)],
                }
            } else {
                vec!["Nothing removed.".to_string()]
            }
        }
        Command::Help => HELP.lines().map(str::to_string).collect(),
        Command::Quit => Vec::new(),
    };
    Ok(lines)
}

fn require_login(app: &App) -> AppResult<()> {
    app.user().map(|_| ()).ok_or(AppError::NotAuthenticated)
}

fn render_form(app: &App) -> Vec<String> {
    let form = app.form();
    let mut lines = vec![
        format!("Area:       {}", form.area),
        format!("People:     {}", form.people),
        format!("Appliances: {}", form.appliances),
        format!("Obs:        {}", form.obs),
    ];
    if let Some(btu) = app.calculated_btu() {
        lines.push(format!("Calculated BTU: {}", format_number(btu)));
    }
    if let Some(draft) = app.draft() {
        lines.push(format!("Editing entry {}: {}", draft.id, draft.action));
        if !draft.obs.is_empty() {
            lines.push(format!("  obs: {}", draft.obs));
        }
    }
    lines
}

fn render_entry(entry: &HistoryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "  [{}] {}  {}",
        entry.id,
        entry.local_time(),
        entry.action
    )];
    if let Some(obs) = entry.observation() {
        lines.push(format!("      Obs: {}", obs));
    }
    lines
}

/// Visible history, newest first, with the visible count
pub fn render_history(entries: &[HistoryEntry], visible_count: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "You have {} visible calculation(s).",
        visible_count
    )];
    if entries.is_empty() {
        lines.push("No calculations saved yet.".to_string());
    }
    lines.extend(entries.iter().filter(|e| !e.hidden).flat_map(render_entry));
    lines
}

/// Every entry, hidden ones marked
pub fn render_raw(entries: &[HistoryEntry]) -> Vec<String> {
    let mut lines = vec![format!("{} entries in total.", entries.len())];
    for entry in entries {
        let mut rendered = render_entry(entry);
        if entry.hidden {
            rendered[0].push_str("  (hidden)");
        }
        lines.extend(rendered);
    }
    lines
}

/// Prompt loop. Command output and prompts go to `out`; alerts go to `err`.
pub struct Shell<'a, R, W, E> {
    app: &'a App,
    lines: Lines<R>,
    out: W,
    err: E,
}

impl<'a, R, W, E> Shell<'a, R, W, E>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    E: Write,
{
    pub fn new(app: &'a App, input: R, out: W, err: E) -> Self {
        Self {
            app,
            lines: input.lines(),
            out,
            err,
        }
    }

    /// Mount the app, optionally log in, then serve commands until `quit`
    /// or end of input.
    pub async fn run(&mut self, credentials: Option<&Credentials>) -> Result<()> {
        self.app.mount().await;

        if let Some(creds) = credentials {
            let command = Command::Login {
                username: creds.username.clone(),
                password: creds.password.clone(),
            };
            self.execute(command).await?;
        }

        loop {
            self.prompt()?;
            let Some(line) = self.lines.next_line().await? else {
                break;
            };

            let command = match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    self.alert(&e)?;
                    continue;
                }
            };
            self.execute(command).await?;
        }

        writeln!(self.out)?;
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        debug!(command = command.name(), "Running command");
        let confirmed = match &command {
            Command::Delete(label) => self.confirm_delete(label).await?,
            _ => false,
        };

        match dispatch(self.app, command, confirmed).await {
            Ok(lines) => {
                for line in lines {
                    writeln!(self.out, "{}", line)?;
                }
            }
            Err(e) => self.alert(&e)?,
        }
        Ok(())
    }

    /// Show the entry and ask before removing it. Unknown ids skip the
    /// question; the removal itself reports them.
    async fn confirm_delete(&mut self, label: &str) -> Result<bool> {
        let Some(entry) = self
            .app
            .visible_history()
            .into_iter()
            .find(|e| e.id.to_string() == label)
        else {
            return Ok(false);
        };

        let verb = match self.app.lifecycle() {
            Lifecycle::Rest => "delete",
            Lifecycle::Soft => "hide",
        };
        write!(
            self.out,
            "Are you sure you want to {} \"{}\"? [y/N] ",
            verb, entry.action
        )?;
        self.out.flush()?;

        let answer = self.lines.next_line().await?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    fn prompt(&mut self) -> Result<()> {
        let prompt = match self.app.user() {
            Some(user) => format!("{}> ", user.username),
            None => match self.app.auth_view() {
                Some(AuthView::Register) => "register> ".to_string(),
                _ => "login> ".to_string(),
            },
        };
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        Ok(())
    }

    fn alert(&mut self, err: &AppError) -> Result<()> {
        self.out.flush()?;
        writeln!(self.err, "! {}", err)?;
        self.err.flush()?;
        Ok(())
    }
}
