//! Command handlers operating on an explicit [`Session`].
//!
//! Every handler takes the session by `&mut` and returns the text to print.
//! [`run_in_session`] is the single place where the query list is written
//! back, whatever the handler returned.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::config::RuntimeConfig;
use crate::credentials::{self, TelegramCredential};
use crate::error::AppError;
use crate::model::TrackedQuery;
use crate::notifier::Notifier;
use crate::refresh::{self, RefreshOptions};
use crate::runner::QueryRunner;
use crate::store;

pub const TELEGRAM_USAGE_HINT: &str = "you must select 'token' and 'chat_id' options";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub queries: Vec<TrackedQuery>,
    pub credential: TelegramCredential,
    queries_file: PathBuf,
    credentials_file: PathBuf,
}

impl Session {
    pub fn load(config: &RuntimeConfig) -> Result<Self, AppError> {
        Self::load_from(config.queries_file(), config.credentials_file())
    }

    pub fn load_from(queries_file: PathBuf, credentials_file: PathBuf) -> Result<Self, AppError> {
        let queries = store::load_queries(&queries_file)?;
        let credential = credentials::load_credential(&credentials_file)?;

        Ok(Self {
            queries,
            credential,
            queries_file,
            credentials_file,
        })
    }

    fn persist_queries(&self) -> Result<(), AppError> {
        store::save_queries(&self.queries_file, &self.queries)?;
        Ok(())
    }

    fn persist_credential(&self) -> Result<(), AppError> {
        credentials::save_credential(&self.credentials_file, &self.credential)?;
        Ok(())
    }
}

/// Run `command` and then save the query list exactly once.
///
/// A command error takes precedence over a save error; the save error is
/// still logged.
pub fn run_in_session<F>(session: &mut Session, command: F) -> Result<String, AppError>
where
    F: FnOnce(&mut Session) -> Result<String, AppError>,
{
    let result = command(session);
    let persisted = session.persist_queries();

    match (result, persisted) {
        (Ok(output), Ok(())) => Ok(output),
        (Ok(_), Err(save_error)) => Err(save_error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(save_error)) => {
            tracing::error!(error = %save_error.message, "failed to save tracked queries");
            Err(error)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub name: String,
    pub url: String,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

pub fn add<R>(session: &mut Session, runner: &R, request: AddRequest) -> Result<String, AppError>
where
    R: QueryRunner + ?Sized,
{
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::user("query name must not be empty"));
    }
    if session.queries.iter().any(|query| query.name == name) {
        return Err(AppError::user(format!(
            "\"{name}\" already exists in the query list"
        )));
    }

    tracing::info!(query = name, "running query");
    let query = runner.run_query(name, &request.url, request.min_price, request.max_price)?;
    let rendered = query.to_string();
    session.queries.push(query);

    Ok(format!("running query \"{name}\" ...\n{rendered}\ndone"))
}

pub fn delete(session: &mut Session, name: &str) -> String {
    let name = name.trim();
    match session.queries.iter().position(|query| query.name == name) {
        Some(index) => {
            session.queries.remove(index);
            format!("deleted query \"{name}\"")
        }
        None => format!("not found the query \"{name}\""),
    }
}

pub fn list(session: &Session, long: bool) -> String {
    session
        .queries
        .iter()
        .enumerate()
        .map(|(index, query)| {
            let body = if long {
                query.to_string()
            } else {
                query.compact_line()
            };
            format!("{}) {body}", index + 1)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn refresh<R, N, S>(
    session: &mut Session,
    runner: &R,
    notifier: Option<&N>,
    options: RefreshOptions,
    cancel: &AtomicBool,
    sleep: S,
) -> Result<String, AppError>
where
    R: QueryRunner + ?Sized,
    N: Notifier + ?Sized,
    S: FnMut(Duration),
{
    if options.daemon && options.delay.is_zero() {
        return Err(AppError::user("daemon delay must be at least one second"));
    }

    let outcome = refresh::run_refresh(
        &mut session.queries,
        runner,
        notifier,
        options,
        cancel,
        sleep,
    );

    let mut message = if outcome.cancelled {
        "end of refreshing".to_string()
    } else {
        "done the refresh of all queries".to_string()
    };
    if outcome.failed_refreshes > 0 {
        message.push_str(&format!(
            " ({} query refreshes failed)",
            outcome.failed_refreshes
        ));
    }
    Ok(message)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramUpdate {
    pub token: Option<String>,
    pub chat_id: Option<String>,
    pub set_on: bool,
    pub set_off: bool,
}

/// Apply a credential change and persist it. Any accepted change is saved
/// immediately, including a bare on/off toggle.
pub fn telegram(session: &mut Session, update: TelegramUpdate) -> Result<String, AppError> {
    if update.set_on && update.set_off {
        return Err(AppError::user("You can't set on and off at the same time"));
    }

    let token = non_blank(update.token);
    let chat_id = non_blank(update.chat_id);
    let pair = match (token, chat_id) {
        (Some(token), Some(chat_id)) => Some((token, chat_id)),
        (None, None) => None,
        _ => return Err(AppError::user(TELEGRAM_USAGE_HINT)),
    };

    if pair.is_none() && !update.set_on && !update.set_off {
        return Ok(TELEGRAM_USAGE_HINT.to_string());
    }

    let mut next = session.credential.clone();
    if let Some((token, chat_id)) = pair {
        next.token = Some(token);
        next.chat_id = Some(chat_id);
    }
    if update.set_on {
        next.enabled = true;
    } else if update.set_off {
        next.enabled = false;
    }

    session.credential = next;
    session.persist_credential()?;

    let state = if session.credential.enabled { "on" } else { "off" };
    Ok(format!("telegram bot settings saved (state: {state})"))
}

pub fn show_telegram_api(session: &Session) -> String {
    session
        .credential
        .entries()
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn pwd() -> Result<String, AppError> {
    std::env::current_dir()
        .map(|path| path.display().to_string())
        .map_err(|error| AppError::runtime(format!("failed to read current directory: {error}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
