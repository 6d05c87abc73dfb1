// UI layer: everything that asks the user something. The transfer logic
// only sees the `SetupProvider` trait, so tests can script the answers;
// `TerminalSetup` is the real implementation on top of `dialoguer` and a
// native folder picker.

use crate::api::Session;
use crate::config::{CredentialStore, Credentials, Endpoints};
use crate::error::{RunError, SetupError};
use dialoguer::{Input, Password, Select};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// Source of answers for first-run setup and the directory choice.
pub trait SetupProvider {
    /// Free text, pre-filled with `default` when it is not empty.
    fn ask_text(&mut self, prompt: &str, default: &str) -> Result<String, SetupError>;
    /// Hidden input.
    fn ask_secret(&mut self, prompt: &str) -> Result<String, SetupError>;
    /// Index into `items` of the chosen entry.
    fn ask_choice(&mut self, prompt: &str, items: &[String]) -> Result<usize, SetupError>;
    /// A directory on the local file system.
    fn ask_path(&mut self, prompt: &str) -> Result<PathBuf, SetupError>;
}

/// Interactive terminal prompts plus a native dialog for the directory.
#[derive(Debug, Default)]
pub struct TerminalSetup;

impl SetupProvider for TerminalSetup {
    fn ask_text(&mut self, prompt: &str, default: &str) -> Result<String, SetupError> {
        let mut input = Input::<String>::new();
        input.with_prompt(prompt);
        if !default.is_empty() {
            input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<String, SetupError> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }

    fn ask_choice(&mut self, prompt: &str, items: &[String]) -> Result<usize, SetupError> {
        // `interact_opt` returns None when the user presses Esc or q.
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?
            .ok_or(SetupError::AbortedByUser)
    }

    fn ask_path(&mut self, prompt: &str) -> Result<PathBuf, SetupError> {
        rfd::FileDialog::new()
            .set_title(prompt)
            .pick_folder()
            .ok_or(SetupError::AbortedByUser)
    }
}

/// First-run setup: ask for the account, log in, let the user pick a
/// household and a creative tonie, then save everything to `store`.
///
/// The session is returned as well so the run does not have to log in a
/// second time.
pub fn run_setup(
    provider: &mut dyn SetupProvider,
    endpoints: &Endpoints,
    store: &CredentialStore,
    known_username: &str,
) -> Result<(Credentials, Session), RunError> {
    let username = provider.ask_text("Tonie username", known_username)?;
    let password = provider.ask_secret("Tonie password")?;
    let session = Session::authenticate(endpoints, &username, &password)?;

    let households = session
        .list_households()
        .map_err(|source| RunError::Lookup {
            what: "households",
            source,
        })?;
    let household_id = choose(provider, "Choose household", "households", households)?;

    let figurines = session
        .list_figurines(&household_id)
        .map_err(|source| RunError::Lookup {
            what: "tonies",
            source,
        })?;
    let figurine_id = choose(provider, "Choose creative tonie", "tonies", figurines)?;

    let credentials = Credentials {
        username,
        password,
        household_id,
        figurine_id,
    };
    store.save(&credentials)?;
    info!(path = %store.path().display(), "saved configuration");
    Ok((credentials, session))
}

/// Offer the names sorted alphabetically and return the id of the pick.
fn choose(
    provider: &mut dyn SetupProvider,
    prompt: &str,
    what: &'static str,
    by_name: HashMap<String, String>,
) -> Result<String, SetupError> {
    let mut entries: Vec<(String, String)> = by_name.into_iter().collect();
    if entries.is_empty() {
        return Err(SetupError::NothingToChoose(what));
    }
    entries.sort();
    let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
    let index = provider.ask_choice(prompt, &names)?;
    entries
        .into_iter()
        .nth(index)
        .map(|(_, id)| id)
        .ok_or(SetupError::AbortedByUser)
}
