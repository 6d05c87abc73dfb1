// Library root
// -----------
// This crate uploads a directory of audio files to a creative tonie. The
// binary (`main.rs`) only parses arguments, sets up logging and calls
// `transfer::Transfer`.
//
// Module responsibilities:
// - `config`: vendor endpoints and the persisted credentials file.
// - `api`: the authenticated session, directory lookups and chapter
//   publishing.
// - `upload`: slot negotiation and the multipart transfer of one file.
// - `ui`: the `SetupProvider` abstraction, its terminal implementation and
//   the first-run setup wizard.
// - `transfer`: the run itself, from config to published chapters.
// - `error`: one error type per step.
pub mod api;
pub mod config;
pub mod error;
pub mod transfer;
pub mod ui;
pub mod upload;

pub use api::{Chapter, Session};
pub use config::{CredentialStore, Credentials, Endpoints};
pub use error::{ApiError, AuthError, ConfigError, RunError, SetupError, UploadError};
pub use transfer::{Transfer, TransferSummary};
pub use ui::{SetupProvider, TerminalSetup};
pub use upload::UploadSlot;
