// Run orchestration: load or create the config, list the source directory,
// log in once, upload every regular file in order and finally replace the
// figurine's chapter list. The first error ends the run; nothing already
// uploaded is published in that case.

use crate::api::{Chapter, Session};
use crate::config::{CredentialStore, Credentials, Endpoints};
use crate::error::RunError;
use crate::ui::{run_setup, SetupProvider};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// A regular file found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// What a successful run published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub directory: PathBuf,
    pub chapters: Vec<Chapter>,
}

/// Regular files of `dir` sorted by name. Directories, symlinks and other
/// special entries are skipped.
pub fn list_directory(dir: &Path) -> Result<Vec<SourceFile>, RunError> {
    let list_err = |source| RunError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let file_type = entry.file_type().map_err(list_err)?;
        if !file_type.is_file() {
            continue;
        }
        let size = entry.metadata().map_err(list_err)?.len();
        files.push(SourceFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            size,
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// One run of the uploader.
pub struct Transfer<'a> {
    endpoints: Endpoints,
    store: CredentialStore,
    provider: &'a mut dyn SetupProvider,
}

impl<'a> Transfer<'a> {
    pub fn new(
        endpoints: Endpoints,
        store: CredentialStore,
        provider: &'a mut dyn SetupProvider,
    ) -> Self {
        Transfer {
            endpoints,
            store,
            provider,
        }
    }

    /// Upload `source` (or a directory picked by the provider) and publish
    /// it as the figurine's complete chapter list.
    pub fn run(&mut self, source: Option<PathBuf>) -> Result<TransferSummary, RunError> {
        let (credentials, session) = self.load_or_create_config()?;

        let dir = match source {
            Some(dir) => dir,
            None => self.provider.ask_path("Choose the directory to upload")?,
        };
        let files = list_directory(&dir)?;
        if files.is_empty() {
            return Err(RunError::EmptyDirectory { path: dir });
        }
        info!(dir = %dir.display(), count = files.len(), "found files to upload");

        let session = match session {
            Some(session) => session,
            None => Session::authenticate(
                &self.endpoints,
                &credentials.username,
                &credentials.password,
            )?,
        };

        let mut chapters = Vec::with_capacity(files.len());
        for file in &files {
            chapters.push(upload_file(&session, file)?);
        }

        session
            .publish(&credentials.household_id, &credentials.figurine_id, &chapters)
            .map_err(RunError::Publish)?;
        info!(count = chapters.len(), "published chapters");

        Ok(TransferSummary {
            directory: dir,
            chapters,
        })
    }

    /// Stored credentials, or the result of the setup wizard when there are
    /// none yet. The wizard already logs in, so its session is handed back.
    fn load_or_create_config(&mut self) -> Result<(Credentials, Option<Session>), RunError> {
        let known_username = match self.store.load()? {
            Some(credentials) if credentials.is_complete() => return Ok((credentials, None)),
            Some(credentials) => {
                info!(path = %self.store.path().display(), "config is incomplete, starting setup");
                credentials.username
            }
            None => {
                info!(path = %self.store.path().display(), "no config found, starting setup");
                String::new()
            }
        };
        let (credentials, session) =
            run_setup(self.provider, &self.endpoints, &self.store, &known_username)?;
        Ok((credentials, Some(session)))
    }
}

fn upload_file(session: &Session, file: &SourceFile) -> Result<Chapter, RunError> {
    let content = File::open(&file.path).map_err(|source| RunError::Open {
        path: file.path.clone(),
        source,
    })?;
    info!(name = %file.name, size = file.size, "processing");
    let file_id = session
        .upload(content, file.size, &file.name)
        .map_err(|source| RunError::Upload {
            name: file.name.clone(),
            source,
        })?;
    Ok(Chapter {
        title: file.name.clone(),
        file: file_id,
    })
}
