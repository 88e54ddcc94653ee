use crate::model::PlannerState;
use crate::planner::Planner;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage key for the persisted planner record. The suffix is the only
/// schema version there is.
pub const STATE_KEY: &str = "planner_state_v1";

const PROJECT_DIR: &str = ".planner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataScope {
    Explicit,
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct DataLocation {
    pub dir: PathBuf,
    pub scope: DataScope,
}

impl DataLocation {
    pub fn scope_label(&self) -> &'static str {
        match self.scope {
            DataScope::Explicit => "explicit",
            DataScope::Project => "project",
            DataScope::Global => "global",
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }
}

/// Minimal string store the planner record is written to.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn describe(&self, key: &str) -> String;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {:?}", path)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {:?}", path)),
        }
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub entries: std::collections::HashMap<String, String>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("quota exceeded");
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory:{}", key)
    }
}

/// Saves and restores the planner record. Backend failures are logged and
/// never reach the caller.
pub struct StateStore<S: KeyValueStore> {
    backend: S,
    default_theme: String,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(backend: S, default_theme: impl Into<String>) -> Self {
        StateStore {
            backend,
            default_theme: default_theme.into(),
        }
    }

    pub fn location(&self) -> String {
        self.backend.describe(STATE_KEY)
    }

    /// Overwrites the stored record with the planner's current content.
    /// Returns whether the write went through.
    pub fn save(&mut self, planner: &Planner) -> bool {
        let state = planner.snapshot();
        let serialized = match serde_json::to_string(&state) {
            Ok(s) => s,
            Err(err) => {
                warn!("failed to serialize planner state: {}", err);
                return false;
            }
        };
        match self.backend.set(STATE_KEY, &serialized) {
            Ok(()) => {
                debug!(
                    "saved {} notes, {} emojis to {}",
                    state.notes.len(),
                    state.emojis.len(),
                    self.location()
                );
                true
            }
            Err(err) => {
                warn!("failed to save planner state: {:#}", err);
                false
            }
        }
    }

    /// Restores the stored planner, or a fresh default one when the record is
    /// missing or unreadable.
    pub fn load(&self) -> Planner {
        let raw = match self.backend.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("no saved planner at {}, starting fresh", self.location());
                return self.fresh();
            }
            Err(err) => {
                warn!("failed to read planner state: {:#}", err);
                return self.fresh();
            }
        };
        match serde_json::from_str::<PlannerState>(&raw) {
            Ok(state) => {
                let planner = Planner::restore(&state);
                info!("restored planner from {}", self.location());
                planner
            }
            Err(err) => {
                warn!("ignoring malformed planner state: {}", err);
                self.fresh()
            }
        }
    }

    /// Empties the live view and deletes the stored record.
    pub fn clear(&mut self, planner: &mut Planner) {
        planner.clear_all();
        if let Err(err) = self.backend.remove(STATE_KEY) {
            warn!("failed to delete planner state: {:#}", err);
        } else {
            info!("cleared planner state at {}", self.location());
        }
    }

    fn fresh(&self) -> Planner {
        Planner::new(self.default_theme.clone())
    }
}

/// Creates `.planner/` in the current directory so this project gets its own
/// planner.
pub fn init_project_dir(cwd: &Path) -> Result<DataLocation> {
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).context("failed to create .planner directory")?;
    Ok(DataLocation {
        dir,
        scope: DataScope::Project,
    })
}

/// Explicit directory wins, then the nearest `.planner/` above `start`, then
/// the per-user data directory.
pub fn locate_data_dir(explicit: Option<&Path>, start: &Path) -> Result<DataLocation> {
    if let Some(dir) = explicit {
        return Ok(DataLocation {
            dir: dir.to_path_buf(),
            scope: DataScope::Explicit,
        });
    }
    if let Some(dir) = find_project_dir(start) {
        return Ok(DataLocation {
            dir,
            scope: DataScope::Project,
        });
    }
    Ok(DataLocation {
        dir: global_data_dir()?,
        scope: DataScope::Global,
    })
}

fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "planner").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
