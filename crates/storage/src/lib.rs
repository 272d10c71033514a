use domain::MentionId;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

mod repo;

/// Durable set of mention ids that have already been handled.
///
/// The file is a JSON array of ids and is rewritten in full on every flush.
/// Loading never fails: a missing or corrupt file yields an empty set.
pub struct DedupStore {
    path: PathBuf,
    pub(crate) handled: HashSet<MentionId>,
    restored: bool,
}

impl DedupStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (handled, restored) = match load(&path) {
            Ok(Some(ids)) => {
                info!(path = %path.display(), count = ids.len(), "Loaded handled mentions");
                (ids, true)
            }
            Ok(None) => {
                info!(path = %path.display(), "No handled-mention file yet, starting empty");
                (HashSet::new(), false)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Handled-mention file unreadable, starting empty");
                (HashSet::new(), false)
            }
        };

        Self {
            path,
            handled,
            restored,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted set was loaded at open time.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn len(&self) -> usize {
        self.handled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }
}

fn load(path: &Path) -> Result<Option<HashSet<MentionId>>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let ids: Vec<MentionId> = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    Ok(Some(ids.into_iter().collect()))
}
