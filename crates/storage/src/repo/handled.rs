use crate::DedupStore;
use domain::{MentionId, PipelineError};
use std::fs;
use tracing::debug;

impl DedupStore {
    pub fn is_handled(&self, id: MentionId) -> bool {
        self.handled.contains(&id)
    }

    /// Returns false if the id was already present.
    pub fn mark_handled(&mut self, id: MentionId) -> bool {
        self.handled.insert(id)
    }

    /// Bulk-seeds ids visible at first start. Returns how many were new.
    pub fn initialize_from_current_feed(
        &mut self,
        ids: impl IntoIterator<Item = MentionId>,
    ) -> usize {
        ids.into_iter().filter(|id| self.handled.insert(*id)).count()
    }

    /// Rewrites the whole set to disk via a temp file + rename.
    pub fn flush(&self) -> Result<(), PipelineError> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(persistence)?;
            }
        }

        let mut ids: Vec<MentionId> = self.handled.iter().copied().collect();
        ids.sort_unstable();
        let body = serde_json::to_vec(&ids).map_err(persistence)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, body).map_err(persistence)?;
        fs::rename(&tmp, path).map_err(persistence)?;

        debug!(path = %path.display(), count = ids.len(), "Flushed handled mentions");
        Ok(())
    }
}

fn persistence(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Persistence(e.to_string())
}
