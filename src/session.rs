//! Copy progress through a chunked output, persisted between invocations.

use crate::{
    engine::ProcessedOutput,
    error::{Error, Result},
    render::render_chunk,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;

/// Name of the session file inside an output directory.
pub const SESSION_FILE_NAME: &str = "session.json";

/// A processed output plus which of its chunks have been copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The output being delivered
    pub output: ProcessedOutput,

    /// One flag per chunk
    pub copied: Vec<bool>,
}

impl Session {
    /// Starts a session with nothing copied.
    #[must_use]
    pub fn new(output: ProcessedOutput) -> Self {
        let copied = vec![false; output.chunk_count()];
        Self { output, copied }
    }

    /// Index of the first chunk not yet copied.
    #[must_use]
    pub fn next_index(&self) -> Option<usize> {
        self.copied.iter().position(|c| !c)
    }

    /// Index of the most recently copied chunk in delivery order.
    #[must_use]
    pub fn last_copied_index(&self) -> Option<usize> {
        match self.next_index() {
            Some(0) => None,
            Some(next) => Some(next - 1),
            None => self.copied.len().checked_sub(1),
        }
    }

    /// Returns true once every chunk has been copied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_index().is_none()
    }

    /// Number of chunks copied so far.
    #[must_use]
    pub fn copied_count(&self) -> usize {
        self.copied.iter().filter(|c| **c).count()
    }

    /// Marks a chunk as copied.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn mark_copied(&mut self, index: usize) -> Result<()> {
        let total = self.copied.len();
        let flag = self.copied.get_mut(index).ok_or_else(|| {
            Error::session(format!("chunk {} does not exist ({total} chunks)", index + 1))
        })?;
        *flag = true;
        Ok(())
    }

    /// Clears all copy flags.
    pub fn reset(&mut self) {
        self.copied.fill(false);
    }

    /// Renders the next chunk and marks it copied.
    ///
    /// Returns the chunk's index along with its text.
    ///
    /// # Errors
    ///
    /// Returns an error if every chunk has already been copied.
    pub fn copy_next(&mut self) -> Result<(usize, String)> {
        let index = self
            .next_index()
            .ok_or_else(|| Error::session("all chunks have already been copied"))?;
        let text = self.render(index)?;
        self.mark_copied(index)?;

        debug!("Copied chunk {}/{}", index + 1, self.copied.len());
        Ok((index, text))
    }

    /// Renders the last copied chunk again without changing state.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing has been copied yet.
    pub fn copy_previous(&self) -> Result<(usize, String)> {
        let index = self
            .last_copied_index()
            .ok_or_else(|| Error::session("no chunk has been copied yet"))?;
        Ok((index, self.render(index)?))
    }

    fn render(&self, index: usize) -> Result<String> {
        self.output.chunks.get(index).map(render_chunk).ok_or_else(|| {
            Error::session(format!(
                "chunk {} does not exist ({} chunks)",
                index + 1,
                self.output.chunk_count()
            ))
        })
    }

    /// Writes the session as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    /// Reads a session written by [`Session::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if its
    /// flags do not line up with its chunks.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let session: Self = serde_json::from_str(&json)?;

        if session.copied.len() != session.output.chunk_count() {
            return Err(Error::session(format!(
                "{} has {} copy flags for {} chunks",
                path.display(),
                session.copied.len(),
                session.output.chunk_count()
            )));
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembler::ContentPart, splitter::Chunk};
    use assert_fs::prelude::*;

    fn output(chunks: usize) -> ProcessedOutput {
        ProcessedOutput {
            tree: "demo".to_string(),
            chunks: (1..=chunks)
                .map(|i| Chunk::new(vec![ContentPart::markdown(format!("chunk {i}"))]))
                .collect(),
            is_chunked: chunks > 1,
            token_estimate: 10,
        }
    }

    #[test]
    fn test_new_session_nothing_copied() {
        let session = Session::new(output(3));

        assert_eq!(session.copied, vec![false, false, false]);
        assert_eq!(session.next_index(), Some(0));
        assert_eq!(session.last_copied_index(), None);
    }

    #[test]
    fn test_copy_next_advances() {
        let mut session = Session::new(output(2));

        assert_eq!(session.copy_next().unwrap(), (0, "chunk 1".to_string()));
        assert_eq!(session.next_index(), Some(1));
        assert_eq!(session.last_copied_index(), Some(0));

        assert_eq!(session.copy_next().unwrap(), (1, "chunk 2".to_string()));
        assert!(session.is_complete());
        assert_eq!(session.last_copied_index(), Some(1));
        assert!(session.copy_next().is_err());
    }

    #[test]
    fn test_copy_previous_keeps_state() {
        let mut session = Session::new(output(3));
        assert!(session.copy_previous().is_err());

        session.copy_next().unwrap();
        session.copy_next().unwrap();

        assert_eq!(session.copy_previous().unwrap(), (1, "chunk 2".to_string()));
        assert_eq!(session.copied_count(), 2);
        assert_eq!(session.next_index(), Some(2));
    }

    #[test]
    fn test_mark_copied_out_of_range() {
        let mut session = Session::new(output(1));
        assert!(session.mark_copied(1).is_err());
        assert!(session.mark_copied(0).is_ok());
    }

    #[test]
    fn test_mismatched_flags_report_error() {
        let mut session = Session::new(output(1));
        session.copied = vec![true, false];

        assert!(session.copy_next().is_err());
        assert!(session.copy_previous().is_ok());

        session.copied = vec![true, true, true];
        assert!(session.copy_previous().is_err());
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new(output(2));
        session.copy_next().unwrap();
        session.reset();

        assert_eq!(session.next_index(), Some(0));
        assert_eq!(session.copied_count(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(SESSION_FILE_NAME);

        let mut session = Session::new(output(2));
        session.copy_next().unwrap();
        session.save(file.path()).unwrap();

        let loaded = Session::load(file.path()).unwrap();
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_load_rejects_mismatched_flags() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(SESSION_FILE_NAME);

        let mut session = Session::new(output(2));
        session.copied.push(false);
        session.save(file.path()).unwrap();

        assert!(Session::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Session::load(&temp.path().join("missing.json"));

        assert!(result.unwrap_err().is_io());
    }
}
