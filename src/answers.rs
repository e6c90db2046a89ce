use crate::models::QuizResult;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default location of the durable answer log, next to the rotated app logs.
pub const ANSWERS_FILE: &str = "logs/answers.txt";

/// Append-only, insertion-ordered log of accepted answer tokens ("13A").
///
/// Appends arrive from worker-pool completion paths, which can overlap with a
/// pool size above one, so the in-memory list is mutex-guarded. The durable
/// form is a single space-joined file rewritten in full on every change.
pub struct AnswerLog {
    entries: Mutex<Vec<String>>,
    path: PathBuf,
}

impl AnswerLog {
    /// Open the log at `path`, reading back whatever a previous run saved.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let entries: Vec<String> =
                    content.split_whitespace().map(str::to_string).collect();
                if entries.is_empty() {
                    tracing::info!(path = %path.display(), "answer file is empty");
                } else {
                    tracing::info!(count = entries.len(), path = %path.display(), "loaded answers");
                }
                entries
            }
            Err(_) => {
                tracing::info!(path = %path.display(), "no answer file found");
                Vec::new()
            }
        };
        Self {
            entries: Mutex::new(entries),
            path,
        }
    }

    /// Append one token per answered question and rewrite the file.
    /// Questions with a blank answer are skipped.
    pub fn record(&self, result: &QuizResult) {
        let mut entries = self.entries.lock().unwrap();
        for q in &result.questions {
            if q.answer.trim().is_empty() {
                tracing::warn!(number = %q.number, "skipping question with no answer");
                continue;
            }
            entries.push(format!("{}{}", q.number, q.answer));
        }
        self.save_locked(&entries);
    }

    /// Delete the file and forget the in-memory history. Returns how many
    /// entries were dropped.
    pub fn reset(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                tracing::error!(?err, path = %self.path.display(), "failed to delete answer file");
            }
        }
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Chunk the history into lines of `per_line` tokens for the popup.
    pub fn format_display(&self, per_line: usize) -> String {
        let entries = self.entries.lock().unwrap();
        let per_line = per_line.max(1);
        entries
            .chunks(per_line)
            .map(|chunk| chunk.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_locked(&self, entries: &[String]) {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(err) = std::fs::create_dir_all(dir) {
                    tracing::error!(?err, "failed to create answer directory");
                    return;
                }
            }
        }
        match std::fs::write(&self.path, entries.join(" ")) {
            Ok(()) => {
                tracing::info!(count = entries.len(), path = %self.path.display(), "saved answers")
            }
            Err(err) => {
                tracing::error!(?err, path = %self.path.display(), "failed to save answers")
            }
        }
    }
}
