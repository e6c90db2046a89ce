use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

pub const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "quizlens.log";

/// Initialise logging to stdout and a daily-rolled file under `logs/`.
/// The default level is `info`; `debug` can be enabled via the settings file,
/// in which case `RUST_LOG` may override it further. The returned guard must
/// live for the duration of the process or buffered lines are lost.
pub fn init(debug: bool) -> WorkerGuard {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable. This prevents accidental verbose output
    // if the variable happens to be set in the user's environment.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        // Allow `RUST_LOG` to override the level when debug logging is enabled.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(file_writer.and(std::io::stdout))
        .try_init();

    guard
}

/// Delete rolled log files. The answer history lives in the same directory
/// and is never touched; the file currently held open by the appender may
/// survive on platforms that lock open files.
pub fn clear_log_files() -> usize {
    clear_log_files_in(Path::new(LOG_DIR))
}

fn clear_log_files_in(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(?err, file = name, "could not delete log file");
            }
        }
    }
    tracing::info!(removed, "cleared log files");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_skips_answer_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quizlens.log.2026-08-29"), "old").unwrap();
        std::fs::write(dir.path().join("quizlens.log.2026-08-30"), "new").unwrap();
        std::fs::write(dir.path().join("answers.txt"), "1A 2B").unwrap();

        assert_eq!(clear_log_files_in(dir.path()), 2);
        assert!(dir.path().join("answers.txt").exists());
        assert!(!dir.path().join("quizlens.log.2026-08-30").exists());
    }

    #[test]
    fn clear_missing_dir_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(clear_log_files_in(&dir.path().join("nope")), 0);
    }
}
