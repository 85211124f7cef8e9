//! Log file sink

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use crate::logger::{FileConfig, LoggerError};

/// Opens the configured log file, creating parent directories as needed.
///
/// `Mutex<File>` implements `MakeWriter`, so the result plugs straight into a
/// fmt layer.
pub(crate) fn open_log_file(config: &FileConfig) -> Result<Mutex<File>, LoggerError> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if config.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    Ok(Mutex::new(options.open(&config.path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogFormat;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/app.log");
        let config = FileConfig::new(true, path.clone(), true, LogFormat::Json);

        let file = open_log_file(&config).unwrap();
        writeln!(file.lock().unwrap(), "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn test_truncate_when_not_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old content\n").unwrap();

        let config = FileConfig::new(true, path.clone(), false, LogFormat::Full);
        drop(open_log_file(&config).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        std::fs::write(&path, "kept\n").unwrap();
        let config = FileConfig::new(true, path.clone(), true, LogFormat::Full);
        drop(open_log_file(&config).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept\n");
    }
}
