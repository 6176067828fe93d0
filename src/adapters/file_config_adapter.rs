//! INI file configuration adapter.
//!
//! Keys are case-insensitive. Values set through [`FileConfigAdapter::set`]
//! take precedence over the file, which is how command-line overrides reach
//! the rest of the pipeline.

use crate::domain::error::ArlError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArlError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ArlError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ArlError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ArlError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// Overrides (or adds) a single key.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.config.set(section, key, Some(value.into()));
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .and_then(|v| Self::parse_bool(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
path = data/EURUSD.dat
field = mid

[model]
kind = linear
window = 20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("data/EURUSD.dat".to_string())
        );
        assert_eq!(adapter.get_string("model", "kind"), Some("linear".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[engine]\ncost = 0.0002\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert!(adapter.has_key("engine", "cost"));
        assert!(!adapter.has_key("engine", "threshold"));
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[walkforward]\ntrain = 500\n").unwrap();
        assert_eq!(adapter.get_int("walkforward", "train", 0), 500);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[walkforward]\n").unwrap();
        assert_eq!(adapter.get_int("walkforward", "step", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[walkforward]\nstep = abc\n").unwrap();
        assert_eq!(adapter.get_int("walkforward", "step", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string("[engine]\ncost = 0.0002\n").unwrap();
        assert_eq!(adapter.get_double("engine", "cost", 0.0), 0.0002);
    }

    #[test]
    fn get_double_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[engine]\n").unwrap();
        assert_eq!(adapter.get_double("engine", "threshold", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("data", "a", false));
        assert!(adapter.get_bool("data", "b", false));
        assert!(adapter.get_bool("data", "c", false));
        assert!(!adapter.get_bool("data", "d", true));
        assert!(!adapter.get_bool("data", "e", true));
        assert!(!adapter.get_bool("data", "f", true));
        assert!(adapter.get_bool("data", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[report]\noutput = curve.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("curve.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini")
            .err()
            .unwrap();
        assert!(matches!(err, ArlError::ConfigParse { file, .. } if file.ends_with("config.ini")));
    }

    #[test]
    fn empty_values_read_as_missing() {
        let adapter = FileConfigAdapter::from_string("[engine]\nthreshold =\n").unwrap();
        assert_eq!(adapter.get_string("engine", "threshold"), None);
    }

    #[test]
    fn set_overrides_file_values() {
        let mut adapter = FileConfigAdapter::from_string("[data]\nlimit = 100\n").unwrap();
        adapter.set("data", "limit", "25");
        adapter.set("report", "output", "out.csv");
        assert_eq!(adapter.get_int("data", "limit", 0), 25);
        assert_eq!(adapter.get_string("report", "output"), Some("out.csv".to_string()));
    }
}
