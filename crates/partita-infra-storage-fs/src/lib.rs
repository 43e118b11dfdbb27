use partita_ports::storage::{SettingsDto, StorageError, StoragePort};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Settings live in one pretty-printed JSON file under the platform config
/// directory. A missing file is not an error; defaults apply until the
/// first save.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("Partita"))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        Self::new(Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let data = match fs::read(self.settings_path()) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SettingsDto::default()),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| StorageError::Io(e.to_string()))?;
        let data = serde_json::to_vec_pretty(s).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(self.settings_path(), data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf());

        let settings = storage.load_settings().unwrap();
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.page_content_width_mm, 190.0);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().join("nested"));

        let settings = SettingsDto {
            api_key: Some("k".to_string()),
            output_dir: Some("/tmp/out".to_string()),
            page_content_height_mm: 280.0,
            ..SettingsDto::default()
        };
        storage.save_settings(&settings).unwrap();

        let loaded = storage.load_settings().unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("k"));
        assert_eq!(loaded.output_dir.as_deref(), Some("/tmp/out"));
        assert_eq!(loaded.page_content_height_mm, 280.0);
    }

    #[test]
    fn partial_settings_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf());
        fs::write(storage.settings_path(), br#"{ "api_key": "k" }"#).unwrap();

        let settings = storage.load_settings().unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("k"));
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.page_start_offset_mm, 10.0);
    }

    #[test]
    fn corrupt_settings_report_a_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().to_path_buf());
        fs::write(storage.settings_path(), b"{ nope").unwrap();

        assert!(matches!(
            storage.load_settings(),
            Err(StorageError::Serde(_))
        ));
    }
}
