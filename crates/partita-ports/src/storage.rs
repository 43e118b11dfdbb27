use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_page_content_width_mm() -> f64 {
    190.0
}

fn default_page_content_height_mm() -> f64 {
    295.0
}

fn default_page_start_offset_mm() -> f64 {
    10.0
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub abc2abc_path: Option<String>,
    pub abcm2ps_path: Option<String>,
    pub rsvg_convert_path: Option<String>,
    pub surface_dir: Option<String>,
    pub output_dir: Option<String>,
    // A4 content box with a 10mm top margin.
    #[serde(default = "default_page_content_width_mm")]
    pub page_content_width_mm: f64,
    #[serde(default = "default_page_content_height_mm")]
    pub page_content_height_mm: f64,
    #[serde(default = "default_page_start_offset_mm")]
    pub page_start_offset_mm: f64,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: None,
            model: "gemini-2.5-flash".to_string(),
            abc2abc_path: None,
            abcm2ps_path: None,
            rsvg_convert_path: None,
            surface_dir: None,
            output_dir: None,
            page_content_width_mm: 190.0,
            page_content_height_mm: 295.0,
            page_start_offset_mm: 10.0,
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
