//! Dashboard configuration.
//!
//! Every field has a serde default, so an empty JSON object is a valid
//! config. `DashboardConfig::load` reads the file named by
//! `LUBE_DASH_CONFIG` when it is set.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::format::{TextEncoding, TextFormat};
use crate::data::loader::LoadOptions;
use crate::error::ConfigError;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "LUBE_DASH_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// File the loader expects at the archive root
    #[serde(default = "default_member_name")]
    pub member_name: String,

    /// Where uploaded archives are extracted
    #[serde(default = "default_extract_dir")]
    pub extract_dir: PathBuf,

    /// Suggested name for exported files
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,

    /// Field delimiter of input and exported files
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Text encoding of input and exported files
    #[serde(default)]
    pub encoding: TextEncoding,

    /// Rows per load chunk (0 = single pass)
    #[serde(default = "default_chunk_rows")]
    pub chunk_rows: usize,

    /// Keep parquet snapshots of parsed tables next to the extracted files
    #[serde(default = "default_cache_snapshots")]
    pub cache_snapshots: bool,

    /// Page where the canonical dataset can be downloaded
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
}

fn default_member_name() -> String {
    "Lubrificante_Anexo_A.csv".to_string()
}

fn default_extract_dir() -> PathBuf {
    PathBuf::from("dados_extraidos")
}

fn default_export_file_name() -> String {
    "dados_filtrados.csv".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_chunk_rows() -> usize {
    100_000
}

fn default_cache_snapshots() -> bool {
    true
}

fn default_dataset_url() -> String {
    "https://www.gov.br/anp/pt-br/centrais-de-conteudo/dados-abertos".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            member_name: default_member_name(),
            extract_dir: default_extract_dir(),
            export_file_name: default_export_file_name(),
            delimiter: default_delimiter(),
            encoding: TextEncoding::default(),
            chunk_rows: default_chunk_rows(),
            cache_snapshots: default_cache_snapshots(),
            dataset_url: default_dataset_url(),
        }
    }
}

impl DashboardConfig {
    /// Config from `LUBE_DASH_CONFIG`, or defaults when it is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.text_format()?;
        Ok(config)
    }

    pub fn text_format(&self) -> Result<TextFormat, ConfigError> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConfigError::InvalidDelimiter(self.delimiter))?;
        Ok(TextFormat {
            delimiter,
            encoding: self.encoding,
        })
    }

    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        Ok(LoadOptions {
            format: self.text_format()?,
            chunk_rows: self.chunk_rows,
        })
    }

    /// Directory for parquet snapshots, inside the extraction directory.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.extract_dir.join(".snapshots")
    }
}
