//! Formatter configuration, loadable from TOML.
//!
//! ```toml
//! media_types = ["application/x-msgpack", "application/msgpack"]
//! buffer_input = true
//! max_body_bytes = 1048576
//! record_layout = "array"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use msgpack_formatting_codec::{CodecOptions, RecordLayout, DEFAULT_MAX_DEPTH};
use serde::Deserialize;
use thiserror::Error;

use crate::formatter::MEDIA_TYPE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// Media types announced to the host.
    pub media_types: Vec<String>,
    /// Read the whole body before decoding. When off, values are decoded
    /// straight off the stream.
    pub buffer_input: bool,
    /// Largest accepted request body. `None` means unlimited.
    pub max_body_bytes: Option<u64>,
    pub write_buffer_capacity: usize,
    pub max_depth: usize,
    pub record_layout: RecordLayout,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            media_types: vec![MEDIA_TYPE.to_owned()],
            buffer_input: true,
            max_body_bytes: None,
            write_buffer_capacity: CodecOptions::default().write_buffer_capacity,
            max_depth: DEFAULT_MAX_DEPTH,
            record_layout: RecordLayout::default(),
        }
    }
}

impl FormatterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(text)?.validated()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.media_types.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one media type is required".to_owned(),
            ));
        }
        if let Some(bad) = self.media_types.iter().find(|m| !is_media_type(m)) {
            return Err(ConfigError::Invalid(format!(
                "`{bad}` is not a type/subtype media type"
            )));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".to_owned()));
        }
        Ok(self)
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            max_depth: self.max_depth,
            record_layout: self.record_layout,
            write_buffer_capacity: self.write_buffer_capacity,
        }
    }
}

fn is_media_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((ty, sub)) => !ty.is_empty() && !sub.is_empty() && !s.contains(char::is_whitespace),
        None => false,
    }
}
