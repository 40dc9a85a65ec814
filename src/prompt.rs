use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// Prompt text plus sampling temperature, forwarded verbatim to the model
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSpec {
    pub text: String,
    /// Between 0 and 1, higher is more random
    pub temperature: f64,
}

impl PromptSpec {
    pub fn new(text: impl Into<String>, temperature: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::InvalidRequest(format!(
                "temperature must be between 0 and 1, got {}",
                temperature
            )));
        }

        Ok(Self {
            text: text.into(),
            temperature,
        })
    }

    /// Load the prompt text from a UTF-8 file
    ///
    /// # Arguments
    /// * `path` - Path to the prompt file
    /// * `temperature` - Sampling temperature for the request
    pub fn load(path: &Path, temperature: f64) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InvalidRequest(format!(
                "prompt file does not exist: {}",
                path.display()
            )));
        }

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => Error::InvalidRequest(format!(
                "prompt file is not valid UTF-8: {}",
                path.display()
            )),
            _ => Error::io(path, e),
        })?;

        Self::new(text, temperature)
    }
}
