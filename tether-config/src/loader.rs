//! Reading integration files from disk

use crate::{ConfigError, Result, Validate};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Case-insensitive; `None` for anything but `json` and `toml`
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else {
            None
        }
    }

    fn of_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| {
            ConfigError::LoadError(format!(
                "{}: expected a .json or .toml file",
                path.display()
            ))
        })
    }

    /// Parse into a JSON tree; TOML tables become JSON objects
    fn to_value(self, content: &str) -> Result<Value> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("invalid JSON: {e}"))),
            Self::Toml => {
                let table = content
                    .parse::<toml::Table>()
                    .map_err(|e| ConfigError::ParseError(format!("invalid TOML: {e}")))?;
                serde_json::to_value(table)
                    .map_err(|e| ConfigError::SerializationError(e.to_string()))
            }
        }
    }
}

/// Configuration file loader.
///
/// String values of the form `${NAME}` are replaced with the variable's
/// value after parsing. Variables set with [`ConfigLoader::with_var`] take
/// precedence over the process environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    format: FileFormat,
    vars: HashMap<String, String>,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            vars: HashMap::new(),
        }
    }

    /// Loader for the format named by the file's extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        FileFormat::of_path(path.as_ref()).map(Self::new)
    }

    /// Provide a variable for `${NAME}` expansion
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Load a `.env` file into the process environment.
    ///
    /// Without a path a missing `.env` in the working directory is ignored;
    /// an explicit path must exist.
    pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                debug!(path = %path.display(), "Loaded environment file");
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(())
    }

    /// Read and parse a file, expanding variables
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), format = ?self.format, "Read integration file");
        self.parse(&content)
    }

    /// Parse a document, expanding variables
    pub fn parse(&self, content: &str) -> Result<Value> {
        self.expand(self.format.to_value(content)?)
    }

    /// Load, deserialize and validate a configuration file
    pub fn load<T: DeserializeOwned + Validate>(&self, path: impl AsRef<Path>) -> Result<T> {
        let value = self.load_file(path)?;
        Self::deserialize(value)
    }

    /// Parse, deserialize and validate a configuration string
    pub fn parse_as<T: DeserializeOwned + Validate>(&self, content: &str) -> Result<T> {
        let value = self.parse(content)?;
        Self::deserialize(value)
    }

    fn deserialize<T: DeserializeOwned + Validate>(value: Value) -> Result<T> {
        let config: T = serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn expand(&self, value: Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.expand_str(&s)?),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.expand(item))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| Ok((k, self.expand(v)?)))
                    .collect::<Result<_>>()?,
            ),
            other => other,
        })
    }

    fn expand_str(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            // Unterminated or malformed references are kept verbatim
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let name = &after[..end];
            if !is_var_name(name) {
                out.push_str(&rest[start..start + 2]);
                rest = after;
                continue;
            }

            out.push_str(&self.lookup(name)?);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, name: &str) -> Result<String> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
    }
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
