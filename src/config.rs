//! `qail-views.toml` configuration.
//!
//! The file declares the views the application expects, the schemas to
//! compare and an optional name filter.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::compare::{ParentNames, VIEW_OBJECT_TYPE};
use crate::error::{ViewError, ViewResult};
use crate::metadata::ViewMetadata;
use crate::schema::{SchemaName, ViewKey};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "qail-views.toml";

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewsConfig {
    /// Database connection URL
    pub database_url: Option<String>,

    /// Extra schemas to compare. The default schema is always compared.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Where `revision` writes migration files
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    #[serde(default)]
    pub filter: NameFilterConfig,

    #[serde(default, rename = "view")]
    pub views: Vec<ViewEntry>,

    /// Directory `file` entries resolve against. Set by [`ViewsConfig::load`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            schemas: Vec::new(),
            migrations_dir: default_migrations_dir(),
            filter: NameFilterConfig::default(),
            views: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

/// Include/exclude patterns. A trailing `*` matches any suffix.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameFilterConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// One `[[view]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewEntry {
    pub name: String,
    pub schema: Option<String>,
    /// Inline query text
    pub definition: Option<String>,
    /// Query file, relative to the config file
    pub file: Option<String>,
}

impl ViewsConfig {
    /// Parse configuration text. `file` entries resolve against the working directory.
    pub fn from_toml_str(content: &str) -> ViewResult<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| ViewError::Config(format!("Invalid configuration: {}", e)))?;
        config.base_dir = PathBuf::from(".");
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> ViewResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ViewError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Load the first configuration found.
    ///
    /// An explicit path must exist. Otherwise `./qail-views.toml` and then
    /// `<config dir>/qail-views/config.toml` are tried; when neither exists
    /// an empty configuration is returned.
    pub fn discover(explicit: Option<&Path>) -> ViewResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(global) = dirs::config_dir().map(|d| d.join("qail-views").join("config.toml"))
        {
            if global.exists() {
                return Self::load(&global);
            }
        }

        Ok(Self::default())
    }

    /// Declared views, with `file` entries read from disk.
    pub fn metadata(&self) -> ViewResult<ViewMetadata> {
        let mut metadata = ViewMetadata::new();

        for entry in &self.views {
            let query = match (&entry.definition, &entry.file) {
                (Some(definition), None) => definition.clone(),
                (None, Some(file)) => {
                    let path = self.base_dir.join(file);
                    fs::read_to_string(&path).map_err(|e| {
                        ViewError::Config(format!(
                            "View '{}': failed to read {}: {}",
                            entry.name,
                            path.display(),
                            e
                        ))
                    })?
                }
                _ => {
                    return Err(ViewError::Config(format!(
                        "View '{}' needs exactly one of 'definition' or 'file'",
                        entry.name
                    )));
                }
            };

            let schema = SchemaName::from(entry.schema.as_deref());
            metadata.insert(ViewKey::new(schema, entry.name.as_str()), query.trim());
        }

        Ok(metadata)
    }

    /// Schemas to compare: the default schema, configured ones, then any
    /// schema a declared view lives in.
    pub fn schemas(&self, metadata: &ViewMetadata) -> Vec<SchemaName> {
        let mut schemas = vec![SchemaName::Default];
        let configured = self.schemas.iter().map(SchemaName::named);

        for schema in configured.chain(metadata.schemas()) {
            if !schemas.contains(&schema) {
                schemas.push(schema);
            }
        }

        schemas
    }

    /// Name filter built from `[filter]`, usable with
    /// [`AutogenContext::with_name_filter`](crate::compare::AutogenContext::with_name_filter).
    pub fn name_filter(&self) -> impl Fn(&str, &str, &ParentNames) -> bool + use<> {
        let filter = self.filter.clone();
        move |name, object_type, _parents| {
            object_type != VIEW_OBJECT_TYPE || filter.accepts(name)
        }
    }
}

impl NameFilterConfig {
    /// True when `name` matches an include pattern (or there are none) and
    /// no exclude pattern.
    pub fn accepts(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| pattern_matches(p, name));
        included && !self.exclude.iter().any(|p| pattern_matches(p, name))
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
