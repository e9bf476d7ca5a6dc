//!
//! Charm metadata documents and the spec that binds them to a charm type.
//!
//! The three documents (`metadata.yaml`, `config.yaml`, `actions.yaml`) are
//! modelled just deeply enough for the runtime to reason about them; any
//! other key, at any level, survives a load/render cycle untouched.
//!

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use std::{
    collections::BTreeMap,
    fmt,
    marker::PhantomData,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

pub const METADATA_FILE: &str = "metadata.yaml";
pub const CONFIG_FILE: &str = "config.yaml";
pub const ACTIONS_FILE: &str = "actions.yaml";

///
/// MetadataError
///

#[derive(Debug, ThisError)]
pub enum MetadataError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot render {document}: {message}")]
    Render { document: String, message: String },
}

///
/// CharmMeta
/// the `metadata.yaml` document
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CharmMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requires: BTreeMap<String, RelationMeta>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provides: BTreeMap<String, RelationMeta>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peers: BTreeMap<String, RelationMeta>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<String, StorageMeta>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, ContainerMeta>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

impl CharmMeta {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_requires(mut self, endpoint: &str, interface: &str) -> Self {
        self.requires
            .insert(endpoint.to_string(), RelationMeta::new(interface));
        self
    }

    #[must_use]
    pub fn with_provides(mut self, endpoint: &str, interface: &str) -> Self {
        self.provides
            .insert(endpoint.to_string(), RelationMeta::new(interface));
        self
    }

    #[must_use]
    pub fn with_peer(mut self, endpoint: &str, interface: &str) -> Self {
        self.peers
            .insert(endpoint.to_string(), RelationMeta::new(interface));
        self
    }

    #[must_use]
    pub fn with_container(mut self, name: &str) -> Self {
        self.containers
            .insert(name.to_string(), ContainerMeta::default());
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RelationMeta {
    pub interface: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

impl RelationMeta {
    #[must_use]
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StorageMeta {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ContainerMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<YamlValue>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

///
/// ConfigSchema
/// the `config.yaml` document
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConfigSchema {
    #[serde(default)]
    pub options: BTreeMap<String, ConfigOption>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

impl ConfigSchema {
    #[must_use]
    pub fn with_option(mut self, key: &str, kind: &str) -> Self {
        self.options.insert(
            key.to_string(),
            ConfigOption {
                kind: Some(kind.to_string()),
                ..ConfigOption::default()
            },
        );
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConfigOption {
    /// Left as written; the consistency checker decides what it accepts.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<YamlValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

/// The `actions.yaml` document: action name to its free-form definition.
pub type ActionsDoc = BTreeMap<String, YamlValue>;

///
/// CharmSpec
///
/// Ties a charm type to the metadata the runtime will lay down for it.
/// `autoloaded` records whether the documents were discovered on disk
/// (and so may safely overwrite identical copies) or supplied by the caller.
///

pub struct CharmSpec<C> {
    pub meta: CharmMeta,
    pub config: Option<ConfigSchema>,
    pub actions: Option<ActionsDoc>,
    pub autoloaded: bool,
    charm: PhantomData<fn() -> C>,
}

impl<C> CharmSpec<C> {
    /// Caller-supplied metadata.
    #[must_use]
    pub const fn new(meta: CharmMeta) -> Self {
        Self {
            meta,
            config: None,
            actions: None,
            autoloaded: false,
            charm: PhantomData,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ConfigSchema) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: ActionsDoc) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Discover the documents in a charm source directory.
    /// `metadata.yaml` is required; the other two are optional.
    pub fn autoload(charm_dir: &Path) -> Result<Self, MetadataError> {
        let meta = read_document(&charm_dir.join(METADATA_FILE))?.ok_or_else(|| {
            MetadataError::Read {
                path: charm_dir.join(METADATA_FILE),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
        })?;

        Ok(Self {
            meta,
            config: read_document(&charm_dir.join(CONFIG_FILE))?,
            actions: read_document(&charm_dir.join(ACTIONS_FILE))?,
            autoloaded: true,
            charm: PhantomData,
        })
    }

    /// Declared options, empty when no config document exists.
    #[must_use]
    pub fn config_options(&self) -> BTreeMap<String, ConfigOption> {
        self.config
            .as_ref()
            .map(|c| c.options.clone())
            .unwrap_or_default()
    }

    pub fn render_metadata(&self) -> Result<String, MetadataError> {
        render(METADATA_FILE, &self.meta)
    }

    /// An absent document renders as an empty mapping.
    pub fn render_config(&self) -> Result<String, MetadataError> {
        match &self.config {
            Some(config) => render(CONFIG_FILE, config),
            None => render(CONFIG_FILE, &BTreeMap::<String, YamlValue>::new()),
        }
    }

    pub fn render_actions(&self) -> Result<String, MetadataError> {
        render(ACTIONS_FILE, &self.actions.clone().unwrap_or_default())
    }
}

// manual impls: C is only a type marker and need not be Clone/Debug
impl<C> Clone for CharmSpec<C> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            config: self.config.clone(),
            actions: self.actions.clone(),
            autoloaded: self.autoloaded,
            charm: PhantomData,
        }
    }
}

impl<C> fmt::Debug for CharmSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharmSpec")
            .field("charm", &std::any::type_name::<C>())
            .field("meta", &self.meta)
            .field("config", &self.config)
            .field("actions", &self.actions)
            .field("autoloaded", &self.autoloaded)
            .finish()
    }
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, MetadataError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|e| MetadataError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn render<T: Serialize>(document: &str, value: &T) -> Result<String, MetadataError> {
    serde_yaml::to_string(value).map_err(|e| MetadataError::Render {
        document: document.to_string(),
        message: e.to_string(),
    })
}

///
/// TESTS
///
