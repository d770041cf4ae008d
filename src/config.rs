//! YAML configuration.
//!
//! The file is rendered as a `tera` template first, so values can be taken
//! from the environment:
//!
//! ```yaml
//! batch:
//!   workers: {{ get_env(name="TAXOSIM_WORKERS", default="4") }}
//! ```
//!
//! Relative paths are resolved against the directory of the configuration
//! file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::batch::{BatchSettings, QuerySource};
use crate::ic::IcConfig;
use crate::logger::LoggerConfig;
use crate::measures::MeasureSettings;
use crate::ontology::{GraphSource, IdentifierRegistry};
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    pub logger: LoggerConfig,
    /// Prefix → namespace, added to the built in `rdf`, `rdfs`, `owl` and
    /// `xsd` entries.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
    pub graph: GraphSettings,
    #[serde(default)]
    pub ic: Vec<IcConfig>,
    #[serde(default)]
    pub measures: MeasureSettings,
    #[serde(default)]
    #[validate(nested)]
    pub batch: BatchSettings,
    pub queries: QuerySource,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// IRI or `prefix:local` name of the graph.
    pub name: String,
    #[serde(default)]
    pub sources: Vec<GraphSource>,
}

impl Config {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, rendered, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::Configuration(format!("cannot read config `{}`: {err}", path.display()))
        })?;
        let mut config = Self::from_str(&raw)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        debug!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    /// Renders, parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Template`], [`Error::Yaml`] or
    /// [`Error::Configuration`].
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self> {
        let rendered = tera::Tera::one_off(raw, &tera::Context::new(), false)?;
        let config: Self = serde_yaml::from_str(&rendered)?;
        config
            .validate()
            .map_err(|err| Error::Configuration(format!("invalid configuration: {err}")))?;
        Ok(config)
    }

    /// Identifier registry seeded with the configured prefixes.
    #[must_use]
    pub fn registry(&self) -> IdentifierRegistry {
        IdentifierRegistry::new().with_prefixes(
            self.prefixes
                .iter()
                .map(|(prefix, namespace)| (prefix.clone(), namespace.clone())),
        )
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for source in &mut self.graph.sources {
            match source {
                GraphSource::Tabular(tabular) => join(&mut tabular.path),
            }
        }
        join(&mut self.queries.path);
        if let Some(output) = self.output.as_mut() {
            join(output);
        }
    }
}
