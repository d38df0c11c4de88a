//! Policy bundles: Rego programs packaged with the metadata of the rule they
//! implement.
//!
//! A bundle is a YAML sequence of records:
//!
//! ```yaml
//! - name: Node pool auto-upgrade
//!   code: GKE-03
//!   description: Markdown rationale.
//!   status: Warning
//!   rule: |
//!     package security
//!     ...
//! ```
//!
//! Every program is compiled when the bundle is loaded. Any malformed record
//! or program fails the whole load.

pub(crate) mod policy;

pub use self::policy::{PolicyRule, QUERY};
use security_controller_core::InvalidStatus;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Bundles compiled into the controller.
const BUILTIN: [(&str, &str); 3] = [
    ("gke.yaml", include_str!("../../bundles/gke.yaml")),
    ("eks.yaml", include_str!("../../bundles/eks.yaml")),
    ("kubernetes.yaml", include_str!("../../bundles/kubernetes.yaml")),
];

/// A single record of a policy bundle.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definition {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,

    /// The status reported when the program finds a violation.
    pub status: String,

    /// The Rego source of the program.
    pub rule: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read policy bundle {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy bundle {bundle} is malformed")]
    Parse {
        bundle: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("policy bundle {bundle} has a record with an empty {field}")]
    Empty { bundle: String, field: &'static str },

    #[error("policy {code} in bundle {bundle} has an invalid status")]
    Severity {
        bundle: String,
        code: String,
        #[source]
        source: InvalidStatus,
    },

    #[error("policy {code} in bundle {bundle} failed to compile: {message}")]
    Compile {
        bundle: String,
        code: String,
        message: String,
    },
}

/// Parses and compiles every record of a bundle.
pub fn load_bundle(bundle: &str, source: &str) -> Result<Vec<PolicyRule>, LoadError> {
    let definitions = serde_yaml::from_str::<Option<Vec<Definition>>>(source)
        .map_err(|source| LoadError::Parse {
            bundle: bundle.to_string(),
            source,
        })?
        .unwrap_or_default();

    let rules = definitions
        .into_iter()
        .map(|definition| PolicyRule::compile(bundle, definition))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(%bundle, rules = rules.len(), "Loaded policy bundle");
    Ok(rules)
}

/// Loads the bundles compiled into the controller.
pub fn load_builtin() -> Result<Vec<PolicyRule>, LoadError> {
    let mut rules = Vec::new();
    for (bundle, source) in BUILTIN {
        rules.extend(load_bundle(bundle, source)?);
    }
    info!(rules = rules.len(), "Loaded built-in policy bundles");
    Ok(rules)
}

/// Loads every `*.yaml`/`*.yml` bundle in a directory, in file name order.
pub fn load_dir(dir: &Path) -> Result<Vec<PolicyRule>, LoadError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LoadError::Read { path, source }
    };

    let mut paths = fs::read_dir(dir)
        .map_err(read_err(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err(dir))?;
    paths.retain(|path| {
        path.is_file()
            && matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml")
            )
    });
    paths.sort();

    let mut rules = Vec::new();
    for path in paths {
        let source = fs::read_to_string(&path).map_err(read_err(&path))?;
        rules.extend(load_bundle(&path.display().to_string(), &source)?);
    }
    info!(dir = %dir.display(), rules = rules.len(), "Loaded policy bundles");
    Ok(rules)
}
