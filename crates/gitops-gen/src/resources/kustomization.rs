//! Structural model of a `kustomization.yaml` and its merge rules.
//!
//! `resources` and `bases` behave as sorted sets: the final list depends only
//! on which paths were ever added, never on call order. `patches` is an
//! ordered list because kustomize applies patches in sequence; see
//! [`Kustomization::merge_patches`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::error::{GenError, Result};
use crate::storage::Filesystem;

pub const KUSTOMIZE_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const KUSTOMIZE_KIND: &str = "Kustomization";

/// Top-level keys with a typed field. Keys that match one of these only
/// ignoring case are rejected on load.
const MODELLED_KEYS: &[&str] = &[
    "apiVersion",
    "kind",
    "resources",
    "bases",
    "patches",
    "commonLabels",
];

/// A single `patches` entry.
///
/// Plain string entries (`- patch.yaml`) are accepted on read and written
/// back in the `- path: patch.yaml` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPatch")]
pub struct Patch {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<serde_yaml::Value>,
}

impl Patch {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPatch {
    Path(String),
    Entry {
        path: String,
        #[serde(default)]
        target: Option<serde_yaml::Value>,
    },
}

impl From<RawPatch> for Patch {
    fn from(raw: RawPatch) -> Self {
        match raw {
            RawPatch::Path(path) => Patch::new(path),
            RawPatch::Entry { path, target } => Patch { path, target },
        }
    }
}

/// A kustomize manifest.
///
/// Top-level keys this type does not model are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_labels: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Kustomization {
    /// Creates an empty kustomization with the fixed apiVersion and kind.
    pub fn new() -> Self {
        Self {
            api_version: KUSTOMIZE_API_VERSION.to_string(),
            kind: KUSTOMIZE_KIND.to_string(),
            ..Default::default()
        }
    }

    /// Merges `paths` into `resources`, deduplicated and sorted.
    pub fn add_resources<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let existing = std::mem::take(&mut self.resources);
        self.resources = dedup_sorted(existing, paths);
    }

    /// Merges `paths` into `bases`, deduplicated and sorted.
    pub fn add_bases<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let existing = std::mem::take(&mut self.bases);
        self.bases = dedup_sorted(existing, paths);
    }

    /// Replaces `patches` with the preservation merge of `original` and
    /// `generated`.
    ///
    /// Generated paths missing from `original` come first, in generation
    /// order, followed by every original entry in its original order.
    /// Hand-added patches therefore keep their position relative to the
    /// tool-managed ones, and nothing is sorted.
    ///
    /// `original = [A, B]`, `generated = [B, C]` gives `[C, A, B]`.
    pub fn merge_patches(&mut self, original: &[Patch], generated: &[String]) {
        let known: HashSet<&str> = original.iter().map(|p| p.path.as_str()).collect();
        let mut seen = HashSet::new();

        let mut merged: Vec<Patch> = generated
            .iter()
            .filter(|path| !known.contains(path.as_str()))
            .filter(|path| seen.insert(path.as_str()))
            .map(|path| Patch::new(path.clone()))
            .collect();
        merged.extend(original.iter().cloned());

        self.patches = merged;
    }

    /// Patch paths in their current order.
    pub fn patch_paths(&self) -> Vec<&str> {
        self.patches.iter().map(|p| p.path.as_str()).collect()
    }

    /// Reads `path` if it exists.
    ///
    /// A file that does not parse as a kustomization is an error naming the
    /// path, so an incompatible hand edit is never silently overwritten.
    pub fn load<F: Filesystem + ?Sized>(fs: &F, path: &Path) -> Result<Option<Self>> {
        if !fs.exists(path)? {
            return Ok(None);
        }

        let bytes = fs.read_file(path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Self::default()));
        }

        let kustomization: Self =
            serde_yaml::from_slice(&bytes).map_err(|e| GenError::ParseKustomization {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        // `Resources: 8` would otherwise slip into `extra` and be rewritten
        if let Some((key, modelled)) = kustomization.miscased_key() {
            return Err(GenError::ParseKustomization {
                path: path.to_path_buf(),
                message: format!("unknown field `{key}`, did you mean `{modelled}`?"),
            });
        }

        Ok(Some(kustomization))
    }

    fn miscased_key(&self) -> Option<(&str, &'static str)> {
        self.extra.keys().find_map(|key| {
            MODELLED_KEYS
                .iter()
                .find(|modelled| modelled.eq_ignore_ascii_case(key))
                .map(|modelled| (key.as_str(), *modelled))
        })
    }

    /// Serializes to YAML, forcing the fixed apiVersion and kind.
    pub fn to_yaml(&mut self) -> Result<String> {
        self.api_version = KUSTOMIZE_API_VERSION.to_string();
        self.kind = KUSTOMIZE_KIND.to_string();
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the kustomization to `path`, replacing any previous file.
    pub fn write<F: Filesystem + ?Sized>(&mut self, fs: &F, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs.write_file(path, yaml.as_bytes())?;
        Ok(())
    }
}

fn dedup_sorted<I, S>(existing: Vec<String>, added: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    existing
        .into_iter()
        .chain(added.into_iter().map(Into::into))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
