// Manifest and catalog models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::ResourceId;

/// Version control system backing a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcsType {
    #[serde(rename = "GITHUB")]
    GitHub,
    #[serde(rename = "GITLAB")]
    GitLab,
}

impl VcsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsType::GitHub => "GITHUB",
            VcsType::GitLab => "GITLAB",
        }
    }

    /// Resource path serving manifests for this VCS
    pub fn manifest_path(&self) -> &'static str {
        match self {
            VcsType::GitHub => "githubManifest",
            VcsType::GitLab => "gitlabManifest",
        }
    }
}

impl std::fmt::Display for VcsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VcsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(VcsType::GitHub),
            "gitlab" => Ok(VcsType::GitLab),
            other => Err(format!("unsupported VCS type '{}' (expected github or gitlab)", other)),
        }
    }
}

/// Catalog manifest
///
/// Depending on the endpoint the identifier arrives as `id`, `_id` or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ResourceId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Manifest {
    /// Preferred identifier: `id`, then `_id`
    pub fn resource_id(&self) -> Option<&ResourceId> {
        self.id.as_ref().or(self.mongo_id.as_ref())
    }
}

/// Catalog entries share the manifest schema
pub type Catalog = Manifest;

/// Selects the VCS-specific manifest endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestListOptions {
    pub vcs: Option<VcsType>,
}

/// `data` payload of the VCS manifest list endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct VcsManifestList {
    #[serde(rename = "catalogManifest", default)]
    pub catalog_manifest: Vec<Manifest>,
}

/// `data` payload of the VCS manifest detail endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct VcsManifestItem {
    #[serde(rename = "catalogManifest")]
    pub catalog_manifest: Manifest,
}

/// Client-side catalog filters
///
/// Set fields must all match. `name` and `description` match on a
/// case-insensitive substring, the rest on case-insensitive equality.
#[derive(Debug, Clone, Default)]
pub struct CatalogListOptions {
    pub id: Option<String>,
    pub vcs: Option<VcsType>,
    pub kind: Option<String>,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
}

impl CatalogListOptions {
    pub fn matches(&self, catalog: &Catalog) -> bool {
        fn equal(filter: Option<&str>, value: Option<&str>) -> bool {
            match filter.filter(|f| !f.is_empty()) {
                Some(f) => value.is_some_and(|v| v.eq_ignore_ascii_case(f)),
                None => true,
            }
        }

        fn contains(filter: Option<&str>, value: Option<&str>) -> bool {
            match filter.filter(|f| !f.is_empty()) {
                Some(f) => value.is_some_and(|v| v.to_lowercase().contains(&f.to_lowercase())),
                None => true,
            }
        }

        equal(
            self.id.as_deref(),
            catalog.resource_id().map(ResourceId::as_str),
        ) && equal(self.vcs.map(|v| v.as_str()), catalog.vcs.as_deref())
            && equal(self.kind.as_deref(), catalog.kind.as_deref())
            && equal(self.slug.as_deref(), catalog.slug.as_deref())
            && contains(self.name.as_deref(), Some(catalog.name.as_str()))
            && contains(self.description.as_deref(), catalog.description.as_deref())
            && equal(self.version.as_deref(), catalog.version.as_deref())
    }
}
