//! Reference catalog of allowed `.zwo` element and attribute names.
//!
//! The catalog is merged from two documents: a tag/attribute usage listing
//! (JSON) and a descriptions file (YAML) whose element and attribute keys
//! extend the allowed sets. It is built once per run and only read after.

use crate::document::{ROOT_ELEMENT, WORKOUT_ELEMENT};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// `tag_attr_usage.json`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UsageDocument {
    #[serde(default)]
    pub elements: Vec<UsageElement>,
    #[serde(default)]
    pub attributes: Vec<UsageAttribute>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UsageElement {
    pub tag: Option<String>,
    pub attributes: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UsageAttribute {
    pub attribute: Option<String>,
}

/// `descriptions.yaml`; only the keys of each map matter
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DescriptionsDocument {
    pub elements: Option<BTreeMap<String, serde_yaml::Value>>,
    pub attributes: Option<BTreeMap<String, serde_yaml::Value>>,
}

/// Allowed names for schema validation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    pub tags: HashSet<String>,
    pub attributes: HashSet<String>,
    /// Per-tag attribute lists; an empty set records no restriction
    pub attributes_by_tag: HashMap<String, HashSet<String>>,
}

impl SchemaCatalog {
    /// Merge the usage listing with the description keys
    pub fn merge(usage: UsageDocument, descriptions: DescriptionsDocument) -> Self {
        let mut tags = HashSet::new();
        let mut attributes_by_tag = HashMap::new();
        for element in usage.elements {
            if let Some(tag) = element.tag {
                let attrs: HashSet<String> =
                    element.attributes.unwrap_or_default().into_iter().collect();
                tags.insert(tag.clone());
                attributes_by_tag.insert(tag, attrs);
            }
        }

        let mut attributes: HashSet<String> = usage
            .attributes
            .into_iter()
            .filter_map(|a| a.attribute)
            .collect();

        tags.extend(descriptions.elements.unwrap_or_default().into_keys());
        attributes.extend(descriptions.attributes.unwrap_or_default().into_keys());

        SchemaCatalog {
            tags,
            attributes,
            attributes_by_tag,
        }
    }

    /// Parse and merge catalog document contents
    pub fn from_strs(usage_json: &str, descriptions_yaml: &str) -> Result<Self> {
        let usage: UsageDocument = serde_json::from_str(usage_json)
            .map_err(|e| Error::Catalog(format!("invalid tag/attribute usage document: {}", e)))?;
        let descriptions: DescriptionsDocument = if descriptions_yaml.trim().is_empty() {
            DescriptionsDocument::default()
        } else {
            serde_yaml::from_str(descriptions_yaml)
                .map_err(|e| Error::Catalog(format!("invalid descriptions document: {}", e)))?
        };
        Ok(Self::merge(usage, descriptions))
    }

    /// Load both catalog files; a missing file is a catalog error
    pub fn load(usage_path: &Path, descriptions_path: &Path) -> Result<Self> {
        let usage = read_catalog_file(usage_path)?;
        let descriptions = read_catalog_file(descriptions_path)?;
        let catalog = Self::from_strs(&usage, &descriptions)?;
        tracing::info!(
            "Loaded catalog: {} elements, {} attributes",
            catalog.tags.len(),
            catalog.attributes.len()
        );
        Ok(catalog)
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn allows_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Recorded attribute list for `tag`, if it is non-empty
    pub fn listed_attributes(&self, tag: &str) -> Option<&HashSet<String>> {
        self.attributes_by_tag.get(tag).filter(|attrs| !attrs.is_empty())
    }

    /// Check the catalog can validate a workout file at all
    ///
    /// Returns a list of problems, or empty Vec if usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.tags.is_empty() {
            errors.push("Catalog lists no elements".to_string());
        }
        if self.attributes.is_empty() {
            errors.push("Catalog lists no attributes".to_string());
        }
        for required in [ROOT_ELEMENT, WORKOUT_ELEMENT] {
            if !self.tags.is_empty() && !self.allows_tag(required) {
                errors.push(format!("Catalog does not allow <{}>", required));
            }
        }

        errors
    }
}

fn read_catalog_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Catalog(format!("missing {}", path.display())));
    }
    Ok(std::fs::read_to_string(path)?)
}
