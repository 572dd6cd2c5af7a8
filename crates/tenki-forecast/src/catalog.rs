//! Two-level region lookup (center -> prefecture office) built from the
//! provider's area taxonomy.

use std::collections::HashMap;
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::{CatalogError, RegionTaxonomy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Center {
    pub code: String,
    pub name: String,
    pub offices: Vec<Office>,
}

impl Center {
    pub fn office(&self, code: &str) -> Option<&Office> {
        self.offices.iter().find(|o| o.code == code)
    }
}

/// Read-only region catalog. Centers and their offices keep the order in
/// which they first appear in the taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCatalog {
    centers: Vec<Center>,
}

impl RegionCatalog {
    /// Build the catalog from a parsed taxonomy.
    ///
    /// Child office codes with no entry in `offices` are dropped silently.
    pub fn build(taxonomy: &RegionTaxonomy) -> Self {
        let office_names: HashMap<&str, &str> = taxonomy
            .offices
            .iter()
            .map(|(code, entry)| (code.as_str(), entry.name.as_str()))
            .collect();

        let centers = taxonomy
            .centers
            .iter()
            .map(|(code, entry)| {
                let mut offices: Vec<Office> = Vec::with_capacity(entry.children.len());
                for child in &entry.children {
                    let Some(name) = office_names.get(child.as_str()) else {
                        continue;
                    };
                    if offices.iter().any(|o| o.code == *child) {
                        continue;
                    }
                    offices.push(Office {
                        code: child.clone(),
                        name: (*name).to_string(),
                    });
                }
                Center {
                    code: code.clone(),
                    name: entry.name.clone(),
                    offices,
                }
            })
            .collect();

        Self { centers }
    }

    /// Parse a taxonomy document and build the catalog from it.
    ///
    /// # Errors
    /// Returns [`CatalogError::Parse`] if the document is not a valid taxonomy.
    pub fn from_json_str(document: &str) -> Result<Self, CatalogError> {
        let taxonomy: RegionTaxonomy = serde_json::from_str(document)?;
        Ok(Self::build(&taxonomy))
    }

    /// Read a taxonomy file and build the catalog from it.
    ///
    /// # Errors
    /// Returns [`CatalogError::Read`] if the file cannot be read and
    /// [`CatalogError::Parse`] if its contents are not a valid taxonomy.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&document)?;
        tracing::info!(
            "Loaded region catalog from {}: {} centers, {} offices",
            path.display(),
            catalog.len(),
            catalog.office_count()
        );
        Ok(catalog)
    }

    pub fn centers(&self) -> &[Center] {
        &self.centers
    }

    pub fn center(&self, code: &str) -> Option<&Center> {
        self.centers.iter().find(|c| c.code == code)
    }

    /// Offices of a center, or an empty slice for an unknown center.
    pub fn offices_of(&self, center_code: &str) -> &[Office] {
        self.center(center_code)
            .map(|c| c.offices.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn office_count(&self) -> usize {
        self.centers.iter().map(|c| c.offices.len()).sum()
    }
}

// Serialized as `{center: {name, offices: {office: {name}}}}`.

struct NameOnly<'a>(&'a str);

impl Serialize for NameOnly<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("name", self.0)?;
        map.end()
    }
}

struct OfficeMap<'a>(&'a [Office]);

impl Serialize for OfficeMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for office in self.0 {
            map.serialize_entry(&office.code, &NameOnly(&office.name))?;
        }
        map.end()
    }
}

impl Serialize for Center {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("offices", &OfficeMap(&self.offices))?;
        map.end()
    }
}

impl Serialize for RegionCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.centers.len()))?;
        for center in &self.centers {
            map.serialize_entry(&center.code, center)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::io::Write;

    const KANTO: &str = r#"{
        "centers": {
            "010300": {"name": "関東甲信地方", "children": ["130000", "140000", "999999"]},
            "010600": {"name": "近畿地方", "children": ["270000", "260000"]}
        },
        "offices": {
            "130000": {"name": "東京都"},
            "140000": {"name": "神奈川県"},
            "260000": {"name": "京都府"},
            "270000": {"name": "大阪府"}
        }
    }"#;

    #[test]
    fn test_build_end_to_end_example() {
        let catalog = RegionCatalog::from_json_str(
            r#"{"centers":{"C1":{"name":"Kanto","children":["O1","O2"]}},"offices":{"O1":{"name":"Tokyo"}}}"#,
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&catalog).unwrap(),
            serde_json::json!({"C1": {"name": "Kanto", "offices": {"O1": {"name": "Tokyo"}}}})
        );
    }

    #[test]
    fn test_unresolved_children_are_dropped() {
        let catalog = RegionCatalog::from_json_str(KANTO).unwrap();
        let kanto = catalog.center("010300").unwrap();

        assert_eq!(kanto.offices.len(), 2);
        assert!(kanto.office("999999").is_none());
    }

    #[test]
    fn test_every_office_resolves_to_taxonomy() {
        let taxonomy: RegionTaxonomy = serde_json::from_str(KANTO).unwrap();
        let catalog = RegionCatalog::build(&taxonomy);

        for center in catalog.centers() {
            for office in &center.offices {
                let entry = taxonomy.offices.iter().find(|(code, _)| *code == office.code);
                assert_eq!(entry.map(|(_, e)| e.name.as_str()), Some(office.name.as_str()));
            }
        }
    }

    #[test]
    fn test_build_preserves_order_and_is_deterministic() {
        let first = RegionCatalog::from_json_str(KANTO).unwrap();
        let second = RegionCatalog::from_json_str(KANTO).unwrap();
        assert_eq!(first, second);

        let centers: Vec<&str> = first.centers().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(centers, vec!["010300", "010600"]);

        let kinki: Vec<&str> = first.offices_of("010600").iter().map(|o| o.code.as_str()).collect();
        assert_eq!(kinki, vec!["270000", "260000"]);
    }

    #[test]
    fn test_duplicate_child_listed_once() {
        let catalog = RegionCatalog::from_json_str(
            r#"{"centers":{"C":{"name":"c","children":["O","O"]}},"offices":{"O":{"name":"o"}}}"#,
        )
        .unwrap();
        assert_eq!(catalog.office_count(), 1);
    }

    #[test]
    fn test_empty_taxonomy_is_not_an_error() {
        let catalog = RegionCatalog::from_json_str(r#"{"centers":{},"offices":{}}"#).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_taxonomy_is_parse_error() {
        let result = RegionCatalog::from_json_str(r#"{"centers":{"C":{"name":"c"}}}"#);
        assert!(matches!(result, Err(CatalogError::Parse(_))));

        let result = RegionCatalog::from_json_str("not json");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RegionCatalog::load(dir.path().join("area.json"));
        assert!(matches!(result, Err(CatalogError::Read { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KANTO.as_bytes()).unwrap();

        let catalog = RegionCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.office_count(), 4);
    }

    #[test]
    fn test_offices_of_unknown_center_is_empty() {
        let catalog = RegionCatalog::from_json_str(KANTO).unwrap();
        assert!(catalog.offices_of("000000").is_empty());
    }
}
