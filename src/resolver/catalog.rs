use super::{EntityType, Resolution, ResolvedEntity, ResultResolver, ScanSubmission, ScanType};
use crate::error::{ResolutionError, Result};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const EMBEDDED_ID: &str = r"(?:.*/)?((?:J|JOB|M|MAT|MC|MACH)-\d{1,6})(?:/.*)?$";
const BARE_ID: &str = r"((?:J|JOB|M|MAT|MC|MACH)-\d{1,6})";
const JOB_ID: &str = r"^(J|JOB)-\d{1,6}$";
const MATERIAL_ID: &str = r"^(M|MAT)-\d{1,6}$";
const MACHINE_ID: &str = r"^(MC|MACH)-\d{1,6}$";

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| warn!("Invalid code pattern {}: {}", source, e))
            .ok()
    })
    .as_ref()
}

fn is_match(cell: &'static OnceLock<Option<Regex>>, source: &str, code: &str) -> bool {
    pattern(cell, source).is_some_and(|re| re.is_match(code))
}

/// Pull a workshop ID out of a scanned string.
///
/// Codes often carry a URL (`https://host/material/M-12345/`) or extra text
/// around the ID. Returns the input unchanged when no ID can be found.
pub fn parse_code(code: &str) -> String {
    static EMBEDDED: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    for (cell, source) in [(&EMBEDDED, EMBEDDED_ID), (&BARE, BARE_ID)] {
        if let Some(id) = pattern(cell, source)
            .and_then(|re| re.captures(code))
            .and_then(|caps| caps.get(1))
        {
            return id.as_str().to_string();
        }
    }

    code.to_string()
}

/// Classify a parsed ID by its prefix; `None` for anything unrecognised
pub fn classify_code(code: &str) -> Option<EntityType> {
    static JOB: OnceLock<Option<Regex>> = OnceLock::new();
    static MATERIAL: OnceLock<Option<Regex>> = OnceLock::new();
    static MACHINE: OnceLock<Option<Regex>> = OnceLock::new();

    if is_match(&JOB, JOB_ID, code) {
        Some(EntityType::Job)
    } else if is_match(&MATERIAL, MATERIAL_ID, code) {
        Some(EntityType::Material)
    } else if is_match(&MACHINE, MACHINE_ID, code) {
        Some(EntityType::Machine)
    } else {
        None
    }
}

/// One known entity in an offline catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Resolver over an in-memory catalog, following the server's rules
#[derive(Debug, Default, Clone)]
pub struct CatalogResolver {
    entries: HashMap<(EntityType, String), CatalogEntry>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry<I, N>(mut self, entity_type: EntityType, id: I, name: N) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        self.insert(CatalogEntry {
            entity_type,
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        let key = (entry.entity_type, entry.id.to_ascii_uppercase());
        self.entries.insert(key, entry);
    }

    /// Load `[[entries]]` tables from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let file: CatalogFile = toml::from_str(&text).map_err(|e| {
            crate::error::ScannerError::component(
                "catalog".to_string(),
                format!("{}: {}", path.as_ref().display(), e),
            )
        })?;

        let mut catalog = Self::new();
        for entry in file.entries {
            catalog.insert(entry);
        }
        info!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    /// Small built-in catalog for offline demos
    pub fn demo() -> Self {
        Self::new()
            .with_entry(EntityType::Job, "J-42", "Cabinet Build")
            .with_entry(EntityType::Job, "JOB-1001", "Workbench Refit")
            .with_entry(EntityType::Material, "MAT-00231", "Birch Plywood 18mm")
            .with_entry(EntityType::Material, "M-17", "Oak Dowel 8mm")
            .with_entry(EntityType::Machine, "MC-3", "Panel Saw")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, entity_type: EntityType, id: &str) -> Resolution {
        match self.entries.get(&(entity_type, id.to_ascii_uppercase())) {
            Some(entry) => Resolution::Recognized(ResolvedEntity {
                entity_type,
                display_name: entry.name.clone(),
                display_id: entry.id.clone(),
                navigate_to: format!(
                    "/scan/{}/{}/",
                    entity_type.label().to_ascii_lowercase(),
                    entry.id
                ),
            }),
            None => Resolution::Unrecognized {
                error_message: format!(
                    "No {} found with ID {}",
                    entity_type.label().to_ascii_lowercase(),
                    id
                ),
            },
        }
    }
}

#[async_trait]
impl ResultResolver for CatalogResolver {
    async fn resolve(&self, submission: &ScanSubmission) -> std::result::Result<Resolution, ResolutionError> {
        let code = submission.code.trim();
        if code.is_empty() {
            return Ok(Resolution::Unrecognized {
                error_message: "No code provided".to_string(),
            });
        }

        let parsed = parse_code(code);
        let entity_type = match submission.scan_type {
            ScanType::Auto => classify_code(&parsed),
            ScanType::Job => Some(EntityType::Job),
            ScanType::Material => Some(EntityType::Material),
            ScanType::Machine => Some(EntityType::Machine),
        };
        debug!("Catalog parsed '{}' as '{}' ({:?})", code, parsed, entity_type);

        Ok(match entity_type {
            Some(entity_type) => self.lookup(entity_type, &parsed),
            None => Resolution::Unrecognized {
                error_message: "Unknown scan type".to_string(),
            },
        })
    }
}
