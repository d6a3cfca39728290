//! Classification of submitted codes into workshop entities

mod catalog;
mod http;


pub use catalog::{classify_code, parse_code, CatalogEntry, CatalogResolver};
pub use http::{HttpResolver, RequestClient, ScanResponse};

use crate::error::ResolutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification hint sent along with a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    #[default]
    Auto,
    Job,
    Material,
    Machine,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Auto => "auto",
            ScanType::Job => "job",
            ScanType::Material => "material",
            ScanType::Machine => "machine",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ScanType::Auto),
            "job" => Ok(ScanType::Job),
            "material" => Ok(ScanType::Material),
            "machine" => Ok(ScanType::Machine),
            other => Err(format!("unknown scan type '{}'", other)),
        }
    }
}

/// Kind of entity a code resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Job,
    Material,
    Machine,
    Other,
}

impl EntityType {
    /// Map the server's `type` field; anything unfamiliar is `Other`
    pub fn from_server(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "job" => EntityType::Job,
            "material" => EntityType::Material,
            "machine" => EntityType::Machine,
            _ => EntityType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Job => "Job",
            EntityType::Material => "Material",
            EntityType::Machine => "Machine",
            EntityType::Other => "Item",
        }
    }

    /// Heading shown when a code resolves, e.g. "Job Detected"
    pub fn title(&self) -> String {
        format!("{} Detected", self.label())
    }

    /// Label of the follow-up action, e.g. "View Job Details"
    pub fn action_label(&self) -> String {
        format!("View {} Details", self.label())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A code handed to the resolver, exactly once per decode or manual entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSubmission {
    pub code: String,
    pub scan_type: ScanType,
}

impl ScanSubmission {
    /// Submission for a camera decode, always classified automatically
    pub fn decoded<S: Into<String>>(code: S) -> Self {
        Self {
            code: code.into(),
            scan_type: ScanType::Auto,
        }
    }

    pub fn manual<S: Into<String>>(code: S, scan_type: ScanType) -> Self {
        Self {
            code: code.into(),
            scan_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub entity_type: EntityType,
    pub display_name: String,
    pub display_id: String,
    pub navigate_to: String,
}

/// Outcome of a completed resolver round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Recognized(ResolvedEntity),
    Unrecognized { error_message: String },
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Recognized(_))
    }
}

/// Turns a submitted code into an entity reference.
///
/// Implementations carry no retry policy; the coordinator decides what
/// happens after a failure.
#[async_trait]
pub trait ResultResolver: Send + Sync {
    async fn resolve(&self, submission: &ScanSubmission) -> Result<Resolution, ResolutionError>;
}
