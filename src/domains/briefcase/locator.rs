use crate::errors::{ExportResult, ExporterError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

static GUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Fa-f0-9]{8}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{12}")
        .expect("Invalid GUID regex")
});

/// Version of an iModel to materialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "changesetId")]
pub enum ImodelVersion {
    Latest,
    AsOfChangeset(String),
}

impl ImodelVersion {
    /// Changeset id as used in checkpoint URLs.
    pub fn changeset_id(&self) -> &str {
        match self {
            ImodelVersion::Latest => "latest",
            ImodelVersion::AsOfChangeset(id) => id,
        }
    }
}

impl fmt::Display for ImodelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImodelVersion::Latest => write!(f, "latest"),
            ImodelVersion::AsOfChangeset(id) => write!(f, "as of changeset {}", id),
        }
    }
}

/// Project, iModel and changeset addressed by a job's viewer URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefcaseLocator {
    pub project_id: String,
    pub imodel_id: String,
    pub changeset_id: String,
}

impl BriefcaseLocator {
    /// Read `projectid`, `imodelid` and `changesetid` from the query string.
    ///
    /// The whole URL is lower-cased first, so parameter names match in any
    /// case and the ids come back lower-case. A missing parameter is empty.
    pub fn from_url(url: &str) -> ExportResult<Self> {
        let lowered = url.to_lowercase();
        let parsed = Url::parse(&lowered).map_err(|e| ExporterError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut locator = Self {
            project_id: String::new(),
            imodel_id: String::new(),
            changeset_id: String::new(),
        };
        for (key, value) in parsed.query_pairs() {
            let slot = match key.as_ref() {
                "projectid" => &mut locator.project_id,
                "imodelid" => &mut locator.imodel_id,
                "changesetid" => &mut locator.changeset_id,
                _ => continue,
            };
            // First occurrence wins
            if slot.is_empty() {
                *slot = value.into_owned();
            }
        }

        if !GUID_REGEX.is_match(&locator.project_id) || !GUID_REGEX.is_match(&locator.imodel_id) {
            return Err(ExporterError::InvalidUrl(url.to_string()));
        }

        Ok(locator)
    }

    pub fn version(&self) -> ImodelVersion {
        if self.changeset_id.is_empty() {
            ImodelVersion::Latest
        } else {
            ImodelVersion::AsOfChangeset(self.changeset_id.clone())
        }
    }
}
