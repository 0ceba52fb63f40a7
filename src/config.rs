//! Configuration types for icu-tzdata-patch

use crate::error::{Error, Result};
use std::path::PathBuf;
use url::Url;

/// Default timezone database version tag
pub const DEFAULT_TZDATA_VERSION: &str = "2019c";

/// Default ICU major version tag (matches the data bundled with Node.js)
pub const DEFAULT_ICU_VERSION: &str = "44";

/// Default base URL of the icu-data repository's prebuilt timezone resources
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/unicode-org/icu-data/master/tzdata/icunew";

/// The ordered set of resource files a complete timezone patch needs.
///
/// Order is fixed for deterministic runs and readable logs; `icupkg` merges
/// each file independently, so ordering does not affect the result.
pub const REQUIRED_RESOURCES: [&str; 4] = [
    "metaZones.res",
    "timezoneTypes.res",
    "windowsZones.res",
    "zoneinfo64.res",
];

/// Byte-order variant of the resource files to download
///
/// Must match the byte order of the target `.dat` bundle; the icu-data
/// repository publishes both variants side by side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    /// Little-endian (`le`), the variant shipped with Node.js
    #[default]
    Le,
    /// Big-endian (`be`)
    Be,
}

impl Endianness {
    /// The path segment used for this variant in resource URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Endianness::Le => "le",
            Endianness::Be => "be",
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Endianness {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "le" => Ok(Endianness::Le),
            "be" => Ok(Endianness::Be),
            other => Err(format!("invalid endianness '{other}' (expected 'le' or 'be')")),
        }
    }
}

/// One complete patch run: which bundle to mutate and which resource
/// versions to fetch.
///
/// Immutable once constructed; the pipeline only reads it.
#[derive(Clone, Debug)]
pub struct PatchRequest {
    /// Path to the `.dat` bundle being patched. Must exist before the run starts.
    pub target: PathBuf,

    /// Timezone database version tag (e.g. "2019c")
    pub tzdata_version: String,

    /// ICU major version tag (e.g. "44")
    pub icu_version: String,

    /// Byte-order variant of the resources to download
    pub endianness: Endianness,

    /// Directory holding per-resource temp files during the run.
    ///
    /// `None` means the pipeline creates a dedicated temp directory that is
    /// removed when the run finishes.
    pub working_dir: Option<PathBuf>,

    /// Base URL the resource URLs are derived from.
    ///
    /// Defaults to [`DEFAULT_BASE_URL`]; overridable so tests can point the
    /// pipeline at a local server.
    pub base_url: String,
}

impl PatchRequest {
    /// Create a request for `target` with default versions, endianness, and URL
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            tzdata_version: DEFAULT_TZDATA_VERSION.to_string(),
            icu_version: DEFAULT_ICU_VERSION.to_string(),
            endianness: Endianness::default(),
            working_dir: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Derive the download URL for one resource file.
    ///
    /// The layout is fixed by the icu-data repository:
    /// `{base}/{tzdata_version}/{icu_version}/{endianness}/{filename}`.
    pub fn resource_url(&self, filename: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.tzdata_version,
            self.icu_version,
            self.endianness,
            filename
        );
        Url::parse(&raw).map_err(|e| Error::InvalidUrl { raw, source: e })
    }
}
