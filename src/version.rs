//! Version strings derived from build metadata
//!
//! A tagged release reports its tag. Anything else gets a pseudo-version of
//! the form `0.0.0-<revision>-<timestamp>`, which sorts by commit time and
//! identifies the commit it was built from.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Module version reported by untagged development builds.
pub const DEVEL_VERSION: &str = "(devel)";

/// Returned when there is nothing to build a version from.
pub const NOT_AVAILABLE: &str = "not available";

pub const REVISION_KEY: &str = "vcs.revision";
pub const TIME_KEY: &str = "vcs.time";

/// Number of revision characters kept in a pseudo-version.
const REVISION_PREFIX_LEN: usize = 12;

/// A single key/value setting recorded at build time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSetting {
    pub key: String,
    pub value: String,
}

/// Metadata describing how the running binary was built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub main_version: String,
    pub settings: Vec<BuildSetting>,
}

impl BuildInfo {
    /// Assemble build info from optional values, as captured by `option_env!`.
    ///
    /// A missing version is recorded as [`DEVEL_VERSION`]; missing or empty
    /// VCS values are left out of the settings.
    #[must_use]
    pub fn from_parts(version: Option<&str>, revision: Option<&str>, time: Option<&str>) -> Self {
        let settings = [(REVISION_KEY, revision), (TIME_KEY, time)]
            .into_iter()
            .filter_map(|(key, value)| {
                value.filter(|v| !v.is_empty()).map(|v| BuildSetting {
                    key: key.to_string(),
                    value: v.to_string(),
                })
            })
            .collect();
        BuildInfo {
            main_version: version
                .filter(|v| !v.is_empty())
                .unwrap_or(DEVEL_VERSION)
                .to_string(),
            settings,
        }
    }

    /// Value of the last setting named `key`.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .rev()
            .find(|s| s.key == key)
            .map(|s| s.value.as_str())
    }
}

/// Capture the [`BuildInfo`] of the crate this macro is expanded in.
///
/// Reads `VERBTREE_MAIN_VERSION`, `VERBTREE_VCS_REVISION` and
/// `VERBTREE_VCS_TIME` at compile time, which a build script sets with
/// [`VcsStamp::emit_cargo_env`](crate::vcs::VcsStamp::emit_cargo_env).
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo::from_parts(
            option_env!("VERBTREE_MAIN_VERSION"),
            option_env!("VERBTREE_VCS_REVISION"),
            option_env!("VERBTREE_VCS_TIME"),
        )
    };
}

/// Display version for a binary built as described by `info`.
#[must_use]
pub fn version(info: &BuildInfo) -> String {
    if !info.main_version.is_empty() && info.main_version != DEVEL_VERSION {
        return info.main_version.clone();
    }

    let revision = info.setting(REVISION_KEY).unwrap_or_default();
    let time = info.setting(TIME_KEY).unwrap_or_default();
    if revision.is_empty() && time.is_empty() {
        return NOT_AVAILABLE.to_string();
    }

    let mut version = String::from("0.0.0");
    if !revision.is_empty() {
        version.push('-');
        version.extend(revision.chars().take(REVISION_PREFIX_LEN));
    }
    if !time.is_empty()
        && let Ok(at) = DateTime::parse_from_rfc3339(time)
    {
        version.push('-');
        version.push_str(&at.format("%Y%m%d%H%M%S").to_string());
    }
    version
}
