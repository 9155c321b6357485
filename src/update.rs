//! Release check against GitHub, cached for a day.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

const UPDATE_URL: &str =
    "https://api.github.com/repos/philipptpunkt/ledger-live-starter/releases/latest";
const UPDATE_TTL: Duration = Duration::from_secs(60 * 60 * 24);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(3);
const UPDATE_CACHE_FILE: &str = "update.json";
pub const NO_UPDATE_ENV: &str = "LEDGER_LIVE_STARTER_NO_UPDATE_CHECK";

const INSTALL_SH: &str = "curl -fsSL https://raw.githubusercontent.com/philipptpunkt/ledger-live-starter/refs/heads/main/scripts/install.sh | bash";
const INSTALL_PS1: &str = "iwr -useb https://raw.githubusercontent.com/philipptpunkt/ledger-live-starter/refs/heads/main/scripts/install.ps1 | iex";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current: String,
    pub latest: String,
}

impl UpdateInfo {
    /// Command that installs the latest release on this OS.
    pub fn install_command(&self) -> &'static str {
        install_command_for(env::consts::OS)
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UpdateCache {
    checked_at: u64,
    latest: String,
}

impl UpdateCache {
    fn load(path: &Path) -> Option<Self> {
        let raw = fs::read(path).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(cache) => Some(cache),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "ignoring corrupt update cache");
                None
            }
        }
    }

    fn fresh_at(&self, now: u64) -> bool {
        now.saturating_sub(self.checked_at) < UPDATE_TTL.as_secs()
    }

    /// Best effort: a cache that cannot be written only costs a lookup next run.
    fn store(&self, path: &Path) {
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(path, serde_json::to_vec(self)?));
        if let Err(err) = written {
            debug!(path = %path.display(), error = %err, "update cache not written");
        }
    }
}

/// `major.minor.patch` of a release tag; a leading `v` and any pre-release
/// or build suffix are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReleaseVersion(u64, u64, u64);

impl ReleaseVersion {
    fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let tag = tag.strip_prefix('v').unwrap_or(tag);
        let core = tag.split(['-', '+']).next()?;
        let mut numbers = core.split('.').map(|part| part.parse::<u64>().ok());
        let version = Self(numbers.next()??, numbers.next()??, numbers.next()??);
        Some(version)
    }
}

impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Returns the newer release, if any. Every failure is treated as "no update".
pub async fn check_for_update() -> Option<UpdateInfo> {
    if update_check_disabled(env::var(NO_UPDATE_ENV).ok().as_deref()) {
        debug!("update check disabled");
        return None;
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    let cache_path = cache_path();
    let cached = cache_path.as_deref().and_then(UpdateCache::load);

    let latest = match cached {
        Some(cache) if cache.fresh_at(now) => {
            debug!(latest = %cache.latest, "using cached release");
            cache.latest
        }
        stale => match fetch_latest_version().await {
            Some(latest) => {
                let cache = UpdateCache {
                    checked_at: now,
                    latest,
                };
                if let Some(path) = cache_path.as_deref() {
                    cache.store(path);
                }
                cache.latest
            }
            None => stale?.latest,
        },
    };

    newer_release(env!("CARGO_PKG_VERSION"), &latest)
}

fn newer_release(current: &str, latest: &str) -> Option<UpdateInfo> {
    let current = ReleaseVersion::parse(current)?;
    let latest = ReleaseVersion::parse(latest)?;
    (latest > current).then(|| UpdateInfo {
        current: current.to_string(),
        latest: latest.to_string(),
    })
}

async fn fetch_latest_version() -> Option<String> {
    let client = reqwest::Client::builder()
        .user_agent(format!("ledger-live-starter/{}", env!("CARGO_PKG_VERSION")))
        .timeout(UPDATE_TIMEOUT)
        .build()
        .ok()?;
    let response = match client
        .get(UPDATE_URL)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, "release lookup failed");
            return None;
        }
    };
    if !response.status().is_success() {
        debug!(status = %response.status(), "release lookup rejected");
        return None;
    }
    let payload: ReleaseResponse = response.json().await.ok()?;
    Some(payload.tag_name)
}

fn update_check_disabled(value: Option<&str>) -> bool {
    value
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn install_command_for(os: &str) -> &'static str {
    if os == "windows" {
        INSTALL_PS1
    } else {
        INSTALL_SH
    }
}

fn cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("ledger-live-starter").join(UPDATE_CACHE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn release_tags_parse_to_three_numbers() {
        assert_eq!(ReleaseVersion::parse("v1.2.3"), Some(ReleaseVersion(1, 2, 3)));
        assert_eq!(ReleaseVersion::parse(" 1.2.3-beta.1 "), Some(ReleaseVersion(1, 2, 3)));
        assert_eq!(ReleaseVersion::parse("1.2.3+build"), Some(ReleaseVersion(1, 2, 3)));
        assert_eq!(ReleaseVersion::parse("v"), None);
        assert_eq!(ReleaseVersion::parse("1.2"), None);
        assert_eq!(ReleaseVersion(0, 10, 0).to_string(), "0.10.0");
    }

    #[test]
    fn compares_numerically_not_lexically() {
        let info = newer_release("0.9.1", "v0.10.0").unwrap();
        assert_eq!(info.latest, "0.10.0");
        assert_eq!(info.current, "0.9.1");
        assert_eq!(newer_release("0.10.0", "v0.9.9"), None);
        assert_eq!(newer_release("1.0.0", "v1.0.0"), None);
        assert_eq!(newer_release("1.0.0", "nightly"), None);
    }

    #[test]
    fn disable_flag_accepts_common_truthy_values() {
        for value in ["1", "true", "YES", "on"] {
            assert!(update_check_disabled(Some(value)), "{value}");
        }
        assert!(!update_check_disabled(Some("0")));
        assert!(!update_check_disabled(None));
    }

    #[test]
    fn install_command_matches_os() {
        assert!(install_command_for("windows").ends_with("| iex"));
        assert!(install_command_for("macos").ends_with("| bash"));
        assert!(install_command_for("linux").contains("install.sh"));
    }

    #[test]
    fn cache_is_stored_and_reloaded() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join(UPDATE_CACHE_FILE);
        UpdateCache {
            checked_at: 42,
            latest: "v1.4.0".into(),
        }
        .store(&path);

        let cache = UpdateCache::load(&path).unwrap();
        assert_eq!(cache.latest, "v1.4.0");
        assert!(cache.fresh_at(42 + UPDATE_TTL.as_secs() - 1));
        assert!(!cache.fresh_at(42 + UPDATE_TTL.as_secs()));
    }

    #[test]
    fn corrupt_cache_is_ignored() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(UPDATE_CACHE_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(UpdateCache::load(&path).is_none());
    }
}
