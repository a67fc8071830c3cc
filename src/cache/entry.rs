//! Cache entry states

use std::fmt;

/// State of one cached dependency directory during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Found on disk, not yet claimed by this build
    Unreferenced,
    /// Claimed by a dependency installed in this build
    InUse,
    /// Removed from disk during this build
    Deleted,
}

impl CacheState {
    /// Whether the directory is still expected on disk
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreferenced => write!(f, "unreferenced"),
            Self::InUse => write!(f, "in use"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// A cached dependency directory and its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Directory name, `<dependency>-<version>`
    pub dir_name: String,
    pub state: CacheState,
}

/// Whether `dir_name` holds a version of dependency `name`.
///
/// The remainder after `<name>-` must start with a digit so that
/// `kibana-plugins-6.2.2` is not mistaken for a version of `kibana`.
pub fn is_version_of(dir_name: &str, name: &str) -> bool {
    dir_name
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|version| version.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(CacheState::Unreferenced.to_string(), "unreferenced");
        assert_eq!(CacheState::InUse.to_string(), "in use");
        assert_eq!(CacheState::Deleted.to_string(), "deleted");
    }

    #[test]
    fn state_presence() {
        assert!(CacheState::Unreferenced.is_present());
        assert!(CacheState::InUse.is_present());
        assert!(!CacheState::Deleted.is_present());
    }

    #[test]
    fn version_of_same_dependency() {
        assert!(is_version_of("kibana-6.2.1", "kibana"));
        assert!(is_version_of("x-pack-6.2.2", "x-pack"));
    }

    #[test]
    fn version_of_rejects_other_dependencies() {
        assert!(!is_version_of("kibana-plugins-6.2.1", "kibana"));
        assert!(!is_version_of("kibana", "kibana"));
        assert!(!is_version_of("kibana-", "kibana"));
        assert!(!is_version_of("jq-1.5.0", "kibana"));
        assert!(!is_version_of("kibana6.2.1", "kibana"));
    }
}
