//! Partial version expansion
//!
//! A configured version such as "6.2" is widened with a trailing wildcard
//! when it has fewer segments than the dependency requires, then matched
//! against the manifest. The highest matching version wins.

use crate::error::{BuildpackError, BuildpackResult};
use semver::Version;
use tracing::debug;

/// Source of known dependency versions
pub trait VersionManifest: Send + Sync {
    /// Every version of `name` the manifest can install
    fn all_versions(&self, name: &str) -> Vec<String>;

    /// The version to use when none is configured
    fn default_version(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Exact(u64),
    Any,
}

/// A dotted version pattern such as `6`, `6.x` or `6.2.1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    segments: Vec<Segment>,
}

impl VersionPattern {
    /// Parse a pattern. Wildcard segments are `x`, `X` or `*`.
    pub fn parse(pattern: &str) -> Option<Self> {
        let segments = pattern
            .trim()
            .trim_start_matches('v')
            .split('.')
            .map(|s| match s {
                "x" | "X" | "*" => Some(Segment::Any),
                _ => s.parse::<u64>().ok().map(Segment::Exact),
            })
            .collect::<Option<Vec<_>>>()?;

        if segments.is_empty() || segments.len() > 3 {
            return None;
        }
        Some(Self { segments })
    }

    /// Whether a release version satisfies the pattern.
    ///
    /// Segments past the end of the pattern match anything after a trailing
    /// wildcard and must be zero otherwise.
    pub fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() {
            return false;
        }

        let trailing_any = matches!(self.segments.last(), Some(Segment::Any));
        let parts = [version.major, version.minor, version.patch];

        parts.iter().enumerate().all(|(i, part)| match self.segments.get(i) {
            Some(Segment::Exact(n)) => n == part,
            Some(Segment::Any) => true,
            None => trailing_any || *part == 0,
        })
    }
}

/// Parse a manifest version leniently: an optional `v` prefix and missing
/// minor/patch components are accepted ("1.5" reads as 1.5.0).
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);

    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().map(str::parse::<u64>).transpose().ok()?.unwrap_or(0);
    let patch = parts.next().map(str::parse::<u64>).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() {
        return None;
    }

    Version::parse(&format!("{major}.{minor}.{patch}{suffix}")).ok()
}

/// Widen `version` with a trailing `.x` when it has fewer than `required_parts` segments
pub fn expand_partial(version: &str, required_parts: usize) -> String {
    if version.split('.').count() < required_parts {
        format!("{version}.x")
    } else {
        version.to_string()
    }
}

/// Pick the highest entry of `available` matching `pattern`, verbatim
pub fn find_matching_version<'a>(pattern: &str, available: &'a [String]) -> Option<&'a str> {
    if let Some(exact) = available.iter().find(|v| v.as_str() == pattern) {
        return Some(exact.as_str());
    }

    let pattern = VersionPattern::parse(pattern)?;
    available
        .iter()
        .filter_map(|raw| parse_lenient(raw).map(|v| (v, raw)))
        .filter(|(v, _)| pattern.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.as_str())
}

/// Resolve the concrete version of `name` to install.
///
/// An empty `configured` version falls back to the manifest default.
pub fn resolve_version(
    manifest: &dyn VersionManifest,
    name: &str,
    configured: &str,
    required_parts: usize,
) -> BuildpackResult<String> {
    let requested = match configured.trim() {
        "" => manifest
            .default_version(name)
            .ok_or_else(|| BuildpackError::VersionNotFound {
                dependency: name.to_string(),
                requested: String::new(),
                reason: "no version configured and manifest declares no default".to_string(),
            })?,
        v => v.to_string(),
    };

    let pattern = expand_partial(&requested, required_parts);
    let available = manifest.all_versions(name);

    match find_matching_version(&pattern, &available) {
        Some(version) => {
            debug!("Resolved {} '{}' to {}", name, pattern, version);
            Ok(version.to_string())
        }
        None => Err(BuildpackError::VersionNotFound {
            dependency: name.to_string(),
            requested: pattern,
            reason: format!("available versions: [{}]", available.join(", ")),
        }),
    }
}
