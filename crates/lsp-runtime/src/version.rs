//! npm-style version requirements.
//!
//! Supports the range grammar used by `package.json` `engines` fields:
//!
//! - exact and partial versions: `18.0.0`, `18`, `18.2`
//! - x-ranges: `16.x`, `16.2.*`, `*`
//! - comparators: `>=16.1.1`, `<20`, `>18.2`, `<=18`
//! - tilde and caret: `~18.2.0`, `^18`, `^0.2.3`
//! - inclusive hyphen ranges: `16 - 18`, `16.2 - 18.1.4`
//! - alternatives: `<17 || >=20`
//!
//! Partial versions expand the way npm expands them, so `<=18` accepts every
//! `18.x.y` and `16 - 18` accepts `18.9.9` but rejects `19.0.0`.
//!
//! # Examples
//!
//! ```
//! use lsp_runtime::version::RuntimeRequirement;
//!
//! let requirement = RuntimeRequirement::parse("16.x").unwrap();
//! assert!(requirement.satisfies("16.9.9"));
//! assert!(!requirement.satisfies("17.0.0"));
//!
//! let requirement = RuntimeRequirement::parse("16 - 18").unwrap();
//! assert!(requirement.satisfies("17.3.0"));
//! assert!(!requirement.satisfies("19.0.0"));
//! ```

use regex::Regex;
use semver::{Prerelease, Version};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// A `(major, minor, patch)` triple, as used for minimum runtime versions.
pub type SemanticVersion = (u64, u64, u64);

/// Render a version triple as `major.minor.patch`.
pub fn version_to_string(version: SemanticVersion) -> String {
    format!("{}.{}.{}", version.0, version.1, version.2)
}

static HYPHEN_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s+-\s+(\S+)\s*$").expect("valid hyphen regex"));

static DETACHED_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|~>|>|<|=|~|\^)\s+").expect("valid operator regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: CompareOp,
    version: Version,
}

impl Comparator {
    fn new(op: CompareOp, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            CompareOp::Gte => candidate >= &self.version,
            CompareOp::Gt => candidate > &self.version,
            CompareOp::Lte => candidate <= &self.version,
            CompareOp::Lt => candidate < &self.version,
            CompareOp::Eq => candidate == &self.version,
        }
    }
}

/// Comparators that must all match. An empty set matches any release.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComparatorSet {
    comparators: Vec<Comparator>,
}

impl ComparatorSet {
    fn matches(&self, candidate: &Version) -> bool {
        if !self.comparators.iter().all(|c| c.matches(candidate)) {
            return false;
        }
        if candidate.pre.is_empty() {
            return true;
        }
        // Prereleases only match when a comparator opts into the same release line
        self.comparators.iter().any(|c| {
            !c.version.pre.is_empty()
                && c.version.major == candidate.major
                && c.version.minor == candidate.minor
                && c.version.patch == candidate.patch
        })
    }
}

/// A version with optional (wildcarded) components, e.g. `18`, `18.x`, `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(input: &str) -> std::result::Result<Self, String> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        // Build metadata never affects precedence
        let trimmed = trimmed.split('+').next().unwrap_or("");

        let (core, pre) = match trimmed.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (trimmed, None),
        };

        let mut parts = [None, None, None];
        if !core.is_empty() {
            let components: Vec<&str> = core.split('.').collect();
            if components.len() > 3 {
                return Err(format!("too many components in '{input}'"));
            }
            let mut wildcard_seen = false;
            for (slot, component) in parts.iter_mut().zip(&components) {
                if matches!(*component, "x" | "X" | "*") {
                    wildcard_seen = true;
                    continue;
                }
                if wildcard_seen {
                    return Err(format!("number after wildcard in '{input}'"));
                }
                *slot = Some(
                    component
                        .parse::<u64>()
                        .map_err(|_| format!("invalid version component '{component}'"))?,
                );
            }
        }

        let pre = match pre {
            Some(pre) if parts[2].is_some() => {
                Prerelease::new(pre).map_err(|e| format!("invalid prerelease '{pre}': {e}"))?
            }
            Some(_) => return Err(format!("prerelease on partial version '{input}'")),
            None => Prerelease::EMPTY,
        };

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            pre,
        })
    }

    fn floor(&self) -> Version {
        let mut version = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        version.pre = self.pre.clone();
        version
    }
}

/// `M.m.p-0`, the lowest possible version of a release line.
fn lowest(major: u64, minor: u64, patch: u64) -> Version {
    let mut version = Version::new(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    version
}

/// Matches nothing (`<0.0.0-0`).
fn nothing() -> Vec<Comparator> {
    vec![Comparator::new(CompareOp::Lt, lowest(0, 0, 0))]
}

/// The following release number, or an error at the top of the range.
fn next(component: u64) -> std::result::Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| format!("version component {component} is too large"))
}

/// Expand an operator applied to a partial version into plain comparators.
fn expand(op: &str, partial: &Partial) -> std::result::Result<Vec<Comparator>, String> {
    use CompareOp::*;

    let Partial {
        major, minor, patch, ..
    } = partial;
    let exact = partial.floor();

    let comparators = match (op, *major, *minor, *patch) {
        // Any version
        ("" | "=" | ">=" | "<=" | "~" | "~>" | "^", None, _, _) => Vec::new(),
        (">" | "<", None, _, _) => nothing(),

        ("" | "=", Some(_), Some(_), Some(_)) => vec![Comparator::new(Eq, exact)],
        ("" | "=" | "~" | "~>" | "^", Some(m), None, _) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(next(m)?, 0, 0)),
        ],
        ("" | "=" | "~" | "~>", Some(m), Some(n), None) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(m, next(n)?, 0)),
        ],

        (">=", Some(_), _, _) => vec![Comparator::new(Gte, exact)],
        (">", Some(m), None, _) => vec![Comparator::new(Gte, Version::new(next(m)?, 0, 0))],
        (">", Some(m), Some(n), None) => vec![Comparator::new(Gte, Version::new(m, next(n)?, 0))],
        (">", Some(_), Some(_), Some(_)) => vec![Comparator::new(Gt, exact)],

        ("<", Some(m), None, _) => vec![Comparator::new(Lt, lowest(m, 0, 0))],
        ("<", Some(m), Some(n), None) => vec![Comparator::new(Lt, lowest(m, n, 0))],
        ("<", Some(_), Some(_), Some(_)) => vec![Comparator::new(Lt, exact)],

        ("<=", Some(m), None, _) => vec![Comparator::new(Lt, lowest(next(m)?, 0, 0))],
        ("<=", Some(m), Some(n), None) => vec![Comparator::new(Lt, lowest(m, next(n)?, 0))],
        ("<=", Some(_), Some(_), Some(_)) => vec![Comparator::new(Lte, exact)],

        ("~" | "~>", Some(m), Some(n), Some(_)) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(m, next(n)?, 0)),
        ],

        ("^", Some(0), Some(n), None) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(0, next(n)?, 0)),
        ],
        ("^", Some(m), Some(_), None) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(next(m)?, 0, 0)),
        ],
        ("^", Some(0), Some(0), Some(p)) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(0, 0, next(p)?)),
        ],
        ("^", Some(0), Some(n), Some(_)) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(0, next(n)?, 0)),
        ],
        ("^", Some(m), Some(_), Some(_)) => vec![
            Comparator::new(Gte, exact),
            Comparator::new(Lt, lowest(next(m)?, 0, 0)),
        ],

        _ => nothing(),
    };
    Ok(comparators)
}

/// Split a comparator token like `>=16.1` into its operator and version.
fn split_operator(token: &str) -> (&str, &str) {
    for op in [">=", "<=", "~>", ">", "<", "=", "~", "^"] {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

/// A parsed npm-style version range, checked against concrete runtime versions.
#[derive(Debug, Clone)]
pub struct RuntimeRequirement {
    sets: Vec<ComparatorSet>,
    raw: String,
}

impl RuntimeRequirement {
    /// Parse an npm-style range expression.
    pub fn parse(requirement: &str) -> Result<Self> {
        let parse_error = |reason: String| Error::RequirementParse {
            requirement: requirement.to_string(),
            reason,
        };

        let mut sets = Vec::new();
        for alternative in requirement.split("||") {
            let mut comparators = Vec::new();

            if let Some(captures) = HYPHEN_RANGE.captures(alternative) {
                let lower = Partial::parse(&captures[1]).map_err(parse_error)?;
                let upper = Partial::parse(&captures[2]).map_err(parse_error)?;
                comparators.extend(expand(">=", &lower).map_err(parse_error)?);
                comparators.extend(expand("<=", &upper).map_err(parse_error)?);
            } else {
                let glued = DETACHED_OPERATOR.replace_all(alternative.trim(), "$1");
                for token in glued.split_whitespace() {
                    let (op, version) = split_operator(token);
                    let partial = Partial::parse(version).map_err(parse_error)?;
                    comparators.extend(expand(op, &partial).map_err(parse_error)?);
                }
            }

            sets.push(ComparatorSet { comparators });
        }

        Ok(Self {
            sets,
            raw: requirement.trim().to_string(),
        })
    }

    /// Requirement of at least the given version (`>=major.minor.patch`).
    pub fn at_least(version: SemanticVersion) -> Self {
        let minimum = Version::new(version.0, version.1, version.2);
        Self {
            sets: vec![ComparatorSet {
                comparators: vec![Comparator::new(CompareOp::Gte, minimum)],
            }],
            raw: format!(">={}", version_to_string(version)),
        }
    }

    /// Check a version string such as `18.0.0` or `v18.0.0`.
    ///
    /// Returns `false` if the version string cannot be parsed.
    pub fn satisfies(&self, version: &str) -> bool {
        parse_version(version)
            .map(|v| self.satisfies_version(&v))
            .unwrap_or(false)
    }

    pub fn satisfies_version(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// Return the original requirement string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for RuntimeRequirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RuntimeRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a concrete version as printed by `node --version` (`v22.18.0`).
///
/// Missing minor/patch components default to zero.
pub fn parse_version(input: &str) -> Result<Version> {
    let parse_error = |reason: String| Error::VersionParse {
        input: input.to_string(),
        reason,
    };
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }
    let partial = Partial::parse(trimmed).map_err(parse_error)?;
    if partial.major.is_none() {
        return Err(parse_error("no major version".to_string()));
    }
    Ok(partial.floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("16.x", "16.0.0", true)]
    #[case("16.x", "16.9.9", true)]
    #[case("16.x", "17.0.0", false)]
    #[case("16.x", "15.9.9", false)]
    #[case("16 - 18", "17.3.0", true)]
    #[case("16 - 18", "16.0.0", true)]
    #[case("16 - 18", "18.20.4", true)]
    #[case("16 - 18", "15.9.9", false)]
    #[case("16 - 18", "19.0.0", false)]
    #[case("16.2 - 18.1.4", "18.1.4", true)]
    #[case("16.2 - 18.1.4", "18.1.5", false)]
    #[case("16.2 - 18.1.4", "16.1.9", false)]
    #[case(">=16.1.1", "16.1.1", true)]
    #[case(">=16.1.1", "22.18.0", true)]
    #[case(">=16.1.1", "16.1.0", false)]
    #[case(">= 16", "16.0.0", true)]
    #[case(">16", "16.9.0", false)]
    #[case(">16", "17.0.0", true)]
    #[case(">16.1.1", "16.1.2", true)]
    #[case("<18", "17.99.0", true)]
    #[case("<18", "18.0.0", false)]
    #[case("<=18", "18.9.9", true)]
    #[case("<=18", "19.0.0", false)]
    #[case("18.0.0", "18.0.0", true)]
    #[case("18.0.0", "18.0.1", false)]
    #[case("=18.0.0", "18.0.0", true)]
    #[case("18", "18.5.1", true)]
    #[case("~18.2.0", "18.2.9", true)]
    #[case("~18.2.0", "18.3.0", false)]
    #[case("~18", "18.9.0", true)]
    #[case("^18.2.0", "18.9.0", true)]
    #[case("^18.2.0", "19.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("*", "22.18.0", true)]
    #[case("", "0.0.1", true)]
    #[case(">=14 <16", "15.0.0", true)]
    #[case(">=14 <16", "16.0.0", false)]
    #[case("<14 || >=20", "22.0.0", true)]
    #[case("<14 || >=20", "18.0.0", false)]
    #[case(">=16.0.0", "v18.0.0", true)]
    #[case(">=16.0.0", "v14.0.0", false)]
    fn test_satisfies(#[case] requirement: &str, #[case] version: &str, #[case] expected: bool) {
        let parsed = RuntimeRequirement::parse(requirement).unwrap();
        assert_eq!(
            parsed.satisfies(version),
            expected,
            "{requirement:?} vs {version}"
        );
    }

    #[test]
    fn test_prerelease_excluded_unless_requested() {
        let requirement = RuntimeRequirement::parse(">=18.0.0").unwrap();
        assert!(!requirement.satisfies("23.0.0-nightly"));

        let requirement = RuntimeRequirement::parse(">=23.0.0-rc.1").unwrap();
        assert!(requirement.satisfies("23.0.0-rc.2"));
        assert!(!requirement.satisfies("23.1.0-rc.1"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RuntimeRequirement::parse(">=abc").is_err());
        assert!(RuntimeRequirement::parse("1.x.3").is_err());
        assert!(RuntimeRequirement::parse("1.2.3.4").is_err());
    }

    #[rstest]
    #[case("18446744073709551615.x")]
    #[case("^18446744073709551615.0.0")]
    #[case("~1.18446744073709551615")]
    #[case("1 - 18446744073709551615.x")]
    #[case("^0.0.18446744073709551615")]
    fn test_component_overflow_is_parse_error(#[case] requirement: &str) {
        let err = RuntimeRequirement::parse(requirement).unwrap_err();
        assert!(matches!(err, Error::RequirementParse { .. }), "got {err:?}");
    }

    #[test]
    fn test_at_least() {
        let requirement = RuntimeRequirement::at_least((14, 0, 0));
        assert_eq!(requirement.as_str(), ">=14.0.0");
        assert!(requirement.satisfies("14.0.0"));
        assert!(!requirement.satisfies("12.22.0"));
    }

    #[test]
    fn test_display_keeps_original_text() {
        let requirement: RuntimeRequirement = " 16 - 18 ".parse().unwrap();
        assert_eq!(requirement.to_string(), "16 - 18");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("v22.18.0\n").unwrap(), Version::new(22, 18, 0));
        assert_eq!(parse_version("3.12").unwrap(), Version::new(3, 12, 0));
        assert!(parse_version("not-a-version").is_err());
    }

    #[test]
    fn test_invalid_candidate_never_satisfies() {
        let requirement = RuntimeRequirement::parse("*").unwrap();
        assert!(!requirement.satisfies("garbage"));
    }

    #[test]
    fn test_version_to_string() {
        assert_eq!(version_to_string((16, 1, 1)), "16.1.1");
    }
}
