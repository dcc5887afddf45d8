//! Go release versions as used by `goN.M` build tags.

use std::fmt;

/// A Go 1.x release. Only the minor number is significant for build tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GoVersion {
    pub minor: u32,
}

impl GoVersion {
    /// Parse `"1.N"`. A `go` prefix and a patch component are accepted.
    ///
    /// ```
    /// use gogen::config::GoVersion;
    ///
    /// assert_eq!(GoVersion::parse("1.22").unwrap().minor, 22);
    /// assert_eq!(GoVersion::parse("go1.21.5").unwrap().minor, 21);
    /// assert!(GoVersion::parse("2.0").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("go").unwrap_or(trimmed);
        let mut parts = trimmed.split('.');
        let major = parts.next().unwrap_or("");
        let minor = parts.next().unwrap_or("");
        let patch = parts.next();

        if major != "1" {
            return Err(format!("{value:?} is not a Go 1.N version"));
        }
        let minor: u32 = minor
            .parse()
            .map_err(|_| format!("{value:?} has an invalid minor version"))?;
        if let Some(patch) = patch {
            if patch.parse::<u32>().is_err() || parts.next().is_some() {
                return Err(format!("{value:?} has an invalid patch version"));
            }
        }
        Ok(Self { minor })
    }

    /// The `goN.M` release tags this version satisfies, oldest first.
    pub fn release_tags(self) -> impl Iterator<Item = String> {
        (1..=self.minor).map(|minor| format!("go1.{minor}"))
    }

    /// Whether a `go1.N` tag is satisfied.
    pub fn satisfies(self, tag: &str) -> bool {
        tag.strip_prefix("go1.")
            .and_then(|minor| minor.parse::<u32>().ok())
            .is_some_and(|minor| minor >= 1 && minor <= self.minor)
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1.{}", self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_tags_up_to_version() {
        let v = GoVersion::parse("1.3").unwrap();
        let tags: Vec<_> = v.release_tags().collect();
        assert_eq!(tags, vec!["go1.1", "go1.2", "go1.3"]);
        assert!(v.satisfies("go1.3"));
        assert!(!v.satisfies("go1.4"));
        assert!(!v.satisfies("go1.x"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(GoVersion::parse("").is_err());
        assert!(GoVersion::parse("1").is_err());
        assert!(GoVersion::parse("1.x").is_err());
        assert!(GoVersion::parse("1.2.3.4").is_err());
    }
}
