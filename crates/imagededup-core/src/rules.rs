//! Names of the prioritization rules used to rank duplicate groups.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::ConfigError;

/// A named ranking rule.
///
/// Each rule maps a record to one orderable key; the ranker turns the
/// configured list into a composite sort key. Names are kebab-case; the
/// older `*-file-name` / `*-file-modification-date` spellings are accepted
/// as aliases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(try_from = "String", into = "String")]
pub enum PrioritizationRule {
    HigherPixelCount,
    LowerPixelCount,
    MoreExifData,
    LessExifData,
    BiggerFileSize,
    SmallerFileSize,
    #[strum(to_string = "newer-modification-date", serialize = "newer-file-modification-date")]
    NewerModificationDate,
    #[strum(to_string = "older-modification-date", serialize = "older-file-modification-date")]
    OlderModificationDate,
    SmallerDistance,
    BiggerDistance,
    #[strum(to_string = "contains-copy-in-filename", serialize = "contains-copy-in-file-name")]
    ContainsCopyInFilename,
    #[strum(
        to_string = "doesnt-contain-copy-in-filename",
        serialize = "doesnt-contain-copy-in-file-name"
    )]
    DoesntContainCopyInFilename,
    #[strum(to_string = "longer-filename", serialize = "longer-file-name")]
    LongerFilename,
    #[strum(to_string = "shorter-filename", serialize = "shorter-file-name")]
    ShorterFilename,
    LongerFolderPath,
    ShorterFolderPath,
    HigherScore,
    LowerScore,
}

impl PrioritizationRule {
    /// The default rule order.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::HigherPixelCount,
            Self::MoreExifData,
            Self::BiggerFileSize,
            Self::NewerModificationDate,
            Self::SmallerDistance,
            Self::DoesntContainCopyInFilename,
            Self::LongerFilename,
            Self::ShorterFolderPath,
            Self::HigherScore,
        ]
    }

    /// Parse a single rule name, rejecting unknown names.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        name.trim().parse().map_err(|_| ConfigError::UnknownRule {
            name: name.to_string(),
        })
    }

    /// Parse an ordered list of rule names.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, ConfigError> {
        names.iter().map(|n| Self::parse(n.as_ref())).collect()
    }

    /// All known rule names, for help output.
    pub fn names() -> Vec<String> {
        Self::iter().map(|r| r.to_string()).collect()
    }
}

impl TryFrom<String> for PrioritizationRule {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PrioritizationRule> for String {
    fn from(rule: PrioritizationRule) -> Self {
        rule.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(
            PrioritizationRule::parse("higher-pixel-count").unwrap(),
            PrioritizationRule::HigherPixelCount
        );
        assert_eq!(
            PrioritizationRule::parse("doesnt-contain-copy-in-filename").unwrap(),
            PrioritizationRule::DoesntContainCopyInFilename
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            PrioritizationRule::parse("newer-file-modification-date").unwrap(),
            PrioritizationRule::NewerModificationDate
        );
        assert_eq!(
            PrioritizationRule::parse("longer-file-name").unwrap(),
            PrioritizationRule::LongerFilename
        );
    }

    #[test]
    fn test_parse_unknown_rejected() {
        let err = PrioritizationRule::parse("sharper-image").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { .. }));

        let err = PrioritizationRule::parse_list(&["higher-score", "nope"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { ref name } if name == "nope"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for name in PrioritizationRule::names() {
            let rule = PrioritizationRule::parse(&name).unwrap();
            assert_eq!(rule.to_string(), name);
        }
        assert_eq!(PrioritizationRule::names().len(), 18);
    }
}
