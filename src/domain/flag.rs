use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// The four Brazilian price flags ("bandeiras tarifárias"), a closed set.
///
/// The green flag carries no surcharge; the others add a per-kWh amount on
/// top of the base tariff depending on generation cost conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum TariffFlag {
    #[strum(serialize = "Bandeira Verde")]
    Green,
    #[strum(serialize = "Bandeira Amarela")]
    Yellow,
    #[strum(serialize = "Bandeira Vermelha Patamar 1")]
    RedLevel1,
    #[strum(serialize = "Bandeira Vermelha Patamar 2")]
    RedLevel2,
}

/// Short labels as published in `NomBandeiraAcionada`.
static UPSTREAM_LABELS: Lazy<HashMap<&'static str, TariffFlag>> = Lazy::new(|| {
    HashMap::from([
        ("Verde", TariffFlag::Green),
        ("Amarela", TariffFlag::Yellow),
        ("Vermelha P1", TariffFlag::RedLevel1),
        ("Vermelha P2", TariffFlag::RedLevel2),
    ])
});

impl TariffFlag {
    /// Map the short upstream label onto the closed set, if known.
    pub fn from_upstream(label: &str) -> Option<Self> {
        UPSTREAM_LABELS.get(label).copied()
    }

    /// Canonical label used in the store and the API.
    pub fn label(self) -> String {
        self.to_string()
    }
}

/// An activated-flag label as resolved from upstream: one of the four known
/// flags, or the verbatim upstream string when no mapping exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagLabel {
    Known(TariffFlag),
    Unmapped(String),
}

impl FlagLabel {
    /// Resolve an upstream label; unmapped values pass through unchanged.
    pub fn resolve(upstream: &str) -> Self {
        match TariffFlag::from_upstream(upstream) {
            Some(flag) => Self::Known(flag),
            None => Self::Unmapped(upstream.to_string()),
        }
    }

    pub fn as_flag(&self) -> Option<TariffFlag> {
        match self {
            Self::Known(flag) => Some(*flag),
            Self::Unmapped(_) => None,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, Self::Unmapped(_))
    }
}

impl fmt::Display for FlagLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(flag) => write!(f, "{flag}"),
            Self::Unmapped(raw) => write!(f, "{raw}"),
        }
    }
}

impl Serialize for FlagLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("Verde", TariffFlag::Green)]
    #[case("Amarela", TariffFlag::Yellow)]
    #[case("Vermelha P1", TariffFlag::RedLevel1)]
    #[case("Vermelha P2", TariffFlag::RedLevel2)]
    fn maps_upstream_labels(#[case] upstream: &str, #[case] expected: TariffFlag) {
        assert_eq!(TariffFlag::from_upstream(upstream), Some(expected));
        assert_eq!(FlagLabel::resolve(upstream), FlagLabel::Known(expected));
    }

    #[test]
    fn unmapped_label_passes_through_verbatim() {
        let label = FlagLabel::resolve("Bandeira Roxa");
        assert!(label.is_unmapped());
        assert_eq!(label.to_string(), "Bandeira Roxa");
        assert_eq!(label.as_flag(), None);
    }

    #[test]
    fn canonical_labels_round_trip() {
        use strum::IntoEnumIterator;
        for flag in TariffFlag::iter() {
            assert_eq!(TariffFlag::from_str(&flag.label()), Ok(flag));
        }
    }

    #[test]
    fn green_canonical_label() {
        assert_eq!(TariffFlag::Green.label(), "Bandeira Verde");
    }
}
