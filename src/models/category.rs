//! Category model
//!
//! Health categories scored 0-10 by the provider, the visual status bucket
//! used on category cards, and the fixed radar zone bands.

use serde::{Deserialize, Serialize};

/// Icon key for a category. Unknown provider names fall back to Activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IconKey {
    HeartPulse,
    BrainCircuit,
    ShieldCheck,
    Flame,
    Bone,
    Droplets,
    Activity,
    TestTube2,
}

impl IconKey {
    pub fn from_name(name: &str) -> Self {
        match name {
            "HeartPulse" => IconKey::HeartPulse,
            "BrainCircuit" => IconKey::BrainCircuit,
            "ShieldCheck" => IconKey::ShieldCheck,
            "Flame" => IconKey::Flame,
            "Bone" => IconKey::Bone,
            "Droplets" => IconKey::Droplets,
            "TestTube2" => IconKey::TestTube2,
            _ => IconKey::Activity,
        }
    }
}

/// A scored health category.
///
/// `category_name` is an ordered sequence of word tokens; token order is
/// significant and the display/grouping key rejoins them with single spaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_name: Vec<String>,
    pub score: f64,
    pub summary: String,
    #[serde(rename = "iconName", with = "icon_name")]
    pub icon: IconKey,
}

/// Serialize the icon as its provider-facing name string.
mod icon_name {
    use super::IconKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(icon: &IconKey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:?}", icon))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<IconKey, D::Error> {
        let name = String::deserialize(d)?;
        Ok(IconKey::from_name(&name))
    }
}

impl Category {
    /// Display name: tokens rejoined with single spaces
    pub fn display_name(&self) -> String {
        self.category_name.join(" ")
    }

    pub fn status(&self) -> CategoryStatus {
        CategoryStatus::from_score(self.score)
    }
}

/// Visual status bucket for a category card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Good,
    Moderate,
    Bad,
}

impl CategoryStatus {
    /// Card bucket rule: score > 7 is good, score > 4 is moderate, else bad.
    ///
    /// Exactly 4 is bad and exactly 7 is moderate. This differs from the radar
    /// zone band boundaries on purpose; see DESIGN.md before changing either.
    pub fn from_score(score: f64) -> Self {
        if score > 7.0 {
            CategoryStatus::Good
        } else if score > 4.0 {
            CategoryStatus::Moderate
        } else {
            CategoryStatus::Bad
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStatus::Good => "good",
            CategoryStatus::Moderate => "moderate",
            CategoryStatus::Bad => "bad",
        }
    }
}

/// One radar background band on the fixed 0-10 score domain, keyed by its
/// upper bound.
#[derive(Debug, Clone, Copy)]
pub struct ZoneBand {
    pub upper: f64,
    pub status: CategoryStatus,
}

/// Radar zone bands in draw order: largest upper bound first, so the band
/// with the smallest bound paints last and sits visually on top.
pub const ZONE_BANDS: [ZoneBand; 3] = [
    ZoneBand {
        upper: 10.0,
        status: CategoryStatus::Good,
    },
    ZoneBand {
        upper: 7.0,
        status: CategoryStatus::Moderate,
    },
    ZoneBand {
        upper: 4.0,
        status: CategoryStatus::Bad,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_status_boundaries() {
        assert_eq!(CategoryStatus::from_score(4.0), CategoryStatus::Bad);
        assert_eq!(CategoryStatus::from_score(4.01), CategoryStatus::Moderate);
        assert_eq!(CategoryStatus::from_score(7.0), CategoryStatus::Moderate);
        assert_eq!(CategoryStatus::from_score(7.01), CategoryStatus::Good);
    }

    #[test]
    fn test_zone_bands_draw_order_largest_first() {
        assert_eq!(ZONE_BANDS[0].upper, 10.0);
        assert_eq!(ZONE_BANDS[1].upper, 7.0);
        assert_eq!(ZONE_BANDS[2].upper, 4.0);
        // smallest band paints last, on top
        assert_eq!(ZONE_BANDS[2].status, CategoryStatus::Bad);
    }

    #[test]
    fn test_display_name_preserves_token_order() {
        let cat = Category {
            category_name: vec!["Blood".into(), "Sugar".into(), "Control".into()],
            score: 6.5,
            summary: String::new(),
            icon: IconKey::Droplets,
        };
        assert_eq!(cat.display_name(), "Blood Sugar Control");
    }

    #[test]
    fn test_icon_fallback() {
        assert_eq!(IconKey::from_name("HeartPulse"), IconKey::HeartPulse);
        assert_eq!(IconKey::from_name("NoSuchIcon"), IconKey::Activity);
    }
}
