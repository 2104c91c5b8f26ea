use serde::{Deserialize, Serialize};

// ── Listing ───────────────────────────────────────────────────────────────────

/// One accepted giveaway. Field names on the wire match the original API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Listing {
    #[serde(rename = "ExpirationDate")]
    pub expiration_date: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "ImageURL")]
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub items: Vec<Listing>,
}

// ── Eligibility regions ───────────────────────────────────────────────────────

/// Lowercase tokens substring-matched against the "OPEN TO:" text.
pub const ELIGIBLE_REGIONS: [&str; 4] = ["worldwide", "us", "north america", "everywhere"];

// ── Raw per-container fields ──────────────────────────────────────────────────

/// Fields accumulated while scanning one `.inside-article` container.
///
/// Starts ineligible and expired; only positive evidence flips either flag.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFieldBundle {
    pub is_eligible: bool,
    pub is_expired: bool,
    pub link: String,
    pub expires: String,
    pub image_url: String,
    pub title: String,
}

impl Default for RawFieldBundle {
    fn default() -> Self {
        Self {
            is_eligible: false,
            is_expired: true,
            link: String::new(),
            expires: String::new(),
            image_url: String::new(),
            title: String::new(),
        }
    }
}
