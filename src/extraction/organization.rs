//! Organization identification from caller hints, filenames and notice text.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::dates::NormalizedDate;

/// Number of leading characters treated as the letterhead zone.
pub const HEADER_ZONE_CHARS: usize = 500;

/// Display string for notices that match no known organization.
pub const UNKNOWN_ORGANIZATION: &str = "Unknown Organization";

/// Hints that carry no information about the issuing organization.
const PLACEHOLDER_HINTS: &[&str] = &["unknown", "organization"];

/// Organizations every report must contain, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrganizationId {
    Aau,
    Csir,
    Nhm,
    Ntpc,
    Tanuvas,
}

impl OrganizationId {
    pub const REQUIRED: [OrganizationId; 5] = [
        OrganizationId::Aau,
        OrganizationId::Csir,
        OrganizationId::Nhm,
        OrganizationId::Ntpc,
        OrganizationId::Tanuvas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationId::Aau => "AAU",
            OrganizationId::Csir => "CSIR",
            OrganizationId::Nhm => "NHM",
            OrganizationId::Ntpc => "NTPC",
            OrganizationId::Tanuvas => "TANUVAS",
        }
    }

    /// First required organization whose id occurs in the filename.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        Self::REQUIRED
            .into_iter()
            .find(|id| lower.contains(&id.as_str().to_lowercase()))
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The organization a result is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Organization {
    Known(OrganizationId),
    /// A caller-supplied name that matched no keyword, kept uppercased.
    Named(String),
    Unknown,
}

impl Organization {
    pub fn known_id(&self) -> Option<OrganizationId> {
        match self {
            Organization::Known(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Organization::Known(id) => f.write_str(id.as_str()),
            Organization::Named(name) => f.write_str(name),
            Organization::Unknown => f.write_str(UNKNOWN_ORGANIZATION),
        }
    }
}

impl Serialize for Organization {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Static lookup data: keyword variants per organization and the deadlines
/// already known for the current recruitment cycle.
#[derive(Debug, Clone)]
pub struct OrganizationDirectory {
    keywords: Vec<(String, OrganizationId)>,
    known_deadlines: HashMap<OrganizationId, NormalizedDate>,
}

impl Default for OrganizationDirectory {
    fn default() -> Self {
        use OrganizationId::*;

        let keywords = [
            ("ntpc", Ntpc),
            ("ngel", Ntpc),
            ("green energy", Ntpc),
            ("tanuvas", Tanuvas),
            ("tamil nadu veterinary", Tanuvas),
            ("csir", Csir),
            ("council of scientific", Csir),
            ("nhm", Nhm),
            ("national health mission", Nhm),
            ("aau", Aau),
            ("assam agricultural", Aau),
        ];

        let known_deadlines = [
            (Ntpc, NormalizedDate::from_parts(1, 5, 2025)),
            (Tanuvas, NormalizedDate::from_parts(15, 2, 2025)),
            (Csir, NormalizedDate::from_parts(15, 2, 2025)),
            (Nhm, NormalizedDate::from_parts(31, 1, 2025)),
            (Aau, NormalizedDate::from_parts(31, 1, 2025)),
        ];

        Self {
            keywords: keywords
                .into_iter()
                .map(|(keyword, id)| (keyword.to_string(), id))
                .collect(),
            known_deadlines: known_deadlines.into_iter().collect(),
        }
    }
}

impl OrganizationDirectory {
    /// First keyword, in table order, contained in the already lowercased haystack.
    pub fn match_keyword(&self, haystack_lower: &str) -> Option<OrganizationId> {
        self.keywords
            .iter()
            .find(|(keyword, _)| haystack_lower.contains(keyword.as_str()))
            .map(|(_, id)| *id)
    }

    pub fn known_deadline(&self, organization: &Organization) -> Option<NormalizedDate> {
        organization
            .known_id()
            .and_then(|id| self.known_deadlines.get(&id).copied())
    }
}

/// Maps hints and notice text to an [`Organization`].
#[derive(Debug, Clone)]
pub struct OrganizationResolver {
    directory: Arc<OrganizationDirectory>,
}

impl OrganizationResolver {
    pub fn new(directory: Arc<OrganizationDirectory>) -> Self {
        Self { directory }
    }

    /// Resolves an explicit caller hint alone.
    ///
    /// Returns `None` for blank or placeholder hints. A usable hint that
    /// matches no keyword is kept verbatim (uppercased).
    pub fn resolve_hint(&self, hint: &str) -> Option<Organization> {
        let hint = hint.trim();
        if hint.is_empty() || PLACEHOLDER_HINTS.contains(&hint.to_lowercase().as_str()) {
            return None;
        }

        let upper = hint.to_uppercase();
        Some(
            match self.directory.match_keyword(&upper.to_lowercase()) {
                Some(id) => Organization::Known(id),
                None => Organization::Named(upper),
            },
        )
    }

    /// Full resolution: caller hint, then letterhead zone, then whole body.
    ///
    /// A placeholder hint that nothing else could improve on is returned as
    /// given; only a blank hint yields [`Organization::Unknown`].
    pub fn resolve(&self, text: &str, hint: &str) -> Organization {
        if let Some(organization) = self.resolve_hint(hint) {
            return organization;
        }

        let header_end = text
            .char_indices()
            .nth(HEADER_ZONE_CHARS)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        if let Some(id) = self.directory.match_keyword(&text[..header_end].to_lowercase()) {
            return Organization::Known(id);
        }

        if let Some(id) = self.directory.match_keyword(&text.to_lowercase()) {
            return Organization::Known(id);
        }

        match hint.trim() {
            "" => Organization::Unknown,
            placeholder => Organization::Named(placeholder.to_string()),
        }
    }
}
