use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Period during which a venue's revenue is tracked under a pricing point.
/// The start is inclusive, the end exclusive and optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingPointLink {
    pub pricing_point_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl PricingPointLink {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && self.end.map_or(true, |end| timestamp < end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Venue {
    pub id: Uuid,
    #[serde(default)]
    pub pricing_point_links: Vec<PricingPointLink>,
}

impl Venue {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            pricing_point_links: Vec::new(),
        }
    }

    /// A venue that is its own pricing point since `start`.
    pub fn self_priced(id: Uuid, start: DateTime<Utc>) -> Self {
        Self {
            id,
            pricing_point_links: vec![PricingPointLink {
                pricing_point_id: id,
                start,
                end: None,
            }],
        }
    }

    pub fn current_pricing_point_id(&self) -> Option<Uuid> {
        self.pricing_point_links
            .iter()
            .find(|link| link.end.is_none())
            .map(|link| link.pricing_point_id)
    }

    /// Return the link to use for something that happened at `timestamp`.
    ///
    /// A link active at that time wins. Failing that, a single open-ended
    /// link that starts later is accepted. Anything else is ambiguous.
    pub fn pricing_point_link_at(&self, timestamp: DateTime<Utc>) -> Result<&PricingPointLink, VenueError> {
        if let Some(link) = self.pricing_point_links.iter().find(|link| link.contains(timestamp)) {
            return Ok(link);
        }

        let links_after: Vec<&PricingPointLink> = self
            .pricing_point_links
            .iter()
            .filter(|link| timestamp < link.start)
            .collect();
        match links_after.as_slice() {
            [only] if only.end.is_none() => Ok(only),
            _ => Err(VenueError::NoPricingPoint(self.id.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VenueError {
    #[error("Could not find pricing point for venue {0}")]
    NoPricingPoint(String),
}
