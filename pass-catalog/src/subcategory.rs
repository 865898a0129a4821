use serde::{Deserialize, Serialize};

/// How bookings of a subcategory are reimbursed to the offerer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReimbursementRuleChoice {
    NotReimbursed,
    Standard,
    Book,
}

pub const ABO_PLATEFORME_VIDEO: &str = "ABO_PLATEFORME_VIDEO";
pub const CINE_VENTE_DISTANCE: &str = "CINE_VENTE_DISTANCE";
pub const FESTIVAL_CINE: &str = "FESTIVAL_CINE";
pub const LIVRE_NUMERIQUE: &str = "LIVRE_NUMERIQUE";
pub const LIVRE_PAPIER: &str = "LIVRE_PAPIER";
pub const MUSEE_VENTE_DISTANCE: &str = "MUSEE_VENTE_DISTANCE";
pub const SEANCE_CINE: &str = "SEANCE_CINE";
pub const SPECTACLE_REPRESENTATION: &str = "SPECTACLE_REPRESENTATION";
pub const SUPPORT_PHYSIQUE_FILM: &str = "SUPPORT_PHYSIQUE_FILM";
pub const VOD: &str = "VOD";

const KNOWN_SUBCATEGORIES: &[(&str, ReimbursementRuleChoice)] = &[
    (ABO_PLATEFORME_VIDEO, ReimbursementRuleChoice::NotReimbursed),
    (CINE_VENTE_DISTANCE, ReimbursementRuleChoice::Standard),
    (FESTIVAL_CINE, ReimbursementRuleChoice::Standard),
    (LIVRE_NUMERIQUE, ReimbursementRuleChoice::Book),
    (LIVRE_PAPIER, ReimbursementRuleChoice::Book),
    (MUSEE_VENTE_DISTANCE, ReimbursementRuleChoice::Standard),
    (SEANCE_CINE, ReimbursementRuleChoice::Standard),
    (SPECTACLE_REPRESENTATION, ReimbursementRuleChoice::Standard),
    (SUPPORT_PHYSIQUE_FILM, ReimbursementRuleChoice::Standard),
    (VOD, ReimbursementRuleChoice::NotReimbursed),
];

/// Offer subcategory, reduced to what reimbursement needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subcategory {
    pub id: String,
    pub reimbursement_rule: ReimbursementRuleChoice,
}

impl Subcategory {
    pub fn new(id: impl Into<String>, reimbursement_rule: ReimbursementRuleChoice) -> Self {
        Self {
            id: id.into(),
            reimbursement_rule,
        }
    }

    /// Look up one of the subcategories the engine knows about.
    pub fn from_id(id: &str) -> Option<Self> {
        KNOWN_SUBCATEGORIES
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(known, rule)| Self::new(*known, *rule))
    }
}
