//! Response language negotiation and status labels.

use crate::api::{AvailabilityKind, ExpiryStatus, ParticipantStatus, PlanStatus, TrainingStatus};
use crate::define_text_enum;
use crate::services::compliance::Code95Status;

define_text_enum!(
    /// Languages the API can label statuses in.
    Language {
        En => "en",
        Nl => "nl",
    }
);

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl Language {
    /// Pick the response language from an explicit `?lang=` value or an
    /// `Accept-Language` header.
    ///
    /// The query parameter wins when it names a supported language. Header
    /// tags are tried in quality order; region subtags are ignored
    /// (`nl-BE` selects Dutch). Falls back to English.
    pub fn negotiate(query: Option<&str>, accept_language: Option<&str>) -> Self {
        if let Some(lang) = query.and_then(Self::from_tag) {
            return lang;
        }
        accept_language
            .and_then(Self::from_accept_language)
            .unwrap_or_default()
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
        primary.parse().ok()
    }

    fn from_accept_language(header: &str) -> Option<Self> {
        let mut tags: Vec<(f32, &str)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() {
                    return None;
                }
                let quality = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((quality, tag))
            })
            .collect();
        // Stable sort keeps header order for equal weights.
        tags.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        tags.into_iter()
            .filter(|(q, _)| *q > 0.0)
            .find_map(|(_, tag)| Self::from_tag(tag))
    }
}

/// A value with a human-readable label per language.
pub trait Localized {
    fn label(&self, lang: Language) -> &'static str;
}

impl Localized for TrainingStatus {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (TrainingStatus::Planned, Language::En) => "Planned",
            (TrainingStatus::Planned, Language::Nl) => "Gepland",
            (TrainingStatus::Confirmed, Language::En) => "Confirmed",
            (TrainingStatus::Confirmed, Language::Nl) => "Bevestigd",
            (TrainingStatus::Cancelled, Language::En) => "Cancelled",
            (TrainingStatus::Cancelled, Language::Nl) => "Geannuleerd",
            (TrainingStatus::Completed, Language::En) => "Completed",
            (TrainingStatus::Completed, Language::Nl) => "Afgerond",
        }
    }
}

impl Localized for ParticipantStatus {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (ParticipantStatus::Enrolled, Language::En) => "Enrolled",
            (ParticipantStatus::Enrolled, Language::Nl) => "Ingeschreven",
            (ParticipantStatus::Attended, Language::En) => "Attended",
            (ParticipantStatus::Attended, Language::Nl) => "Aanwezig",
            (ParticipantStatus::Completed, Language::En) => "Completed",
            (ParticipantStatus::Completed, Language::Nl) => "Afgerond",
            (ParticipantStatus::NoShow, Language::En) => "No show",
            (ParticipantStatus::NoShow, Language::Nl) => "Niet verschenen",
            (ParticipantStatus::Cancelled, Language::En) => "Cancelled",
            (ParticipantStatus::Cancelled, Language::Nl) => "Geannuleerd",
        }
    }
}

impl Localized for ExpiryStatus {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (ExpiryStatus::NoExpiry, Language::En) => "Does not expire",
            (ExpiryStatus::NoExpiry, Language::Nl) => "Verloopt niet",
            (ExpiryStatus::Valid, Language::En) => "Valid",
            (ExpiryStatus::Valid, Language::Nl) => "Geldig",
            (ExpiryStatus::ExpiringSoon, Language::En) => "Expiring soon",
            (ExpiryStatus::ExpiringSoon, Language::Nl) => "Verloopt binnenkort",
            (ExpiryStatus::Expired, Language::En) => "Expired",
            (ExpiryStatus::Expired, Language::Nl) => "Verlopen",
        }
    }
}

impl Localized for Code95Status {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Code95Status::Compliant, Language::En) => "Compliant",
            (Code95Status::Compliant, Language::Nl) => "Voldoet",
            (Code95Status::InProgress, Language::En) => "In progress",
            (Code95Status::InProgress, Language::Nl) => "Bezig",
            (Code95Status::AtRisk, Language::En) => "At risk",
            (Code95Status::AtRisk, Language::Nl) => "Risico",
            (Code95Status::NonCompliant, Language::En) => "Non-compliant",
            (Code95Status::NonCompliant, Language::Nl) => "Voldoet niet",
            (Code95Status::NotApplicable, Language::En) => "Not applicable",
            (Code95Status::NotApplicable, Language::Nl) => "Niet van toepassing",
        }
    }
}

impl Localized for AvailabilityKind {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (AvailabilityKind::Vacation, Language::En) => "Vacation",
            (AvailabilityKind::Vacation, Language::Nl) => "Vakantie",
            (AvailabilityKind::Sick, Language::En) => "Sick",
            (AvailabilityKind::Sick, Language::Nl) => "Ziek",
            (AvailabilityKind::Leave, Language::En) => "Leave",
            (AvailabilityKind::Leave, Language::Nl) => "Verlof",
            (AvailabilityKind::Unavailable, Language::En) => "Unavailable",
            (AvailabilityKind::Unavailable, Language::Nl) => "Niet beschikbaar",
        }
    }
}

impl Localized for PlanStatus {
    fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (PlanStatus::Draft, Language::En) => "Draft",
            (PlanStatus::Draft, Language::Nl) => "Concept",
            (PlanStatus::Finalized, Language::En) => "Finalized",
            (PlanStatus::Finalized, Language::Nl) => "Definitief",
            (PlanStatus::Converted, Language::En) => "Converted",
            (PlanStatus::Converted, Language::Nl) => "Omgezet",
        }
    }
}
