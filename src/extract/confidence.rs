//! Metadata completeness scoring
//!
//! The confidence score is the fraction of a fixed checklist the extraction
//! passes. Items that fail are recorded in `missing_fields` so callers can
//! decide whether refinement is worth attempting.

use crate::model::{ExtractedMetadata, MetadataField};
use std::collections::BTreeSet;

/// Number of checklist items
const CHECKLIST_LEN: usize = 7;

/// Apply the completeness checklist, filling in `confidence_score` and
/// `missing_fields` on the metadata in place.
pub fn score(metadata: &mut ExtractedMetadata) {
    let mut missing = BTreeSet::new();
    let mut passed = 0usize;

    if metadata.parties.len() >= 2 {
        passed += 1;
    } else {
        missing.insert(MetadataField::Parties);
    }

    let has_parties = !metadata.parties.is_empty();
    if has_parties && metadata.parties.iter().all(|p| p.address.is_some()) {
        passed += 1;
    } else {
        missing.insert(MetadataField::PartyAddresses);
    }

    if has_parties && metadata.parties.iter().all(|p| p.role.is_some()) {
        passed += 1;
    } else {
        missing.insert(MetadataField::PartyRoles);
    }

    if metadata.effective_date.is_some() {
        passed += 1;
    } else {
        missing.insert(MetadataField::EffectiveDate);
    }

    if metadata.governing_law.is_some() {
        passed += 1;
    } else {
        missing.insert(MetadataField::GoverningLaw);
    }

    if metadata.term_months.is_some() {
        passed += 1;
    } else {
        missing.insert(MetadataField::TermMonths);
    }

    if metadata.is_mutual.is_some() {
        passed += 1;
    } else {
        missing.insert(MetadataField::Mutuality);
    }

    metadata.confidence_score = passed as f32 / CHECKLIST_LEN as f32;
    metadata.missing_fields = missing;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Party, PartyRole};
    use chrono::NaiveDate;

    #[test]
    fn test_empty_metadata_scores_zero() {
        let mut metadata = ExtractedMetadata::default();
        score(&mut metadata);

        assert_eq!(metadata.confidence_score, 0.0);
        assert_eq!(metadata.missing_fields.len(), CHECKLIST_LEN);
    }

    #[test]
    fn test_complete_metadata_scores_one() {
        let party = |name: &str, role| Party {
            name: name.to_string(),
            role: Some(role),
            address: Some("1 Main St".to_string()),
        };
        let mut metadata = ExtractedMetadata {
            parties: vec![
                party("Acme Inc.", PartyRole::Disclosing),
                party("Beta Corp", PartyRole::Receiving),
            ],
            governing_law: Some("State of Delaware".to_string()),
            effective_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            term_months: Some(36),
            survival_months: None,
            is_mutual: Some(true),
            ..Default::default()
        };
        score(&mut metadata);

        assert_eq!(metadata.confidence_score, 1.0);
        assert!(metadata.missing_fields.is_empty());
    }

    #[test]
    fn test_partial_metadata() {
        let mut metadata = ExtractedMetadata {
            parties: vec![Party::named("Acme Inc."), Party::named("Beta Corp")],
            is_mutual: Some(false),
            ..Default::default()
        };
        score(&mut metadata);

        // Passes: >=2 parties, mutuality. Fails the other five.
        assert!((metadata.confidence_score - 2.0 / 7.0).abs() < 1e-6);
        assert!(metadata.missing_fields.contains(&MetadataField::PartyRoles));
        assert!(metadata
            .missing_fields
            .contains(&MetadataField::PartyAddresses));
        assert!(metadata
            .missing_fields
            .contains(&MetadataField::EffectiveDate));
    }

    #[test]
    fn test_no_parties_fails_address_and_role_items() {
        let mut metadata = ExtractedMetadata::default();
        score(&mut metadata);

        assert!(metadata
            .missing_fields
            .contains(&MetadataField::PartyAddresses));
        assert!(metadata.missing_fields.contains(&MetadataField::PartyRoles));
    }
}
