//! Attribute reconciliation for matched features.
//!
//! Only the `name` attribute is reconciled: a fully matched candidate without a
//! `ref` and without a name of its own receives the ground truth's name.

use serde_json::{Map, Value};

use crate::{FeatureId, LineFeature};

/// Attribute carrying the road name.
pub const NAME_KEY: &str = "name";

/// Attribute carrying a route reference; its presence blocks renaming.
pub const REF_KEY: &str = "ref";

/// Proposed attribute change for one candidate feature.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    /// Position of the candidate in the tile's filtered candidate list
    pub candidate_index: usize,
    /// Candidate identifier, if it has one
    pub id: Option<FeatureId>,
    /// Only the fields that change
    pub fields: Map<String, Value>,
}

/// Propose an update of `candidate` from a matched `ground_truth` feature.
///
/// Emitted iff the ground truth has a non-empty `name`, the candidate has no
/// `ref` (absent, null or empty string) and the candidate's `name` is empty or
/// absent. The caller is responsible for only asking about MATCHED features.
///
/// # Example
///
/// ```rust
/// use highway_compare::{propose_update, LineFeature};
///
/// let gt = LineFeature::from_coords(Some("gt"), &[(0.0, 0.0), (0.0, 1.0)])
///     .with_property("name", "Main Street");
/// let osm = LineFeature::from_coords(Some("way/7"), &[(0.0, 0.0), (0.0, 1.0)]);
///
/// let update = propose_update(&gt, &osm, 0).unwrap();
/// assert_eq!(update.id.as_deref(), Some("way/7"));
/// assert_eq!(update.fields["name"], "Main Street");
/// ```
pub fn propose_update(
    ground_truth: &LineFeature,
    candidate: &LineFeature,
    candidate_index: usize,
) -> Option<AttributeUpdate> {
    let name = ground_truth.property_str(NAME_KEY).filter(|n| !n.is_empty())?;

    if is_set(candidate.properties.get(REF_KEY)) || is_set(candidate.properties.get(NAME_KEY)) {
        return None;
    }

    let mut fields = Map::new();
    fields.insert(NAME_KEY.to_string(), Value::String(name.to_string()));

    Some(AttributeUpdate { candidate_index, id: candidate.id.clone(), fields })
}

/// An attribute counts as set unless it is missing, null or an empty string.
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str) -> LineFeature {
        LineFeature::from_coords(Some(id), &[(0.0, 0.0), (0.0, 0.01)])
    }

    #[test]
    fn test_proposes_name_for_unnamed_candidate() {
        let gt = line("gt").with_property("name", "Rue Haute");
        let osm = line("osm").with_property("highway", "residential");

        let update = propose_update(&gt, &osm, 3).unwrap();
        assert_eq!(update.candidate_index, 3);
        assert_eq!(update.fields.len(), 1);
        assert_eq!(update.fields["name"], Value::String("Rue Haute".into()));
    }

    #[test]
    fn test_empty_candidate_name_counts_as_absent() {
        let gt = line("gt").with_property("name", "Rue Haute");
        let osm = line("osm").with_property("name", "");
        assert!(propose_update(&gt, &osm, 0).is_some());

        let osm = line("osm").with_property("name", Value::Null);
        assert!(propose_update(&gt, &osm, 0).is_some());
    }

    #[test]
    fn test_no_proposal_when_blocked() {
        let gt = line("gt").with_property("name", "Rue Haute");

        let named = line("osm").with_property("name", "Rue Basse");
        assert!(propose_update(&gt, &named, 0).is_none());

        let with_ref = line("osm").with_property("ref", "N4");
        assert!(propose_update(&gt, &with_ref, 0).is_none());

        let numeric_ref = line("osm").with_property("ref", 4);
        assert!(propose_update(&gt, &numeric_ref, 0).is_none());
    }

    #[test]
    fn test_no_proposal_without_ground_truth_name() {
        let osm = line("osm");
        assert!(propose_update(&line("gt"), &osm, 0).is_none());
        assert!(propose_update(&line("gt").with_property("name", ""), &osm, 0).is_none());
        assert!(propose_update(&line("gt").with_property("name", 12), &osm, 0).is_none());
    }

    #[test]
    fn test_empty_ref_does_not_block() {
        let gt = line("gt").with_property("name", "Rue Haute");
        let osm = line("osm").with_property("ref", "");
        assert!(propose_update(&gt, &osm, 0).is_some());
    }
}
