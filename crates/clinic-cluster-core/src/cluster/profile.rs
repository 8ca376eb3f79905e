//! Per-cluster population summaries for dashboards.

use serde::{Deserialize, Serialize};

use super::features::{AgeGroup, DiseaseCatalog, FeatureVector, RoleCode};
use crate::models::DiseaseId;

/// Case count of one disease inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseCount {
    pub disease_id: DiseaseId,
    pub cases: usize,
}

/// Summary of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub label: usize,
    pub size: usize,
    /// Fraction of all clustered consultations
    pub share: f64,
    /// Member counts indexed by [`AgeGroup::code`]
    pub age_groups: [usize; 5],
    /// Member counts indexed by [`RoleCode::code`]
    pub roles: [usize; 4],
    /// Diseases present, most cases first, ties by ascending ID
    pub diseases: Vec<DiseaseCount>,
}

impl ClusterProfile {
    /// Most common age group; ties go to the younger group.
    pub fn dominant_age_group(&self) -> Option<AgeGroup> {
        dominant(&self.age_groups).and_then(AgeGroup::from_code)
    }

    /// Most common role; ties go to the lower code.
    pub fn dominant_role(&self) -> Option<RoleCode> {
        dominant(&self.roles).and_then(RoleCode::from_code)
    }
}

fn dominant(counts: &[usize]) -> Option<usize> {
    let (index, &count) = counts
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
    (count > 0).then_some(index)
}

/// Build one profile per group; `groups[label]` holds that cluster's vectors.
pub fn build_profiles(groups: &[Vec<FeatureVector>], catalog: &DiseaseCatalog) -> Vec<ClusterProfile> {
    let total: usize = groups.iter().map(Vec::len).sum();

    groups
        .iter()
        .enumerate()
        .map(|(label, members)| {
            let mut age_groups = [0usize; 5];
            let mut roles = [0usize; 4];
            let mut cases = vec![0usize; catalog.len()];

            for vector in members {
                if let Some(group) = vector.age_group() {
                    age_groups[group.code()] += 1;
                }
                if let Some(role) = vector.role() {
                    roles[role.code()] += 1;
                }
                for (count, flag) in cases.iter_mut().zip(vector.disease_flags()) {
                    if *flag > 0.0 {
                        *count += 1;
                    }
                }
            }

            let mut diseases: Vec<DiseaseCount> = catalog
                .ids()
                .iter()
                .zip(cases)
                .filter(|(_, cases)| *cases > 0)
                .map(|(&disease_id, cases)| DiseaseCount { disease_id, cases })
                .collect();
            diseases.sort_by(|a, b| b.cases.cmp(&a.cases).then(a.disease_id.cmp(&b.disease_id)));

            ClusterProfile {
                label,
                size: members.len(),
                share: if total == 0 {
                    0.0
                } else {
                    members.len() as f64 / total as f64
                },
                age_groups,
                roles,
                diseases,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f64]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    #[test]
    fn test_profiles_count_members() {
        let catalog = DiseaseCatalog::new(vec![10, 20, 30]);
        let groups = vec![
            vec![v(&[1.0, 0.0, 1.0, 0.0, 1.0]), v(&[1.0, 0.0, 1.0, 0.0, 0.0])],
            vec![v(&[4.0, 2.0, 0.0, 1.0, 0.0])],
        ];

        let profiles = build_profiles(&groups, &catalog);
        assert_eq!(profiles.len(), 2);

        let students = &profiles[0];
        assert_eq!(students.size, 2);
        assert!((students.share - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(students.age_groups, [0, 2, 0, 0, 0]);
        assert_eq!(students.roles, [2, 0, 0, 0]);
        assert_eq!(
            students.diseases,
            vec![
                DiseaseCount { disease_id: 10, cases: 2 },
                DiseaseCount { disease_id: 30, cases: 1 },
            ]
        );
        assert_eq!(students.dominant_age_group(), Some(AgeGroup::YoungAdult));
        assert_eq!(students.dominant_role(), Some(RoleCode::Student));

        let staff = &profiles[1];
        assert_eq!(staff.dominant_age_group(), Some(AgeGroup::Senior));
        assert_eq!(staff.dominant_role(), Some(RoleCode::Staff));
        assert_eq!(staff.diseases, vec![DiseaseCount { disease_id: 20, cases: 1 }]);
    }

    #[test]
    fn test_disease_ties_sorted_by_id() {
        let catalog = DiseaseCatalog::new(vec![1, 2]);
        let groups = vec![vec![v(&[0.0, 3.0, 1.0, 1.0])]];
        let profile = &build_profiles(&groups, &catalog)[0];
        let ids: Vec<_> = profile.diseases.iter().map(|d| d.disease_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_group() {
        let catalog = DiseaseCatalog::new(vec![1]);
        let profile = &build_profiles(&[Vec::new()], &catalog)[0];
        assert_eq!(profile.size, 0);
        assert_eq!(profile.share, 0.0);
        assert_eq!(profile.dominant_role(), None);
        assert!(profile.diseases.is_empty());
    }

    #[test]
    fn test_profile_serializes() {
        let catalog = DiseaseCatalog::new(vec![1]);
        let profiles = build_profiles(&[vec![v(&[2.0, 1.0, 1.0])]], &catalog);
        let json = serde_json::to_value(&profiles).unwrap();
        assert_eq!(json[0]["size"], 1);
        assert_eq!(json[0]["diseases"][0]["disease_id"], 1);
    }
}
