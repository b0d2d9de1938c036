use super::{MissionError, MissionProfile};

const BUILTIN: &[(&str, &str)] = &[
    ("hyb2-onc-t", include_str!("../../missions/hyb2-onc-t.yaml")),
    ("hyb2-onc-w1", include_str!("../../missions/hyb2-onc-w1.yaml")),
    ("hyb2-onc-w2", include_str!("../../missions/hyb2-onc-w2.yaml")),
    ("orex-ocams", include_str!("../../missions/orex-ocams.yaml")),
    ("rosetta-nac", include_str!("../../missions/rosetta-nac.yaml")),
    ("rosetta-wac", include_str!("../../missions/rosetta-wac.yaml")),
    ("rosetta-navcam", include_str!("../../missions/rosetta-navcam.yaml")),
];

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

pub fn builtin(name: &str) -> Result<MissionProfile, MissionError> {
    let (_, yaml) = BUILTIN
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .ok_or_else(|| MissionError::Unknown(name.to_string()))?;
    MissionProfile::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    #[test]
    fn every_builtin_profile_loads() {
        for name in builtin_names() {
            let profile = builtin(name).unwrap();
            assert_eq!(profile.name, name);
        }
        assert!(matches!(builtin("voyager"), Err(MissionError::Unknown(_))));
    }

    #[test]
    fn onc_t_tables_are_complete() {
        let profile = builtin("hyb2-onc-t").unwrap();
        let eoe = profile.end_of_exposure.unwrap();
        assert_eq!(eoe.name_pattern, "tvf");
        assert_eq!(eoe.ranges.len(), 50);
        assert_eq!(profile.exclude.names.len(), 91);
        assert_eq!(profile.exclude.date_ranges.len(), 18);
        assert!(profile.exclude.names.contains("hyb2_onc_20190307_211244_tvf_l2c"));

        let inside = time::parse_utc("2019-09-01T00:00:00Z").unwrap();
        assert!(profile.exclude.date_ranges.contains(&inside));
    }

    #[test]
    fn rosetta_splits_windows_in_june_2016() {
        let profile = builtin("rosetta-wac").unwrap();
        assert_eq!(profile.windows.len(), 2);
        assert_eq!(profile.target.required_type.as_deref(), Some("COMET"));
        let late = &profile.windows[1];
        assert_eq!(late.name, "late");
        assert_eq!(late.starts_at, time::parse_utc("2016-06-01T00:00:00Z"));
        assert!(!late.resources[0].required);

        assert!(builtin("rosetta-nac").unwrap().target.required_type.is_none());
    }

    #[test]
    fn orex_falls_back_to_camera_heads() {
        let profile = builtin("orex-ocams").unwrap();
        assert_eq!(profile.instruments.frame_for_category(2), Some("ORX_OCAMS_POLYCAM"));
        assert_eq!(profile.instruments.frame_for_code("polycam"), Some("ORX_OCAMS_POLYCAM"));
        assert_eq!(profile.observer, "ORX");
    }
}
