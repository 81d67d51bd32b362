use std::sync::Arc;

use sightline_oracle::data::loader::{read_observation_log_csv, read_parameter_table_csv};
use sightline_oracle::observe::{NoopObserver, QueryEvent, RecordingObserver};
use sightline_oracle::{
    Catalog, ObjectFilter, ObservationQuery, Oracle, OracleError, ParameterKind, ParameterQuery,
    ParameterValue, ReferenceId, ReferencePolicy,
};

const OBS_LOG: &str = "\
Filename,Object,Order,WaveMin,WaveMax
hd164073_all.fits,HD164073,ALL,5000,5200
hd164073_o1.fits,HD164073,1,5000,5100
hd164073_z.fits,HD164073,Z,5000,5200
x_all.fits,X,ALL,6500,6700
x_o2.fits,X,2,6550,6650
y_all.fits,Y,ALL,3000,4000
y_o7.fits,Y,7,3900,4100
";

const EBV: &str = "\
object,value,reference_id,preferred_flag
HD164073,0.02,1,1
X,0.5,1,1
X,0.9,2,0
Y,0.6,1,1
Y,0.4,2,0
";

const SPTYPE: &str = "\
object,value,reference_id,preferred_flag
HD164073,B3 III,3,1
X,B0.5 III,3,1
Y,O9 V,3,1
Y,B1 V,4,0
";

fn catalog_with(extra_obs: &str) -> Catalog {
    let obs = format!("{OBS_LOG}{extra_obs}");
    Catalog {
        observations: read_observation_log_csv(obs.as_bytes()).unwrap(),
        reddening: read_parameter_table_csv(ParameterKind::Reddening, EBV.as_bytes()).unwrap(),
        spectral_types: read_parameter_table_csv(ParameterKind::SpectralType, SPTYPE.as_bytes())
            .unwrap(),
    }
}

fn oracle() -> Oracle {
    Oracle::new(catalog_with(""))
}

fn names(files: &[&str]) -> Vec<String> {
    files.iter().map(|f| f.to_string()).collect()
}

#[test]
fn unconstrained_query_returns_every_valid_row() {
    let oracle = oracle();
    let files = oracle.filtered_observations(&ObservationQuery::new()).unwrap();

    let expected: Vec<String> = oracle
        .observation_log()
        .records()
        .iter()
        .filter(|r| !r.order.is_excluded())
        .map(|r| r.filename.clone())
        .collect();
    assert_eq!(files, expected);
    assert!(!files.contains(&"hd164073_z.fits".to_string()));
}

#[test]
fn objects_missing_from_parameter_tables_are_dropped() {
    let oracle = Oracle::new(catalog_with("w_o5.fits,W,5,6600,6800\n"));
    let files = oracle.filtered_observations(&ObservationQuery::new()).unwrap();
    assert!(!files.contains(&"w_o5.fits".to_string()));
    assert_eq!(oracle.by_target(Some("W"), false, false).unwrap(), names(&["w_o5.fits"]));
}

#[test]
fn preferred_policy_never_returns_non_preferred_rows() {
    let oracle = oracle();
    for kind in ParameterKind::ALL {
        let rows = oracle
            .filter_parameter_table(&ObjectFilter::NoFilter, kind, &ParameterQuery::default())
            .unwrap();
        let table = oracle.parameter_table(kind);
        for (object, value) in &rows {
            assert!(table
                .records()
                .iter()
                .any(|r| &r.object == object && &r.value == value && r.preferred));
        }
        assert_eq!(rows.len(), table.records().iter().filter(|r| r.preferred).count());
    }
}

#[test]
fn all_references_is_a_superset_of_preferred() {
    let oracle = oracle();
    let objects = ObjectFilter::any_of(["X", "Y"]);
    let preferred = oracle
        .filter_parameter_table(&objects, ParameterKind::Reddening, &ParameterQuery::default())
        .unwrap();
    let all = oracle
        .filter_parameter_table(
            &objects,
            ParameterKind::Reddening,
            &ParameterQuery::default().with_reference(ReferencePolicy::UseAll),
        )
        .unwrap();

    assert!(preferred.iter().all(|row| all.contains(row)));
    assert!(all.len() > preferred.len());
    assert!(all.contains(&("X".to_string(), ParameterValue::Number(0.9))));
}

#[test]
fn reference_policy_and_bounds_are_independent() {
    let oracle = oracle();
    let objects = ObjectFilter::any_of(["X"]);
    let query = ParameterQuery::between(0.2, 0.8);
    let expected = vec![("X".to_string(), ParameterValue::Number(0.5))];

    let preferred = oracle
        .filter_parameter_table(&objects, ParameterKind::Reddening, &query)
        .unwrap();
    assert_eq!(preferred, expected);

    let all = oracle
        .filter_parameter_table(
            &objects,
            ParameterKind::Reddening,
            &query.with_reference(ReferencePolicy::UseAll),
        )
        .unwrap();
    assert_eq!(all, expected);
}

#[test]
fn explicit_reference_outside_known_domain_matches_nothing() {
    let oracle = oracle();
    let query = ParameterQuery::default()
        .with_reference(ReferencePolicy::UseReference(ReferenceId::from(3)));
    let rows = oracle
        .filter_parameter_table(&ObjectFilter::NoFilter, ParameterKind::Reddening, &query)
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn objects_must_satisfy_both_parameter_families() {
    let oracle = oracle();
    // E(B-V) > 0.45 keeps X and Y; B-type spectral class keeps HD164073 and X.
    let query = ObservationQuery::new()
        .reddening(ParameterQuery::above(0.45))
        .spectral_type(ParameterQuery::between("B", "C"));
    let files = oracle.filtered_observations(&query).unwrap();
    assert_eq!(files, names(&["x_all.fits", "x_o2.fits"]));
}

#[test]
fn alternative_reference_changes_surviving_objects() {
    let oracle = oracle();
    // Y's second spectral-type reference classifies it as B1 V.
    let query = ObservationQuery::new()
        .spectral_type(
            ParameterQuery::between("B", "C")
                .with_reference(ReferencePolicy::UseReference(ReferenceId::from(4))),
        )
        .merged_only();
    assert_eq!(oracle.filtered_observations(&query).unwrap(), names(&["y_all.fits"]));
}

#[test]
fn merged_wins_when_both_order_flags_are_set() {
    let recorder = Arc::new(RecordingObserver::new());
    let oracle = oracle().with_observer(recorder.clone());

    let both = oracle
        .filtered_observations(&ObservationQuery::new().merged_only().orders_only())
        .unwrap();
    assert!(recorder.events().contains(&QueryEvent::OrderConflict));

    recorder.clear();
    let merged = oracle
        .filtered_observations(&ObservationQuery::new().merged_only())
        .unwrap();
    assert!(!recorder.events().contains(&QueryEvent::OrderConflict));

    assert_eq!(both, merged);
    assert_eq!(merged, names(&["hd164073_all.fits", "x_all.fits", "y_all.fits"]));
}

#[test]
fn wavelength_query_matches_strict_coverage() {
    let oracle = oracle();
    for wave in [3950.0, 5050.0, 5150.0, 6600.0, 5000.0] {
        let files = oracle.by_wavelength(Some(wave), false, false).unwrap();
        let expected: Vec<String> = oracle
            .observation_log()
            .records()
            .iter()
            .filter(|r| !r.order.is_excluded() && r.wave_min < wave && wave < r.wave_max)
            .map(|r| r.filename.clone())
            .collect();
        assert_eq!(files, expected, "wave {wave}");
    }
}

#[test]
fn merged_and_order_scenario() {
    let oracle = oracle();
    assert_eq!(
        oracle.by_wavelength(Some(5150.0), true, false).unwrap(),
        names(&["hd164073_all.fits"])
    );
    assert_eq!(
        oracle.by_target(Some("HD164073"), false, true).unwrap(),
        names(&["hd164073_o1.fits"])
    );
}

#[test]
fn default_target_and_wave_are_used_when_omitted() {
    let oracle = oracle();
    assert_eq!(
        oracle.by_target(None, false, false).unwrap(),
        names(&["hd164073_all.fits", "hd164073_o1.fits"])
    );
    // 5000 Å sits on the edge of the HD164073 files, so nothing covers it strictly.
    assert!(oracle.by_wavelength(None, false, false).unwrap().is_empty());
}

#[test]
fn wave_window_selects_overlapping_observations() {
    let oracle = oracle();
    let query = ObservationQuery::new().wave_range(Some(4050.0), Some(5020.0));
    assert_eq!(
        oracle.filtered_observations(&query).unwrap(),
        names(&["hd164073_all.fits", "hd164073_o1.fits", "y_o7.fits"])
    );
}

#[test]
fn object_list_and_point_wave_combine() {
    let oracle = oracle();
    let query = ObservationQuery::new()
        .objects(ObjectFilter::any_of(["X", "Y"]))
        .wave(6600.0)
        .orders_only();
    assert_eq!(oracle.filtered_observations(&query).unwrap(), names(&["x_o2.fits"]));
}

#[test]
fn single_object_name_fails_fast() {
    let oracle = oracle();
    let query = ObservationQuery::new().objects(ObjectFilter::exactly("X"));
    match oracle.filtered_observations(&query) {
        Err(OracleError::InvalidArgument { parameter, reason }) => {
            assert_eq!(parameter, "objects");
            assert!(reason.contains("single name"), "{reason}");
        }
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn zero_value_bounds_are_applied() {
    let ebv = "object,value,reference_id,preferred_flag\nA,-0.1,1,1\nB,0.3,1,1\n";
    let mut catalog = catalog_with("");
    catalog.reddening =
        read_parameter_table_csv(ParameterKind::Reddening, ebv.as_bytes()).unwrap();
    let oracle = Oracle::new(catalog);

    let above = oracle
        .filter_parameter_table(
            &ObjectFilter::NoFilter,
            ParameterKind::Reddening,
            &ParameterQuery::above(0.0),
        )
        .unwrap();
    assert_eq!(above, vec![("B".to_string(), ParameterValue::Number(0.3))]);

    let below = oracle
        .filter_parameter_table(
            &ObjectFilter::NoFilter,
            ParameterKind::Reddening,
            &ParameterQuery::below(0.0),
        )
        .unwrap();
    assert_eq!(below, vec![("A".to_string(), ParameterValue::Number(-0.1))]);
}

#[test]
fn zero_wavelength_constraints_are_applied() {
    let oracle = Oracle::new(catalog_with("neg_o3.fits,X,3,-10,0\ncross_o4.fits,X,4,-10,5\n"));

    assert_eq!(
        oracle.by_wavelength(Some(0.0), false, false).unwrap(),
        names(&["cross_o4.fits"])
    );

    let above_zero = oracle
        .filtered_observations(&ObservationQuery::new().wave_range(Some(0.0), None))
        .unwrap();
    assert!(above_zero.contains(&"cross_o4.fits".to_string()));
    assert!(!above_zero.contains(&"neg_o3.fits".to_string()));

    let below_zero = oracle
        .filtered_observations(&ObservationQuery::new().wave_range(None, Some(0.0)))
        .unwrap();
    assert_eq!(below_zero, names(&["neg_o3.fits", "cross_o4.fits"]));
}

#[test]
fn silent_observer_does_not_change_results() {
    let query = ObservationQuery::new()
        .reddening(ParameterQuery::above(0.45))
        .merged_only()
        .orders_only();
    let silent = oracle().with_observer(Arc::new(NoopObserver));
    assert_eq!(
        silent.filtered_observations(&query).unwrap(),
        oracle().filtered_observations(&query).unwrap()
    );
    let table = silent.parameter_table(ParameterKind::SpectralType);
    assert_eq!(table.kind(), ParameterKind::SpectralType);
}

#[test]
fn nan_wavelength_is_rejected() {
    let oracle = oracle();
    let err = oracle.by_wavelength(Some(f64::NAN), false, false).unwrap_err();
    assert!(matches!(err, OracleError::InvalidArgument { parameter: "wave", .. }));
}

#[test]
fn repeated_queries_are_stable() {
    let oracle = oracle();
    let query = ObservationQuery::new()
        .reddening(ParameterQuery::below(1.0).with_reference(ReferencePolicy::UseAll))
        .wave_range(Some(3000.0), None);
    let first = oracle.filtered_observations(&query).unwrap();
    for _ in 0..3 {
        assert_eq!(oracle.filtered_observations(&query).unwrap(), first);
    }
}

#[test]
fn match_counts_are_reported_per_table() {
    let recorder = Arc::new(RecordingObserver::new());
    let oracle = oracle().with_observer(recorder.clone());
    oracle
        .filtered_observations(&ObservationQuery::new().reddening(ParameterQuery::above(0.45)))
        .unwrap();

    let events = recorder.events();
    let kinds: Vec<ParameterKind> = events
        .iter()
        .filter_map(|e| match e {
            QueryEvent::ParameterMatches(kind, _) => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ParameterKind::Reddening, ParameterKind::SpectralType]);
    assert!(events.contains(&QueryEvent::CommonObjects(vec!["X".to_string(), "Y".to_string()])));
    assert!(events.contains(&QueryEvent::ObservationsSelected(4)));
}
