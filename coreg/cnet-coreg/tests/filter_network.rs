use cnet_coreg::{CoregConfig, Error, count_ignored, filter_network};
use test_log::test;

mod common;
use common::{CopyConverter, FailingConverter, NETWORK, entries, joined_network, stats_table, write};

#[test]
fn outlier_point_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let stats = write(dir.path(), "coreg.csv", &stats_table(true));
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    assert_eq!(count_ignored(&network).unwrap(), 1);
    let outcome = filter_network(
        &network,
        &stats,
        &out_dir.join("final.filtered"),
        &CoregConfig::default(),
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.flagged_rows, 1);
    assert_eq!(outcome.ignored_points, 1);

    let outputs = outcome.outputs.unwrap();
    assert_eq!(outputs.pvl, out_dir.join("final.filtered.pvl"));
    assert_eq!(
        entries(&out_dir),
        vec!["final.filtered.net", "final.filtered.pvl"]
    );
    let expected = joined_network().replacen(
        "  Object = ControlPoint\n",
        "  Object = ControlPoint\n    Ignore = True\n",
        1,
    );
    assert_eq!(std::fs::read_to_string(&outputs.pvl).unwrap(), expected);
    assert_eq!(count_ignored(&outputs.pvl).unwrap(), 2);

    // the input network is never modified
    assert_eq!(std::fs::read_to_string(&network).unwrap(), NETWORK);
    // the statistics table records the flagged row
    let table = std::fs::read_to_string(&stats).unwrap();
    assert!(table.lines().next().unwrap().ends_with(",Filtered"));
    assert!(table.lines().last().unwrap().ends_with(",1"));
}

#[test]
fn filtering_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let stats = write(dir.path(), "coreg.csv", &stats_table(true));
    let cfg = CoregConfig::default();

    let first = filter_network(&network, &stats, &dir.path().join("first"), &cfg, &CopyConverter)
        .unwrap()
        .outputs
        .unwrap();
    let second = filter_network(&first.pvl, &stats, &dir.path().join("second"), &cfg, &CopyConverter)
        .unwrap();
    assert_eq!(second.flagged_rows, 1);
    assert_eq!(second.ignored_points, 0);
    assert_eq!(
        std::fs::read_to_string(second.outputs.unwrap().pvl).unwrap(),
        std::fs::read_to_string(&first.pvl).unwrap()
    );
}

#[test]
fn too_few_rows_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let stats = write(
        dir.path(),
        "coreg.csv",
        "SampleDifference,LineDifference\n0.1,0.1\n50.0,50.0\n",
    );

    let outcome = filter_network(
        &network,
        &stats,
        &dir.path().join("final.filtered"),
        &CoregConfig::default(),
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.flagged_rows, 0);
    assert_eq!(outcome.ignored_points, 0);
    assert!(outcome.outputs.is_none());
    assert_eq!(std::fs::read_to_string(&network).unwrap(), NETWORK);
    assert_eq!(entries(dir.path()), vec!["coreg.csv", "coreg.pvl"]);
}

#[test]
fn flagged_row_of_another_measure_ignores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let table = stats_table(true).replace("1.5,-0.75,0.5", "1.5,-0.7601,0.5");
    let stats = write(dir.path(), "coreg.csv", &table);

    let outcome = filter_network(
        &network,
        &stats,
        &dir.path().join("final.filtered"),
        &CoregConfig::default(),
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.flagged_rows, 1);
    assert_eq!(outcome.ignored_points, 0);
    assert_eq!(
        std::fs::read_to_string(outcome.outputs.unwrap().pvl).unwrap(),
        joined_network()
    );
}

#[test]
fn matching_tolerance_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let table = stats_table(true).replace("1.5,-0.75,0.5", "1.5,-0.7601,0.5");
    let stats = write(dir.path(), "coreg.csv", &table);
    let cfg = CoregConfig::from_toml_str("[matching]\nabs_tol = 0.02\n").unwrap();

    let outcome = filter_network(
        &network,
        &stats,
        &dir.path().join("final.filtered"),
        cfg.valid(),
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.ignored_points, 1);
}

#[test]
fn conversion_failure_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let stats = write(dir.path(), "coreg.csv", &stats_table(true));
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let err = filter_network(
        &network,
        &stats,
        &out_dir.join("final.filtered"),
        &CoregConfig::default(),
        &FailingConverter,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Conversion { ref name, .. } if name == "final.filtered"));
    assert!(entries(&out_dir).is_empty());
}

#[test]
fn unterminated_point_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let truncated = &NETWORK[..NETWORK.find("  End_Object").unwrap()];
    let network = write(dir.path(), "coreg.pvl", truncated);
    let stats = write(dir.path(), "coreg.csv", &stats_table(true));

    let err = filter_network(
        &network,
        &stats,
        &dir.path().join("final.filtered"),
        &CoregConfig::default(),
        &CopyConverter,
    )
    .unwrap_err();
    match err {
        Error::Format { path, .. } => assert_eq!(path, network),
        other => panic!("unexpected {other}"),
    }
    assert_eq!(entries(dir.path()), vec!["coreg.csv", "coreg.pvl"]);
}
