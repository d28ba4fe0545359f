use cnet_coreg::{CoregConfig, Error, translate_network};
use isis_tools::GeometryError;
use test_log::test;

mod common;
use common::{CopyConverter, FakeGeometry, NETWORK, entries, inputs, joined_network, write};

/// [NETWORK] translated by [FakeGeometry].
fn translated_network() -> String {
    joined_network()
        .replace(
            "      SerialNumber = match.x20.cub\n      MeasureType  = Candidate\n      Sample       = 100.0\n      Line         = 200.0\n",
            "      SerialNumber = SN:match.cub\n      MeasureType  = Candidate\n      Sample = 1100.0\n      Line = 1200.0\n",
        )
        .replace(
            "      SerialNumber = match.x20.cub\n      MeasureType  = Candidate\n      Sample       = 300.0\n      Line         = 40.0\n",
            "      SerialNumber = SN:match.cub\n      MeasureType  = Candidate\n      Sample = 1300.0\n      Line = 1040.0\n",
        )
        .replace(
            "      SerialNumber   = moved.x20.cub\n      MeasureType    = RegisteredSubPixel\n      Sample         = 101.5\n      Line           = 199.25\n",
            "      SerialNumber = SN:source.cub\n      MeasureType    = RegisteredSubPixel\n      Sample = 102.0\n      Line = 199.75\n",
        )
        .replace(
            "      SerialNumber   = moved.x20.cub\n      MeasureType    = RegisteredSubPixel\n      Sample         = 320.0\n      Line           = 44.0\n",
            "      SerialNumber = SN:source.cub\n      MeasureType    = RegisteredSubPixel\n      Sample = 320.5\n      Line = 44.5\n",
        )
}

#[test]
fn measures_are_moved_to_original_images() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let geometry = FakeGeometry::default();

    let outcome = translate_network(
        &network,
        &inputs(dir.path()),
        &out_dir.join("final"),
        &CoregConfig::default(),
        &geometry,
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.translated_measures, 4);
    assert_eq!(entries(&out_dir), vec!["final.net", "final.pvl"]);
    let text = std::fs::read_to_string(&outcome.outputs.pvl).unwrap();
    assert_eq!(text, translated_network());
    assert!(!text.contains("x20"));

    // ground points come from the transformed images
    assert_eq!(geometry.calls.borrow()[0], "ground match.x20.cub");
    assert_eq!(geometry.calls_to("ground"), 4);
    assert_eq!(geometry.calls_to("pixel match.cub"), 2);
    assert_eq!(geometry.calls_to("pixel source.cub"), 2);
    // serial numbers are looked up once per image
    assert_eq!(geometry.calls_to("serial"), 2);
}

#[test]
fn measures_without_serial_number_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let text = "Group = ControlMeasure\n  MeasureType = Candidate\n  Sample = 1\nEnd_Group\nEnd\n";
    let network = write(dir.path(), "coreg.pvl", text);
    let geometry = FakeGeometry::default();

    let outcome = translate_network(
        &network,
        &inputs(dir.path()),
        &dir.path().join("final"),
        &CoregConfig::default(),
        &geometry,
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(outcome.translated_measures, 0);
    assert_eq!(std::fs::read_to_string(outcome.outputs.pvl).unwrap(), text);
    assert!(geometry.calls.borrow().is_empty());
}

#[test]
fn geometry_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let geometry = FakeGeometry {
        broken: Some("moved.x20.cub".into()),
        ..Default::default()
    };

    let err = translate_network(
        &network,
        &inputs(dir.path()),
        &dir.path().join("final"),
        &CoregConfig::default(),
        &geometry,
        &CopyConverter,
    )
    .unwrap_err();
    match err {
        Error::Geometry {
            path,
            line,
            serial_number,
            source,
        } => {
            assert_eq!(path, network);
            assert_eq!(serial_number, "moved.x20.cub");
            // End_Group of the moved measure of coreg_1
            assert_eq!(line, 28);
            assert!(matches!(source, GeometryError::Rejected(_)));
        }
        other => panic!("unexpected {other}"),
    }
    assert_eq!(entries(dir.path()), vec!["coreg.pvl"]);
}

#[test]
fn reference_flag_can_be_required() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(dir.path(), "coreg.pvl", NETWORK);
    let cfg = CoregConfig::from_toml_str("[translation]\nrequire_reference_flag = true\n").unwrap();

    let err = translate_network(
        &network,
        &inputs(dir.path()),
        &dir.path().join("final"),
        cfg.valid(),
        &FakeGeometry::default(),
        &CopyConverter,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Data {
            source: pvl_blocks::Error::MissingKey { ref key },
            ..
        } if key == "Reference"
    ));
}

#[test]
fn explicit_non_reference_uses_source_image() {
    let dir = tempfile::tempdir().unwrap();
    let text = "Group = ControlMeasure\n  SerialNumber = match.x20.cub\n  Sample = 4.0\n  Line = 6.0\n  Reference = False\nEnd_Group\n";
    let network = write(dir.path(), "coreg.pvl", text);

    let outcome = translate_network(
        &network,
        &inputs(dir.path()),
        &dir.path().join("final"),
        &CoregConfig::default(),
        &FakeGeometry::default(),
        &CopyConverter,
    )
    .unwrap();
    assert_eq!(
        std::fs::read_to_string(outcome.outputs.pvl).unwrap(),
        "Group = ControlMeasure\n  SerialNumber = SN:source.cub\n  Sample = 4.5\n  Line = 6.5\n  Reference = False\nEnd_Group\n"
    );
}

#[test]
fn unterminated_group_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let network = write(
        dir.path(),
        "coreg.pvl",
        "Group = ControlMeasure\n  SerialNumber = a.cub\n  Sample = 1.0\n",
    );

    let err = translate_network(
        &network,
        &inputs(dir.path()),
        &dir.path().join("final"),
        &CoregConfig::default(),
        &FakeGeometry::default(),
        &CopyConverter,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Format { .. }));
}
