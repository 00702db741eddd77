//! End-to-end runs: PGM on disk, script or edge pipeline, PGM back.

use std::fs;

use edgestag::config::Config;
use edgestag::pgm::{self, PgmError, PgmFormat};
use edgestag::script::{Script, ScriptError, Session};
use edgestag::{edges_with, EdgeOptions, PixelGrid};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Left half 0, right half 200.
fn step_image(size: usize) -> PixelGrid {
    let pixels = (0..size * size)
        .map(|i| if i % size < size / 2 { 0 } else { 200 })
        .collect();
    PixelGrid::from_vec(size, size, 200, pixels).unwrap()
}

#[test]
fn test_script_round_trip_through_files() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pgm");
    let output = dir.path().join("out.pgm");

    let image = PixelGrid::from_vec(4, 3, 9, (0..12).collect()).unwrap();
    pgm::write(&image, &input, PgmFormat::Ascii).unwrap();

    let script = Script::parse("# tonal only\ninvert\n\nthreshold 4\n").unwrap();
    assert_eq!(script.len(), 2);

    let loaded = pgm::read(&input).unwrap();
    let mut session = Session::default();
    let result = script.run(&loaded, &mut session).unwrap();
    pgm::write(&result, &output, PgmFormat::Ascii).unwrap();

    let back = pgm::read(&output).unwrap();
    assert_eq!(back.dims(), (4, 3));
    // invert maps v to 9 - v; threshold sends >= 4 to 255
    let expected: Vec<i32> = (0..12).map(|v| if 9 - v >= 4 { 255 } else { 0 }).collect();
    assert_eq!(back.to_vec(), expected);
}

#[test]
fn test_ced_finds_step() {
    init_logger();
    let image = step_image(20);
    let script = Script::parse("ced").unwrap();
    let mut session = Session::from_config(&Config::default());
    let result = script.run(&image, &mut session).unwrap();

    assert_eq!(result.dims(), (20, 20));
    assert!(result.to_vec().iter().all(|&v| v == 0 || v == 255));
    // The step sits between columns 9 and 10
    assert!((8..=11).any(|col| result.get(10, col) == Some(255)));
    // Flat regions far from the step stay empty
    assert_eq!(result.get(10, 4), Some(0));
    assert_eq!(result.get(10, 15), Some(0));
    // Outer ring is never an edge
    for i in 0..20 {
        assert_eq!(result.get(0, i), Some(0));
        assert_eq!(result.get(19, i), Some(0));
        assert_eq!(result.get(i, 0), Some(0));
        assert_eq!(result.get(i, 19), Some(0));
    }
}

#[test]
fn test_ced_matches_direct_pipeline() {
    init_logger();
    let image = step_image(16);
    let mut session = Session::default();
    let scripted = Script::parse("ced 1.4142135623730951 25 75")
        .unwrap()
        .run(&image, &mut session)
        .unwrap();
    let direct = edges_with(&image, &EdgeOptions::default()).unwrap();
    assert_eq!(scripted, direct);
}

#[test]
fn test_binary_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.pgm");

    let image = PixelGrid::from_vec(3, 2, 1000, vec![0, 1, 255, 256, 999, 1000]).unwrap();
    pgm::write(&image, &path, PgmFormat::Binary).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"P5"));

    let back = pgm::read(&path).unwrap();
    assert_eq!(back.max_val(), 1000);
    assert_eq!(back.to_vec(), image.to_vec());
}

#[test]
fn test_script_error_carries_line() {
    let err = Script::parse("median\n\nblur 3\n").unwrap_err();
    match err {
        ScriptError::UnknownCommand { line, keyword } => {
            assert_eq!(line, 3);
            assert_eq!(keyword, "blur");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_input_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nowhere.pgm");
    let err = pgm::read(&path).unwrap_err();
    assert!(matches!(err, PgmError::Io { .. }));
    assert!(err.to_string().contains("nowhere.pgm"));
}
