//! Region mapping integration tests.
//!
//! These tests drive validation, request mapping, tiling and replay together
//! over a realistic three-level slide.

use wsi_region::geom::IntPos;
use wsi_region::{
    check_region, compare, compute_request, is_valid_region, parse_cases, scaled_size,
    scaling_for_mpp, LevelProperties, RegionError, RegionRequest, TileGrid,
};

use super::test_utils::slide_levels;

fn replay_row(location: IntPos, scaling: f64, size: IntPos, r: &RegionRequest) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        location.x,
        location.y,
        scaling,
        size.x,
        size.y,
        r.location.x,
        r.location.y,
        r.level,
        r.size.x,
        r.size.y,
        r.native.fractional_coordinates.x,
        r.native.fractional_coordinates.y,
        r.native.native_size.x,
        r.native.native_size.y
    )
}

// =============================================================================
// Request Mapping
// =============================================================================

#[test]
fn test_quarter_scale_request() {
    let props = slide_levels();
    let location = IntPos::new(6912, 5376);
    let size = IntPos::new(256, 256);

    assert!(is_valid_region(location, 0.2495, size, &props));
    let request = compute_request(location, 0.2495, size, &props);

    assert_eq!(request.level, 1);
    assert_eq!(request.location, IntPos::new(27684, 21528));
    assert_eq!(request.size, IntPos::new(266, 266));

    let frac = request.native.fractional_coordinates;
    assert!((frac.x - 4.8517).abs() < 1e-3, "frac.x = {}", frac.x);
    assert!((frac.y - 4.7735).abs() < 1e-3, "frac.y = {}", frac.y);
    assert!((request.native.native_size.x - 256.513).abs() < 1e-3);
    assert!((request.native.native_size.y - 256.513).abs() < 1e-3);
}

#[test]
fn test_mpp_driven_request() {
    let props = slide_levels();
    let scaling = scaling_for_mpp(0.25, 1.0);
    assert_eq!(scaling, 0.25);

    let request = compute_request(IntPos::new(1000, 1000), scaling, IntPos::new(512, 512), &props);
    assert_eq!(request.level, 1);
    // Exactly native scaling: no fractional resampling inside the window.
    assert_eq!(request.native.native_size.x, 512.0);
    assert_eq!(request.native.fractional_coordinates.x, 3.0);
    assert_eq!(request.location, IntPos::new(3988, 3988));
    assert_eq!(request.size, IntPos::new(518, 518));
}

#[test]
fn test_upscaling_reads_level_zero() {
    let props = slide_levels();
    let request = compute_request(IntPos::new(1000, 1000), 2.0, IntPos::new(200, 200), &props);

    assert_eq!(request.level, 0);
    assert_eq!(request.location, IntPos::new(497, 497));
    assert_eq!(request.size, IntPos::new(106, 106));
    assert_eq!(request.native.fractional_coordinates.x, 3.0);
    assert_eq!(request.native.native_size.x, 100.0);
}

#[test]
fn test_origin_region_starts_at_zero() {
    let props = slide_levels();
    for scaling in [1.0, 0.5, 0.2495, 0.0625, 0.01] {
        let request = compute_request(IntPos::ZERO, scaling, IntPos::new(32, 32), &props);
        assert_eq!(request.location, IntPos::ZERO, "scaling {}", scaling);
        assert_eq!(request.native.fractional_coordinates.x, 0.0);
        assert_eq!(request.native.fractional_coordinates.y, 0.0);
    }
}

#[test]
fn test_edge_region_stays_inside_level() {
    let props = slide_levels();
    for scaling in [1.0, 0.3, 0.2495, 0.1, 0.05] {
        let size = IntPos::new(128, 96);
        let location = scaled_size(props.slide_size(), scaling) - size;
        assert!(is_valid_region(location, scaling, size, &props));

        let request = compute_request(location, scaling, size, &props);
        let ds = props.level_downsamples()[request.level];
        let dims = props.level_dimensions()[request.level];

        let native_origin = IntPos::new(
            (request.location.x as f64 / ds) as i64,
            (request.location.y as f64 / ds) as i64,
        );
        let end = native_origin + request.size;
        assert!(!end.any_greater(dims), "scaling {}: {:?} > {:?}", scaling, end, dims);
    }
}

#[test]
fn test_requests_are_deterministic() {
    let props = slide_levels();
    let a = compute_request(IntPos::new(333, 777), 0.137, IntPos::new(300, 200), &props);
    let b = compute_request(IntPos::new(333, 777), 0.137, IntPos::new(300, 200), &props);
    assert_eq!(a, b);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_invalid_scaling() {
    let props = slide_levels();
    for scaling in [0.0, -0.5, f64::NAN, f64::INFINITY] {
        let err = check_region(IntPos::ZERO, scaling, IntPos::new(10, 10), &props).unwrap_err();
        assert!(matches!(err, RegionError::InvalidScaling(_)), "scaling {}", scaling);
    }
}

#[test]
fn test_invalid_regions() {
    let props = slide_levels();
    let level_size = scaled_size(props.slide_size(), 0.5);

    // Past the right edge by one pixel.
    let location = IntPos::new(level_size.x - 99, 0);
    let err = check_region(location, 0.5, IntPos::new(100, 100), &props).unwrap_err();
    match err {
        RegionError::InvalidRegion { level_size: reported, .. } => assert_eq!(reported, level_size),
        other => panic!("unexpected error: {}", other),
    }

    assert!(!is_valid_region(IntPos::new(-1, 0), 0.5, IntPos::new(10, 10), &props));
    assert!(!is_valid_region(IntPos::ZERO, 0.5, IntPos::new(10, -10), &props));

    // Touching the edge exactly is fine.
    assert!(is_valid_region(level_size - IntPos::new(100, 100), 0.5, IntPos::new(100, 100), &props));
}

#[test]
fn test_level_properties_from_json() {
    let json = r#"{
        "level_downsamples": [1.0, 4.0, 16.0],
        "level_dimensions": [
            {"x": 100000, "y": 71398},
            {"x": 25000, "y": 17849},
            {"x": 6250, "y": 4462}
        ]
    }"#;
    let props: LevelProperties = serde_json::from_str(json).unwrap();
    assert_eq!(props, slide_levels());

    let bad = r#"{"level_downsamples": [2.0], "level_dimensions": [{"x": 10, "y": 10}]}"#;
    assert!(serde_json::from_str::<LevelProperties>(bad).is_err());
}

// =============================================================================
// Tiling
// =============================================================================

#[test]
fn test_tile_requests_cover_their_regions() {
    let props = slide_levels();
    let tile = IntPos::new(256, 256);

    for scaling in [1.0, 0.5, 0.2495, 0.1, 0.03125] {
        let level_size = scaled_size(props.slide_size(), scaling);
        let grid = TileGrid::new(level_size, tile, IntPos::ZERO).unwrap();
        assert!(!grid.is_empty());

        for location in grid.locations().step_by(37) {
            assert!(is_valid_region(location, scaling, tile, &props));
            let request = compute_request(location, scaling, tile, &props);

            // The chosen level never has less resolution than asked for.
            let ds = props.level_downsamples()[request.level];
            assert!(ds * scaling <= 1.0 + 1e-9 || request.level == 0);

            assert!(!request.location.any_negative());
            assert!(!request.location.any_greater(props.slide_size()));
            assert!(request.size.x > 0 && request.size.y > 0);

            let frac = request.native.fractional_coordinates;
            let end = frac + request.native.native_size;
            assert!(frac.x >= 0.0 && frac.y >= 0.0);
            assert!(end.x <= request.size.x as f64 + 1.0, "{:?}", request);
            assert!(end.y <= request.size.y as f64 + 1.0, "{:?}", request);
        }
    }
}

#[test]
fn test_overlapping_tiles() {
    let grid = TileGrid::new(IntPos::new(1000, 1000), IntPos::new(256, 256), IntPos::new(32, 32)).unwrap();
    assert_eq!(grid.stride(), IntPos::new(224, 224));
    assert_eq!(grid.counts(), IntPos::new(4, 4));

    let last = grid.locations().last().unwrap();
    assert_eq!(last, IntPos::new(672, 672));
    assert!(last.x + 256 <= 1000);
}

#[test]
fn test_invalid_tiling() {
    let size = IntPos::new(1000, 1000);
    assert!(matches!(
        TileGrid::new(size, IntPos::new(0, 256), IntPos::ZERO),
        Err(RegionError::InvalidTiling { .. })
    ));
    assert!(matches!(
        TileGrid::new(size, IntPos::new(256, 256), IntPos::new(256, 0)),
        Err(RegionError::InvalidTiling { .. })
    ));
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn test_replay_of_recorded_requests() {
    let props = slide_levels();
    let cases = [
        (IntPos::new(6912, 5376), 0.2495, IntPos::new(256, 256)),
        (IntPos::new(0, 0), 1.0, IntPos::new(512, 512)),
        (IntPos::new(100, 200), 0.01, IntPos::new(64, 32)),
        (IntPos::new(4000, 3000), 0.07, IntPos::new(300, 300)),
    ];

    let mut text = String::from("loc_x,loc_y,scaling,size_x,size_y,req_x,req_y,level,req_w,req_h,frac_x,frac_y,native_w,native_h\n");
    for (location, scaling, size) in cases {
        let request = compute_request(location, scaling, size, &props);
        text.push_str(&replay_row(location, scaling, size, &request));
        text.push('\n');
    }

    let parsed = parse_cases(&text).unwrap();
    assert_eq!(parsed.len(), cases.len());
    for case in &parsed {
        let actual = compute_request(case.location, case.scaling, case.size, &props);
        assert!(compare(&case.expected, &actual, 1e-9).is_empty(), "line {}", case.line);
    }
}

#[test]
fn test_replay_reports_regressions() {
    let props = slide_levels();
    let (location, scaling, size) = (IntPos::new(6912, 5376), 0.2495, IntPos::new(256, 256));

    let mut recorded = compute_request(location, scaling, size, &props);
    recorded.level = 2;
    recorded.native.native_size.y += 0.5;

    let case = &parse_cases(&replay_row(location, scaling, size, &recorded)).unwrap()[0];
    let actual = compute_request(case.location, case.scaling, case.size, &props);
    let diffs = compare(&case.expected, &actual, 1e-6);

    let fields: Vec<&str> = diffs.iter().map(|d| d.field).collect();
    assert_eq!(fields, vec!["level", "native_size.y"]);
    assert_eq!(diffs[0].delta(), -1.0);
}
