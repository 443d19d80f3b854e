mod common;

use approx::assert_relative_eq;
use common::*;
use face_fiducials::{
    FiducialConfig, FiducialError, FiducialParams, FiducialPipeline, FiducialReport,
    LandmarkScheme, MeshRayCaster, Reduction,
};
use std::path::PathBuf;

#[test]
fn minimal_config_uses_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "mesh_path": "scan/face.obj" }"#).expect("write config");

    let cfg = FiducialConfig::load_json(&path).expect("load config");
    assert_eq!(cfg.mesh_path, "scan/face.obj");
    assert_eq!(cfg.params, FiducialParams::default());
    assert_eq!(cfg.output_path(), PathBuf::from("fiducials_report.json"));
}

#[test]
fn config_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    let cfg = FiducialConfig {
        mesh_path: "face.obj".into(),
        output_path: Some("out/report.json".into()),
        params: FiducialParams {
            num_views: 24,
            filter_thresh: 1.5,
            reduction: Reduction::Median,
            scheme: LandmarkScheme::MediaPipe468,
            num_workers: Some(4),
            ..FiducialParams::default()
        },
    };
    cfg.write_json(&path).expect("write config");
    let back = FiducialConfig::load_json(&path).expect("load config");
    assert_eq!(back, cfg);
    assert_eq!(back.output_path(), PathBuf::from("out/report.json"));
    assert_eq!(back.build_params().expect("valid params").num_views, 24);
}

#[test]
fn invalid_config_is_rejected_by_build_params() {
    let cfg: FiducialConfig =
        serde_json::from_str(r#"{ "mesh_path": "face.obj", "image_size": 0 }"#).expect("parse");
    assert!(matches!(cfg.build_params(), Err(FiducialError::InvalidConfig(_))));
}

#[test]
fn report_keeps_fiducials_and_view_diagnostics() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cfg_path = dir.path().join("config.json");
    let report_path = dir.path().join("report.json");
    let cfg = FiducialConfig {
        mesh_path: "shell.obj".into(),
        output_path: None,
        params: FiducialParams {
            num_views: 6,
            image_size: 64,
            sweep_size: 10.0,
            ..FiducialParams::default()
        },
    };

    let params = cfg.build_params().expect("valid params");
    let pipeline = FiducialPipeline::new(params).expect("pipeline");
    let res = pipeline
        .run(
            &face_shell(),
            &PaintingRenderer { points: truth() },
            &MeshRayCaster::new(),
            &PaintDetector,
        )
        .expect("pipeline run");

    let mut report = FiducialReport::new(&cfg, &cfg_path);
    report.set_result(res.clone());
    report.write_json(&report_path).expect("write report");

    let loaded = FiducialReport::load_json(&report_path).expect("load report");
    assert!(loaded.error.is_none());
    let back = loaded.result.expect("result stored");
    assert_eq!(back.views.len(), 6);
    assert_eq!(back.fiducials.len(), res.fiducials.len());
    for (a, b) in res.fiducials.iter().zip(&back.fiducials) {
        assert_eq!(a.landmark, b.landmark);
        assert_eq!(a.status, b.status);
        assert_relative_eq!(a.position, b.position, epsilon = 1e-12);
    }
}

#[test]
fn report_records_errors() {
    let cfg = FiducialConfig {
        mesh_path: "face.obj".into(),
        output_path: None,
        params: FiducialParams {
            num_views: 0,
            ..FiducialParams::default()
        },
    };
    let mut report = FiducialReport::new(&cfg, std::path::Path::new("config.json"));
    let err = FiducialPipeline::new(cfg.params.clone()).err().expect("invalid config");
    report.set_error(err);
    assert!(report.error.as_deref().is_some_and(|e| e.contains("num_views")));
    assert!(report.result.is_none());
}
