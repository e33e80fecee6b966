//! Tests for ViewState zoom transitions.

use test_utils::{assert_approx_eq, assert_bbox_approx_eq};
use wms_common::{BoundingBox, ViewState, ZOOM_STEP};

#[test]
fn test_initial_zoom_level() {
    let view = ViewState::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0)).unwrap();
    assert_eq!(view.zoom_level(), 1.0);
    assert_eq!(view.bbox(), BoundingBox::new(-10.0, -10.0, 10.0, 10.0));
}

#[test]
fn test_zoom_keeps_center_fixed() {
    let view = ViewState::new(BoundingBox::new(10.0, 20.0, 30.0, 40.0)).unwrap();
    let zoomed = view.zoom(4.0).unwrap();
    assert_eq!(zoomed.bbox().center(), (20.0, 30.0));
    assert_approx_eq!(zoomed.bbox().width(), 5.0, 1e-9);
    assert_approx_eq!(zoomed.bbox().height(), 5.0, 1e-9);
    assert_approx_eq!(zoomed.zoom_level(), 4.0, 1e-12);
}

#[test]
fn test_zoom_roundtrip_without_clamping() {
    let start = ViewState::new(BoundingBox::new(-20.0, -10.0, 20.0, 10.0)).unwrap();
    let back = start.zoom(1.5).unwrap().zoom(1.0 / 1.5).unwrap();
    assert_bbox_approx_eq!(back.bbox(), start.bbox(), 1e-9);
    assert_approx_eq!(back.zoom_level(), 1.0, 1e-12);
}

#[test]
fn test_zoom_out_near_edge_is_lossy() {
    let start = ViewState::new(BoundingBox::new(160.0, 0.0, 180.0, 20.0)).unwrap();
    let out = start.zoom(0.5).unwrap();
    assert_eq!(out.bbox(), BoundingBox::new(150.0, -10.0, 180.0, 30.0));

    // Zooming back in does not restore the original extent.
    let back = out.zoom(2.0).unwrap();
    assert_ne!(back.bbox(), start.bbox());
    assert!(back.bbox().is_geographic());
}

#[test]
fn test_zoom_steps_are_inverse() {
    let view = ViewState::new(BoundingBox::new(-50.0, -25.0, 50.0, 25.0)).unwrap();
    let zoomed = view.zoom_in().unwrap();
    assert_approx_eq!(zoomed.bbox().width(), 100.0 / ZOOM_STEP, 1e-9);
    let back = zoomed.zoom_out().unwrap();
    assert_bbox_approx_eq!(back.bbox(), view.bbox(), 1e-9);
}

#[test]
fn test_zoom_zero_and_negative_fail() {
    let view = ViewState::default();
    assert_eq!(view.zoom(0.0).unwrap_err().kind(), "ValidationError");
    assert_eq!(view.zoom(-1.0).unwrap_err().kind(), "ValidationError");
    // The original view is untouched.
    assert_eq!(view.bbox(), BoundingBox::WORLD);
}

#[test]
fn test_repeated_zoom_never_degenerates() {
    let mut view = ViewState::default();
    for _ in 0..50 {
        view = view.zoom_out().unwrap();
        assert!(view.bbox().has_positive_area());
        assert!(view.bbox().is_geographic());
    }
    assert_eq!(view.bbox(), BoundingBox::WORLD);
}
