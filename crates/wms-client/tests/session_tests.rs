//! View session tests: versioned transitions and stale-result handling.

use std::sync::Arc;
use std::time::Duration;

use segmentation::{SegmentationAdapter, SegmentationModel, ThresholdModel};
use test_utils::{assert_bbox_approx_eq, gray_png, MockReply, MockWmsServer};
use wms_client::{Delivery, FetchConfig, MapSession, WmsClient};
use wms_common::{BoundingBox, RasterImage, ViewState};
use wms_protocol::{GetMapDefaults, GetMapParams};

fn session_for(base_url: String) -> MapSession {
    let client = WmsClient::new(FetchConfig::default(), GetMapDefaults::default()).unwrap();
    let template = GetMapParams::new(base_url).with_layers(["topp:states"]);
    MapSession::new(Arc::new(client), template, ViewState::default())
}

fn with_model(session: MapSession) -> MapSession {
    let model: Arc<dyn SegmentationModel> = Arc::new(ThresholdModel::default());
    session.with_segmentation(SegmentationAdapter::default(), Some(model))
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn test_zoom_bumps_version() {
    let session = session_for("http://unused/wms".into());
    assert_eq!(session.view().version, 0);

    let snap = session.zoom(2.0).unwrap();
    assert_eq!(snap.version, 1);
    assert_bbox_approx_eq!(
        snap.state.bbox(),
        BoundingBox::new(-90.0, -45.0, 90.0, 45.0),
        1e-9
    );

    let snap = session.zoom_in().unwrap();
    assert_eq!(snap.version, 2);
    assert_eq!(session.view(), snap);
}

#[tokio::test]
async fn test_failed_zoom_keeps_view() {
    let session = session_for("http://unused/wms".into());
    session.zoom(2.0).unwrap();
    let before = session.view();

    assert_eq!(session.zoom(0.0).unwrap_err().field(), Some("factor"));
    assert_eq!(session.zoom(-1.0).unwrap_err().field(), Some("factor"));
    assert_eq!(session.view(), before);
}

#[tokio::test]
async fn test_reset_and_set_bbox() {
    let session = session_for("http://unused/wms".into());
    session.zoom(4.0).unwrap();

    let snap = session.reset();
    assert_eq!(snap.version, 2);
    assert_eq!(snap.state, ViewState::default());

    let snap = session
        .set_bbox(BoundingBox::new(-10.0, -5.0, 10.0, 5.0))
        .unwrap();
    assert_eq!(snap.version, 3);
    assert_eq!(snap.state.zoom_level(), 1.0);

    assert!(session
        .set_bbox(BoundingBox::new(10.0, 0.0, 10.0, 5.0))
        .is_err());
    assert_eq!(session.view().version, 3);
}

#[tokio::test]
async fn test_subscribers_see_transitions() {
    let session = session_for("http://unused/wms".into());
    let mut rx = session.subscribe();

    session.zoom_out().unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().version, 1);
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test]
async fn test_fetch_map_current() {
    let server = MockWmsServer::start().await;
    server.on("GetMap", MockReply::png(gray_png(80, 60)));
    let session = session_for(server.base_url());
    session.zoom(2.0).unwrap();

    let delivery = session.fetch_map().await.unwrap();
    match delivery {
        Delivery::Current { version, value } => {
            assert_eq!(version, 1);
            assert_eq!(value.image.dimensions(), (80, 60));
            assert_eq!(value.request.bbox, session.view().state.bbox());
        }
        Delivery::Stale { .. } => panic!("expected a current delivery"),
    }
    assert!(server.requests()[0].contains("bbox=-90,-45,90,45"));
}

#[tokio::test]
async fn test_zoom_during_fetch_makes_result_stale() {
    let server = MockWmsServer::start().await;
    server.on(
        "GetMap",
        MockReply::png(gray_png(8, 8)).with_delay(Duration::from_millis(500)),
    );
    let session = session_for(server.base_url());

    let (delivery, _) = tokio::join!(session.fetch_map(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.zoom_in().unwrap();
    });

    assert_eq!(
        delivery.unwrap(),
        Delivery::Stale {
            issued: 0,
            current: 1
        }
    );
    assert_eq!(session.view().version, 1);
}

#[tokio::test]
async fn test_fetch_errors_propagate() {
    let server = MockWmsServer::start().await;
    server.on("GetMap", MockReply::status(500));
    let session = session_for(server.base_url());

    let err = session.fetch_map().await.unwrap_err();
    assert_eq!(err.kind(), "HttpStatusError");
}

#[tokio::test]
async fn test_segment_requires_model() {
    let session = session_for("http://unused/wms".into());
    let image = RasterImage::decode(&gray_png(16, 16)).unwrap();

    let err = session.segment(image).await.unwrap_err();
    assert_eq!(err.kind(), "ModelNotLoadedError");
}

#[tokio::test]
async fn test_segment_current() {
    let session = with_model(session_for("http://unused/wms".into()));
    let image = RasterImage::decode(&gray_png(40, 30)).unwrap();

    let result = session
        .segment(image)
        .await
        .unwrap()
        .into_current()
        .unwrap();
    assert_eq!(result.dimensions(), (40, 30));
    assert_eq!(result.class_at(2, 15), Some(0));
    assert_eq!(result.class_at(38, 15), Some(1));
}

#[tokio::test]
async fn test_fetch_and_segment() {
    let server = MockWmsServer::start().await;
    server.on("GetMap", MockReply::png(gray_png(64, 48)));
    let session = with_model(session_for(server.base_url()));

    let delivery = session.fetch_and_segment().await.unwrap();
    assert!(!delivery.is_stale());
    let segmented = delivery.into_current().unwrap();
    assert_eq!(segmented.map.image.dimensions(), (64, 48));
    assert_eq!(segmented.segmentation.dimensions(), (64, 48));
}
