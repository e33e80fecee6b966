//! A map view whose requests are tagged with the view version that issued
//! them.
//!
//! Each transition (zoom, pan to a new bbox, reset) atomically replaces the
//! view and bumps its version. Work started under an older version is
//! dropped as soon as the view moves on, and its result is reported as
//! [`Delivery::Stale`] instead of being handed to the caller.

use std::future::Future;
use std::sync::Arc;

use segmentation::{SegmentationAdapter, SegmentationModel, SegmentationResult};
use tokio::sync::watch;
use tracing::{debug, instrument};
use wms_common::{BoundingBox, RasterImage, ViewState, WmsError, WmsResult};
use wms_protocol::GetMapParams;

use crate::client::{MapImage, WmsClient};

/// The view at a given version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSnapshot {
    pub version: u64,
    pub state: ViewState,
}

/// Outcome of work issued against a particular view version.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Current { version: u64, value: T },
    /// The view changed before the work finished; its result was discarded.
    Stale { issued: u64, current: u64 },
}

impl<T> Delivery<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Delivery::Stale { .. })
    }

    pub fn into_current(self) -> Option<T> {
        match self {
            Delivery::Current { value, .. } => Some(value),
            Delivery::Stale { .. } => None,
        }
    }
}

/// A map fetched and segmented under one view version.
#[derive(Debug, Clone)]
pub struct SegmentedMap {
    pub map: MapImage,
    pub segmentation: SegmentationResult,
}

pub struct MapSession {
    client: Arc<WmsClient>,
    /// Everything but the bbox, which always comes from the view
    template: GetMapParams,
    initial: ViewState,
    view: watch::Sender<ViewSnapshot>,
    adapter: SegmentationAdapter,
    model: Option<Arc<dyn SegmentationModel>>,
}

impl MapSession {
    pub fn new(client: Arc<WmsClient>, template: GetMapParams, initial: ViewState) -> Self {
        let (view, _) = watch::channel(ViewSnapshot {
            version: 0,
            state: initial,
        });
        Self {
            client,
            template,
            initial,
            view,
            adapter: SegmentationAdapter::default(),
            model: None,
        }
    }

    /// Attach the model used by [`segment`](Self::segment).
    pub fn with_segmentation(
        mut self,
        adapter: SegmentationAdapter,
        model: Option<Arc<dyn SegmentationModel>>,
    ) -> Self {
        self.adapter = adapter;
        self.model = model;
        self
    }

    pub fn view(&self) -> ViewSnapshot {
        *self.view.borrow()
    }

    /// Observe view transitions.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.subscribe()
    }

    pub fn template(&self) -> &GetMapParams {
        &self.template
    }

    pub fn zoom(&self, factor: f64) -> WmsResult<ViewSnapshot> {
        self.transition(|state| state.zoom(factor))
    }

    pub fn zoom_in(&self) -> WmsResult<ViewSnapshot> {
        self.transition(ViewState::zoom_in)
    }

    pub fn zoom_out(&self) -> WmsResult<ViewSnapshot> {
        self.transition(ViewState::zoom_out)
    }

    /// Jump to a new extent at zoom level 1.0.
    pub fn set_bbox(&self, bbox: BoundingBox) -> WmsResult<ViewSnapshot> {
        self.transition(|_| ViewState::new(bbox))
    }

    /// Return to the initial view. Always counts as a transition.
    pub fn reset(&self) -> ViewSnapshot {
        let initial = self.initial;
        self.view.send_modify(|snapshot| {
            snapshot.version += 1;
            snapshot.state = initial;
        });
        let snapshot = self.view();
        debug!(version = snapshot.version, "View reset");
        snapshot
    }

    /// Apply `step` to the current view. A failed step leaves the view and
    /// its version untouched.
    fn transition<F>(&self, step: F) -> WmsResult<ViewSnapshot>
    where
        F: FnOnce(&ViewState) -> WmsResult<ViewState>,
    {
        let mut outcome = Ok(self.view());
        self.view.send_if_modified(|snapshot| match step(&snapshot.state) {
            Ok(next) => {
                snapshot.version += 1;
                snapshot.state = next;
                outcome = Ok(*snapshot);
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });

        if let Ok(snapshot) = &outcome {
            debug!(
                version = snapshot.version,
                bbox = %snapshot.state.bbox(),
                zoom = snapshot.state.zoom_level(),
                "View changed"
            );
        }
        outcome
    }

    /// Fetch the map for the current view.
    #[instrument(skip(self))]
    pub async fn fetch_map(&self) -> WmsResult<Delivery<MapImage>> {
        let snapshot = self.view();
        let params = self.params_for(&snapshot);
        self.deliver(snapshot.version, self.client.fetch_map(&params))
            .await
    }

    /// Segment an image on behalf of the current view.
    #[instrument(skip(self, image))]
    pub async fn segment(&self, image: RasterImage) -> WmsResult<Delivery<SegmentationResult>> {
        let issued = self.view().version;
        self.deliver(issued, self.adapter.segment_async(self.model.clone(), image))
            .await
    }

    /// Fetch the current view and segment it, both under one version.
    #[instrument(skip(self))]
    pub async fn fetch_and_segment(&self) -> WmsResult<Delivery<SegmentedMap>> {
        let snapshot = self.view();
        let params = self.params_for(&snapshot);
        let work = async {
            let map = self.client.fetch_map(&params).await?;
            let segmentation = self
                .adapter
                .segment_async(self.model.clone(), map.image.clone())
                .await?;
            Ok::<_, WmsError>(SegmentedMap { map, segmentation })
        };
        self.deliver(snapshot.version, work).await
    }

    fn params_for(&self, snapshot: &ViewSnapshot) -> GetMapParams {
        self.template.clone().with_bbox(snapshot.state.bbox())
    }

    /// Race `work` against a view change. Dropping `work` cancels it.
    async fn deliver<T, F>(&self, issued: u64, work: F) -> WmsResult<Delivery<T>>
    where
        F: Future<Output = WmsResult<T>>,
    {
        let mut rx = self.view.subscribe();

        tokio::select! {
            biased;

            Ok(changed) = rx.wait_for(|snapshot| snapshot.version != issued) => {
                let current = changed.version;
                debug!(issued, current, "View moved on, dropping in-flight work");
                Ok(Delivery::Stale { issued, current })
            }
            result = work => {
                let current = self.view().version;
                if current != issued {
                    debug!(issued, current, "Discarding stale result");
                    return Ok(Delivery::Stale { issued, current });
                }
                result.map(|value| Delivery::Current { version: issued, value })
            }
        }
    }
}
