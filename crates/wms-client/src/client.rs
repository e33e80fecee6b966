//! Request building, fetching and parsing combined behind one handle.

use tracing::{info, instrument, warn};
use wms_common::{Layer, RasterImage, WmsResult};
use wms_protocol::{
    build_get_capabilities_url, build_get_map_url, parse_layers, GetMapDefaults, GetMapParams,
    GetMapUrl,
};

use crate::fetcher::{FetchConfig, ImageFetcher};

/// A decoded map together with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapImage {
    pub request: GetMapUrl,
    pub image: RasterImage,
}

#[derive(Debug, Clone)]
pub struct WmsClient {
    fetcher: ImageFetcher,
    defaults: GetMapDefaults,
}

impl WmsClient {
    pub fn new(fetch: FetchConfig, defaults: GetMapDefaults) -> WmsResult<Self> {
        Ok(Self::from_fetcher(ImageFetcher::new(fetch)?, defaults))
    }

    pub fn from_fetcher(fetcher: ImageFetcher, defaults: GetMapDefaults) -> Self {
        Self { fetcher, defaults }
    }

    pub fn fetcher(&self) -> &ImageFetcher {
        &self.fetcher
    }

    pub fn defaults(&self) -> &GetMapDefaults {
        &self.defaults
    }

    /// Data layers advertised by the service at `base_url`, in document order.
    ///
    /// An empty list is not an error; the caller decides how to present it.
    #[instrument(skip(self))]
    pub async fn list_layers(&self, base_url: &str) -> WmsResult<Vec<Layer>> {
        let url = build_get_capabilities_url(base_url)?;
        let body = self.fetcher.fetch_capabilities(&url).await?;
        let layers = parse_layers(&body)?;

        if layers.is_empty() {
            info!("No layers found in capabilities document");
        } else {
            info!(count = layers.len(), "Listed layers");
        }
        Ok(layers)
    }

    /// Build the GetMap URL for `params` against this client's defaults.
    pub fn map_url(&self, params: &GetMapParams) -> WmsResult<GetMapUrl> {
        build_get_map_url(params, &self.defaults)
    }

    /// Build, fetch and decode one map image.
    #[instrument(skip(self, params), fields(base_url = %params.base_url))]
    pub async fn fetch_map(&self, params: &GetMapParams) -> WmsResult<MapImage> {
        let request = self.map_url(params)?;
        for warning in &request.warnings {
            warn!(%warning, "GetMap request adjusted");
        }

        let image = self.fetcher.fetch_map(&request.url).await?;
        Ok(MapImage { request, image })
    }
}
