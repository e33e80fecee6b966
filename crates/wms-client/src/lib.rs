//! Async WMS client.
//!
//! - [`ImageFetcher`]: HTTP GET with timeout, single retry and error
//!   classification
//! - [`WmsClient`]: layer listing and map fetching against one set of
//!   request defaults
//! - [`MapSession`]: a zoomable view whose stale results are discarded

pub mod client;
pub mod fetcher;
pub mod session;

pub use client::{MapImage, WmsClient};
pub use fetcher::{FetchConfig, ImageFetcher};
pub use session::{Delivery, MapSession, SegmentedMap, ViewSnapshot};
