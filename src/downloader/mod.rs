// Download core: selection, pipeline, providers, and the tool façade

pub mod catalog;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod selector;
pub mod service;
pub mod tools;
pub mod transcript;
pub mod utils;

pub use catalog::{CatalogProvider, YtdlpCatalog};
pub use errors::DownloadError;
pub use models::{
    DownloadPlan, QualityRequest, SearchHit, SegmentRequest, StreamCatalog, StreamDescriptor,
    VideoInfo, VideoMetadata,
};
pub use service::DownloaderService;
pub use transcript::{TimedTextProvider, TranscriptProvider};
