pub mod backoff;
pub mod stream_ingestion_pipeline;
pub mod stream_source;
pub mod websocket_adapter;
