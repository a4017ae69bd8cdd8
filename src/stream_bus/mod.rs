pub mod stream_bus;

pub use stream_bus::{
    load_readings, parse_readings, StreamBus, StreamBusConfig, StreamBusError, StreamBusMetrics,
};
