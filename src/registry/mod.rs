pub mod zone_registry;

pub use zone_registry::{RegistryError, ZoneId, ZoneInfo, ZoneRegistry};
