pub mod telemetry;
pub mod distro_usage;
pub mod pagination;

pub use telemetry::*;
pub use distro_usage::*;
pub use pagination::*;
