pub mod resolvers;
pub mod distro_usage;
pub mod query_facade;
pub mod metrics;

pub use resolvers::*;
pub use distro_usage::*;
pub use query_facade::*;
pub use metrics::*;
