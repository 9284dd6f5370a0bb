pub mod convert;
pub mod key;
pub mod registry;

pub use key::{PoolKey, ResolvedConnection};
pub use registry::{PoolRegistry, PoolStats};
