mod cfg_debug;
mod config;
mod envelope;
mod error;
mod local;
mod registry;
mod store;
mod tag;
mod tag_ref;
mod tagged;

pub use cfg_debug::CfgDebug;
pub use config::Config;
pub use error::{StoreError, TagError};
pub use local::LocalCache;
pub use registry::{Stamp, TagRegistry};
pub use store::{Store, next_counter};
pub use tag::{Tag, TagId};
pub use tag_ref::TagRef;
pub use tagged::TaggedCache;
