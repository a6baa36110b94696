pub mod combine;
pub mod compare;
pub mod core;
pub mod error;
pub mod hash;
pub mod histogram;
pub mod key;
pub mod partition;
pub mod pass;


pub use self::compare::*;
pub use self::core::*;
pub use self::error::SortError;
pub use self::hash::{DEFAULT_BUCKET_RANGE, KeyHasher, hash_id, hash_name, hash_timestamp};
pub use self::key::SortKey;
