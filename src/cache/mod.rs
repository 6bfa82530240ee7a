//! Local response cache
//!
//! Responses are stored on disk under a short key derived from the endpoint and
//! its parameters. Entries carry a TTL and are dropped as soon as they are found
//! to be expired or damaged, so a read either returns a trustworthy payload or
//! a miss.

mod key;
mod store;

pub use key::{canonical_form, canonicalize, ParamValue, Params, KEY_LEN};
pub use store::{CacheError, CacheStore};
