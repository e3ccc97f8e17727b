//! Configuration support for Ferry.
//!
//! Host frameworks pass configuration as flat string maps. [`Properties`]
//! gives typed, error-reporting access to such a map; the client, sink and
//! source crates build their own option structs on top of it.

mod properties;

pub use properties::Properties;
