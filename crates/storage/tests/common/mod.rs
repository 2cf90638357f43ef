pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{archived_store, chunk_key};
