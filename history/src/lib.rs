// The digest-history crate persists per-identity history lists and the
// remembered identity/theme as JSON documents on disk.

mod file_store;

pub use file_store::FileStore;
