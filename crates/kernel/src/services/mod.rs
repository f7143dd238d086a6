//! Kernel services for the tag taxonomy.
//!
//! Pure helpers (`version`, `color`) feed the stateful services
//! (`taxonomy`, `tag_sync`) that run against the database.

pub mod color;
pub mod tag_sync;
pub mod taxonomy;
pub mod version;
