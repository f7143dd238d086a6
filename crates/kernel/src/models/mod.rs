//! Database models.

pub mod content;
pub mod link;
pub mod tag;

pub use content::ModVersion;
pub use link::{ModTagLink, NewsTagLink};
pub use tag::{CreateTag, Tag, TagWithUsage, UpdateTag};
