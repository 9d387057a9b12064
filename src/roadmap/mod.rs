pub mod progress;
pub mod reorder;
pub mod summary;
pub mod timeline;
