//! Local evaluation of page scripts against captured HTML, and text cleanup
//! shared by every content path.

pub mod html;
pub mod text;

pub use html::Snapshot;
pub use text::clean_text;
