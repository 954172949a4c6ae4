//! File watching for the dev session
//!
//! A change is reported once its content actually differs, after the project
//! has been quiet for the debounce period.

mod cache;
mod event;
mod filter;
mod use_case;


pub use cache::{compute_content_hash, ContentTracker};
pub use event::{WatcherState, DEBOUNCE_MS};
pub use filter::WatchFilter;
pub use use_case::ProjectWatcher;
