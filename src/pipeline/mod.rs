//! Pipeline entry points for the listing watcher.
//!
//! - `run_poll`: fetch the listing page, report unseen listings, persist state
//! - `diff_and_update`: seen-set diff used by the poll

pub mod diff;
pub mod poll;

pub use diff::{SeenDiff, SeenSet, diff_and_update};
pub use poll::{EXIT_FAILURE, EXIT_NEW_FOUND, EXIT_NO_NEW, PollOutcome, Poller, run_poll};
