//! Tracks how long user-selected running applications have been active, attributing
//! elapsed time to user-defined categories. The core resolves a stable process
//! identity per executable name, accounts time through a tracked/untracked state
//! machine, and deduplicates category labels in a shared registry; foreground-change
//! detection, persistence, and any UI live outside and feed signals in through
//! [monitor] and [tracker].

pub mod app;
pub mod category;
pub mod error;
pub mod monitor;
pub mod process;
pub mod storage;
pub mod tracker;
pub mod utils;
