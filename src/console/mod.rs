//! Interaction core of the console.
//!
//! This module ties the components together: every user interaction and
//! every background result is an [`Action`] handled by the [`Console`].
//!
//! # Module Components
//!
//! - [`actions`] - Action definitions
//! - [`app`] - The page-level owner of forms, views and dialogs
//! - [`context`] - Per-page session state and row counters
//! - [`task_manager`] - Background network operations on tokio
//!
//! # Architecture
//!
//! 1. **Actions** describe what happened, from the user or from a task
//! 2. **Console** mutates page state in response, on one thread
//! 3. **Tasks** run requests and report back over a channel

pub mod actions;
pub mod app;
pub mod context;
pub mod task_manager;

pub use actions::Action;
pub use app::{Console, Identity};
pub use context::PageSession;
pub use task_manager::{TaskId, TaskManager};
