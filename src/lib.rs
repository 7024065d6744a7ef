//! typeconsole - client core of a schema-driven admin console
//!
//! This library implements the client-side control layer of the administrative
//! console of a data-management server: editing repeated form rows, swapping
//! server-rendered listing fragments in place, submitting forms and reading
//! their action-specific responses, tracking upload progress and running live
//! lookups. Rendering is left to the front-end that embeds it.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`config`] - Application and per-form configuration
//! * [`components`] - Row editing, partial views, dispatch, uploads, search and editors
//! * [`console`] - Action handling and background tasks
//! * [`form`] - Form controls and the unsaved-edits flag
//! * [`transport`] - Server transport interface and its HTTP implementation
//! * [`view`] - Fragment parsing and the mounted view tree
//! * [`utils`] - Number and byte-size formatting

/// Interaction components of the console
pub mod components;

/// Configuration module for managing application settings
pub mod config;

/// Action handling, page session and background task management
pub mod console;

/// Application constants and default values
pub mod constants;

/// Form model shared by the components
pub mod form;

/// Logging utilities for debugging and error tracking
pub mod logger;

/// Transport layer between the console and the server
pub mod transport;

/// Utility functions for formatting numbers and sizes
pub mod utils;

/// Server-rendered fragments and the view tree
pub mod view;
