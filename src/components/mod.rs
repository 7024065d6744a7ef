pub mod dialog;
pub mod dispatcher;
pub mod editor;
pub mod filters;
pub mod loader;
pub mod rows;
pub mod search;
pub mod upload;

pub use dialog::{ConfirmPurpose, Dialog, DialogKind, DialogSlot, TextAlign};
pub use dispatcher::{ActionDispatcher, ActionKind, DispatchError, DispatchState};
pub use editor::{EditorAdapter, EditorMode, TextEditor};
pub use filters::{FilterSpec, InputShape};
pub use loader::{PartialViewLoader, ViewRequest};
pub use rows::{Collection, Row, RowKey, RowSetEditor};
pub use search::SearchQueue;
pub use upload::UploadProgressTracker;
