use crate::components::dispatcher::ActionKind;
use crate::components::editor::{ContentChange, EditorEdit};
use crate::components::rows::RowKey;
use crate::form::FormId;
use crate::transport::{BackendError, SelectedFile, ServerResponse, TransferSample};
use crate::view::NodeId;
use url::Url;

#[derive(Debug, Clone)]
pub enum Action {
    // Rows
    AddFieldRow(FormId),
    AddIndexRow(FormId),
    TypeNamesLoaded {
        form: FormId,
        names: Vec<String>,
    },
    TypeNamesFailed {
        form: FormId,
        error: BackendError,
    },
    DeleteRow {
        form: FormId,
        key: RowKey,
    },

    // Filters
    AddFilter(FormId),
    ChangeFilterField {
        form: FormId,
        key: RowKey,
        field: String,
    },
    FilterLoaded {
        form: FormId,
        key: RowKey,
        response: ServerResponse,
    },
    FilterFailed {
        form: FormId,
        key: RowKey,
        error: BackendError,
    },

    // Partial views
    ActivateControl {
        node: NodeId,
        form: Option<FormId>,
        /// Ctrl-activation of a sort header
        multi: bool,
    },
    /// Set a listing checkbox; "all" carries the listing along
    SetControlChecked {
        node: NodeId,
        checked: bool,
    },
    ChangeSelector {
        node: NodeId,
        form: Option<FormId>,
        value: String,
    },
    FragmentLoaded {
        anchor: NodeId,
        response: ServerResponse,
    },
    FragmentFailed {
        anchor: NodeId,
        error: BackendError,
    },

    // Submissions
    Submit {
        form: FormId,
        action: ActionKind,
        anchor: Option<NodeId>,
    },
    Confirm(bool),
    UploadProgress(TransferSample),
    CancelUpload,
    SubmissionCompleted {
        form: FormId,
        response: ServerResponse,
    },
    SubmissionFailed {
        form: FormId,
        error: BackendError,
    },

    // Form edits
    FieldEdited {
        form: FormId,
        field: String,
        value: String,
    },
    EditContent {
        form: FormId,
        field: String,
        edit: EditorEdit,
    },
    ContentChanged(ContentChange),
    SelectFile {
        form: FormId,
        field: String,
        file: SelectedFile,
    },
    ClearFile {
        form: FormId,
        field: String,
    },
    SetNull {
        form: FormId,
        field: String,
        checked: bool,
    },
    SetAllChecked {
        form: FormId,
        checked: bool,
    },
    SetRowChecked {
        form: FormId,
        key: RowKey,
        checked: bool,
    },

    // Page
    DismissDialog,
    Navigate(Url),
    None,
}
