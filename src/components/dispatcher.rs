//! Form submission state machine.
//!
//! A submission moves `Idle -> Confirming -> InFlight -> Succeeded | Failed`;
//! non-destructive actions skip `Confirming`. The response is interpreted per
//! action: form-local updates are applied to the form here, everything that
//! touches the rest of the page is returned as an [`Effect`].

use crate::components::dialog::{Dialog, TextAlign};
use crate::constants::{
    FIELD_ADATE, FIELD_LOGIN_USER, FIELD_NEW_ID, FIELD_NEW_NAME, FIELD_UDATE, FORM_MODE_ALTER, FORM_MODE_UPDATE,
    PARAM_FORM,
};
use crate::form::{Form, FormId};
use crate::transport::{BackendError, PayloadValue, ServerResponse, SubmitRequest};
use crate::view::NodeId;
use serde::Deserialize;
use std::fmt;
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("A submission is already {0}")]
    Busy(DispatchState),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: DispatchState,
    },

    #[error("Submission belongs to another form")]
    WrongForm,
}

/// Action identifiers the server understands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Alter,
    Rename,
    Insert,
    Update,
    UpdateId,
    UpdatePassword,
    Delete,
    ExportTypes,
    ExportObjects,
    Drop,
    ImportTypes,
    ImportObjects,
    Login,
    Logout,
    Other(String),
}

impl ActionKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "create" => ActionKind::Create,
            "alter" => ActionKind::Alter,
            "rename" => ActionKind::Rename,
            "insert" => ActionKind::Insert,
            "update" => ActionKind::Update,
            "update_id" => ActionKind::UpdateId,
            "update_password" => ActionKind::UpdatePassword,
            "delete" => ActionKind::Delete,
            "export_types" => ActionKind::ExportTypes,
            "export_objects" => ActionKind::ExportObjects,
            "drop" => ActionKind::Drop,
            "import_types" => ActionKind::ImportTypes,
            "import_objects" => ActionKind::ImportObjects,
            "login" => ActionKind::Login,
            "logout" => ActionKind::Logout,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Alter => "alter",
            ActionKind::Rename => "rename",
            ActionKind::Insert => "insert",
            ActionKind::Update => "update",
            ActionKind::UpdateId => "update_id",
            ActionKind::UpdatePassword => "update_password",
            ActionKind::Delete => "delete",
            ActionKind::ExportTypes => "export_types",
            ActionKind::ExportObjects => "export_objects",
            ActionKind::Drop => "drop",
            ActionKind::ImportTypes => "import_types",
            ActionKind::ImportObjects => "import_objects",
            ActionKind::Login => "login",
            ActionKind::Logout => "logout",
            ActionKind::Other(other) => other,
        }
    }

    /// Actions the user must confirm before anything is sent
    pub fn is_destructive(&self) -> bool {
        matches!(self, ActionKind::Delete | ActionKind::Drop)
    }

    pub fn is_import(&self) -> bool {
        matches!(self, ActionKind::ImportTypes | ActionKind::ImportObjects)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Confirming,
    InFlight,
    Succeeded,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Idle => "idle",
            DispatchState::Confirming => "awaiting confirmation",
            DispatchState::InFlight => "in flight",
            DispatchState::Succeeded => "succeeded",
            DispatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything needed to send a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPlan {
    pub form: FormId,
    pub action: ActionKind,
    pub request: SubmitRequest,
    /// Show the upload progress dialog while the body is sent
    pub track_upload: bool,
}

/// Result of starting a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Begin {
    /// Ask the user first; carries the prompt
    Confirm(String),
    Submit(SubmitPlan),
}

/// Page-level consequence of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Reload the listing the submit button belongs to
    RefreshListing { anchor: Option<NodeId>, component: Option<String> },
    /// Unmount the checked items of the listing around the submit button
    ClearSelection { anchor: NodeId },
    ShowIdentity { user: String },
    HideIdentity,
}

/// How a completed submission is presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub dialog: Dialog,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    form: FormId,
    action: ActionKind,
    anchor: Option<NodeId>,
    component: Option<String>,
    /// Checked listing items, as field name and object identifier
    selection: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct AlterBody {
    message: String,
    altered: bool,
    #[serde(default)]
    adate: Option<String>,
}

#[derive(Deserialize)]
struct UpdateBody {
    message: String,
    #[serde(default)]
    udate: Option<String>,
}

/// Drives one form submission at a time
#[derive(Debug)]
pub struct ActionDispatcher {
    state: DispatchState,
    pending: Option<Pending>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self {
            state: DispatchState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, DispatchState::Confirming | DispatchState::InFlight)
    }

    /// Form of the submission currently confirming or in flight
    pub fn pending_form(&self) -> Option<FormId> {
        self.pending.as_ref().map(|pending| pending.form)
    }

    /// Start submitting `form` with `action`, triggered from `anchor` (the submit button)
    pub fn begin(
        &mut self,
        form: &mut Form,
        action: ActionKind,
        anchor: Option<NodeId>,
        component: Option<String>,
    ) -> Result<Begin, DispatchError> {
        self.begin_with_selection(form, action, anchor, component, Vec::new())
    }

    /// Like [`begin`](Self::begin), also sending the listing items checked around `anchor`
    pub fn begin_with_selection(
        &mut self,
        form: &mut Form,
        action: ActionKind,
        anchor: Option<NodeId>,
        component: Option<String>,
        selection: Vec<(String, String)>,
    ) -> Result<Begin, DispatchError> {
        if self.is_busy() {
            return Err(DispatchError::Busy(self.state));
        }

        form.state_mut().pending_action = Some(action.clone());
        self.pending = Some(Pending {
            form: form.id(),
            action: action.clone(),
            anchor,
            component,
            selection,
        });

        if action.is_destructive() {
            self.state = DispatchState::Confirming;
            let prompt = match action {
                ActionKind::Drop => form.config().confirmations.drop.clone(),
                _ => form.config().confirmations.delete.clone(),
            };
            log::debug!("Awaiting confirmation for {}", action);
            return Ok(Begin::Confirm(prompt));
        }

        Ok(Begin::Submit(self.send(form, action)))
    }

    /// Answer the confirmation prompt; declining returns to idle without sending anything
    pub fn resolve_confirmation(&mut self, form: &mut Form, accepted: bool) -> Result<Option<SubmitPlan>, DispatchError> {
        if self.state != DispatchState::Confirming {
            return Err(DispatchError::InvalidState {
                operation: "resolve a confirmation",
                state: self.state,
            });
        }
        let action = match &self.pending {
            Some(pending) if pending.form == form.id() => pending.action.clone(),
            _ => return Err(DispatchError::WrongForm),
        };

        if !accepted {
            log::debug!("Confirmation for {} declined", action);
            self.reset(form);
            return Ok(None);
        }

        Ok(Some(self.send(form, action)))
    }

    fn send(&mut self, form: &mut Form, action: ActionKind) -> SubmitPlan {
        self.state = DispatchState::InFlight;
        log::info!("Submitting {} to {}", action, form.config().target_url);

        let mut fields = form.payload(&action);
        if let Some(pending) = self.pending.as_ref().filter(|pending| !pending.selection.is_empty()) {
            // The action identifier stays the last field
            let action_field = fields.pop();
            fields.extend(
                pending
                    .selection
                    .iter()
                    .map(|(name, value)| (name.clone(), PayloadValue::Text(value.clone()))),
            );
            fields.extend(action_field);
        }

        SubmitPlan {
            form: form.id(),
            request: SubmitRequest {
                url: form.config().target_url.clone(),
                fields,
            },
            action,
            track_upload: form.config().large_payload,
        }
    }

    /// Abandon the in-flight submission without interpreting anything
    pub fn cancel(&mut self, form: &mut Form) {
        log::info!("Submission canceled");
        self.reset(form);
    }

    fn reset(&mut self, form: &mut Form) {
        form.state_mut().pending_action = None;
        self.pending = None;
        self.state = DispatchState::Idle;
    }

    /// Interpret the server's answer, applying form-local updates.
    ///
    /// `page_url` is the address renames and identifier changes navigate from.
    pub fn complete(
        &mut self,
        form: &mut Form,
        page_url: &Url,
        result: Result<ServerResponse, BackendError>,
    ) -> Result<Interpretation, DispatchError> {
        if self.state != DispatchState::InFlight {
            return Err(DispatchError::InvalidState {
                operation: "complete a submission",
                state: self.state,
            });
        }
        let pending = match self.pending.take() {
            Some(pending) if pending.form == form.id() => pending,
            other => {
                self.pending = other;
                return Err(DispatchError::WrongForm);
            }
        };
        form.state_mut().pending_action = None;

        let response = match result {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                log::warn!("{} failed with status {}", pending.action, response.status);
                self.state = DispatchState::Failed;
                return Ok(Interpretation {
                    dialog: Dialog::error(response.body),
                    effects: Vec::new(),
                });
            }
            Err(e) => {
                log::warn!("{} failed: {}", pending.action, e);
                self.state = DispatchState::Failed;
                return Ok(Interpretation {
                    dialog: Dialog::error(e.user_message()),
                    effects: Vec::new(),
                });
            }
        };

        // The server has stored the submission; the form is no longer ahead of it.
        form.clear_dirty();

        match interpret_success(form, page_url, &pending, response.body) {
            Ok(mut interpretation) => {
                if pending.action.is_import() {
                    interpretation.dialog.align = TextAlign::Left;
                }
                self.state = DispatchState::Succeeded;
                log::info!("{} succeeded", pending.action);
                Ok(interpretation)
            }
            Err(body) => {
                log::warn!("{} returned an unreadable body", pending.action);
                self.state = DispatchState::Failed;
                Ok(Interpretation {
                    dialog: Dialog::error(body),
                    effects: Vec::new(),
                })
            }
        }
    }
}

/// Apply a 2xx response; returns the raw body back when a JSON body could not be read
fn interpret_success(form: &mut Form, page_url: &Url, pending: &Pending, body: String) -> Result<Interpretation, String> {
    let mut effects = Vec::new();

    let dialog = match &pending.action {
        ActionKind::Delete => {
            effects.push(Effect::RefreshListing {
                anchor: pending.anchor,
                component: pending.component.clone(),
            });
            Dialog::success(body)
        }
        ActionKind::Drop => {
            let removed = form.remove_checked_rows();
            log::debug!("Removed {} checked rows", removed.len());
            if let Some(anchor) = pending.anchor {
                effects.push(Effect::ClearSelection { anchor });
            }
            Dialog::success(body)
        }
        ActionKind::Alter => {
            let Ok(altered) = serde_json::from_str::<AlterBody>(&body) else {
                return Err(body);
            };
            if altered.altered {
                if let Some(adate) = altered.adate.as_deref() {
                    form.set_value(FIELD_ADATE, adate);
                }
                form.echo_old_names();
                Dialog::success(altered.message)
            } else {
                Dialog::warning(altered.message)
            }
        }
        ActionKind::Rename => {
            let Ok(renamed) = serde_json::from_str::<MessageBody>(&body) else {
                return Err(body);
            };
            let dialog = Dialog::success(renamed.message);
            match form.value(FIELD_NEW_NAME) {
                Some(name) => dialog.with_navigation(sibling_url(page_url, &name, FORM_MODE_ALTER)),
                None => dialog,
            }
        }
        ActionKind::Update => {
            let Ok(updated) = serde_json::from_str::<UpdateBody>(&body) else {
                return Err(body);
            };
            if let Some(udate) = updated.udate.as_deref() {
                form.set_value(FIELD_UDATE, udate);
            }
            form.reset_binary_inputs();
            Dialog::success(updated.message)
        }
        ActionKind::UpdateId => {
            let Ok(updated) = serde_json::from_str::<MessageBody>(&body) else {
                return Err(body);
            };
            let dialog = Dialog::success(updated.message);
            match form.value(FIELD_NEW_ID) {
                Some(id) => dialog.with_navigation(sibling_url(page_url, &id, FORM_MODE_UPDATE)),
                None => dialog,
            }
        }
        ActionKind::Login => {
            effects.push(Effect::ShowIdentity {
                user: form.value(FIELD_LOGIN_USER).unwrap_or_default(),
            });
            Dialog::success(body)
        }
        ActionKind::Logout => {
            effects.push(Effect::HideIdentity);
            Dialog::success(body)
        }
        ActionKind::Create
        | ActionKind::Insert
        | ActionKind::UpdatePassword
        | ActionKind::ExportTypes
        | ActionKind::ExportObjects
        | ActionKind::ImportTypes
        | ActionKind::ImportObjects => Dialog::success(body),
        ActionKind::Other(_) => {
            let Ok(message) = serde_json::from_str::<MessageBody>(&body) else {
                return Err(body);
            };
            Dialog::success(message.message)
        }
    };

    Ok(Interpretation { dialog, effects })
}

/// `page_url` with its last path segment replaced by `name` and `form=<mode>` set
pub fn sibling_url(page_url: &Url, name: &str, mode: &str) -> Url {
    let mut url = page_url.clone();
    let path = page_url.path();
    let parent = &path[..path.rfind('/').map(|i| i + 1).unwrap_or(0)];
    url.set_path(&format!("{}{}", parent, name));
    crate::components::loader::with_query_param(&url, PARAM_FORM, mode)
}
