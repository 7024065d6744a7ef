use super::actions::Action;
use super::context::PageSession;
use super::task_manager::{TaskId, TaskManager};
use crate::components::dialog::{ConfirmPurpose, Dialog, DialogKind, DialogSlot};
use crate::components::dispatcher::{ActionDispatcher, ActionKind, Begin, Effect, SubmitPlan};
use crate::components::editor::{EditorAdapter, EditorEdit};
use crate::components::filters::{filter_fragment_url, parse_filter};
use crate::components::loader::{LoadOutcome, PartialViewLoader, ViewRequest};
use crate::components::rows::{Collection, Row, RowKey, RowSetEditor};
use crate::components::upload::UploadProgressTracker;
use crate::config::StringsConfig;
use crate::constants::{ERROR_TYPE_LISTING, ROW_NAME};
use crate::form::{BinaryInput, Form, FormId};
use crate::logger::Logger;
use crate::transport::{BackendError, ConsoleBackend, ServerResponse};
use crate::utils::bytes::progress_text;
use crate::view::{Binding, Fragment, NodeId, ViewError, ViewTree};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Logged-in user display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub visible: bool,
    pub user_name: String,
}

struct ActiveSubmission {
    form: FormId,
    task_id: TaskId,
    tracker: Option<UploadProgressTracker>,
}

/// Owner of all interaction state of one page.
///
/// Every user interaction and every background result is an [`Action`]
/// handled on the caller's thread; network work runs on tokio tasks.
pub struct Console {
    session: PageSession,
    forms: HashMap<FormId, Form>,
    view: ViewTree,
    /// Mounted row fragments and the form row each one renders
    row_nodes: HashMap<NodeId, (FormId, RowKey)>,
    dialog: DialogSlot,
    dispatcher: ActionDispatcher,
    submission: Option<ActiveSubmission>,
    editors: Vec<EditorAdapter>,
    identity: Identity,
    pending_navigation: Option<Url>,
    navigation: Option<Url>,
    strings: StringsConfig,
    task_manager: TaskManager,
    background_action_rx: mpsc::UnboundedReceiver<Action>,
    logger: Logger,
}

impl Console {
    pub fn new(session: PageSession, backend: Arc<dyn ConsoleBackend>, strings: StringsConfig, logger: Logger) -> Self {
        let (task_manager, background_action_rx) = TaskManager::new(backend);

        Self {
            session,
            forms: HashMap::new(),
            view: ViewTree::new(),
            row_nodes: HashMap::new(),
            dialog: DialogSlot::new(strings.clone()),
            dispatcher: ActionDispatcher::new(),
            submission: None,
            editors: Vec::new(),
            identity: Identity::default(),
            pending_navigation: None,
            navigation: None,
            strings,
            task_manager,
            background_action_rx,
            logger,
        }
    }

    /// Register a server-rendered form, seeding the row counters past its rows
    pub fn add_form(&mut self, form: Form) -> FormId {
        for collection in [Collection::Fields, Collection::Indexes, Collection::Filters] {
            if let Some(max) = form.rows().max_index(collection) {
                self.session.seed(collection, max + 1);
            }
        }

        let id = form.id();
        self.logger.log(format!("Form: Registered {} posting to {}", id, form.config().target_url));
        self.forms.insert(id, form);
        id
    }

    /// Mount a server-rendered fragment under `parent`
    pub fn mount_fragment(&mut self, parent: NodeId, html: &str) -> Result<NodeId, ViewError> {
        let fragment = Fragment::parse(html)?;
        self.view.mount(parent, fragment)
    }

    /// Mount the server-rendered markup of one form row under `parent`
    pub fn mount_row(&mut self, form: FormId, key: RowKey, parent: NodeId, html: &str) -> Result<NodeId, ViewError> {
        let node = self.mount_fragment(parent, html)?;
        self.row_nodes.insert(node, (form, key));
        Ok(node)
    }

    /// Mounted fragment rendering `key` of `form`
    pub fn row_node(&self, form: FormId, key: RowKey) -> Option<NodeId> {
        self.row_nodes
            .iter()
            .find(|(_, row)| **row == (form, key))
            .map(|(node, _)| *node)
    }

    /// Form row whose fragment contains `node`
    fn row_of(&self, node: NodeId) -> Option<(FormId, RowKey)> {
        self.view
            .ancestors(node)
            .into_iter()
            .find_map(|id| self.row_nodes.get(&id).copied())
    }

    /// Attach the configured editor to a textarea; false when the field has none
    pub fn attach_editor(&mut self, form: FormId, field: &str) -> bool {
        let Some(adapter) = self.forms.get(&form).and_then(|form| EditorAdapter::attach(form, field)) else {
            return false;
        };
        self.editors.push(adapter);
        true
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    pub fn form(&self, id: FormId) -> Option<&Form> {
        self.forms.get(&id)
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.current()
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn editor(&self, form: FormId, field: &str) -> Option<&EditorAdapter> {
        self.editors
            .iter()
            .find(|adapter| adapter.form() == form && adapter.field() == field)
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Whether leaving the page needs confirmation
    pub fn navigation_blocked(&self) -> bool {
        self.forms
            .values()
            .any(|form| form.config().unload_guard && form.is_dirty())
    }

    /// Address the page should navigate to, once per request
    pub fn take_navigation(&mut self) -> Option<Url> {
        self.navigation.take()
    }

    /// Whether background operations are still running
    pub fn is_busy(&self) -> bool {
        self.task_manager.task_count() > 0
    }

    /// Drain results reported by background tasks
    pub fn process_background_actions(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        while let Ok(action) = self.background_action_rx.try_recv() {
            actions.push(action);
        }

        let finished = self.task_manager.cleanup_finished_tasks();
        if !finished.is_empty() {
            self.logger
                .log(format!("Background: Cleaned up {} finished tasks", finished.len()));
        }

        actions
    }

    /// Wait for the next background result
    pub async fn next_background_action(&mut self) -> Option<Action> {
        self.background_action_rx.recv().await
    }

    /// Handle one action, returning a follow-up action or [`Action::None`]
    pub fn handle_action(&mut self, action: Action) -> Action {
        match action {
            Action::None => Action::None,

            Action::AddFieldRow(form_id) => {
                let Some(form) = self.forms.get_mut(&form_id) else {
                    return self.unknown_form(form_id);
                };
                form.mark_dirty();
                self.logger.log("Rows: Loading type names for a new field row".to_string());
                self.task_manager.spawn_type_listing(form_id);
                Action::None
            }
            Action::TypeNamesLoaded { form, names } => {
                let Some(form) = self.forms.get_mut(&form) else {
                    return self.unknown_form(form);
                };
                let key = RowSetEditor::add_field_row(&mut self.session, form, &names);
                self.logger.log(format!("Rows: Added field row {}", key));
                Action::None
            }
            Action::TypeNamesFailed { form: _, error } => {
                self.logger.log(format!("Rows: Type listing failed: {}", error));
                self.dialog
                    .show(Dialog::error(format!("{}: {}", ERROR_TYPE_LISTING, error.user_message())));
                Action::None
            }
            Action::AddIndexRow(form_id) => {
                let Some(form) = self.forms.get_mut(&form_id) else {
                    return self.unknown_form(form_id);
                };
                let key = RowSetEditor::add_index_row(&mut self.session, form);
                self.logger.log(format!("Rows: Added index row {}", key));
                Action::None
            }
            Action::DeleteRow { form, key } => {
                let Some(form) = self.forms.get_mut(&form) else {
                    return self.unknown_form(form);
                };
                let form_id = form.id();
                match RowSetEditor::delete_row(form, &key) {
                    Ok(_) => self.logger.log(format!("Rows: Deleted row {}", key)),
                    Err(e) => self.logger.log(format!("Rows: {}", e)),
                }
                if let Some(node) = self.row_node(form_id, key) {
                    self.row_nodes.remove(&node);
                    if let Err(e) = self.view.remove(node) {
                        self.logger.log(format!("View: {}", e));
                    }
                }
                Action::None
            }

            Action::AddFilter(form) => {
                if !self.forms.contains_key(&form) {
                    return self.unknown_form(form);
                }
                let key = self.session.next_key(Collection::Filters);
                let url = filter_fragment_url(self.session.page_url(), key.index(), None);
                self.logger.log(format!("Filters: Requesting filter {}", key.index()));
                self.task_manager.spawn_filter_load(form, key, url);
                Action::None
            }
            Action::ChangeFilterField { form, key, field } => {
                let url = filter_fragment_url(self.session.page_url(), key.index(), Some(&field));
                self.logger
                    .log(format!("Filters: Filter {} now targets '{}'", key.index(), field));
                self.task_manager.spawn_filter_load(form, key, url);
                Action::None
            }
            Action::FilterLoaded { form, key, response } => {
                self.apply_filter(form, key, Ok(response));
                Action::None
            }
            Action::FilterFailed { form, key, error } => {
                self.apply_filter(form, key, Err(error));
                Action::None
            }

            Action::ActivateControl { node, form, multi } => self.activate_control(node, form, multi),
            Action::SetControlChecked { node, checked } => {
                self.set_control_checked(node, checked);
                Action::None
            }
            Action::ChangeSelector { node, form, value } => self.change_selector(node, form, &value),
            Action::FragmentLoaded { anchor, response } => {
                self.apply_fragment(anchor, Ok(response));
                Action::None
            }
            Action::FragmentFailed { anchor, error } => {
                self.apply_fragment(anchor, Err(error));
                Action::None
            }

            Action::Submit { form, action, anchor } => self.submit(form, action, anchor),
            Action::Confirm(accepted) => self.confirm(accepted),
            Action::UploadProgress(sample) => {
                if let Some(tracker) = self.submission.as_mut().and_then(|active| active.tracker.as_mut()) {
                    let report = tracker.sample(sample);
                    self.dialog.update_progress(report.text);
                }
                Action::None
            }
            Action::CancelUpload => {
                self.cancel_upload();
                Action::None
            }
            Action::SubmissionCompleted { form, response } => {
                self.complete_submission(form, Ok(response));
                Action::None
            }
            Action::SubmissionFailed { form, error } => {
                self.complete_submission(form, Err(error));
                Action::None
            }

            Action::FieldEdited { form, field, value } => {
                let Some(form) = self.forms.get_mut(&form) else {
                    return self.unknown_form(form);
                };
                if !form.edit_value(&field, &value) {
                    self.logger.log(format!("Form: No field named '{}'", field));
                }
                Action::None
            }
            Action::EditContent { form, field, edit } => self.edit_content(form, &field, edit),
            Action::ContentChanged(change) => {
                let Some(form) = self.forms.get_mut(&change.form) else {
                    return self.unknown_form(change.form);
                };
                form.set_value(&change.field, &change.value);
                form.mark_dirty();
                Action::None
            }
            Action::SelectFile { form, field, file } => {
                let locale = self.session.locale().to_string();
                self.with_binary(form, &field, |input| input.select_file(file, &locale));
                Action::None
            }
            Action::ClearFile { form, field } => {
                self.with_binary(form, &field, |input| input.clear());
                Action::None
            }
            Action::SetNull { form, field, checked } => {
                self.with_binary(form, &field, |input| input.set_null(checked));
                Action::None
            }
            Action::SetAllChecked { form, checked } => {
                if let Some(form) = self.forms.get_mut(&form) {
                    form.set_all_checked(checked);
                }
                Action::None
            }
            Action::SetRowChecked { form, key, checked } => {
                if let Some(form) = self.forms.get_mut(&form) {
                    form.set_row_checked(&key, checked);
                }
                Action::None
            }

            Action::DismissDialog => match self.dialog.current().map(|dialog| dialog.kind) {
                Some(DialogKind::Progress) => {
                    self.cancel_upload();
                    Action::None
                }
                Some(DialogKind::Confirm(_)) => self.confirm(false),
                _ => match self.dialog.dismiss() {
                    Some(target) => Action::Navigate(target),
                    None => Action::None,
                },
            },
            Action::Navigate(url) => {
                if self.navigation_blocked() {
                    self.logger
                        .log(format!("Navigation: Unsaved changes, confirming before leaving for {}", url));
                    // One prompt per page; a later request only changes where it leads
                    if self.pending_navigation.replace(url).is_none() {
                        self.dialog.show(Dialog::confirm(
                            ConfirmPurpose::Navigation,
                            self.strings.unsaved_changes.clone(),
                        ));
                    }
                } else {
                    self.logger.log(format!("Navigation: Leaving for {}", url));
                    self.navigation = Some(url);
                }
                Action::None
            }
        }
    }

    fn unknown_form(&self, form: FormId) -> Action {
        self.logger.log(format!("Form: Unknown form {}", form));
        Action::None
    }

    fn with_binary(&mut self, form: FormId, field: &str, update: impl FnOnce(&mut BinaryInput)) {
        let Some(form) = self.forms.get_mut(&form) else {
            return;
        };
        match form.binary_mut(field) {
            Some(input) => {
                update(input);
                form.mark_dirty();
            }
            None => self.logger.log(format!("Form: No binary field named '{}'", field)),
        }
    }

    fn edit_content(&mut self, form: FormId, field: &str, edit: EditorEdit) -> Action {
        let adapter = self
            .editors
            .iter_mut()
            .find(|adapter| adapter.form() == form && adapter.field() == field);

        match adapter.and_then(|adapter| adapter.edit(edit)) {
            Some(change) => Action::ContentChanged(change),
            None => Action::None,
        }
    }

    fn apply_filter(&mut self, form_id: FormId, key: RowKey, result: Result<ServerResponse, BackendError>) {
        let parsed = match result {
            Ok(response) if response.is_ok() => Fragment::parse(&response.body)
                .and_then(|fragment| parse_filter(&fragment, key.index()).map(|spec| (fragment, spec)))
                .map_err(|_| response.body),
            Ok(response) => Err(response.body),
            Err(error) => Err(error.user_message()),
        };

        let (fragment, spec) = match parsed {
            Ok(parsed) => parsed,
            Err(message) => {
                self.logger.log(format!("Filters: Filter {} failed to load", key.index()));
                self.dialog.show(Dialog::alert(message));
                return;
            }
        };

        let Some(form) = self.forms.get_mut(&form_id) else {
            return;
        };
        let target_field = spec.target_field.clone();
        match form.rows_mut().get_mut(&key) {
            Some(row) => {
                row.set_sub_value(ROW_NAME, &target_field);
                row.set_filter(spec);
            }
            None => {
                let mut row = Row::new(key);
                row.set_sub_value(ROW_NAME, &target_field);
                row.set_filter(spec);
                form.rows_mut().push(row);
            }
        }
        self.logger
            .log(format!("Filters: Filter {} targets '{}'", key.index(), target_field));

        let mounted = match self.row_node(form_id, key) {
            Some(node) => {
                self.row_nodes.remove(&node);
                self.view.replace(node, fragment)
            }
            None => {
                let root = self.view.root();
                self.view.mount(root, fragment)
            }
        };
        match mounted {
            Ok(node) => {
                self.row_nodes.insert(node, (form_id, key));
            }
            Err(e) => self.logger.log(format!("View: {}", e)),
        }
    }

    fn request_view(&mut self, request: ViewRequest) -> Action {
        match request {
            ViewRequest::Fragment { anchor, url } => {
                self.logger.log(format!("View: Loading fragment {}", url));
                self.task_manager.spawn_fragment_load(anchor, url);
                Action::None
            }
            ViewRequest::Navigate(url) => Action::Navigate(url),
        }
    }

    fn apply_fragment(&mut self, anchor: NodeId, result: Result<ServerResponse, BackendError>) {
        match PartialViewLoader::apply(&mut self.view, anchor, result) {
            LoadOutcome::Replaced(node) => self.logger.log(format!("View: Listing replaced by {}", node)),
            LoadOutcome::Stale => self.logger.log(format!("View: Dropped result for stale anchor {}", anchor)),
            LoadOutcome::Alert(message) => self.dialog.show(Dialog::alert(message)),
        }
    }

    fn activate_control(&mut self, node: NodeId, form: Option<FormId>, multi: bool) -> Action {
        let Some(binding) = self.view.binding(node).cloned() else {
            self.logger.log(format!("View: No control at {}", node));
            return Action::None;
        };
        let page_url = self.session.page_url().clone();

        let request = match binding {
            Binding::SortAnchor {
                href,
                component,
                multi_order,
            } => PartialViewLoader::sort(&page_url, node, &href, component.as_deref(), multi_order.as_deref(), multi),
            Binding::PageAnchor { href, component } => {
                PartialViewLoader::page(&page_url, node, &href, component.as_deref())
            }
            Binding::SubmitButton { action, .. } | Binding::ExportButton { action } => {
                return match form {
                    Some(form) => Action::Submit {
                        form,
                        action: ActionKind::parse(&action),
                        anchor: Some(node),
                    },
                    None => Action::None,
                };
            }
            Binding::SelectAll | Binding::ItemCheckbox { .. } => {
                let checked = !self.view.is_checked(node);
                self.set_control_checked(node, checked);
                return Action::None;
            }
            Binding::DeleteRow => {
                return match self.row_of(node) {
                    Some((form, key)) => Action::DeleteRow { form, key },
                    None => {
                        self.logger.log(format!("View: Delete button {} is outside any row", node));
                        Action::None
                    }
                };
            }
            other => {
                self.logger.log(format!("View: {:?} is not activatable", other));
                return Action::None;
            }
        };

        match request {
            Ok(request) => self.request_view(request),
            Err(e) => {
                self.logger.log(format!("View: {}", e));
                Action::None
            }
        }
    }

    fn change_selector(&mut self, node: NodeId, form: Option<FormId>, value: &str) -> Action {
        let Some(binding) = self.view.binding(node).cloned() else {
            return Action::None;
        };
        let page_url = self.session.page_url().clone();

        match binding {
            Binding::PageSizeSelector { component, .. } => {
                let data_url = form
                    .and_then(|form| self.forms.get(&form))
                    .and_then(|form| form.config().data_url.clone());
                let request =
                    PartialViewLoader::page_size(&page_url, data_url.as_ref(), node, component.as_deref(), value);
                self.request_view(request)
            }
            Binding::ParameterSelector { parameter, .. } => {
                self.request_view(PartialViewLoader::parameter(&page_url, &parameter, value))
            }
            Binding::FilterFieldSelector { .. } => match self.row_of(node) {
                Some((form, key)) => Action::ChangeFilterField {
                    form,
                    key,
                    field: value.to_string(),
                },
                None => {
                    self.logger.log(format!("View: Filter selector {} is outside any row", node));
                    Action::None
                }
            },
            _ => Action::None,
        }
    }

    fn set_control_checked(&mut self, node: NodeId, checked: bool) {
        if let Err(e) = self.view.set_checked(node, checked) {
            self.logger.log(format!("View: {}", e));
        }
    }

    fn submit(&mut self, form_id: FormId, action: ActionKind, anchor: Option<NodeId>) -> Action {
        let component = anchor.and_then(|node| match self.view.binding(node) {
            Some(Binding::SubmitButton { component, .. }) => component.clone(),
            _ => None,
        });
        let selection = anchor
            .map(|node| self.view.checked_items(node))
            .unwrap_or_default();
        let Some(form) = self.forms.get_mut(&form_id) else {
            return self.unknown_form(form_id);
        };
        let component = component.or_else(|| form.config().component_id.clone());

        match self
            .dispatcher
            .begin_with_selection(form, action, anchor, component, selection)
        {
            Ok(Begin::Confirm(prompt)) => {
                self.dialog.show(Dialog::confirm(ConfirmPurpose::Dispatch, prompt));
            }
            Ok(Begin::Submit(plan)) => self.start_submission(plan),
            Err(e) => self.logger.log(format!("Submit: Refused: {}", e)),
        }
        Action::None
    }

    /// Answer the visible confirmation dialog
    fn confirm(&mut self, accepted: bool) -> Action {
        match self.dialog.current().map(|dialog| dialog.kind) {
            Some(DialogKind::Confirm(ConfirmPurpose::Dispatch)) => self.confirm_dispatch(accepted),
            Some(DialogKind::Confirm(ConfirmPurpose::Navigation)) => self.confirm_navigation(accepted),
            _ => {
                self.logger.log("Dialog: No confirmation to answer".to_string());
                Action::None
            }
        }
    }

    fn confirm_dispatch(&mut self, accepted: bool) -> Action {
        self.dialog.dismiss();
        let Some(form_id) = self.dispatcher.pending_form() else {
            return Action::None;
        };
        let Some(form) = self.forms.get_mut(&form_id) else {
            return self.unknown_form(form_id);
        };

        match self.dispatcher.resolve_confirmation(form, accepted) {
            Ok(Some(plan)) => self.start_submission(plan),
            Ok(None) => self.logger.log("Submit: Declined".to_string()),
            Err(e) => self.logger.log(format!("Submit: {}", e)),
        }
        Action::None
    }

    fn confirm_navigation(&mut self, accepted: bool) -> Action {
        self.dialog.dismiss();
        if let Some(url) = self.pending_navigation.take() {
            if accepted {
                self.logger.log(format!("Navigation: Leaving for {} with unsaved changes", url));
                self.navigation = Some(url);
            }
        }
        Action::None
    }

    fn start_submission(&mut self, plan: SubmitPlan) {
        let tracker = plan.track_upload.then(|| {
            let locale = self.session.locale();
            self.dialog
                .interrupt(Dialog::progress(progress_text(0, plan.request.payload_len(), 0.0, locale)));
            UploadProgressTracker::new(locale)
        });

        self.logger
            .log(format!("Submit: Sending {} to {}", plan.action, plan.request.url));
        let task_id = self
            .task_manager
            .spawn_submission(plan.form, plan.request, plan.track_upload);

        self.submission = Some(ActiveSubmission {
            form: plan.form,
            task_id,
            tracker,
        });
    }

    fn cancel_upload(&mut self) {
        let Some(active) = self.submission.take() else {
            return;
        };
        if active.tracker.is_none() {
            self.submission = Some(active);
            return;
        }

        self.task_manager.abort(active.task_id);
        if let Some(form) = self.forms.get_mut(&active.form) {
            self.dispatcher.cancel(form);
        }
        self.dialog.dismiss();
        self.logger.log("Submit: Upload canceled".to_string());
    }

    fn complete_submission(&mut self, form_id: FormId, result: Result<ServerResponse, BackendError>) {
        if self.submission.as_ref().map(|active| active.form) == Some(form_id) {
            self.submission = None;
        }
        let page_url = self.session.page_url().clone();
        let Some(form) = self.forms.get_mut(&form_id) else {
            return;
        };

        let interpretation = match self.dispatcher.complete(form, &page_url, result) {
            Ok(interpretation) => interpretation,
            Err(e) => {
                self.logger.log(format!("Submit: Ignoring result: {}", e));
                return;
            }
        };
        let data_url = form.config().data_url.clone();

        match self.dialog.current().map(|dialog| dialog.kind) {
            Some(DialogKind::Progress) => self.dialog.replace(interpretation.dialog),
            _ => self.dialog.show(interpretation.dialog),
        }

        for effect in interpretation.effects {
            match effect {
                Effect::RefreshListing { anchor, component } => match (anchor, data_url.clone()) {
                    (Some(anchor), Some(url)) => {
                        let request = PartialViewLoader::request(anchor, url, component.as_deref());
                        if let ViewRequest::Fragment { anchor, url } = request {
                            self.logger.log(format!("View: Refreshing listing {}", url));
                            self.task_manager.spawn_fragment_load(anchor, url);
                        }
                    }
                    _ => self.logger.log("View: Nothing to refresh".to_string()),
                },
                Effect::ShowIdentity { user } => {
                    self.identity = Identity {
                        visible: true,
                        user_name: user,
                    };
                }
                Effect::HideIdentity => self.identity.visible = false,
                Effect::ClearSelection { anchor } => {
                    let removed = self.view.remove_checked_items(anchor);
                    self.logger.log(format!("View: Removed {} dropped items", removed));
                }
            }
        }
    }
}
