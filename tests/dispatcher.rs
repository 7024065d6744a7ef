mod common;

use typeconsole::components::dialog::{DialogKind, TextAlign};
use typeconsole::components::dispatcher::{ActionDispatcher, ActionKind, Begin, DispatchError, DispatchState, Effect};
use typeconsole::components::rows::{Collection, Row, RowKey};
use typeconsole::constants::{FIELD_ACTION, ROW_NAME, ROW_OLD_NAME};
use typeconsole::form::{BinaryInput, Control, ControlKind, Form};
use typeconsole::transport::{BackendError, PayloadValue, SelectedFile, ServerResponse};

fn schema_form() -> Form {
    let key = RowKey::new(Collection::Fields, 0);
    let row = Row::new(key)
        .with_input(ROW_NAME, ControlKind::Text(typeconsole::form::TextInput::new("title")), "Name")
        .with_input(ROW_OLD_NAME, ControlKind::Hidden("name".to_string()), "");

    Form::new(common::form_config())
        .with_control(Control::hidden("adate", "2024-01-01"))
        .with_row(row)
}

fn submit(dispatcher: &mut ActionDispatcher, form: &mut Form, action: ActionKind) {
    match dispatcher.begin(form, action, None, None).unwrap() {
        Begin::Submit(_) => {}
        Begin::Confirm(prompt) => panic!("unexpected confirmation: {}", prompt),
    }
}

#[test]
fn test_alter_not_altered_is_a_warning() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    form.mark_dirty();
    submit(&mut dispatcher, &mut form, ActionKind::Alter);

    let body = r#"{"message": "Nothing to alter", "altered": false}"#;
    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(body)))
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Warning);
    assert_eq!(result.dialog.message, "Nothing to alter");
    assert_eq!(form.value("fields:0:old_name"), Some("name".to_string()));
    assert_eq!(form.value("adate"), Some("2024-01-01".to_string()));
    assert!(!form.is_dirty());
}

#[test]
fn test_alter_echoes_names_into_old_names() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    submit(&mut dispatcher, &mut form, ActionKind::Alter);

    let body = r#"{"message": "Type altered", "altered": true, "adate": "2024-05-02T10:00:00Z"}"#;
    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(body)))
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Success);
    assert_eq!(form.value("fields:0:old_name"), Some("title".to_string()));
    assert_eq!(form.value("adate"), Some("2024-05-02T10:00:00Z".to_string()));
    assert_eq!(dispatcher.state(), DispatchState::Succeeded);
}

#[test]
fn test_alter_adds_missing_old_name_field() {
    let mut dispatcher = ActionDispatcher::new();
    let row = Row::new(RowKey::new(Collection::Indexes, 3))
        .with_input(ROW_NAME, ControlKind::Text(typeconsole::form::TextInput::new("by_name")), "Name");
    let mut form = Form::new(common::form_config()).with_row(row);
    submit(&mut dispatcher, &mut form, ActionKind::Alter);

    let body = r#"{"message": "ok", "altered": true, "adate": "x"}"#;
    dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(body)))
        .unwrap();

    assert_eq!(form.value("indexes:3:old_name"), Some("by_name".to_string()));
}

#[test]
fn test_declined_confirmation_sends_nothing() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();

    let begin = dispatcher.begin(&mut form, ActionKind::Drop, None, None).unwrap();
    assert_eq!(begin, Begin::Confirm("Drop the selected items?".to_string()));
    assert_eq!(dispatcher.state(), DispatchState::Confirming);

    let plan = dispatcher.resolve_confirmation(&mut form, false).unwrap();
    assert!(plan.is_none());
    assert_eq!(dispatcher.state(), DispatchState::Idle);
    assert_eq!(form.state().pending_action, None);
}

#[test]
fn test_accepted_confirmation_injects_action() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form().with_control(Control::hidden(FIELD_ACTION, "stale"));

    dispatcher.begin(&mut form, ActionKind::Delete, None, None).unwrap();
    let plan = dispatcher.resolve_confirmation(&mut form, true).unwrap().unwrap();

    let actions: Vec<&str> = plan
        .request
        .fields
        .iter()
        .filter(|(name, _)| name == FIELD_ACTION)
        .filter_map(|(_, value)| match value {
            PayloadValue::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec!["delete"]);
    assert_eq!(plan.request.text("fields:0:name"), Some("title"));
    assert_eq!(dispatcher.state(), DispatchState::InFlight);
}

#[test]
fn test_overlapping_submission_is_refused() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    submit(&mut dispatcher, &mut form, ActionKind::Insert);

    let second = dispatcher.begin(&mut form, ActionKind::Insert, None, None);
    assert_eq!(second.unwrap_err(), DispatchError::Busy(DispatchState::InFlight));
}

#[test]
fn test_failure_shows_raw_body_and_keeps_form() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    form.mark_dirty();
    submit(&mut dispatcher, &mut form, ActionKind::Alter);

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::new(409, "Field already exists")))
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Error);
    assert_eq!(result.dialog.message, "Field already exists");
    assert!(result.effects.is_empty());
    assert!(form.is_dirty());
    assert_eq!(form.value("fields:0:old_name"), Some("name".to_string()));
    assert_eq!(dispatcher.state(), DispatchState::Failed);
}

#[test]
fn test_transport_error_shows_message() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    submit(&mut dispatcher, &mut form, ActionKind::Create);

    let result = dispatcher
        .complete(
            &mut form,
            &common::page_url(),
            Err(BackendError::Network("connection refused".to_string())),
        )
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Error);
    assert!(result.dialog.message.contains("connection refused"));
}

#[test]
fn test_unreadable_json_shows_raw_body() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();
    submit(&mut dispatcher, &mut form, ActionKind::Update);

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok("<html>oops</html>")))
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Error);
    assert_eq!(result.dialog.message, "<html>oops</html>");
}

#[test]
fn test_update_resets_binary_inputs() {
    let mut dispatcher = ActionDispatcher::new();
    let mut uploaded = BinaryInput::nullable("0 B", false);
    uploaded.select_file(
        SelectedFile {
            path: "/tmp/photo.png".into(),
            file_name: "photo.png".to_string(),
            size: 1536,
        },
        "en",
    );
    let mut nulled = BinaryInput::nullable("2 KiB", true);
    nulled.set_null(true);

    let mut form = Form::new(common::form_config())
        .with_control(Control::hidden("udate", "old"))
        .with_control(Control::binary("photo", uploaded))
        .with_control(Control::binary("document", nulled));
    submit(&mut dispatcher, &mut form, ActionKind::Update);

    let body = r#"{"message": "Object updated", "udate": "2024-06-01T00:00:00Z"}"#;
    dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(body)))
        .unwrap();

    assert_eq!(form.value("udate"), Some("2024-06-01T00:00:00Z".to_string()));

    let inputs: Vec<_> = form.binary_inputs().map(|(name, input)| (name.to_string(), input.clone())).collect();
    let (_, photo) = &inputs[0];
    assert_eq!(photo.reference_size, "1.5 KiB");
    assert_eq!(photo.displayed_size, "1.5 KiB");
    assert!(!photo.clear_visible);
    assert!(photo.file.is_none());
    assert!(photo.null.unwrap().visible);

    let (_, document) = &inputs[1];
    assert_eq!(document.displayed_size, "0 B");
    assert_eq!(document.reference_size, "0 B");
    assert!(!document.null.unwrap().checked);
    assert!(!document.null.unwrap().visible);
    assert!(!document.disabled);
}

#[test]
fn test_rename_navigates_on_dismissal() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config()).with_control(Control::text("new_name", "article"));
    submit(&mut dispatcher, &mut form, ActionKind::Rename);

    let result = dispatcher
        .complete(
            &mut form,
            &common::page_url(),
            Ok(ServerResponse::ok(r#"{"message": "Type renamed"}"#)),
        )
        .unwrap();

    assert_eq!(result.dialog.message, "Type renamed");
    assert_eq!(
        result.dialog.navigate_on_dismiss.unwrap().as_str(),
        "http://localhost:8080/en/article?form=alter"
    );
}

#[test]
fn test_update_id_navigates_to_update_form() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config()).with_control(Control::text("new_id", "42"));
    submit(&mut dispatcher, &mut form, ActionKind::UpdateId);

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(r#"{"message": "Id updated"}"#)))
        .unwrap();

    assert_eq!(
        result.dialog.navigate_on_dismiss.unwrap().as_str(),
        "http://localhost:8080/en/42?form=update"
    );
}

#[test]
fn test_drop_removes_checked_rows() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config())
        .with_row(Row::new(RowKey::new(Collection::Fields, 0)))
        .with_row(Row::new(RowKey::new(Collection::Fields, 1)));
    form.set_all_checked(true);
    form.set_row_checked(&RowKey::new(Collection::Fields, 1), false);

    dispatcher.begin(&mut form, ActionKind::Drop, None, None).unwrap();
    let plan = dispatcher.resolve_confirmation(&mut form, true).unwrap().unwrap();
    assert_eq!(plan.request.text("fields:0:checked"), Some("on"));

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok("1 type dropped")))
        .unwrap();

    assert_eq!(result.dialog.message, "1 type dropped");
    assert!(!form.all_checked());
    assert_eq!(form.rows().keys(), vec![RowKey::new(Collection::Fields, 1)]);
}

#[test]
fn test_delete_requests_listing_refresh() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = schema_form();

    dispatcher
        .begin(&mut form, ActionKind::Delete, None, Some("3".to_string()))
        .unwrap();
    dispatcher.resolve_confirmation(&mut form, true).unwrap();
    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok("2 objects deleted")))
        .unwrap();

    assert_eq!(
        result.effects,
        vec![Effect::RefreshListing {
            anchor: None,
            component: Some("3".to_string())
        }]
    );
}

#[test]
fn test_import_result_is_left_aligned() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config());
    submit(&mut dispatcher, &mut form, ActionKind::ImportObjects);

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok("Imported:\n  product: 3")))
        .unwrap();

    assert_eq!(result.dialog.align, TextAlign::Left);
    assert_eq!(result.dialog.message, "Imported:\n  product: 3");
}

#[test]
fn test_other_actions_read_message() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config());
    submit(&mut dispatcher, &mut form, ActionKind::parse("archive"));

    let result = dispatcher
        .complete(&mut form, &common::page_url(), Ok(ServerResponse::ok(r#"{"message": "Archived"}"#)))
        .unwrap();

    assert_eq!(result.dialog.kind, DialogKind::Success);
    assert_eq!(result.dialog.message, "Archived");
}

#[test]
fn test_complete_without_submission() {
    let mut dispatcher = ActionDispatcher::new();
    let mut form = Form::new(common::form_config());

    let result = dispatcher.complete(&mut form, &common::page_url(), Ok(ServerResponse::ok("")));
    assert!(matches!(result, Err(DispatchError::InvalidState { .. })));
}
