mod common;

use std::sync::Arc;
use typeconsole::components::dialog::DialogKind;
use typeconsole::components::filters::{filter_fragment_url, parse_filter, InputShape};
use typeconsole::components::rows::{Collection, RowKey};
use typeconsole::console::Action;
use typeconsole::form::Form;
use typeconsole::transport::ServerResponse;
use typeconsole::view::{Binding, Fragment};

const PRICE_FILTER: &str = r#"<div class="filter">
  <select class="filter-field"><option value="id">id</option><option value="price" selected>price</option></select>
  <select class="filter-comparison"><option value="=">=</option><option value="&gt;" selected>&gt;</option></select>
  <input class="filter-value" name="filters:1:value">
</div>"#;

#[test]
fn test_parse_single_value_filter() {
    let fragment = Fragment::parse(PRICE_FILTER).unwrap();
    let spec = parse_filter(&fragment, 1).unwrap();

    assert_eq!(spec.ordinal, 1);
    assert_eq!(spec.target_field, "price");
    assert_eq!(spec.comparison_operator, ">");
    assert_eq!(spec.input_shape, InputShape::Single);
}

#[test]
fn test_parse_list_and_text_filters() {
    let list = Fragment::parse(
        r#"<div><select class="filter-field"><option>status</option></select>
        <select class="filter-comparison"><option>in</option></select>
        <select class="filter-value" multiple><option>new</option></select></div>"#,
    )
    .unwrap();
    assert_eq!(parse_filter(&list, 0).unwrap().input_shape, InputShape::List);

    let text = Fragment::parse(
        r#"<div><select class="filter-field"><option>notes</option></select>
        <textarea class="filter-value"></textarea></div>"#,
    )
    .unwrap();
    let spec = parse_filter(&text, 0).unwrap();
    assert_eq!(spec.input_shape, InputShape::FreeText);
    assert_eq!(spec.target_field, "notes");
    assert_eq!(spec.comparison_operator, "=");
}

#[test]
fn test_filter_url_replaces_previous_ordinal() {
    let page = url::Url::parse("http://localhost:8080/en/product?filter_component=0").unwrap();
    let url = filter_fragment_url(&page, 3, Some("price"));
    assert_eq!(url.as_str(), "http://localhost:8080/en/product/id/price?filter_component=3");
}

#[tokio::test]
async fn test_add_filter_creates_row() {
    let backend = Arc::new(common::MockBackend::new().with_fragment(ServerResponse::ok(PRICE_FILTER)));
    let mut console = common::console(backend.clone());
    let form = console.add_form(Form::new(common::form_config()));

    console.handle_action(Action::AddFilter(form));
    common::settle_next(&mut console).await;

    let requested = backend.fragment_urls.lock().unwrap().clone();
    assert_eq!(requested[0].query(), Some("filter_component=0"));

    let row = console
        .form(form)
        .unwrap()
        .rows()
        .get(&RowKey::new(Collection::Filters, 0))
        .unwrap()
        .clone();
    assert_eq!(row.filter().unwrap().target_field, "price");
    assert_eq!(row.sub_value("name"), Some("price".to_string()));
}

#[tokio::test]
async fn test_change_filter_field_requests_field_fragment() {
    let backend = Arc::new(common::MockBackend::new().with_fragment(ServerResponse::ok(PRICE_FILTER)));
    let mut console = common::console(backend.clone());
    let form = console.add_form(Form::new(common::form_config()));

    console.handle_action(Action::AddFilter(form));
    common::settle_next(&mut console).await;
    console.handle_action(Action::ChangeFilterField {
        form,
        key: RowKey::new(Collection::Filters, 0),
        field: "price".to_string(),
    });
    common::settle_next(&mut console).await;

    let requested = backend.fragment_urls.lock().unwrap().clone();
    assert_eq!(requested[1].path(), "/en/product/id/price");
    assert_eq!(console.form(form).unwrap().rows().len(), 1);
}

#[tokio::test]
async fn test_failed_filter_shows_alert() {
    let backend = Arc::new(common::MockBackend::new().with_fragment(ServerResponse::new(404, "Unknown field")));
    let mut console = common::console(backend);
    let form = console.add_form(Form::new(common::form_config()));

    console.handle_action(Action::AddFilter(form));
    common::settle_next(&mut console).await;

    let dialog = console.dialog().unwrap();
    assert_eq!(dialog.kind, DialogKind::Alert);
    assert_eq!(dialog.message, "Unknown field");
    assert!(console.form(form).unwrap().rows().is_empty());
}

#[tokio::test]
async fn test_filter_controls_act_on_their_row() {
    let markup = r#"<div class="filter">
      <select class="filter-field"><option value="id">id</option><option value="price" selected>price</option></select>
      <input class="filter-value" name="filters:0:value">
      <button class="delete-row">Remove</button>
    </div>"#;
    let backend = Arc::new(common::MockBackend::new().with_fragment(ServerResponse::ok(markup)));
    let mut console = common::console(backend.clone());
    let form = console.add_form(Form::new(common::form_config()));
    let key = RowKey::new(Collection::Filters, 0);

    console.handle_action(Action::AddFilter(form));
    common::settle_next(&mut console).await;
    let node = console.row_node(form, key).unwrap();
    let (selector, _) = console
        .view()
        .bindings_under(node)
        .into_iter()
        .find(|(_, binding)| matches!(binding, Binding::FilterFieldSelector { .. }))
        .unwrap();

    common::handle_all(
        &mut console,
        Action::ChangeSelector {
            node: selector,
            form: None,
            value: "id".to_string(),
        },
    );
    common::settle_next(&mut console).await;

    let requested = backend.fragment_urls.lock().unwrap().clone();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested[1].as_str(), "http://localhost:8080/en/product?filter_component=0");

    let reloaded = console.row_node(form, key).unwrap();
    assert!(!console.view().contains(node));
    assert_eq!(console.view().children(console.view().root()), &[reloaded]);

    let (delete, _) = console
        .view()
        .bindings_under(reloaded)
        .into_iter()
        .find(|(_, binding)| matches!(binding, Binding::DeleteRow))
        .unwrap();
    common::handle_all(
        &mut console,
        Action::ActivateControl {
            node: delete,
            form: None,
            multi: false,
        },
    );

    assert!(console.form(form).unwrap().rows().get(&key).is_none());
    assert_eq!(console.row_node(form, key), None);
    assert!(!console.view().contains(reloaded));
}
