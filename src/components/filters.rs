//! Filter rows of a listing's search form.
//!
//! Each filter row is a server-rendered fragment requested with its ordinal.
//! Changing the target field re-requests the fragment so the comparison
//! operator and value input match the field's kind.

use crate::constants::PARAM_FILTER_COMPONENT;
use crate::view::{Fragment, ViewError};
use url::Url;

/// Shape of a filter's value input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    Single,
    List,
    FreeText,
}

/// One filter row: which field is compared, how, and with what kind of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub ordinal: u32,
    pub target_field: String,
    pub comparison_operator: String,
    pub input_shape: InputShape,
}

/// Address of the fragment for filter `ordinal`, narrowed to `field` when given.
///
/// The field segment is left out for `id`, which the server treats as the default.
pub fn filter_fragment_url(page_url: &Url, ordinal: u32, field: Option<&str>) -> Url {
    let mut url = page_url.clone();

    if let Some(field) = field.filter(|field| *field != "id") {
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/id/{}", path, field));
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != PARAM_FILTER_COMPONENT)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PARAM_FILTER_COMPONENT, &ordinal.to_string());

    url
}

/// Read the filter a fragment renders
pub fn parse_filter(fragment: &Fragment, ordinal: u32) -> Result<FilterSpec, ViewError> {
    if fragment.elements().is_empty() {
        return Err(ViewError::EmptyFragment);
    }

    let target_field = fragment
        .find_by_class("filter-field")
        .and_then(|select| select.selected.clone())
        .unwrap_or_else(|| "id".to_string());

    let comparison_operator = fragment
        .find_by_class("filter-comparison")
        .and_then(|select| select.selected.clone())
        .unwrap_or_else(|| "=".to_string());

    let input_shape = match fragment.find_by_class("filter-value") {
        Some(element) if element.tag == "select" && element.attr("multiple").is_some() => InputShape::List,
        Some(element) if element.has_class("filter-list") => InputShape::List,
        Some(element) if element.tag == "textarea" => InputShape::FreeText,
        _ => InputShape::Single,
    };

    Ok(FilterSpec {
        ordinal,
        target_field,
        comparison_operator,
        input_shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_url_appends_field_segment() {
        let page = Url::parse("http://localhost:8080/en/product?search=a").unwrap();
        let url = filter_fragment_url(&page, 2, Some("price"));

        assert_eq!(url.path(), "/en/product/id/price");
        assert_eq!(url.query(), Some("search=a&filter_component=2"));
    }

    #[test]
    fn test_filter_url_omits_id_field() {
        let page = Url::parse("http://localhost:8080/en/product").unwrap();
        let url = filter_fragment_url(&page, 0, Some("id"));

        assert_eq!(url.path(), "/en/product");
        assert_eq!(url.query(), Some("filter_component=0"));
    }
}
