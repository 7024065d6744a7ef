//! Partial view loading: fetch a listing fragment and swap it in place.

use crate::constants::{PARAM_COMPONENT, PARAM_LIMIT, PARAM_ORDER};
use crate::transport::{BackendError, ServerResponse};
use crate::view::{Fragment, NodeId, ViewError, ViewTree};
use url::Url;

/// What a listing control asks for: an in-place refresh or a full navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRequest {
    Fragment { anchor: NodeId, url: Url },
    Navigate(Url),
}

/// Result of applying a fragment response to the view tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The listing was replaced; the new subtree's root
    Replaced(NodeId),
    /// Nothing changed; the text is shown as a blocking alert
    Alert(String),
    /// The anchor is gone because the listing was already replaced
    Stale,
}

/// Return `url` with `name` set to `value`, replacing any previous value
pub fn with_query_param(url: &Url, name: &str, value: &str) -> Url {
    let mut updated = url.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    updated
        .query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(name, value);
    updated
}

/// Address of the fragment rendering component `component_id` of `url`
pub fn fragment_url(url: &Url, component_id: &str) -> Url {
    with_query_param(url, PARAM_COMPONENT, component_id)
}

pub fn resolve_href(page_url: &Url, href: &str) -> Result<Url, ViewError> {
    page_url
        .join(href)
        .map_err(|e| ViewError::InvalidAddress(format!("{}: {}", href, e)))
}

/// Replaces listing fragments in the view tree
pub struct PartialViewLoader;

impl PartialViewLoader {
    /// Refresh in place when the control belongs to a component, navigate otherwise
    pub fn request(anchor: NodeId, url: Url, component_id: Option<&str>) -> ViewRequest {
        match component_id {
            Some(component) => ViewRequest::Fragment {
                anchor,
                url: fragment_url(&url, component),
            },
            None => ViewRequest::Navigate(url),
        }
    }

    /// A sort header was activated; `multi` is a ctrl-activation adding to the current ordering
    pub fn sort(
        page_url: &Url,
        anchor: NodeId,
        href: &str,
        component_id: Option<&str>,
        multi_order: Option<&str>,
        multi: bool,
    ) -> Result<ViewRequest, ViewError> {
        let mut url = resolve_href(page_url, href)?;
        if let (true, Some(order)) = (multi, multi_order) {
            url = with_query_param(&url, PARAM_ORDER, order);
        }
        Ok(Self::request(anchor, url, component_id))
    }

    pub fn page(page_url: &Url, anchor: NodeId, href: &str, component_id: Option<&str>) -> Result<ViewRequest, ViewError> {
        let url = resolve_href(page_url, href)?;
        Ok(Self::request(anchor, url, component_id))
    }

    /// The page-size selector changed to `limit`
    pub fn page_size(
        page_url: &Url,
        data_url: Option<&Url>,
        anchor: NodeId,
        component_id: Option<&str>,
        limit: &str,
    ) -> ViewRequest {
        match component_id {
            Some(_) => {
                let base = data_url.unwrap_or(page_url);
                Self::request(anchor, with_query_param(base, PARAM_LIMIT, limit), component_id)
            }
            None => ViewRequest::Navigate(with_query_param(page_url, PARAM_LIMIT, limit)),
        }
    }

    /// A language, year or month selector changed
    pub fn parameter(page_url: &Url, parameter: &str, value: &str) -> ViewRequest {
        ViewRequest::Navigate(with_query_param(page_url, parameter, value))
    }

    /// Swap the listing around `anchor` for the fetched fragment.
    ///
    /// On any failure the current listing is left untouched.
    pub fn apply(tree: &mut ViewTree, anchor: NodeId, result: Result<ServerResponse, BackendError>) -> LoadOutcome {
        let response = match result {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                log::warn!("Fragment request failed with status {}", response.status);
                return LoadOutcome::Alert(response.body);
            }
            Err(e) => {
                log::warn!("Fragment request failed: {}", e);
                return LoadOutcome::Alert(e.user_message());
            }
        };

        if !tree.contains(anchor) {
            log::debug!("Dropping fragment for replaced anchor {}", anchor);
            return LoadOutcome::Stale;
        }

        let replaced = Fragment::parse(&response.body)
            .and_then(|fragment| {
                let root = tree.nearest_listing_root(anchor)?;
                tree.replace(root, fragment)
            });

        match replaced {
            Ok(node) => {
                log::debug!("Replaced listing with node {}", node);
                LoadOutcome::Replaced(node)
            }
            Err(e) => {
                log::warn!("Could not apply fragment: {}", e);
                LoadOutcome::Alert(response.body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query_param_replaces_existing_value() {
        let url = Url::parse("http://localhost/en/product?limit=10&offset=20").unwrap();
        let updated = with_query_param(&url, "limit", "50");
        assert_eq!(updated.query(), Some("offset=20&limit=50"));
    }
}
