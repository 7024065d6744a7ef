//! Server-rendered view fragments and the tree they are mounted in.
//!
//! A [`Fragment`] is parsed once with scraper; the controls that need
//! interaction handlers are recorded as [`Binding`]s. The [`ViewTree`] keeps
//! mounted fragments in a generation-tagged slab so a listing can be swapped in place without
//! disturbing its siblings.

use crate::constants::FIELD_OBJECTS;
use scraper::{ElementRef, Html};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("Fragment contains no element")]
    EmptyFragment,

    #[error("View node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("View node {0} is not inside a listing")]
    NoListingRoot(NodeId),

    #[error("View node {0} is not a checkbox")]
    NotCheckable(NodeId),

    #[error("The page node cannot be removed")]
    PageNode,

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
}

/// An interaction handler a fragment control requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    SubmitButton { action: String, component: Option<String> },
    ExportButton { action: String },
    SortAnchor { href: String, component: Option<String>, multi_order: Option<String> },
    PageAnchor { href: String, component: Option<String> },
    SelectAll,
    ItemCheckbox { name: Option<String>, value: Option<String> },
    PageSizeSelector { component: Option<String>, selected: Option<String> },
    ParameterSelector { parameter: String, selected: Option<String> },
    DeleteRow,
    FilterFieldSelector { selected: Option<String> },
}

/// Attributes of one element of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentElement {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    /// Selected option value, for `select` elements
    pub selected: Option<String>,
}

impl FragmentElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }
}

/// Where a listing or control sits inside its fragment, in document order.
///
/// `parent` and `listing` index the fragment's nested listings; `None` is the
/// fragment itself.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Listing { component: Option<String>, parent: Option<usize> },
    Control { binding: usize, listing: Option<usize> },
}

/// A parsed server-rendered fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    html: String,
    listing_root: bool,
    component: Option<String>,
    elements: Vec<FragmentElement>,
    bindings: Vec<Binding>,
    layout: Vec<Placement>,
}

impl Fragment {
    pub fn parse(html: &str) -> Result<Self, ViewError> {
        let document = Html::parse_fragment(html);
        let first = document
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or(ViewError::EmptyFragment)?;

        let first_element = describe(first);
        let mut elements = Vec::new();
        let mut bindings = Vec::new();
        let mut layout = Vec::new();
        let mut listing_ids = Vec::new();

        for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
            let described = describe(element);
            if described.tag == "html" {
                continue;
            }

            let enclosing = element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find_map(|ancestor| listing_ids.iter().position(|id| *id == ancestor.id()));

            if described.has_class("select") && element.id() != first.id() {
                layout.push(Placement::Listing {
                    component: described.attr("data-component").map(str::to_string),
                    parent: enclosing,
                });
                listing_ids.push(element.id());
            }
            if let Some(binding) = classify(&described) {
                layout.push(Placement::Control {
                    binding: bindings.len(),
                    listing: enclosing,
                });
                bindings.push(binding);
            }
            elements.push(described);
        }

        Ok(Self {
            html: html.to_string(),
            listing_root: first_element.has_class("select"),
            component: first_element.attr("data-component").map(str::to_string),
            elements,
            bindings,
            layout,
        })
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Whether the fragment's outermost element is a listing that can be refreshed in place
    pub fn is_listing_root(&self) -> bool {
        self.listing_root
    }

    /// Listings nested inside the fragment
    pub fn nested_listings(&self) -> usize {
        self.layout
            .iter()
            .filter(|placement| matches!(placement, Placement::Listing { .. }))
            .count()
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn elements(&self) -> &[FragmentElement] {
        &self.elements
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn find_by_class(&self, class: &str) -> Option<&FragmentElement> {
        self.elements.iter().find(|element| element.has_class(class))
    }
}

fn describe(element: ElementRef) -> FragmentElement {
    let value = element.value();
    let tag = value.name().to_string();

    let selected = if tag == "select" {
        let options: Vec<ElementRef> = element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "option")
            .collect();
        options
            .iter()
            .find(|option| option.value().attr("selected").is_some())
            .or_else(|| options.first())
            .map(|option| {
                option
                    .value()
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| option.text().collect::<String>().trim().to_string())
            })
    } else {
        None
    };

    FragmentElement {
        tag,
        classes: value.classes().map(str::to_string).collect(),
        attrs: value
            .attrs()
            .map(|(name, attr)| (name.to_string(), attr.to_string()))
            .collect(),
        selected,
    }
}

fn classify(element: &FragmentElement) -> Option<Binding> {
    let attr = |name: &str| element.attr(name).map(str::to_string);

    match element.tag.as_str() {
        "button" if element.has_class("submit-form") => Some(Binding::SubmitButton {
            action: attr("value").unwrap_or_default(),
            component: attr("data-component"),
        }),
        "button" if element.has_class("export") => Some(Binding::ExportButton {
            action: attr("value").unwrap_or_default(),
        }),
        "button" if element.has_class("delete-row") => Some(Binding::DeleteRow),
        "a" if element.has_class("select-header-anchor") => Some(Binding::SortAnchor {
            href: attr("href").unwrap_or_default(),
            component: attr("data-component"),
            multi_order: attr("data-multi-order"),
        }),
        "a" if element.has_class("offset") => Some(Binding::PageAnchor {
            href: attr("href").unwrap_or_default(),
            component: attr("data-component"),
        }),
        "input" if element.has_class("all-checkbox") => Some(Binding::SelectAll),
        "input" if element.has_class("item-checkbox") => Some(Binding::ItemCheckbox {
            name: attr("name"),
            value: attr("value"),
        }),
        "select" if element.has_class("limit") => Some(Binding::PageSizeSelector {
            component: attr("data-component"),
            selected: element.selected.clone(),
        }),
        "select" if element.has_class("filter-field") => Some(Binding::FilterFieldSelector {
            selected: element.selected.clone(),
        }),
        "select" => {
            let parameter = [("langs", "lang"), ("years", "year"), ("months", "month")]
                .iter()
                .find(|(class, _)| element.has_class(class))
                .map(|(_, parameter)| parameter.to_string())?;
            Some(Binding::ParameterSelector {
                parameter,
                selected: element.selected.clone(),
            })
        }
        _ => None,
    }
}

/// Slab slot and generation of a mounted view node.
///
/// Slots of removed nodes are reused under a new generation, so an id kept
/// past its node's removal never resolves to the node that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Page,
    Container,
    ListingRoot { component: Option<String> },
    Control(Binding),
}

#[derive(Debug, Clone)]
pub struct ViewNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    fragment: Option<Fragment>,
    checked: bool,
}

impl ViewNode {
    fn new(parent: Option<NodeId>, kind: NodeKind, fragment: Option<Fragment>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            kind,
            fragment,
            checked: false,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn fragment(&self) -> Option<&Fragment> {
        self.fragment.as_ref()
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

/// Mounted fragments: one node per fragment, per nested listing and per bound control
#[derive(Debug, Clone)]
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(ViewNode::new(None, NodeKind::Page, None)),
            }],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId { index: 0, generation: 0 }
    }

    pub fn node(&self, id: NodeId) -> Option<&ViewNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of mounted nodes, the page included
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Mount `fragment` as the last child of `parent`
    pub fn mount(&mut self, parent: NodeId, fragment: Fragment) -> Result<NodeId, ViewError> {
        let position = self
            .node(parent)
            .ok_or(ViewError::UnknownNode(parent))?
            .children
            .len();
        self.mount_at(parent, position, fragment)
    }

    fn mount_at(&mut self, parent: NodeId, position: usize, fragment: Fragment) -> Result<NodeId, ViewError> {
        if !self.contains(parent) {
            return Err(ViewError::UnknownNode(parent));
        }

        let kind = if fragment.is_listing_root() {
            NodeKind::ListingRoot {
                component: fragment.component().map(str::to_string),
            }
        } else {
            NodeKind::Container
        };
        let layout = fragment.layout.clone();
        let bindings = fragment.bindings.clone();

        let id = self.alloc(ViewNode::new(Some(parent), kind, Some(fragment)));
        let mut listings: Vec<NodeId> = Vec::new();

        for placement in layout {
            let (owner, kind) = match placement {
                Placement::Listing { component, parent } => {
                    let owner = parent.and_then(|i| listings.get(i).copied()).unwrap_or(id);
                    (owner, NodeKind::ListingRoot { component })
                }
                Placement::Control { binding, listing } => {
                    let Some(binding) = bindings.get(binding).cloned() else {
                        continue;
                    };
                    let owner = listing.and_then(|i| listings.get(i).copied()).unwrap_or(id);
                    (owner, NodeKind::Control(binding))
                }
            };

            let is_listing = matches!(kind, NodeKind::ListingRoot { .. });
            let child = self.alloc(ViewNode::new(Some(owner), kind, None));
            if let Some(node) = self.node_mut(owner) {
                node.children.push(child);
            }
            if is_listing {
                listings.push(child);
            }
        }

        if let Some(parent_node) = self.node_mut(parent) {
            let position = position.min(parent_node.children.len());
            parent_node.children.insert(position, id);
        }

        Ok(id)
    }

    fn alloc(&mut self, node: ViewNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Closest ancestor of `node` (or `node` itself) that is a listing root
    pub fn nearest_listing_root(&self, node: NodeId) -> Result<NodeId, ViewError> {
        let mut current = Some(node);
        while let Some(id) = current {
            let view_node = self.node(id).ok_or(ViewError::UnknownNode(id))?;
            if matches!(view_node.kind, NodeKind::ListingRoot { .. }) {
                return Ok(id);
            }
            current = view_node.parent;
        }
        Err(ViewError::NoListingRoot(node))
    }

    /// `node` followed by its ancestors up to the page
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(view_node) = self.node(id) else {
                break;
            };
            found.push(id);
            current = view_node.parent;
        }
        found
    }

    /// Swap the subtree at `old` for `fragment`, keeping its position among its siblings
    pub fn replace(&mut self, old: NodeId, fragment: Fragment) -> Result<NodeId, ViewError> {
        let (parent, position) = self.detach(old)?;
        self.mount_at(parent, position, fragment)
    }

    /// Unmount `node` and everything under it
    pub fn remove(&mut self, node: NodeId) -> Result<(), ViewError> {
        self.detach(node).map(|_| ())
    }

    fn detach(&mut self, old: NodeId) -> Result<(NodeId, usize), ViewError> {
        let parent = self
            .node(old)
            .ok_or(ViewError::UnknownNode(old))?
            .parent
            .ok_or(ViewError::PageNode)?;

        let position = self
            .node(parent)
            .and_then(|node| node.children.iter().position(|child| *child == old))
            .ok_or(ViewError::UnknownNode(old))?;

        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.remove(position);
        }
        self.free_subtree(old);

        Ok((parent, position))
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index)
                .filter(|slot| slot.generation == current.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                pending.extend(node.children);
            }
        }
    }

    /// Controls bound under `node`, in document order
    pub fn bindings_under(&self, node: NodeId) -> Vec<(NodeId, &Binding)> {
        let mut found = Vec::new();
        let mut pending = vec![node];

        while let Some(current) = pending.pop() {
            let Some(view_node) = self.node(current) else {
                continue;
            };
            if let NodeKind::Control(binding) = &view_node.kind {
                found.push((current, binding));
            }
            pending.extend(view_node.children.iter().rev());
        }

        found
    }

    pub fn binding(&self, node: NodeId) -> Option<&Binding> {
        match self.node(node).map(|view_node| &view_node.kind) {
            Some(NodeKind::Control(binding)) => Some(binding),
            _ => None,
        }
    }

    /// Nodes mounted directly under `parent`
    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        self.node(parent).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// The listing a checkbox selects in, or its fragment outside listings
    fn selection_scope(&self, node: NodeId) -> Result<NodeId, ViewError> {
        self.nearest_listing_root(node).or_else(|_| {
            self.node(node)
                .and_then(ViewNode::parent)
                .ok_or(ViewError::UnknownNode(node))
        })
    }

    fn checkboxes_under(&self, scope: NodeId) -> Vec<NodeId> {
        self.bindings_under(scope)
            .into_iter()
            .filter(|(_, binding)| matches!(binding, Binding::SelectAll | Binding::ItemCheckbox { .. }))
            .map(|(id, _)| id)
            .collect()
    }

    /// Check or uncheck a listing checkbox.
    ///
    /// "All" sets every checkbox of its listing; unchecking an item clears "all".
    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<(), ViewError> {
        let binding = self.binding(node).cloned().ok_or(ViewError::NotCheckable(node))?;
        let scope = self.selection_scope(node)?;

        match binding {
            Binding::SelectAll => {
                for id in self.checkboxes_under(scope) {
                    if let Some(view_node) = self.node_mut(id) {
                        view_node.checked = checked;
                    }
                }
            }
            Binding::ItemCheckbox { .. } => {
                if let Some(view_node) = self.node_mut(node) {
                    view_node.checked = checked;
                }
                if !checked {
                    let all: Vec<NodeId> = self
                        .bindings_under(scope)
                        .into_iter()
                        .filter(|(_, binding)| matches!(binding, Binding::SelectAll))
                        .map(|(id, _)| id)
                        .collect();
                    for id in all {
                        if let Some(view_node) = self.node_mut(id) {
                            view_node.checked = false;
                        }
                    }
                }
            }
            _ => return Err(ViewError::NotCheckable(node)),
        }

        Ok(())
    }

    pub fn is_checked(&self, node: NodeId) -> bool {
        self.node(node).map(ViewNode::is_checked).unwrap_or(false)
    }

    /// Field name and value of every checked item in the listing around `node`
    pub fn checked_items(&self, node: NodeId) -> Vec<(String, String)> {
        let Ok(scope) = self.selection_scope(node) else {
            return Vec::new();
        };

        self.bindings_under(scope)
            .into_iter()
            .filter(|(id, _)| self.is_checked(*id))
            .filter_map(|(_, binding)| match binding {
                Binding::ItemCheckbox { name, value: Some(value) } => Some((
                    name.clone().unwrap_or_else(|| FIELD_OBJECTS.to_string()),
                    value.clone(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Unmount the checked items of the listing around `node` and clear its "all" box
    pub fn remove_checked_items(&mut self, node: NodeId) -> usize {
        let Ok(scope) = self.selection_scope(node) else {
            return 0;
        };

        let mut removed = 0;
        for id in self.checkboxes_under(scope) {
            match self.binding(id) {
                Some(Binding::ItemCheckbox { .. }) if self.is_checked(id) => {
                    if self.remove(id).is_ok() {
                        removed += 1;
                    }
                }
                Some(Binding::SelectAll) => {
                    if let Some(view_node) = self.node_mut(id) {
                        view_node.checked = false;
                    }
                }
                _ => {}
            }
        }
        removed
    }
}
