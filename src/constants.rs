//! Constants used throughout the console
//!
//! This module centralizes wire field names, request parameters and the
//! fixed enumerations shared by the components.

// Input limits
pub const MAX_FIELD_NAME_LENGTH: usize = 30;
pub const MAX_INDEX_NAME_LENGTH: usize = 30;

/// Entries the in-memory log view keeps
pub const LOG_BUFFER_CAPACITY: usize = 1000;

/// Built-in field kinds, in the order the type selector lists them.
pub const PRIMITIVE_TYPES: [&str; 26] = [
    "int16", "int32", "int64", "float32", "float64", "numeric", "boolean", "string", "text", "html", "json", "xml",
    "uri", "email", "tel", "date", "time", "datetime", "timezone", "color", "binary", "image", "audio", "video",
    "document", "password",
];

/// Index modes offered for a new index row.
pub const INDEX_MODES: [&str; 3] = ["index", "unique", "fulltext"];

// Collections
pub const COLLECTION_FIELDS: &str = "fields";
pub const COLLECTION_INDEXES: &str = "indexes";
pub const COLLECTION_FILTERS: &str = "filters";

// Row sub-fields
pub const ROW_TYPE: &str = "type";
pub const ROW_NAME: &str = "name";
pub const ROW_OLD_NAME: &str = "old_name";
pub const ROW_PARAMETERS: &str = "parameters";
pub const ROW_NOT_NULL: &str = "not_null";
pub const ROW_MODE: &str = "mode";
pub const ROW_FIELDS: &str = "fields";

// Form fields read or written by the dispatcher
pub const FIELD_ACTION: &str = "type_action";
pub const FIELD_ADATE: &str = "adate";
pub const FIELD_UDATE: &str = "udate";
pub const FIELD_NEW_NAME: &str = "new_name";
pub const FIELD_NEW_ID: &str = "new_id";
pub const FIELD_LOGIN_USER: &str = "login_user";
/// Field name of listing item checkboxes rendered without one
pub const FIELD_OBJECTS: &str = "objects";

// Request parameters
pub const PARAM_COMPONENT: &str = "component";
pub const PARAM_FILTER_COMPONENT: &str = "filter_component";
pub const PARAM_SEARCH: &str = "search";
pub const PARAM_OFFSET: &str = "offset";
pub const PARAM_ORDER: &str = "order";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_FORM: &str = "form";
pub const PARAM_LANG: &str = "lang";
pub const PARAM_YEAR: &str = "year";
pub const PARAM_MONTH: &str = "month";

/// Path and query of the type-listing endpoint, relative to the console base URL.
pub const TYPE_NAMES_PATH: &str = "/?view=json&names";

// Form modes used when navigating after a rename or identifier change
pub const FORM_MODE_ALTER: &str = "alter";
pub const FORM_MODE_UPDATE: &str = "update";

/// Displayed size of an emptied binary input.
pub const EMPTY_BINARY_SIZE: &str = "0 B";

// Defaults
pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_LOOKUP_PAGE_SIZE: u32 = 10;

// Messages
pub const CONFIG_GENERATED: &str = "✅ Configuration file generated";
pub const ERROR_TYPE_LISTING: &str = "Could not load the list of types";
