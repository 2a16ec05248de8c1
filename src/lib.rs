//! Headless controllers for the hostdb search page: the multi-field search
//! form kept in sync with the URL, catalog-backed value menus, and the results
//! table with expandable JSON detail rows.

pub mod catalog;
pub mod config;
pub mod fields;
pub mod form;
pub mod host;
pub mod pagination;
pub mod query;
pub mod render;
pub mod table;
pub mod tree;

#[cfg(feature = "http")]
pub use catalog::HttpCatalog;
pub use catalog::{CatalogError, CatalogResponse, CatalogSource, StaticCatalog};
pub use config::{ConfigError, UiConfig, load_config};
pub use fields::{FieldDirectory, FieldEntry};
pub use form::{
    Affordance, CatalogMenu, ClauseId, ClauseView, LuckyError, SearchClause, SearchForm,
    SearchFormController,
};
pub use host::{PageHost, TableLayout};
pub use pagination::{PageLink, Pagination};
pub use query::{QueryParameter, merge_url_parameters, parse_query};
pub use table::{DetailPanel, Indicator, ResultRow, ResultTableController, TableError, TableOptions};
pub use tree::JsonTree;
