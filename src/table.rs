//! The results table: rows carrying a JSON payload, each with a detail panel
//! that is rendered on first expand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::host::TableLayout;
use crate::tree::JsonTree;

pub const DEFAULT_ELLIPSIS: usize = 42;
/// The non-orderable column holding the expand toggle.
pub const DETAILS_COLUMN: usize = 0;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no row with id {0:?}")]
    UnknownRow(String),
    #[error("row {0:?} has no JSON payload")]
    MissingPayload(String),
    #[error("row {row:?} carries malformed JSON: {source}")]
    MalformedPayload {
        row: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: String,
    pub cells: Vec<String>,
    /// Raw JSON document for the detail panel.
    pub data_json: Option<String>,
}

impl ResultRow {
    pub fn new(id: impl Into<String>, cells: Vec<String>, data_json: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells,
            data_json: Some(data_json.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    pub ellipsis: usize,
    pub hidden_columns: Vec<usize>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            ellipsis: DEFAULT_ELLIPSIS,
            hidden_columns: vec![1, 5],
        }
    }
}

/// The toggle cell's visual state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone)]
pub struct DetailPanel {
    element_id: String,
    tree: JsonTree,
    shown: bool,
}

impl DetailPanel {
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn tree(&self) -> &JsonTree {
        &self.tree
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }
}

/// Truncates `text` to at most `max` characters, ending in `…` when cut.
pub fn ellipsis(text: &str, max: usize) -> String {
    if max == 0 || text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max - 1).collect();
    short.push('…');
    short
}

pub struct ResultTableController<L> {
    rows: Vec<ResultRow>,
    options: TableOptions,
    panels: HashMap<String, DetailPanel>,
    layout: L,
}

impl<L: TableLayout> ResultTableController<L> {
    pub fn new(rows: Vec<ResultRow>, options: TableOptions, layout: L) -> Self {
        Self {
            rows,
            options,
            panels: HashMap::new(),
            layout,
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Cells of `row` as displayed: hidden columns dropped, text truncated.
    pub fn visible_cells(&self, row: &ResultRow) -> Vec<String> {
        row.cells
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.options.hidden_columns.contains(index))
            .map(|(_, cell)| ellipsis(cell, self.options.ellipsis))
            .collect()
    }

    pub fn indicator(&self, row_id: &str) -> Indicator {
        if self.is_shown(row_id) {
            Indicator::Expanded
        } else {
            Indicator::Collapsed
        }
    }

    pub fn is_shown(&self, row_id: &str) -> bool {
        self.panels.get(row_id).is_some_and(DetailPanel::is_shown)
    }

    /// The row's panel, if it is currently shown.
    pub fn panel(&self, row_id: &str) -> Option<&DetailPanel> {
        self.panels.get(row_id).filter(|panel| panel.shown)
    }

    /// Expands a collapsed row or collapses an expanded one and returns the
    /// new indicator. Expanding parses the row payload into a fully expanded
    /// tree; on a parse failure nothing changes. The layout is recomputed
    /// after every show or hide.
    pub fn toggle_row(&mut self, row_id: &str) -> Result<Indicator, TableError> {
        let row = self
            .rows
            .iter()
            .find(|row| row.id == row_id)
            .ok_or_else(|| TableError::UnknownRow(row_id.to_string()))?;

        if let Some(panel) = self.panels.get_mut(row_id).filter(|panel| panel.shown) {
            panel.shown = false;
            self.layout.adjust_columns();
            debug!(row = row_id, "detail panel hidden");
            return Ok(Indicator::Collapsed);
        }

        let payload = row
            .data_json
            .as_deref()
            .ok_or_else(|| TableError::MissingPayload(row_id.to_string()))?;
        let mut tree = JsonTree::parse(payload).map_err(|source| TableError::MalformedPayload {
            row: row_id.to_string(),
            source,
        })?;
        tree.expand();

        self.panels.insert(
            row_id.to_string(),
            DetailPanel {
                element_id: format!("json-{row_id}"),
                tree,
                shown: true,
            },
        );
        self.layout.adjust_columns();
        debug!(row = row_id, "detail panel shown");
        Ok(Indicator::Expanded)
    }
}
