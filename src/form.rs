//! The dynamic search form: an ordered list of `key = value` clauses kept in
//! step with the page query string.
//!
//! [`SearchForm`] is the plain state; [`SearchFormController`] wraps it for the
//! page, running catalog fetches in the background and publishing a fresh
//! [`ClauseView`] snapshot after every change.

use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::{CatalogError, CatalogSource, sorted_catalog};
use crate::fields::{CHOOSE_LABEL, FieldDirectory};
use crate::host::PageHost;
use crate::query::{
    LUCKY_KEY, QueryParameter, build_query, encode_component, is_internal_key, parse_query,
};

pub const LUCKY_NOTICE: &str =
    "It looks like this feature isn't available right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClauseId(u64);

impl ClauseId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The action button a clause carries: only the last clause can add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Affordance {
    Add,
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogMenu {
    pub values: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchClause {
    id: ClauseId,
    key: Option<String>,
    label: String,
    value: String,
    catalog: Option<CatalogMenu>,
}

impl SearchClause {
    fn empty(id: ClauseId) -> Self {
        Self {
            id,
            key: None,
            label: CHOOSE_LABEL.to_string(),
            value: String::new(),
            catalog: None,
        }
    }

    pub fn id(&self) -> ClauseId {
        self.id
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn catalog(&self) -> Option<&CatalogMenu> {
        self.catalog.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.value.is_empty()
    }
}

/// Read-only row handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseView {
    pub id: ClauseId,
    pub key: Option<String>,
    pub label: String,
    pub value: String,
    pub catalog: Option<CatalogMenu>,
    pub affordance: Affordance,
}

impl ClauseView {
    pub fn is_last(&self) -> bool {
        self.affordance == Affordance::Add
    }
}

#[derive(Debug, Clone)]
pub struct SearchForm {
    clauses: Vec<SearchClause>,
    directory: FieldDirectory,
    next_id: u64,
}

impl SearchForm {
    /// A form holding only the empty template clause.
    pub fn new(directory: FieldDirectory) -> Self {
        let mut form = Self {
            clauses: Vec::new(),
            directory,
            next_id: 0,
        };
        let id = form.allocate_id();
        form.clauses.push(SearchClause::empty(id));
        form
    }

    pub fn from_location(directory: FieldDirectory, query: &str) -> Self {
        let mut form = Self::new(directory);
        form.init_from_location(query);
        form
    }

    fn allocate_id(&mut self) -> ClauseId {
        let id = ClauseId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Rebuilds the clause list from a raw query string (no leading `?`).
    ///
    /// Every parameter except internal ones (`_search` excepted) becomes a
    /// clause, in query order. When nothing qualifies the form is left with
    /// exactly one empty clause. Returns the number of clauses materialized.
    pub fn init_from_location(&mut self, query: &str) -> usize {
        let template = match self.clauses.first() {
            Some(first) => SearchClause::empty(first.id),
            None => {
                let id = self.allocate_id();
                SearchClause::empty(id)
            }
        };

        let mut materialized = Vec::new();
        for param in parse_query(query) {
            if !param.materializes() {
                debug!(key = %param.key, "skipping internal parameter");
                continue;
            }
            let id = self.allocate_id();
            materialized.push(SearchClause {
                id,
                label: self.directory.label_or_default(&param.key),
                key: Some(param.key),
                value: param.value,
                catalog: None,
            });
        }

        let count = materialized.len();
        self.clauses = if materialized.is_empty() {
            vec![template]
        } else {
            materialized
        };
        debug!(clauses = count, "form initialized from location");
        count
    }

    /// Appends an empty clause after the current last one.
    pub fn add_clause(&mut self) -> ClauseId {
        let id = self.allocate_id();
        self.clauses.push(SearchClause::empty(id));
        id
    }

    /// Removes a clause. The form may become empty.
    pub fn remove_clause(&mut self, id: ClauseId) -> Option<SearchClause> {
        let index = self.position(id)?;
        Some(self.clauses.remove(index))
    }

    /// Sets the clause key and label. Any catalog menu belonged to the old
    /// key and is dropped.
    pub fn set_key(&mut self, id: ClauseId, key: &str) -> bool {
        let label = self.directory.label_or_default(key);
        let Some(clause) = self.clause_mut(id) else {
            return false;
        };
        clause.key = (!key.is_empty()).then(|| key.to_string());
        clause.label = label;
        clause.catalog = None;
        true
    }

    /// Replaces the clause's catalog menu, provided it still holds `key`.
    pub fn apply_catalog(&mut self, id: ClauseId, key: &str, values: Vec<String>) -> bool {
        match self.clause_mut(id) {
            Some(clause) if clause.key.as_deref() == Some(key) => {
                clause.catalog = Some(CatalogMenu {
                    values: sorted_catalog(values),
                    selected: None,
                });
                true
            }
            _ => false,
        }
    }

    /// Sets the clause value from its catalog menu.
    pub fn select_catalog_value(&mut self, id: ClauseId, value: &str) -> bool {
        let Some(clause) = self.clause_mut(id) else {
            return false;
        };
        clause.value = value.to_string();
        if let Some(menu) = clause.catalog.as_mut() {
            menu.selected = Some(value.to_string());
        }
        true
    }

    /// Free-text edit of the clause value.
    pub fn set_value(&mut self, id: ClauseId, value: &str) -> bool {
        let Some(clause) = self.clause_mut(id) else {
            return false;
        };
        clause.value = value.to_string();
        true
    }

    pub fn clause(&self, id: ClauseId) -> Option<&SearchClause> {
        self.clauses.iter().find(|clause| clause.id == id)
    }

    fn clause_mut(&mut self, id: ClauseId) -> Option<&mut SearchClause> {
        self.clauses.iter_mut().find(|clause| clause.id == id)
    }

    fn position(&self, id: ClauseId) -> Option<usize> {
        self.clauses.iter().position(|clause| clause.id == id)
    }

    pub fn clauses(&self) -> &[SearchClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn directory(&self) -> &FieldDirectory {
        &self.directory
    }

    pub fn last_id(&self) -> Option<ClauseId> {
        self.clauses.last().map(|clause| clause.id)
    }

    pub fn affordance(&self, id: ClauseId) -> Option<Affordance> {
        self.clause(id).map(|clause| {
            if Some(clause.id) == self.last_id() {
                Affordance::Add
            } else {
                Affordance::Remove
            }
        })
    }

    pub fn views(&self) -> Vec<ClauseView> {
        let last = self.clauses.len().saturating_sub(1);
        self.clauses
            .iter()
            .enumerate()
            .map(|(index, clause)| ClauseView {
                id: clause.id,
                key: clause.key.clone(),
                label: clause.label.clone(),
                value: clause.value.clone(),
                catalog: clause.catalog.clone(),
                affordance: if index == last {
                    Affordance::Add
                } else {
                    Affordance::Remove
                },
            })
            .collect()
    }

    /// Clauses with a key, as query parameters in form order.
    pub fn to_parameters(&self) -> Vec<QueryParameter> {
        self.clauses
            .iter()
            .filter_map(|clause| {
                clause
                    .key
                    .as_ref()
                    .map(|key| QueryParameter::new(key.clone(), clause.value.clone()))
            })
            .collect()
    }

    /// The query string a submit of this form produces.
    pub fn submission_query(&self) -> String {
        build_query(&self.to_parameters())
    }
}

#[derive(Debug, Error)]
pub enum LuckyError {
    #[error("no searchable fields to pick from")]
    NoFields,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog for {0:?} is empty")]
    EmptyCatalog(String),
}

/// Location of a "feeling lucky" search for one key/value pair.
pub fn lucky_location(key: &str, value: &str) -> String {
    format!(
        "/?{LUCKY_KEY}=true&{}={}",
        encode_component(key),
        encode_component(value)
    )
}

struct Shared<C> {
    form: RwLock<SearchForm>,
    catalog: C,
    page: Arc<dyn PageHost>,
    updates: watch::Sender<Vec<ClauseView>>,
}

impl<C> Shared<C> {
    fn mutate<T>(&self, apply: impl FnOnce(&mut SearchForm) -> T) -> T {
        let mut guard = self.form.write();
        let result = apply(&mut *guard);
        // publish under the lock so snapshots reach subscribers in write order
        self.updates.send_replace(guard.views());
        result
    }
}

/// Page-facing owner of a [`SearchForm`].
pub struct SearchFormController<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for SearchFormController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: CatalogSource> SearchFormController<C> {
    pub fn new(directory: FieldDirectory, catalog: C, page: Arc<dyn PageHost>) -> Self {
        let form = SearchForm::new(directory);
        let (updates, _) = watch::channel(form.views());
        Self {
            shared: Arc::new(Shared {
                form: RwLock::new(form),
                catalog,
                page,
                updates,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ClauseView>> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> Vec<ClauseView> {
        self.shared.form.read().views()
    }

    pub fn submission_query(&self) -> String {
        self.shared.form.read().submission_query()
    }

    pub fn init_from_location(&self, query: &str) -> Vec<ClauseView> {
        self.shared.mutate(|form| {
            form.init_from_location(query);
            form.views()
        })
    }

    pub fn add_clause(&self) -> ClauseId {
        self.shared.mutate(SearchForm::add_clause)
    }

    pub fn remove_clause(&self, id: ClauseId) -> bool {
        self.shared.mutate(|form| form.remove_clause(id)).is_some()
    }

    pub fn select_catalog_value(&self, id: ClauseId, value: &str) -> bool {
        self.shared
            .mutate(|form| form.select_catalog_value(id, value))
    }

    pub fn set_value(&self, id: ClauseId, value: &str) -> bool {
        self.shared.mutate(|form| form.set_value(id, value))
    }

    /// Chooses the clause key. For non-internal keys the catalog is fetched
    /// in the background and the returned handle resolves once the menu has
    /// been applied (or dropped). Internal keys and unknown clauses return
    /// `None` without touching the network.
    ///
    /// Fetches are never cancelled. A result is only applied if the clause
    /// still exists and still holds the key it was fetched for.
    pub fn select_key(&self, id: ClauseId, key: &str) -> Option<JoinHandle<()>> {
        if !self.shared.mutate(|form| form.set_key(id, key)) {
            debug!(clause = id.get(), "select_key on unknown clause");
            return None;
        }
        if key.is_empty() || is_internal_key(key) {
            return None;
        }

        let shared = Arc::clone(&self.shared);
        let key = key.to_string();
        Some(tokio::spawn(async move {
            match shared.catalog.fetch(&key).await {
                Ok(values) => {
                    let count = values.len();
                    if shared.mutate(|form| form.apply_catalog(id, &key, values)) {
                        debug!(clause = id.get(), %key, count, "catalog applied");
                    } else {
                        debug!(clause = id.get(), %key, "dropping stale catalog");
                    }
                }
                Err(err) => warn!(clause = id.get(), %key, error = %err, "catalog fetch failed"),
            }
        }))
    }

    /// Picks a random field and a random value from its catalog, then
    /// navigates to that search. Failures show the blocking notice and leave
    /// the page where it is.
    pub async fn feeling_lucky(&self) -> Result<String, LuckyError> {
        let mut rng = SmallRng::from_entropy();
        self.feeling_lucky_with(&mut rng).await
    }

    pub async fn feeling_lucky_with<R: Rng>(&self, rng: &mut R) -> Result<String, LuckyError> {
        match self.pick_lucky(rng).await {
            Ok(location) => {
                self.shared.page.navigate(&location);
                Ok(location)
            }
            Err(err) => {
                warn!(error = %err, "feeling lucky failed");
                self.shared.page.notify(LUCKY_NOTICE);
                Err(err)
            }
        }
    }

    async fn pick_lucky<R: Rng>(&self, rng: &mut R) -> Result<String, LuckyError> {
        let key = {
            let form = self.shared.form.read();
            let keys = form.directory().catalog_keys();
            keys.choose(rng).map(|key| key.to_string())
        };
        let key = key.ok_or(LuckyError::NoFields)?;

        let values = self.shared.catalog.fetch(&key).await?;
        let value = values
            .choose(rng)
            .ok_or_else(|| LuckyError::EmptyCatalog(key.clone()))?;
        Ok(lucky_location(&key, value))
    }
}
