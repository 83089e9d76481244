// src/memory/store_server.rs — Async message passing for Store
//
// One task owns the SQLite connection and applies commands in arrival
// order, so every single-key write is atomic with respect to other writers.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use crate::infra::errors::{AdReplyError, Result};
use crate::learner::keyword_stats::KeywordStat;
use crate::matching::types::{GroupHistory, Template, TemplateFilter, VariantIndex};
use crate::memory::store::Store;

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
pub enum StoreCommand {
    UpsertTemplate {
        template: Box<Template>,
        resp: Reply<()>,
    },
    DeleteTemplate {
        id: String,
        resp: Reply<bool>,
    },
    QueryTemplates {
        filter: Option<TemplateFilter>,
        resp: Reply<Vec<Template>>,
    },
    QueryTemplate {
        id: String,
        resp: Reply<Option<Template>>,
    },
    IncrementTemplateUsage {
        id: String,
        resp: Reply<()>,
    },
    QueryGroupHistory {
        group_id: String,
        resp: Reply<Option<GroupHistory>>,
    },
    UpsertGroupHistory {
        group_id: String,
        template_id: String,
        variant: VariantIndex,
        resp: Reply<()>,
    },
    QueryKeywordStats {
        category: String,
        resp: Reply<HashMap<String, KeywordStat>>,
    },
    SaveKeywordStats {
        category: String,
        stats: HashMap<String, KeywordStat>,
        resp: Reply<()>,
    },
    QueryKeywordCategories {
        resp: Reply<Vec<String>>,
    },
    DeleteKeywordCategory {
        category: String,
        resp: Reply<usize>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        operation: &str,
        make: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(make(resp_tx))
            .await
            .map_err(|e| AdReplyError::unavailable(operation, e))?;
        let result = resp_rx
            .await
            .map_err(|e| AdReplyError::unavailable(operation, e))?;

        // Persistence failures are outages from the caller's point of view.
        result.map_err(|e| match e {
            AdReplyError::Database(db) => AdReplyError::unavailable(operation, db),
            other => other,
        })
    }

    pub async fn upsert_template(&self, template: Template) -> Result<()> {
        self.request("upsert_template", |resp| StoreCommand::UpsertTemplate {
            template: Box::new(template),
            resp,
        })
        .await
    }

    pub async fn delete_template(&self, id: String) -> Result<bool> {
        self.request("delete_template", |resp| StoreCommand::DeleteTemplate { id, resp })
            .await
    }

    pub async fn query_templates(&self, filter: Option<TemplateFilter>) -> Result<Vec<Template>> {
        self.request("get_templates", |resp| StoreCommand::QueryTemplates { filter, resp })
            .await
    }

    pub async fn query_template(&self, id: String) -> Result<Option<Template>> {
        self.request("get_template", |resp| StoreCommand::QueryTemplate { id, resp })
            .await
    }

    pub async fn increment_template_usage(&self, id: String) -> Result<()> {
        self.request("increment_template_usage", |resp| {
            StoreCommand::IncrementTemplateUsage { id, resp }
        })
        .await
    }

    pub async fn query_group_history(&self, group_id: String) -> Result<Option<GroupHistory>> {
        self.request("get_group_history", |resp| StoreCommand::QueryGroupHistory {
            group_id,
            resp,
        })
        .await
    }

    pub async fn upsert_group_history(
        &self,
        group_id: String,
        template_id: String,
        variant: VariantIndex,
    ) -> Result<()> {
        self.request("update_group_history", |resp| {
            StoreCommand::UpsertGroupHistory {
                group_id,
                template_id,
                variant,
                resp,
            }
        })
        .await
    }

    pub async fn query_keyword_stats(
        &self,
        category: String,
    ) -> Result<HashMap<String, KeywordStat>> {
        self.request("get_keyword_stats", |resp| StoreCommand::QueryKeywordStats {
            category,
            resp,
        })
        .await
    }

    pub async fn save_keyword_stats(
        &self,
        category: String,
        stats: HashMap<String, KeywordStat>,
    ) -> Result<()> {
        self.request("save_keyword_stats", |resp| StoreCommand::SaveKeywordStats {
            category,
            stats,
            resp,
        })
        .await
    }

    pub async fn query_keyword_categories(&self) -> Result<Vec<String>> {
        self.request("list_keyword_categories", |resp| {
            StoreCommand::QueryKeywordCategories { resp }
        })
        .await
    }

    pub async fn delete_keyword_category(&self, category: String) -> Result<usize> {
        self.request("delete_keyword_category", |resp| {
            StoreCommand::DeleteKeywordCategory { category, resp }
        })
        .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::UpsertTemplate { template, resp } => {
                let _ = resp.send(store.upsert_template(&template));
            }
            StoreCommand::DeleteTemplate { id, resp } => {
                let _ = resp.send(store.delete_template(&id));
            }
            StoreCommand::QueryTemplates { filter, resp } => {
                let _ = resp.send(store.query_templates(filter.as_ref()));
            }
            StoreCommand::QueryTemplate { id, resp } => {
                let _ = resp.send(store.query_template(&id));
            }
            StoreCommand::IncrementTemplateUsage { id, resp } => {
                let _ = resp.send(store.increment_template_usage(&id));
            }
            StoreCommand::QueryGroupHistory { group_id, resp } => {
                let _ = resp.send(store.query_group_history(&group_id));
            }
            StoreCommand::UpsertGroupHistory {
                group_id,
                template_id,
                variant,
                resp,
            } => {
                let _ = resp.send(store.upsert_group_history(&group_id, &template_id, variant));
            }
            StoreCommand::QueryKeywordStats { category, resp } => {
                let _ = resp.send(store.query_keyword_stats(&category));
            }
            StoreCommand::SaveKeywordStats {
                category,
                stats,
                resp,
            } => {
                let _ = resp.send(store.save_keyword_stats(&category, &stats));
            }
            StoreCommand::QueryKeywordCategories { resp } => {
                let _ = resp.send(store.query_keyword_categories());
            }
            StoreCommand::DeleteKeywordCategory { category, resp } => {
                let _ = resp.send(store.delete_keyword_category(&category));
            }
        }
    }
    tracing::debug!("Store server stopped: all handles dropped");
}
