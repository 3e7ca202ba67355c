//! Reconciliation manager.
//!
//! Drives the computed documents onto the devices in strict stages: collect the running
//! configuration, print the target, diff, validate, and commit only when every switch
//! validated. Each stage runs over all switches (concurrently up to `workers`) before its
//! output is written, in switch order. A failing switch never stops the others.

mod report;
mod storage;

pub use report::{RunSummary, StageStatus, SwitchReport};
pub use storage::{merge, strip_namespaces, SwitchStorage};

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::device::{Connector, Datastore, DeviceClient};
use crate::encoder::ConfigDocument;
use crate::models::Switch;

/// Every RPC replaces the whole tree
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub collect: bool,
    pub print_config: bool,
    pub diff: bool,
    pub commit: bool,
    pub workers: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            collect: true,
            print_config: false,
            diff: true,
            commit: false,
            workers: 1,
        }
    }
}

pub struct ReconcileManager {
    connector: Arc<dyn Connector>,
    options: ReconcileOptions,
}

impl ReconcileManager {
    pub fn new(connector: Arc<dyn Connector>, options: ReconcileOptions) -> Self {
        Self { connector, options }
    }

    /// Reconcile every target, writing rendered configs and diffs to `out`
    pub async fn run<W: Write>(
        &self,
        targets: Vec<(&Switch, ConfigDocument)>,
        out: &mut W,
    ) -> io::Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("reconcile", run_id = %run_id);
        let reports = self.run_stages(targets, out).instrument(span).await?;
        Ok(RunSummary::new(run_id, reports))
    }

    async fn run_stages<W: Write>(
        &self,
        targets: Vec<(&Switch, ConfigDocument)>,
        out: &mut W,
    ) -> io::Result<Vec<SwitchReport>> {
        let mut storages = self.connect(targets);

        if self.options.collect {
            self.collect(&mut storages).await;
        }
        if self.options.print_config {
            print_config(&storages, out)?;
        }
        if self.options.diff {
            self.diff(&mut storages, out).await?;
        }

        let validated = self.validate(&mut storages).await;
        if !validated {
            tracing::warn!("Validation failed; nothing will be committed");
        } else if self.options.commit {
            self.commit(&mut storages).await;
        }

        Ok(storages.into_iter().map(|s| s.report).collect())
    }

    fn connect(&self, targets: Vec<(&Switch, ConfigDocument)>) -> Vec<SwitchStorage> {
        targets
            .into_iter()
            .map(|(switch, document)| {
                let mut storage = SwitchStorage::new(switch.name.clone(), document);
                match self.connector.connect(switch) {
                    Ok(client) => storage.client = Some(client),
                    Err(e) => {
                        tracing::warn!(switch = %switch.name, error = %e, "Cannot open device session");
                        storage.report.collect = StageStatus::Failed(e.to_string());
                    }
                }
                storage
            })
            .collect()
    }

    /// Run `call` for every reachable switch, at most `workers` at a time, keeping order
    async fn each<'s, F, Fut, T>(&self, storages: &'s [SwitchStorage], call: F) -> Vec<Option<T>>
    where
        F: Fn(&'s SwitchStorage, Arc<dyn DeviceClient>) -> Fut,
        Fut: Future<Output = T> + 's,
    {
        let call = &call;
        stream::iter(storages.iter().map(|storage| {
            let span = tracing::info_span!("switch", name = %storage.name);
            let pending = storage.active_client().map(|client| call(storage, client));
            async move {
                match pending {
                    Some(fut) => Some(fut.await),
                    None => None,
                }
            }
            .instrument(span)
        }))
        .buffered(self.options.workers.max(1))
        .collect()
        .await
    }

    async fn collect(&self, storages: &mut [SwitchStorage]) {
        tracing::info!("Collecting running config");
        let replies = self
            .each(storages, |_, client| async move {
                client.get(ROOT_PATH, Datastore::Running).await
            })
            .await;

        for (storage, reply) in storages.iter_mut().zip(replies) {
            let Some(reply) = reply else { continue };
            match reply.map_err(|e| e.to_string()).and_then(running_config) {
                Ok(base) => {
                    tracing::debug!(switch = %storage.name, sections = base.len(), "Collected running config");
                    storage.set_base(base);
                    storage.report.collect = StageStatus::Done;
                }
                Err(reason) => {
                    tracing::warn!(switch = %storage.name, error = %reason, "Failed to collect running config");
                    storage.report.collect = StageStatus::Failed(reason);
                }
            }
        }
    }

    async fn diff<W: Write>(&self, storages: &mut [SwitchStorage], out: &mut W) -> io::Result<()> {
        tracing::info!("Computing diffs");
        let replies = self
            .each(storages, |storage, client| async move {
                let document = storage.merged();
                client.diff(ROOT_PATH, &document).await
            })
            .await;

        for (storage, reply) in storages.iter_mut().zip(replies) {
            let Some(reply) = reply else { continue };
            let reply = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(switch = %storage.name, error = %e, "Diff request failed");
                    storage.report.diff = StageStatus::Failed(e.to_string());
                    continue;
                }
            };

            match diff_text(&reply) {
                DiffReply::Changes(text) => {
                    writeln!(out, "--- {} ---", storage.name)?;
                    writeln!(out, "{}", strip_namespaces(&text))?;
                    storage.report.diff = StageStatus::Done;
                }
                DiffReply::Empty => {
                    writeln!(out, "no diff for {}", storage.name)?;
                    storage.report.diff = StageStatus::NoChange;
                }
                DiffReply::Unexpected => {
                    writeln!(out, "--- {} ---", storage.name)?;
                    writeln!(out, "{}", reply)?;
                    storage.report.diff = StageStatus::Failed("device returned no diff result".to_string());
                }
            }
        }
        Ok(())
    }

    /// True when every switch validated
    async fn validate(&self, storages: &mut [SwitchStorage]) -> bool {
        tracing::info!("Validating");
        let replies = self
            .each(storages, |storage, client| async move {
                let document = storage.merged();
                client.validate(ROOT_PATH, &document).await
            })
            .await;

        for (storage, reply) in storages.iter_mut().zip(replies) {
            let Some(reply) = reply else { continue };
            storage.report.validate = match reply {
                Ok(reply) => validation_status(&reply),
                Err(e) => StageStatus::Failed(e.to_string()),
            };
            match &storage.report.validate {
                StageStatus::Failed(reason) => {
                    tracing::warn!(switch = %storage.name, error = %reason, "Validation failed")
                }
                _ => tracing::info!(switch = %storage.name, "Validated"),
            }
        }

        storages.iter().all(|s| s.report.is_validated())
    }

    async fn commit(&self, storages: &mut [SwitchStorage]) {
        tracing::info!("Committing");
        let replies = self
            .each(storages, |storage, client| async move {
                let document = storage.merged();
                client.commit(ROOT_PATH, &document).await
            })
            .await;

        for (storage, reply) in storages.iter_mut().zip(replies) {
            let Some(reply) = reply else { continue };
            storage.report.commit = match reply {
                Ok(reply) => commit_status(&reply),
                Err(e) => StageStatus::Failed(e.to_string()),
            };
            match &storage.report.commit {
                StageStatus::Failed(reason) => {
                    tracing::warn!(switch = %storage.name, error = %reason, "Commit failed")
                }
                _ => tracing::info!(switch = %storage.name, "Committed"),
            }
        }
    }
}

fn print_config<W: Write>(storages: &[SwitchStorage], out: &mut W) -> io::Result<()> {
    tracing::info!("Printing configuration");
    for storage in storages {
        let rendered = storage.rendered_target().map_err(io::Error::other)?;
        writeln!(out, "=== {} ===", storage.name)?;
        writeln!(out, "{}", rendered)?;
    }
    Ok(())
}

fn rpc_error(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => error.to_string(),
    }
}

/// First result of a `get` reply
fn running_config(reply: Value) -> Result<ConfigDocument, String> {
    if let Some(error) = reply.get("error") {
        return Err(rpc_error(error));
    }
    match reply.get("result").and_then(|r| r.get(0)) {
        Some(Value::Object(document)) => Ok(document.clone()),
        _ => Err(format!("unexpected reply: {}", reply)),
    }
}

enum DiffReply {
    Changes(String),
    Empty,
    /// No `result` key; the whole reply is the error payload
    Unexpected,
}

fn diff_text(reply: &Value) -> DiffReply {
    let Some(result) = reply.get("result").and_then(Value::as_array) else {
        return DiffReply::Unexpected;
    };
    match result.first() {
        None => DiffReply::Empty,
        Some(Value::String(text)) if text.trim().is_empty() => DiffReply::Empty,
        Some(Value::String(text)) => DiffReply::Changes(text.clone()),
        Some(other) => DiffReply::Changes(other.to_string()),
    }
}

fn validation_status(reply: &Value) -> StageStatus {
    match reply.get("error") {
        Some(error) => StageStatus::Failed(rpc_error(error)),
        None => StageStatus::Done,
    }
}

/// A commit succeeded when the first result is an empty object
fn commit_status(reply: &Value) -> StageStatus {
    let Some(result) = reply.get("result") else {
        return StageStatus::Failed(reply.to_string());
    };
    match result.get(0) {
        Some(Value::Object(map)) if map.is_empty() => StageStatus::Done,
        Some(other) => StageStatus::Failed(other.to_string()),
        None => StageStatus::Failed(result.to_string()),
    }
}
