//! Line-delimited JSON task service.
//!
//! One request per line on the reader, one response per line on the
//! writer, in order. The protocol mirrors the store's operations for
//! editor and agent integrations: task listing, lookup, toggling,
//! creation and assignment. Operation failures travel back in the
//! response's `error` field; only transport problems abort the loop.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{CreateAnchor, DocumentStore, TaskFilter};

/// One request line.
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Caller-chosen correlation id, echoed in the response.
    pub id: u64,
    /// Method name, e.g. `toggle_task`.
    pub method: String,
    /// Method parameters; may be omitted for parameterless methods.
    #[serde(default)]
    pub params: Value,
}

/// One response line.
#[derive(Debug, Serialize)]
pub struct Response {
    /// Correlation id from the request, 0 for unparseable requests.
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    document: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskIdParams {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    text: String,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    document: Option<PathBuf>,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignParams {
    task_id: String,
    assignee: String,
}

/// Run the request loop until the reader is exhausted.
///
/// # Errors
///
/// Fails only on transport-level read or write errors.
pub fn serve<R: BufRead, W: Write>(
    store: &mut DocumentStore,
    reader: R,
    mut writer: W,
) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(id = request.id, method = %request.method, "handling request");
                handle(store, &request)
            }
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                Response::err(0, format!("invalid request: {e}"))
            }
        };
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}

fn handle(store: &mut DocumentStore, request: &Request) -> Response {
    match dispatch(store, &request.method, request.params.clone()) {
        Ok(result) => Response::ok(request.id, result),
        Err(e) => Response::err(request.id, e.to_string()),
    }
}

fn dispatch(store: &mut DocumentStore, method: &str, params: Value) -> Result<Value> {
    match method {
        "list_documents" => {
            let docs: Vec<&std::path::Path> = store.documents().collect();
            Ok(serde_json::to_value(docs)?)
        }
        "list_tasks" => {
            let params: ListParams = serde_json::from_value(params)?;
            let filter = match params.filter.as_deref() {
                Some(raw) => raw.parse::<TaskFilter>()?,
                None => TaskFilter::All,
            };
            let tasks = store.list_tasks(filter, params.document.as_deref());
            Ok(serde_json::to_value(tasks)?)
        }
        "get_task" => {
            let params: TaskIdParams = serde_json::from_value(params)?;
            Ok(serde_json::to_value(store.get_task(&params.task_id)?)?)
        }
        "toggle_task" => {
            let params: TaskIdParams = serde_json::from_value(params)?;
            Ok(serde_json::to_value(store.toggle_task(&params.task_id)?)?)
        }
        "create_task" => {
            let params: CreateParams = serde_json::from_value(params)?;
            let record = match params.parent_id {
                Some(parent) => {
                    store.create_subtask(&parent, &params.text, params.assignee.as_deref())?
                }
                None => store.create_task(
                    &params.text,
                    params.assignee.as_deref(),
                    params.document.as_deref(),
                    CreateAnchor::End,
                )?,
            };
            Ok(serde_json::to_value(record)?)
        }
        "assign_task" => {
            let params: AssignParams = serde_json::from_value(params)?;
            Ok(serde_json::to_value(
                store.assign_task(&params.task_id, &params.assignee)?,
            )?)
        }
        "report" => Ok(Value::String(store.progress_report())),
        other => Err(crate::error::PrdError::config(format!(
            "unknown method '{other}'"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
