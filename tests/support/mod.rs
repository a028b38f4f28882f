//! Shared helpers: a scripted transport and driver builders

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time::Instant;
use user_data_exporter::fetcher::retry_formatter::RetryErrorType;
use user_data_exporter::fetcher::{
    HttpTransport, PageRequest, PagedUserClient, TransportError, TransportResponse,
};
use user_data_exporter::resume::FileStateStore;
use user_data_exporter::{ExportConfig, ExportDriver};

pub type Reply = Result<TransportResponse, TransportError>;

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: PageRequest,
    pub at: Instant,
}

/// Replays canned replies in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_users(&self, request: &PageRequest) -> Reply {
        self.requests.lock().unwrap().push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {request:?}"))
    }
}

/// User object as the upstream returns it
pub fn user(id: &str, created_at: i64) -> Value {
    json!({
        "id": id,
        "created_at": created_at,
        "has_accepted_terms": true,
        "linked_accounts": [
            {"type": "email", "address": format!("{id}@example.com")},
            {"type": "wallet", "address": format!("0x{id}")}
        ]
    })
}

/// 200 with the given users and next cursor
pub fn page(users: Vec<Value>, next_cursor: Option<&str>) -> Reply {
    let body = json!({"data": users, "next_cursor": next_cursor});
    Ok(TransportResponse::new(200, body.to_string()))
}

pub fn status(code: u16, body: &str) -> Reply {
    Ok(TransportResponse::new(code, body))
}

pub fn connection_refused() -> Reply {
    Err(TransportError::new(
        RetryErrorType::NetworkOffline,
        "connection refused",
    ))
}

/// Files of one export workspace
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("users.csv")
    }

    pub fn cursor_file(&self) -> PathBuf {
        self.dir.path().join(".export_cursor")
    }

    pub fn watermark_file(&self) -> PathBuf {
        self.dir.path().join(".export_watermark")
    }

    pub fn store(&self) -> FileStateStore {
        FileStateStore::new(self.cursor_file(), self.watermark_file())
    }

    pub fn driver(
        &self,
        transport: &Arc<ScriptedTransport>,
        config: ExportConfig,
    ) -> ExportDriver<PagedUserClient<Arc<ScriptedTransport>>, FileStateStore> {
        let client = PagedUserClient::new(transport.clone(), &config);
        ExportDriver::new(client, self.store(), config)
    }

    pub fn output_lines(&self) -> Vec<String> {
        read_lines(&self.output())
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
