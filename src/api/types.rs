//! TradeMicro API record and payload types
//!
//! Records are opaque server objects: only the fields the client reads are
//! typed, everything else is kept in `extra`.

use crate::display::{mask_token, token_expiry_info_at, TokenExpiry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Record identifier, sent by the server as either a number or a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Unsigned(n) => RecordId(n.to_string()),
            RawId::Signed(n) => RecordId(n.to_string()),
            RawId::Text(s) => RecordId(s),
        })
    }
}

// ========== Auth ==========

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
}

/// Current user, `GET /user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// API health, `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Response to `?count=true`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

// ========== Symbols ==========

/// Tradable symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "SymbolRepr")]
pub struct Symbol {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub exchange: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// The symbol list is served either as bare names or as full records.
#[derive(Deserialize)]
#[serde(untagged)]
enum SymbolRepr {
    Name(String),
    Record(SymbolRecord),
}

#[derive(Deserialize)]
struct SymbolRecord {
    id: Option<RecordId>,
    name: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<SymbolRepr> for Symbol {
    fn from(repr: SymbolRepr) -> Self {
        match repr {
            SymbolRepr::Name(name) => Symbol {
                id: None,
                name: Some(name),
                exchange: None,
                kind: None,
                extra: Map::new(),
            },
            SymbolRepr::Record(record) => Symbol {
                id: record.id,
                name: record.name,
                exchange: record.exchange,
                kind: record.kind,
                extra: record.extra,
            },
        }
    }
}

// ========== Trades ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: RecordId,
    pub symbol: Option<String>,
    #[serde(rename = "type")]
    pub side: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ========== Broker tokens ==========

#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerToken {
    pub id: RecordId,
    pub broker: Option<String>,
    pub token: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BrokerToken {
    /// Token value safe to show
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_deref().map(mask_token)
    }

    /// Expiry info, when the server reported a creation time
    pub fn expiry_at(&self, now: DateTime<Utc>) -> Option<TokenExpiry> {
        self.created_at
            .map(|created_at| token_expiry_info_at(created_at, now))
    }
}

impl fmt::Debug for BrokerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerToken")
            .field("id", &self.id)
            .field("broker", &self.broker)
            .field("token", &self.masked_token())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize)]
pub struct NewBrokerToken {
    pub broker: String,
    pub token: String,
}

impl fmt::Debug for NewBrokerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewBrokerToken")
            .field("broker", &self.broker)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct BrokerTokenUpdate {
    pub token: String,
}

// ========== Tasks ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Pending tasks are the only ones that can still be cancelled
    pub fn is_pending(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("pending"))
            .unwrap_or(false)
    }
}

/// Captured output of a task run, `GET /tasks/:id/logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLogs {
    pub task: Option<Task>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// Background task to create, `POST /tasks`
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTask {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub params: Map<String, Value>,
    pub run_on_worker: bool,
}

// ========== Family members ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: RecordId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Default, Serialize)]
pub struct NewFamilyMember {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pin: String,
    pub client_id: String,
    pub client_token: String,
}

impl fmt::Debug for NewFamilyMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewFamilyMember")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("pin", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_token", &mask_token(&self.client_token))
            .finish()
    }
}
