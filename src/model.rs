//! Wire types for the OakBase HTTP and realtime APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub id: Uuid,
  pub collection: String,
  pub data: serde_json::Value,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult<T> {
  pub items: Vec<T>,
  pub total: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset: Option<u64>,
}

/// Collection metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionModel {
  pub name: String,
  pub created_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub document_count: Option<u64>,
}

/// Response of the document count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResult {
  pub count: u64,
}

/// Credentials sent to the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

/// An authenticated session as returned by register/login/refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
  pub token: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub refresh_token: Option<String>,
  pub user: serde_json::Value,
}

/// Result of a batch delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeleteResult {
  pub deleted: u64,
}

/// Client-to-server realtime messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
  Subscribe {
    id: String,
    collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
  },
  Unsubscribe {
    id: String,
  },
  Ping {
    id: String,
  },
}

/// Server-to-client realtime messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
  Subscribed { id: String },
  Unsubscribed { id: String },
  Event { id: String, event: ChangeEvent },
  Error { id: String, error: String },
  Pong { id: String },
}

/// Change notifications delivered on a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent {
  Create { new: Document },
  Update { old: serde_json::Value, new: Document },
  Delete { old: Document },
}
