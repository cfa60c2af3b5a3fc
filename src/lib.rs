//! OakBase Rust Client SDK
//!
//! An HTTP/WebSocket client for OakBase, a backend-as-a-service document
//! store. Queries are built with a fluent [`QueryBuilder`] and serialized
//! into the query-string format the backend's filtering engine consumes.
//!
//! # Example
//!
//! ```no_run
//! use oakbase::{OakBase, QueryBuilder, SortDir};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> oakbase::Result<()> {
//!     // Connect to an OakBase backend
//!     let client = OakBase::new("http://localhost:4920")?;
//!
//!     // Insert a document
//!     let doc = client.insert("users", json!({
//!         "name": "Alice",
//!         "email": "alice@example.com"
//!     })).await?;
//!
//!     println!("Inserted: {:?}", doc);
//!
//!     // Query documents
//!     let query = QueryBuilder::new()
//!         .set_equal("status", "active")
//!         .where_greater_than_or_equal("age", 18)
//!         .sort_by("name", SortDir::Asc)
//!         .limit(20);
//!     let users = client.list_documents("users", &query).await?;
//!
//!     println!("Found: {} of {}", users.items.len(), users.total);
//!
//!     // Subscribe to changes
//!     let mut sub = client.subscribe("users", None).await?;
//!     while let Some(change) = sub.next().await {
//!         println!("Change: {:?}", change);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
pub mod model;
pub mod query;
pub mod realtime;

pub use client::{ClientOptions, OakBase};
pub use error::{Error, Result};
pub use model::{
  AuthSession, BatchDeleteResult, ChangeEvent, ClientMessage, CollectionModel, CountResult,
  Credentials, Document, ListResult, ServerMessage,
};
pub use query::{Operator, QueryBuilder, SortDir, Value};
pub use realtime::Subscription;
