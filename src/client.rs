//! HTTP client for the OakBase API.

use std::sync::{Arc, RwLock};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{
  AuthSession, BatchDeleteResult, CollectionModel, CountResult, Credentials, Document, ListResult,
};
use crate::query::QueryBuilder;
use crate::realtime::{RealtimeConnection, Subscription};

/// Client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
  pub base_url: String,
  pub api_key: Option<String>,
}

impl ClientOptions {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      api_key: None,
    }
  }

  pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
    self.api_key = Some(key.into());
    self
  }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async client for an OakBase backend.
///
/// All document reads go through the query-string format produced by
/// [`QueryBuilder`]; writes are plain JSON bodies. The client holds the
/// auth session from `login`/`register` and attaches it to every request.
///
/// # Example
///
/// ```no_run
/// use oakbase::{OakBase, QueryBuilder};
///
/// # async fn run() -> oakbase::Result<()> {
/// let client = OakBase::new("http://localhost:4920")?;
/// let admins = client
///   .list_documents("users", &QueryBuilder::new().set_equal("role", "admin"))
///   .await?;
/// println!("{} admins", admins.total);
/// # Ok(())
/// # }
/// ```
pub struct OakBase {
  http: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
  session: Arc<RwLock<Option<AuthSession>>>,
  realtime: tokio::sync::Mutex<Option<Arc<RealtimeConnection>>>,
}

impl OakBase {
  /// Create a client for the given base URL.
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    Self::with_options(ClientOptions::new(base_url))
  }

  /// Create a client from explicit options.
  pub fn with_options(options: ClientOptions) -> Result<Self> {
    let base_url = options.base_url.trim_end_matches('/').to_string();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
      return Err(Error::Url(format!("expected http(s) base URL, got {}", base_url)));
    }

    Ok(Self {
      http: reqwest::Client::new(),
      base_url,
      api_key: options.api_key,
      session: Arc::new(RwLock::new(None)),
      realtime: tokio::sync::Mutex::new(None),
    })
  }

  /// The normalized base URL this client talks to.
  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn query_endpoint(&self, path: &str, query: &QueryBuilder) -> String {
    let qs = query.build();
    if qs.is_empty() {
      self.endpoint(path)
    } else {
      format!("{}?{}", self.endpoint(path), qs)
    }
  }

  fn authorize(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if let Some(key) = &self.api_key {
      req = req.header("x-api-key", key);
    }
    if let Some(token) = self.auth_token() {
      req = req.bearer_auth(token);
    }
    req
  }

  async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
    let resp = self.authorize(req).send().await?;
    let status = resp.status();

    if status.is_success() {
      Ok(resp.json::<T>().await?)
    } else {
      let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
      };
      Err(Error::Server {
        status: status.as_u16(),
        message,
      })
    }
  }

  async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
    let resp = self.authorize(req).send().await?;
    let status = resp.status();

    if status.is_success() {
      Ok(())
    } else {
      let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
      };
      Err(Error::Server {
        status: status.as_u16(),
        message,
      })
    }
  }

  /// Check that the backend is reachable.
  pub async fn ping(&self) -> Result<()> {
    self.send_empty(self.http.get(self.endpoint("/health"))).await
  }

  // ---- collections ----

  /// List all collections.
  pub async fn list_collections(&self) -> Result<Vec<CollectionModel>> {
    self.send(self.http.get(self.endpoint("/collections"))).await
  }

  /// Create a collection.
  pub async fn create_collection(&self, name: &str) -> Result<CollectionModel> {
    let url = self.endpoint("/collections");
    self
      .send(self.http.post(url).json(&serde_json::json!({ "name": name })))
      .await
  }

  /// Delete a collection and everything in it.
  pub async fn delete_collection(&self, name: &str) -> Result<()> {
    let url = self.endpoint(&format!("/collections/{}", name));
    self.send_empty(self.http.delete(url)).await
  }

  // ---- documents ----

  /// List documents matching a query.
  pub async fn list_documents(
    &self,
    collection: &str,
    query: &QueryBuilder,
  ) -> Result<ListResult<Document>> {
    let url = self.query_endpoint(&format!("/collections/{}/documents", collection), query);
    debug!("GET {}", url);
    self.send(self.http.get(url)).await
  }

  /// Fetch a single document by id.
  pub async fn get_document(&self, collection: &str, id: Uuid) -> Result<Document> {
    let url = self.endpoint(&format!("/collections/{}/documents/{}", collection, id));
    self.send(self.http.get(url)).await
  }

  /// Insert a document.
  pub async fn insert(&self, collection: &str, data: serde_json::Value) -> Result<Document> {
    let url = self.endpoint(&format!("/collections/{}/documents", collection));
    self.send(self.http.post(url).json(&data)).await
  }

  /// Update a document by id.
  pub async fn update(
    &self,
    collection: &str,
    id: Uuid,
    data: serde_json::Value,
  ) -> Result<Document> {
    let url = self.endpoint(&format!("/collections/{}/documents/{}", collection, id));
    self.send(self.http.patch(url).json(&data)).await
  }

  /// Delete a document by id.
  pub async fn delete(&self, collection: &str, id: Uuid) -> Result<()> {
    let url = self.endpoint(&format!("/collections/{}/documents/{}", collection, id));
    self.send_empty(self.http.delete(url)).await
  }

  // ---- query endpoints ----

  /// Count documents matching a query.
  pub async fn count(&self, collection: &str, query: &QueryBuilder) -> Result<u64> {
    let url = self.query_endpoint(
      &format!("/collections/{}/query/documents/count", collection),
      query,
    );
    debug!("GET {}", url);
    let result: CountResult = self.send(self.http.get(url)).await?;
    Ok(result.count)
  }

  /// Run the aggregation endpoint against a query.
  pub async fn aggregate(
    &self,
    collection: &str,
    query: &QueryBuilder,
  ) -> Result<serde_json::Value> {
    let url = self.query_endpoint(
      &format!("/collections/{}/query/documents/aggregate", collection),
      query,
    );
    debug!("GET {}", url);
    self.send(self.http.get(url)).await
  }

  /// Run the group-by endpoint against a query.
  pub async fn group_by(
    &self,
    collection: &str,
    query: &QueryBuilder,
  ) -> Result<serde_json::Value> {
    let url = self.query_endpoint(
      &format!("/collections/{}/query/documents/group-by", collection),
      query,
    );
    debug!("GET {}", url);
    self.send(self.http.get(url)).await
  }

  // ---- batch ----

  /// Insert several documents in one request.
  pub async fn insert_many(
    &self,
    collection: &str,
    docs: Vec<serde_json::Value>,
  ) -> Result<Vec<Document>> {
    let url = self.endpoint(&format!("/collections/{}/documents/batch", collection));
    self.send(self.http.post(url).json(&docs)).await
  }

  /// Delete several documents by id in one request.
  pub async fn delete_many(&self, collection: &str, ids: &[Uuid]) -> Result<u64> {
    let url = self.endpoint(&format!("/collections/{}/documents/batch", collection));
    let result: BatchDeleteResult = self
      .send(self.http.delete(url).json(&serde_json::json!({ "ids": ids })))
      .await?;
    Ok(result.deleted)
  }

  // ---- auth ----

  /// Register a new account and store the returned session.
  pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession> {
    let creds = Credentials {
      email: email.to_string(),
      password: password.to_string(),
    };
    let session: AuthSession = self
      .send(self.http.post(self.endpoint("/auth/register")).json(&creds))
      .await?;
    self.store_session(Some(session.clone()));
    Ok(session)
  }

  /// Log in and store the returned session.
  pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
    let creds = Credentials {
      email: email.to_string(),
      password: password.to_string(),
    };
    let session: AuthSession = self
      .send(self.http.post(self.endpoint("/auth/login")).json(&creds))
      .await?;
    self.store_session(Some(session.clone()));
    Ok(session)
  }

  /// Exchange the stored refresh token for a fresh session.
  pub async fn refresh(&self) -> Result<AuthSession> {
    let refresh_token = self
      .current_session()
      .and_then(|s| s.refresh_token)
      .ok_or_else(|| Error::Auth("no refresh token stored".to_string()))?;

    let session: AuthSession = self
      .send(
        self
          .http
          .post(self.endpoint("/auth/refresh"))
          .json(&serde_json::json!({ "refresh_token": refresh_token })),
      )
      .await?;
    self.store_session(Some(session.clone()));
    Ok(session)
  }

  /// Invalidate the stored session server-side and forget it locally.
  pub async fn logout(&self) -> Result<()> {
    let result = self.send_empty(self.http.post(self.endpoint("/auth/logout"))).await;
    self.store_session(None);
    result
  }

  /// Fetch the account behind the stored session.
  pub async fn me(&self) -> Result<serde_json::Value> {
    self.send(self.http.get(self.endpoint("/auth/me"))).await
  }

  /// The bearer token of the stored session, if any.
  pub fn auth_token(&self) -> Option<String> {
    self.current_session().map(|s| s.token)
  }

  /// Replace the stored session with an externally obtained token.
  pub fn set_auth_token(&self, token: impl Into<String>) {
    self.store_session(Some(AuthSession {
      token: token.into(),
      refresh_token: None,
      user: serde_json::Value::Null,
    }));
  }

  fn current_session(&self) -> Option<AuthSession> {
    self.session.read().ok().and_then(|guard| (*guard).clone())
  }

  fn store_session(&self, session: Option<AuthSession>) {
    if let Ok(mut guard) = self.session.write() {
      *guard = session;
    }
  }

  // ---- realtime ----

  fn realtime_url(&self) -> String {
    let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
      format!("wss://{}", rest)
    } else {
      let rest = self.base_url.strip_prefix("http://").unwrap_or(&self.base_url);
      format!("ws://{}", rest)
    };
    format!("{}/realtime", ws_base)
  }

  /// Subscribe to change events on a collection.
  ///
  /// An optional query restricts the events server-side to documents
  /// matching the serialized filter. The realtime connection is opened on
  /// first use and shared by all subscriptions of this client.
  pub async fn subscribe(
    &self,
    collection: &str,
    query: Option<&QueryBuilder>,
  ) -> Result<Subscription> {
    let mut conn = self.realtime.lock().await;
    if conn.is_none() {
      let url = self.realtime_url();
      debug!("connecting realtime socket {}", url);
      *conn = Some(RealtimeConnection::connect(&url, self.auth_token()).await?);
    }

    let conn = conn.as_ref().ok_or(Error::ChannelClosed)?;
    conn.subscribe(collection, query.map(|q| q.build())).await
  }
}
