//! Basic example demonstrating OakBase Rust SDK usage.

use oakbase::{ChangeEvent, OakBase, QueryBuilder};
use serde_json::json;

#[tokio::main]
async fn main() -> oakbase::Result<()> {
  // Connect to an OakBase backend
  let client = OakBase::new("http://localhost:4920")?;

  // Check the server is up
  client.ping().await?;
  println!("Ping successful!");

  // List collections
  let collections = client.list_collections().await?;
  println!("Collections: {:?}", collections);

  // Insert a document
  let doc = client
    .insert(
      "users",
      json!({
          "name": "Alice",
          "email": "alice@example.com",
          "active": true
      }),
    )
    .await?;
  println!("Inserted document: {:?}", doc);

  // Query documents
  let query = QueryBuilder::new()
    .set_equal("active", true)
    .or_equal("role", "admin")
    .or_equal("role", "moderator")
    .populate("profile")
    .order_by_desc("created_at")
    .limit(20);
  let users = client.list_documents("users", &query).await?;
  println!("Active users: {} of {}", users.items.len(), users.total);

  // Count with the same filters
  let active = client.count("users", &QueryBuilder::new().set_equal("active", true)).await?;
  println!("Active count: {}", active);

  // Update the document
  let updated = client
    .update(
      "users",
      doc.id,
      json!({
          "name": "Alice Updated",
          "email": "alice.updated@example.com",
          "active": true
      }),
    )
    .await?;
  println!("Updated document: {:?}", updated);

  // Subscribe to changes (in a real app, you'd run this in a separate task)
  println!("\nSubscribing to user changes...");
  println!("(Insert/update/delete users from another client to see changes)");
  println!("Press Ctrl+C to exit.\n");

  let mut sub = client.subscribe("users", None).await?;

  while let Some(change) = sub.next().await {
    match change {
      ChangeEvent::Create { new } => {
        println!("Create: {}", new.data);
      }
      ChangeEvent::Update { old, new } => {
        println!("Update: {} -> {}", old, new.data);
      }
      ChangeEvent::Delete { old } => {
        println!("Delete: {}", old.data);
      }
    }
  }

  Ok(())
}
