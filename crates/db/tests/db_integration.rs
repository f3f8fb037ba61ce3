//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `taskyflow_test`)
//!   `TEST_DB_PASSWORD` (default: `taskyflow_test`)
//!   `TEST_DB_NAME` (default: `taskyflow_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, Set, SqlxPostgresConnector};
use taskyflow_db::entities::{comment, conversation, message, message_read, todo, user};
use taskyflow_db::repositories::{
    CommentRepository, ConversationRepository, MessageReadRepository, MessageRepository,
    TodoRepository, UserRepository,
};
use taskyflow_db::test_utils::{TestDatabase, TestDbConfig};

// `DatabaseConnection` is not `Clone` when sea-orm's `mock` feature is enabled
// (it is, via dev-dependencies), so share the underlying pool instead.
fn share_conn(db: &TestDatabase) -> DatabaseConnection {
    SqlxPostgresConnector::from_sqlx_postgres_pool(db.conn.get_postgres_connection_pool().clone())
}

async fn insert_user(db: &TestDatabase, id: &str) -> user::Model {
    UserRepository::new(Arc::new(share_conn(db)))
        .create(user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(id.to_string()),
            username_lower: Set(id.to_lowercase()),
            name: Set(None),
            password_hash: Set("x".to_string()),
            token: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_comments_come_back_in_thread_order() {
    let db = TestDatabase::create_unique().await.expect("Failed to connect");
    let conn = Arc::new(share_conn(&db));
    insert_user(&db, "owner").await;

    TodoRepository::new(conn.clone())
        .create(todo::ActiveModel {
            id: Set("todo1".to_string()),
            user_id: Set("owner".to_string()),
            title: Set("Plan sprint".to_string()),
            description: Set(None),
            status: Set(todo::TodoStatus::Pending),
            priority: Set(todo::TodoPriority::Medium),
            visibility: Set(todo::TodoVisibility::Private),
            due_date: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    let comments = CommentRepository::new(conn);
    let base = Utc::now();
    // Inserted out of order; same timestamp for b and c
    for (id, offset) in [("c", 1), ("a", 0), ("b", 1)] {
        comments
            .create(comment::ActiveModel {
                id: Set(id.to_string()),
                todo_id: Set("todo1".to_string()),
                user_id: Set("owner".to_string()),
                parent_comment_id: Set(None),
                body: Set(id.to_string()),
                created_at: Set((base + Duration::seconds(offset)).into()),
                updated_at: Set(None),
            })
            .await
            .unwrap();
    }

    let ids: Vec<_> = comments
        .find_by_todo("todo1")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_read_marker_is_unique_per_message_and_user() {
    let db = TestDatabase::create_unique().await.expect("Failed to connect");
    let conn = Arc::new(share_conn(&db));
    insert_user(&db, "alice").await;
    insert_user(&db, "bob").await;

    let conversations = ConversationRepository::new(conn.clone());
    conversations
        .create(conversation::ActiveModel {
            id: Set("conv1".to_string()),
            created_at: Set(Utc::now().into()),
            last_message_at: Set(None),
        })
        .await
        .unwrap();

    MessageRepository::new(conn.clone())
        .create(message::ActiveModel {
            id: Set("m1".to_string()),
            conversation_id: Set("conv1".to_string()),
            sender_id: Set("alice".to_string()),
            body: Set("hi".to_string()),
            created_at: Set(Utc::now().into()),
            deleted_at: Set(None),
        })
        .await
        .unwrap();

    let reads = MessageReadRepository::new(conn);
    let marker = |id: &str| message_read::ActiveModel {
        id: Set(id.to_string()),
        message_id: Set("m1".to_string()),
        user_id: Set("bob".to_string()),
        read_at: Set(Utc::now().into()),
    };

    assert!(reads.create(marker("r1")).await.is_ok());
    assert!(reads.create(marker("r2")).await.is_err());
    assert_eq!(
        reads
            .find_read_message_ids("bob", &["m1".to_string()])
            .await
            .unwrap()
            .len(),
        1
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_cleanup() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let result = db.cleanup().await;
    assert!(result.is_ok(), "Cleanup failed: {:?}", result.err());
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
