use crate::models::{Conversation, ConversationSummary, Message};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str = "id, participant_a, participant_b, last_message_at, created_at";
const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, recipient_id, content, read_at, created_at";

/// Fetch the conversation for a pair, creating it if needed, in one
/// statement. The no-op `DO UPDATE` makes `RETURNING` yield the existing row.
pub async fn get_or_create(
    pool: &PgPool,
    user_a: Uuid,
    user_b: Uuid,
) -> Result<Conversation, sqlx::Error> {
    let (a, b) = Conversation::sorted_pair(user_a, user_b);
    sqlx::query_as::<_, Conversation>(&format!(
        r#"
        INSERT INTO conversations (id, participant_a, participant_b)
        VALUES ($1, $2, $3)
        ON CONFLICT (participant_a, participant_b)
        DO UPDATE SET participant_a = EXCLUDED.participant_a
        RETURNING {CONVERSATION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
    ))
    .bind(conversation_id)
    .fetch_optional(pool)
    .await
}

/// Inbox for `user_id`, most recently active first
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ConversationSummary>, sqlx::Error> {
    sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT c.id, c.last_message_at, c.created_at,
               u.id AS other_user_id,
               u.username AS other_username,
               u.display_name AS other_display_name,
               u.avatar_url AS other_avatar_url,
               last.content AS last_message,
               last.sender_id AS last_sender_id,
               (SELECT COUNT(*) FROM messages m
                 WHERE m.conversation_id = c.id
                   AND m.recipient_id = $1
                   AND m.read_at IS NULL) AS unread_count
        FROM conversations c
        JOIN users u
          ON u.id = CASE WHEN c.participant_a = $1 THEN c.participant_b ELSE c.participant_a END
        LEFT JOIN LATERAL (
            SELECT m.content, m.sender_id
            FROM messages m
            WHERE m.conversation_id = c.id
            ORDER BY m.created_at DESC
            LIMIT 1
        ) last ON TRUE
        WHERE c.participant_a = $1 OR c.participant_b = $1
        ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Persist a message and bump the conversation's `last_message_at`.
pub async fn insert_message(
    pool: &PgPool,
    conversation_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    content: &str,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!(
        r#"
        WITH m AS (
            INSERT INTO messages (id, conversation_id, sender_id, recipient_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
        ), bump AS (
            UPDATE conversations SET last_message_at = (SELECT created_at FROM m)
            WHERE id = $2
        )
        SELECT {MESSAGE_COLUMNS} FROM m
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// One page of history strictly older than `before`, returned oldest first.
pub async fn list_messages(
    pool: &PgPool,
    conversation_id: Uuid,
    before: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let mut messages = sqlx::query_as::<_, Message>(&format!(
        r#"
        SELECT {MESSAGE_COLUMNS}
        FROM messages
        WHERE conversation_id = $1 AND ($2::timestamptz IS NULL OR created_at < $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#
    ))
    .bind(conversation_id)
    .bind(before)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}

/// Mark everything addressed to `reader_id` in the conversation as read.
pub async fn mark_read(
    pool: &PgPool,
    conversation_id: Uuid,
    reader_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE messages SET read_at = NOW()
        WHERE conversation_id = $1 AND recipient_id = $2 AND read_at IS NULL
        "#,
    )
    .bind(conversation_id)
    .bind(reader_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM messages WHERE recipient_id = $1 AND read_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn find_message(pool: &PgPool, message_id: Uuid) -> Result<Option<Message>, sqlx::Error> {
    sqlx::query_as::<_, Message>(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
        .bind(message_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_message(pool: &PgPool, message_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
