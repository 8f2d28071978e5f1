//! Target content previews
//!
//! Posts, comments and groups belong to the community tables. Rows are
//! fetched in batches of [`PREVIEW_CHUNK_SIZE`] ids per `IN` clause, all
//! batches in flight at once. A missing community table yields no rows, and
//! a case without a row gets [`Preview::placeholder`].

use futures::future::{try_join_all, BoxFuture};
use icc_common::db::faults::is_missing_table;
use icc_common::db::models::{CommentRow, GroupRow, PostRow};
use icc_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::types::{Preview, TargetType};

/// Maximum ids per `IN (...)` clause
pub const PREVIEW_CHUNK_SIZE: usize = 150;

const POST_COLUMNS: &str = "id, author_name, author_device_id, content, created_at, \
     visibility, moderation_status, reported_count";
const COMMENT_COLUMNS: &str = "id, post_id, author_name, author_device_id, content, created_at";
const GROUP_COLUMNS: &str =
    "id, name, description, created_at, created_by_name, created_by_device_id";

/// Community row behind a case, one variant per target type that has one
#[derive(Debug, Clone)]
pub enum TargetContent {
    Post(PostRow),
    Comment(CommentRow),
    Group(GroupRow),
}

impl TargetContent {
    pub fn target_type(&self) -> TargetType {
        match self {
            TargetContent::Post(_) => TargetType::Post,
            TargetContent::Comment(_) => TargetType::Comment,
            TargetContent::Group(_) => TargetType::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            TargetContent::Post(row) => &row.id,
            TargetContent::Comment(row) => &row.id,
            TargetContent::Group(row) => &row.id,
        }
    }

    /// Device that authored (or created) the content
    pub fn author_device_id(&self) -> Option<&str> {
        let device = match self {
            TargetContent::Post(row) => row.author_device_id.as_deref(),
            TargetContent::Comment(row) => row.author_device_id.as_deref(),
            TargetContent::Group(row) => row.created_by_device_id.as_deref(),
        };
        device.map(str::trim).filter(|d| !d.is_empty())
    }

    pub fn preview(&self) -> Preview {
        match self {
            TargetContent::Post(row) => Preview {
                title: non_empty(&row.author_name).unwrap_or_else(|| "Post".to_string()),
                subtitle: format!("Post {}", icc_common::uuid_utils::short(&row.id, 8)),
                content: row.content.clone().unwrap_or_default(),
                author_name: non_empty(&row.author_name),
                author_device_id: non_empty(&row.author_device_id),
                created_at: non_empty(&row.created_at),
                visibility: non_empty(&row.visibility),
                moderation_status: non_empty(&row.moderation_status),
            },
            TargetContent::Comment(row) => Preview {
                title: non_empty(&row.author_name).unwrap_or_else(|| "Comment".to_string()),
                subtitle: match non_empty(&row.post_id) {
                    Some(post_id) => format!("Comment on post {}", post_id),
                    None => "Comment".to_string(),
                },
                content: row.content.clone().unwrap_or_default(),
                author_name: non_empty(&row.author_name),
                author_device_id: non_empty(&row.author_device_id),
                created_at: non_empty(&row.created_at),
                visibility: None,
                moderation_status: None,
            },
            TargetContent::Group(row) => Preview {
                title: non_empty(&row.name).unwrap_or_else(|| "Group".to_string()),
                subtitle: match non_empty(&row.created_by_name) {
                    Some(creator) => format!("By {}", creator),
                    None => "Group".to_string(),
                },
                content: row.description.clone().unwrap_or_default(),
                author_name: non_empty(&row.created_by_name),
                author_device_id: non_empty(&row.created_by_device_id),
                created_at: non_empty(&row.created_at),
                visibility: None,
                moderation_status: None,
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fetch the community rows for a set of targets.
///
/// Keyed by `(target type, target id)`. Users have no community row and are
/// never looked up.
pub async fn fetch_target_contents(
    pool: &SqlitePool,
    targets: &[(TargetType, String)],
) -> Result<HashMap<(TargetType, String), TargetContent>> {
    let mut post_ids = BTreeSet::new();
    let mut comment_ids = BTreeSet::new();
    let mut group_ids = BTreeSet::new();
    for (target_type, target_id) in targets {
        match target_type {
            TargetType::Post => post_ids.insert(target_id.clone()),
            TargetType::Comment => comment_ids.insert(target_id.clone()),
            TargetType::Group => group_ids.insert(target_id.clone()),
            TargetType::User => false,
        };
    }

    let post_ids: Vec<String> = post_ids.into_iter().collect();
    let comment_ids: Vec<String> = comment_ids.into_iter().collect();
    let group_ids: Vec<String> = group_ids.into_iter().collect();

    let mut batches: Vec<BoxFuture<'_, Result<Vec<TargetContent>>>> = Vec::new();
    for ids in post_ids.chunks(PREVIEW_CHUNK_SIZE) {
        batches.push(Box::pin(fetch_batch(pool, TargetType::Post, ids)));
    }
    for ids in comment_ids.chunks(PREVIEW_CHUNK_SIZE) {
        batches.push(Box::pin(fetch_batch(pool, TargetType::Comment, ids)));
    }
    for ids in group_ids.chunks(PREVIEW_CHUNK_SIZE) {
        batches.push(Box::pin(fetch_batch(pool, TargetType::Group, ids)));
    }

    let contents = try_join_all(batches)
        .await?
        .into_iter()
        .flatten()
        .map(|content| ((content.target_type(), content.id().to_string()), content))
        .collect();

    Ok(contents)
}

/// Fetch the community row for a single target
pub async fn load_target_content(
    pool: &SqlitePool,
    target_type: TargetType,
    target_id: &str,
) -> Result<Option<TargetContent>> {
    if target_type == TargetType::User {
        return Ok(None);
    }
    let ids = [target_id.to_string()];
    Ok(fetch_batch(pool, target_type, &ids).await?.into_iter().next())
}

async fn fetch_batch(
    pool: &SqlitePool,
    target_type: TargetType,
    ids: &[String],
) -> Result<Vec<TargetContent>> {
    let (table, columns) = match target_type {
        TargetType::Post => ("community_posts", POST_COLUMNS),
        TargetType::Comment => ("community_comments", COMMENT_COLUMNS),
        TargetType::Group => ("community_groups", GROUP_COLUMNS),
        TargetType::User => return Ok(Vec::new()),
    };
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM {} WHERE id IN (", columns, table));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");

    let result = match target_type {
        TargetType::Post => builder
            .build_query_as::<PostRow>()
            .fetch_all(pool)
            .await
            .map(|rows| rows.into_iter().map(TargetContent::Post).collect()),
        TargetType::Comment => builder
            .build_query_as::<CommentRow>()
            .fetch_all(pool)
            .await
            .map(|rows| rows.into_iter().map(TargetContent::Comment).collect()),
        _ => builder
            .build_query_as::<GroupRow>()
            .fetch_all(pool)
            .await
            .map(|rows| rows.into_iter().map(TargetContent::Group).collect()),
    };

    match result {
        Ok(contents) => Ok(contents),
        Err(e) if is_missing_table(&e, table) => {
            debug!("{} not present, previews fall back to placeholders", table);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icc_common::db::init::init_memory_database;

    async fn insert_post(pool: &SqlitePool, id: &str, author: Option<&str>) {
        sqlx::query(
            "INSERT INTO community_posts (id, author_name, author_device_id, content, created_at)
             VALUES (?, ?, 'dev-1', 'hello', '2026-01-01T00:00:00.000Z')",
        )
        .bind(id)
        .bind(author)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_post_preview_fields() {
        let pool = init_memory_database().await.unwrap();
        insert_post(&pool, "post-0123456789", Some("Ruth")).await;

        let content = load_target_content(&pool, TargetType::Post, "post-0123456789")
            .await
            .unwrap()
            .expect("post should load");
        let preview = content.preview();
        assert_eq!(preview.title, "Ruth");
        assert_eq!(preview.subtitle, "Post post-012");
        assert_eq!(preview.content, "hello");
        assert_eq!(preview.visibility.as_deref(), Some("public"));
        assert_eq!(preview.moderation_status.as_deref(), Some("clean"));
        assert_eq!(content.author_device_id(), Some("dev-1"));
    }

    #[tokio::test]
    async fn test_comment_and_group_previews() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO community_comments (id, post_id, content, created_at)
             VALUES ('c1', 'p9', 'nice', '2026-01-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO community_groups (id, name, description, created_by_name, created_at)
             VALUES ('g1', NULL, 'prayer group', 'Naomi', '2026-01-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let targets = vec![
            (TargetType::Comment, "c1".to_string()),
            (TargetType::Group, "g1".to_string()),
            (TargetType::User, "u1".to_string()),
        ];
        let contents = fetch_target_contents(&pool, &targets).await.unwrap();
        assert_eq!(contents.len(), 2);

        let comment = contents[&(TargetType::Comment, "c1".to_string())].preview();
        assert_eq!(comment.title, "Comment");
        assert_eq!(comment.subtitle, "Comment on post p9");

        let group = contents[&(TargetType::Group, "g1".to_string())].preview();
        assert_eq!(group.title, "Group");
        assert_eq!(group.subtitle, "By Naomi");
        assert_eq!(group.content, "prayer group");
    }

    #[tokio::test]
    async fn test_batches_larger_than_one_chunk() {
        let pool = init_memory_database().await.unwrap();
        let mut targets = Vec::new();
        for i in 0..(PREVIEW_CHUNK_SIZE + 20) {
            let id = format!("p{:04}", i);
            insert_post(&pool, &id, None).await;
            targets.push((TargetType::Post, id));
        }
        // Duplicates are looked up once
        targets.push((TargetType::Post, "p0000".to_string()));

        let contents = fetch_target_contents(&pool, &targets).await.unwrap();
        assert_eq!(contents.len(), PREVIEW_CHUNK_SIZE + 20);
    }

    #[tokio::test]
    async fn test_missing_community_table_yields_nothing() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("DROP TABLE community_groups")
            .execute(&pool)
            .await
            .unwrap();

        let content = load_target_content(&pool, TargetType::Group, "g1").await.unwrap();
        assert!(content.is_none());
    }
}
