//! Post repository
//!
//! Posts are loaded together with their categories and tags. Visibility
//! (`is_published = 1 AND is_deleted = 0`) is applied here for the public
//! queries; admin queries see everything.

use crate::db::DynDatabasePool;
use crate::models::{
    Archive, Category, ContentType, ListParams, Post, PostCounts, PostStats, PostStatusFilter, Tag,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use std::sync::Arc;

/// Filters for the public post list
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub featured_only: bool,
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and return its ID. Categories and tags are not touched.
    async fn create(&self, post: &Post) -> Result<i64>;

    /// Overwrite every column of the post row
    async fn update(&self, post: &Post) -> Result<()>;

    /// Any post, deleted or not
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Visible post by its route link
    async fn get_by_route_link(&self, route_link: &str) -> Result<Option<Post>>;

    /// Whether another post already owns `route_link`
    async fn route_link_exists(&self, route_link: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Visible posts, newest first
    async fn list_published(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    /// Admin list by lifecycle state with an optional title keyword
    async fn list_admin(
        &self,
        status: PostStatusFilter,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<Post>, i64)>;

    /// Visible posts whose title, abstract or content contains `keyword`
    async fn search(&self, keyword: &str, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    /// Visible post counts grouped by publish year and month, newest first
    async fn archive(&self) -> Result<Vec<Archive>>;

    /// Visible posts published in `[start, end)`
    async fn list_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Post>>;

    /// Every visible post, for the sitemap
    async fn list_all_published(&self) -> Result<Vec<Post>>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Purge every soft-deleted post, returning how many were removed
    async fn delete_all_deleted(&self) -> Result<u64>;

    async fn counts(&self) -> Result<PostCounts>;

    /// Returns false when the post does not exist or is deleted
    async fn increment_hits(&self, id: i64) -> Result<bool>;

    async fn increment_likes(&self, id: i64) -> Result<bool>;

    async fn get_stats(&self, id: i64) -> Result<Option<PostStats>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    /// Load categories and tags for each post
    async fn attach_relations(&self, posts: &mut [Post]) -> Result<()> {
        let pool = self.pool.sqlite();
        for post in posts.iter_mut() {
            let categories = sqlx::query(
                r#"
                SELECT c.id, c.route_name, c.display_name, c.note, c.created_at
                FROM categories c
                INNER JOIN post_categories pc ON pc.category_id = c.id
                WHERE pc.post_id = ?
                ORDER BY c.display_name COLLATE NOCASE
                "#,
            )
            .bind(post.id)
            .fetch_all(pool)
            .await
            .context("Failed to load post categories")?;

            post.categories = categories
                .iter()
                .map(|row| {
                    Ok(Category {
                        id: row.try_get("id")?,
                        route_name: row.try_get("route_name")?,
                        display_name: row.try_get("display_name")?,
                        note: row.try_get("note")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .collect::<Result<_>>()?;

            let tags = sqlx::query(
                r#"
                SELECT t.id, t.display_name, t.normalized_name
                FROM tags t
                INNER JOIN post_tags pt ON pt.tag_id = t.id
                WHERE pt.post_id = ?
                ORDER BY t.display_name COLLATE NOCASE
                "#,
            )
            .bind(post.id)
            .fetch_all(pool)
            .await
            .context("Failed to load post tags")?;

            post.tags = tags
                .iter()
                .map(|row| {
                    Ok(Tag {
                        id: row.try_get("id")?,
                        display_name: row.try_get("display_name")?,
                        normalized_name: row.try_get("normalized_name")?,
                    })
                })
                .collect::<Result<_>>()?;
        }
        Ok(())
    }

    async fn fetch_posts<'q>(&self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Result<Vec<Post>> {
        let rows = query
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list posts")?;
        let mut posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
        self.attach_relations(&mut posts).await?;
        Ok(posts)
    }

    async fn fetch_one_post<'q>(&self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Result<Option<Post>> {
        let row = query
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get post")?;
        match row {
            Some(row) => {
                let mut posts = vec![row_to_post(&row)?];
                self.attach_relations(&mut posts).await?;
                Ok(posts.pop())
            }
            None => Ok(None),
        }
    }
}

const POST_COLUMNS: &str = r#"
    p.id, p.title, p.slug, p.author, p.content, p.content_type, p.content_abstract,
    p.content_language_code, p.comment_enabled, p.is_feed_included, p.is_featured,
    p.is_original, p.origin_link, p.hero_image_url, p.inline_css, p.is_published,
    p.is_deleted, p.pub_date, p.last_modified, p.created_at, p.route_link, p.hits, p.likes
"#;

const VISIBLE: &str = "p.is_published = 1 AND p.is_deleted = 0";

const PUBLISHED_FILTER: &str = r#"
    p.is_published = 1 AND p.is_deleted = 0
    AND (? IS NULL OR EXISTS (SELECT 1 FROM post_categories pc WHERE pc.post_id = p.id AND pc.category_id = ?))
    AND (? IS NULL OR EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?))
    AND (? = 0 OR p.is_featured = 1)
"#;

fn bind_filter<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    filter: &PostFilter,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.tag_id)
        .bind(filter.tag_id)
        .bind(filter.featured_only)
}

fn status_clause(status: PostStatusFilter) -> &'static str {
    match status {
        PostStatusFilter::Default => "p.is_deleted = 0",
        PostStatusFilter::Published => "p.is_published = 1 AND p.is_deleted = 0",
        PostStatusFilter::Draft => "p.is_published = 0 AND p.is_deleted = 0",
        PostStatusFilter::Deleted => "p.is_deleted = 1",
    }
}

/// `%keyword%` with LIKE wildcards escaped by `\`
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (
                title, slug, author, content, content_type, content_abstract,
                content_language_code, comment_enabled, is_feed_included, is_featured,
                is_original, origin_link, hero_image_url, inline_css, is_published,
                is_deleted, pub_date, last_modified, created_at, route_link, hits, likes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.author)
        .bind(&post.content)
        .bind(post.content_type.as_str())
        .bind(&post.content_abstract)
        .bind(&post.content_language_code)
        .bind(post.comment_enabled)
        .bind(post.is_feed_included)
        .bind(post.is_featured)
        .bind(post.is_original)
        .bind(&post.origin_link)
        .bind(&post.hero_image_url)
        .bind(&post.inline_css)
        .bind(post.is_published)
        .bind(post.is_deleted)
        .bind(post.pub_date)
        .bind(post.last_modified)
        .bind(post.created_at)
        .bind(&post.route_link)
        .bind(post.hits)
        .bind(post.likes)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create post")?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET
                title = ?, slug = ?, author = ?, content = ?, content_type = ?,
                content_abstract = ?, content_language_code = ?, comment_enabled = ?,
                is_feed_included = ?, is_featured = ?, is_original = ?, origin_link = ?,
                hero_image_url = ?, inline_css = ?, is_published = ?, is_deleted = ?,
                pub_date = ?, last_modified = ?, route_link = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.author)
        .bind(&post.content)
        .bind(post.content_type.as_str())
        .bind(&post.content_abstract)
        .bind(&post.content_language_code)
        .bind(post.comment_enabled)
        .bind(post.is_feed_included)
        .bind(post.is_featured)
        .bind(post.is_original)
        .bind(&post.origin_link)
        .bind(&post.hero_image_url)
        .bind(&post.inline_css)
        .bind(post.is_published)
        .bind(post.is_deleted)
        .bind(post.pub_date)
        .bind(post.last_modified)
        .bind(&post.route_link)
        .bind(post.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update post")?;
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        self.fetch_one_post(sqlx::query(&sql).bind(id)).await
    }

    async fn get_by_route_link(&self, route_link: &str) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.route_link = ? AND {}",
            POST_COLUMNS, VISIBLE
        );
        self.fetch_one_post(sqlx::query(&sql).bind(route_link)).await
    }

    async fn route_link_exists(&self, route_link: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE route_link = ? AND (? IS NULL OR id != ?)",
        )
        .bind(route_link)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check route link")?;
        Ok(count > 0)
    }

    async fn list_published(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let count_sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", PUBLISHED_FILTER);
        let total: i64 = bind_filter(sqlx::query(&count_sql), filter)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count published posts")?
            .try_get(0)?;

        let sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, PUBLISHED_FILTER
        );
        let query = bind_filter(sqlx::query(&sql), filter)
            .bind(params.limit())
            .bind(params.offset());
        let posts = self.fetch_posts(query).await?;

        Ok((posts, total))
    }

    async fn list_admin(
        &self,
        status: PostStatusFilter,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<Post>, i64)> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(like_pattern);
        let where_clause = format!(
            "{} AND (? IS NULL OR p.title LIKE ? ESCAPE '\\')",
            status_clause(status)
        );

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts p WHERE {}", where_clause))
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count posts")?;

        let sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY COALESCE(p.last_modified, p.created_at) DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, where_clause
        );
        let query = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(params.limit())
            .bind(params.offset());
        let posts = self.fetch_posts(query).await?;

        Ok((posts, total))
    }

    async fn search(&self, keyword: &str, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let pattern = like_pattern(keyword.trim());
        let where_clause = format!(
            "{} AND (p.title LIKE ? ESCAPE '\\' OR p.content_abstract LIKE ? ESCAPE '\\' OR p.content LIKE ? ESCAPE '\\')",
            VISIBLE
        );

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts p WHERE {}", where_clause))
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count search results")?;

        let sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS, where_clause
        );
        let query = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(params.limit())
            .bind(params.offset());
        let posts = self.fetch_posts(query).await?;

        Ok((posts, total))
    }

    async fn archive(&self) -> Result<Vec<Archive>> {
        // pub_date is stored as RFC 3339 text, so the first 7 chars are `YYYY-MM`
        let rows = sqlx::query(
            r#"
            SELECT CAST(substr(p.pub_date, 1, 4) AS INTEGER) AS year,
                   CAST(substr(p.pub_date, 6, 2) AS INTEGER) AS month,
                   COUNT(*) AS count
            FROM posts p
            WHERE p.is_published = 1 AND p.is_deleted = 0 AND p.pub_date IS NOT NULL
            GROUP BY year, month
            ORDER BY year DESC, month DESC
            "#,
        )
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to load archive")?;

        rows.iter()
            .map(|row| {
                Ok(Archive {
                    year: row.try_get::<i64, _>("year")? as i32,
                    month: row.try_get::<i64, _>("month")? as u32,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn list_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE {} AND p.pub_date >= ? AND p.pub_date < ? ORDER BY p.pub_date DESC",
            POST_COLUMNS, VISIBLE
        );
        self.fetch_posts(sqlx::query(&sql).bind(start).bind(end)).await
    }

    async fn list_all_published(&self) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY p.pub_date DESC",
            POST_COLUMNS, VISIBLE
        );
        self.fetch_posts(sqlx::query(&sql)).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete post")?;
        Ok(())
    }

    async fn delete_all_deleted(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE is_deleted = 1")
            .execute(self.pool.sqlite())
            .await
            .context("Failed to empty recycle bin")?;
        Ok(result.rows_affected())
    }

    async fn counts(&self) -> Result<PostCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_published = 1 AND is_deleted = 0 THEN 1 ELSE 0 END), 0) AS published,
                COALESCE(SUM(CASE WHEN is_published = 0 AND is_deleted = 0 THEN 1 ELSE 0 END), 0) AS drafts,
                COALESCE(SUM(CASE WHEN is_deleted = 1 THEN 1 ELSE 0 END), 0) AS deleted
            FROM posts
            "#,
        )
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count posts")?;

        Ok(PostCounts {
            published: row.try_get("published")?,
            drafts: row.try_get("drafts")?,
            deleted: row.try_get("deleted")?,
        })
    }

    async fn increment_hits(&self, id: i64) -> Result<bool> {
        let sql = format!("UPDATE posts AS p SET hits = hits + 1 WHERE p.id = ? AND {}", VISIBLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to increment hits")?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_likes(&self, id: i64) -> Result<bool> {
        let sql = format!("UPDATE posts AS p SET likes = likes + 1 WHERE p.id = ? AND {}", VISIBLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to increment likes")?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_stats(&self, id: i64) -> Result<Option<PostStats>> {
        let sql = format!("SELECT p.hits, p.likes FROM posts p WHERE p.id = ? AND {}", VISIBLE);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get post stats")?;

        row.map(|r| {
            Ok(PostStats {
                hits: r.try_get("hits")?,
                likes: r.try_get("likes")?,
            })
        })
        .transpose()
    }
}

fn row_to_post(row: &SqliteRow) -> Result<Post> {
    let content_type: String = row.try_get("content_type")?;
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        content_type: ContentType::parse(&content_type).unwrap_or_default(),
        content_abstract: row.try_get("content_abstract")?,
        content_language_code: row.try_get("content_language_code")?,
        comment_enabled: row.try_get("comment_enabled")?,
        is_feed_included: row.try_get("is_feed_included")?,
        is_featured: row.try_get("is_featured")?,
        is_original: row.try_get("is_original")?,
        origin_link: row.try_get("origin_link")?,
        hero_image_url: row.try_get("hero_image_url")?,
        inline_css: row.try_get("inline_css")?,
        is_published: row.try_get("is_published")?,
        is_deleted: row.try_get("is_deleted")?,
        pub_date: row.try_get("pub_date")?,
        last_modified: row.try_get("last_modified")?,
        created_at: row.try_get("created_at")?,
        route_link: row.try_get("route_link")?,
        hits: row.try_get("hits")?,
        likes: row.try_get("likes")?,
        categories: Vec::new(),
        tags: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTagRepository, TagRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::build_route_link;
    use chrono::TimeZone;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn sample_post(slug: &str, published_at: Option<DateTime<Utc>>) -> Post {
        Post {
            id: 0,
            title: format!("Title {}", slug),
            slug: slug.to_string(),
            author: Some("admin".to_string()),
            content: format!("Content of {}", slug),
            content_type: ContentType::Markdown,
            content_abstract: format!("Abstract {}", slug),
            content_language_code: "en-us".to_string(),
            comment_enabled: true,
            is_feed_included: true,
            is_featured: false,
            is_original: true,
            origin_link: None,
            hero_image_url: None,
            inline_css: None,
            is_published: published_at.is_some(),
            is_deleted: false,
            pub_date: published_at,
            last_modified: None,
            created_at: Utc::now(),
            route_link: published_at.map(|d| build_route_link(d, slug)),
            hits: 0,
            likes: 0,
            categories: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_route_link() {
        let (_pool, repo) = setup_test_repo().await;
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap();
        let id = repo.create(&sample_post("hello", Some(date))).await.unwrap();

        let post = repo.get_by_route_link("2024/3/7/hello").await.unwrap().unwrap();
        assert_eq!(post.id, id);
        assert_eq!(post.pub_date, Some(date));
        assert_eq!(post.content_type, ContentType::Markdown);

        assert!(repo.route_link_exists("2024/3/7/hello", None).await.unwrap());
        assert!(!repo.route_link_exists("2024/3/7/hello", Some(id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_drafts_and_deleted_are_hidden() {
        let (_pool, repo) = setup_test_repo().await;
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        repo.create(&sample_post("visible", Some(date))).await.unwrap();
        repo.create(&sample_post("draft", None)).await.unwrap();
        let mut gone = sample_post("gone", Some(date));
        gone.is_deleted = true;
        repo.create(&gone).await.unwrap();

        let (posts, total) = repo
            .list_published(&PostFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].slug, "visible");
        assert!(repo.get_by_route_link("2024/1/1/gone").await.unwrap().is_none());

        let counts = repo.counts().await.unwrap();
        assert_eq!(counts, PostCounts { published: 1, drafts: 1, deleted: 1 });

        let (drafts, _) = repo
            .list_admin(PostStatusFilter::Draft, None, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].slug, "draft");

        assert_eq!(repo.delete_all_deleted().await.unwrap(), 1);
        assert_eq!(repo.counts().await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn test_list_published_by_tag_and_pagination() {
        let (pool, repo) = setup_test_repo().await;
        let tags = SqlxTagRepository::new(pool.clone());
        let rust = tags.create(&Tag::new("Rust", "rust")).await.unwrap();

        for day in 1..=5 {
            let date = Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap();
            let id = repo.create(&sample_post(&format!("p{}", day), Some(date))).await.unwrap();
            if day % 2 == 1 {
                tags.set_post_tags(id, &[rust.id]).await.unwrap();
            }
        }

        let filter = PostFilter {
            tag_id: Some(rust.id),
            ..Default::default()
        };
        let (posts, total) = repo.list_published(&filter, &ListParams::new(1, 2)).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "p5");
        assert_eq!(posts[0].tags[0].normalized_name, "rust");

        let (page2, _) = repo.list_published(&filter, &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].slug, "p1");
    }

    #[tokio::test]
    async fn test_archive_and_date_range() {
        let (_pool, repo) = setup_test_repo().await;
        for (y, m, d, slug) in [(2023, 12, 31, "a"), (2024, 1, 5, "b"), (2024, 1, 20, "c")] {
            let date = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
            repo.create(&sample_post(slug, Some(date))).await.unwrap();
        }

        let archive = repo.archive().await.unwrap();
        assert_eq!(
            archive,
            vec![
                Archive { year: 2024, month: 1, count: 2 },
                Archive { year: 2023, month: 12, count: 1 },
            ]
        );

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let january = repo.list_by_date_range(start, end).await.unwrap();
        assert_eq!(january.len(), 2);
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards() {
        let (_pool, repo) = setup_test_repo().await;
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut post = sample_post("discount", Some(date));
        post.title = "100% off".to_string();
        repo.create(&post).await.unwrap();
        repo.create(&sample_post("other", Some(date))).await.unwrap();

        let (found, total) = repo.search("100%", &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].slug, "discount");

        let (none, _) = repo.search("%", &ListParams::default()).await.unwrap();
        assert_eq!(none.len(), 1);
    }

    #[tokio::test]
    async fn test_hits_and_likes() {
        let (_pool, repo) = setup_test_repo().await;
        let id = repo.create(&sample_post("p", Some(Utc::now()))).await.unwrap();

        assert!(repo.increment_hits(id).await.unwrap());
        assert!(repo.increment_hits(id).await.unwrap());
        assert!(repo.increment_likes(id).await.unwrap());
        assert!(!repo.increment_hits(9999).await.unwrap());

        let stats = repo.get_stats(id).await.unwrap().unwrap();
        assert_eq!(stats, PostStats { hits: 2, likes: 1 });
    }
}
