//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings and applied in version
//! order. Applied versions are recorded in `_migrations`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::DynDatabasePool;

/// A single schema migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and increasing)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements, separated by `;`
    pub up: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_accounts",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(32) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                last_login_ip VARCHAR(64),
                last_login_time TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 2,
        name: "create_categories_and_tags",
        up: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_name VARCHAR(64) NOT NULL UNIQUE,
                display_name VARCHAR(64) NOT NULL,
                note VARCHAR(128),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO categories (route_name, display_name, note)
            VALUES ('default', 'Default', 'Default category');
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name VARCHAR(32) NOT NULL,
                normalized_name VARCHAR(64) NOT NULL UNIQUE
            );
            CREATE INDEX IF NOT EXISTS idx_tags_display_name ON tags(display_name);
        "#,
    },
    Migration {
        version: 3,
        name: "create_posts",
        up: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(128) NOT NULL,
                slug VARCHAR(128) NOT NULL,
                author VARCHAR(64),
                content TEXT NOT NULL,
                content_type VARCHAR(16) NOT NULL DEFAULT 'markdown',
                content_abstract VARCHAR(1024) NOT NULL DEFAULT '',
                content_language_code VARCHAR(8) NOT NULL DEFAULT 'en-us',
                comment_enabled BOOLEAN NOT NULL DEFAULT 1,
                is_feed_included BOOLEAN NOT NULL DEFAULT 1,
                is_featured BOOLEAN NOT NULL DEFAULT 0,
                is_original BOOLEAN NOT NULL DEFAULT 1,
                origin_link VARCHAR(256),
                hero_image_url VARCHAR(256),
                inline_css TEXT,
                is_published BOOLEAN NOT NULL DEFAULT 0,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                pub_date TIMESTAMP,
                last_modified TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                route_link VARCHAR(256) UNIQUE,
                hits INTEGER NOT NULL DEFAULT 0,
                likes INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_posts_slug ON posts(slug);
            CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts(pub_date);
            CREATE INDEX IF NOT EXISTS idx_posts_state ON posts(is_published, is_deleted);
            CREATE TABLE IF NOT EXISTS post_categories (
                post_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, category_id),
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_post_categories_category ON post_categories(category_id);
            CREATE TABLE IF NOT EXISTS post_tags (
                post_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, tag_id),
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_pages",
        up: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(128) NOT NULL,
                slug VARCHAR(128) NOT NULL UNIQUE,
                meta_description VARCHAR(256) NOT NULL DEFAULT '',
                html_content TEXT NOT NULL,
                css TEXT,
                hide_sidebar BOOLEAN NOT NULL DEFAULT 0,
                is_published BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_comments",
        up: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                username VARCHAR(64) NOT NULL,
                email VARCHAR(128) NOT NULL,
                ip_address VARCHAR(64),
                content TEXT NOT NULL,
                is_approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id);
            CREATE TABLE IF NOT EXISTS comment_replies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comment_replies_comment_id ON comment_replies(comment_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_site_furniture",
        up: r#"
            CREATE TABLE IF NOT EXISTS friend_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(64) NOT NULL,
                link_url VARCHAR(256) NOT NULL,
                rank INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS menus (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(64) NOT NULL,
                url VARCHAR(256) NOT NULL,
                icon VARCHAR(64),
                display_order INTEGER NOT NULL DEFAULT 0,
                is_open_in_new_tab BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS sub_menus (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                menu_id INTEGER NOT NULL,
                title VARCHAR(64) NOT NULL,
                url VARCHAR(256) NOT NULL,
                is_open_in_new_tab BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (menu_id) REFERENCES menus(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sub_menus_menu_id ON sub_menus(menu_id);
            CREATE TABLE IF NOT EXISTS widgets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(64) NOT NULL,
                widget_type VARCHAR(32) NOT NULL,
                content TEXT NOT NULL DEFAULT '{}',
                display_order INTEGER NOT NULL DEFAULT 0,
                is_enabled BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_mentions",
        up: r#"
            CREATE TABLE IF NOT EXISTS mentions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain VARCHAR(256) NOT NULL,
                source_url VARCHAR(256) NOT NULL,
                source_title VARCHAR(256) NOT NULL DEFAULT '',
                source_ip VARCHAR(64),
                target_post_id INTEGER NOT NULL,
                target_post_title VARCHAR(128) NOT NULL,
                worker VARCHAR(16) NOT NULL,
                ping_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (target_post_id) REFERENCES posts(id) ON DELETE CASCADE
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_mentions_source_target
                ON mentions(source_url, target_post_id);
        "#,
    },
    Migration {
        version: 8,
        name: "create_configuration_and_themes",
        up: r##"
            CREATE TABLE IF NOT EXISTS blog_configurations (
                cfg_key VARCHAR(64) PRIMARY KEY,
                cfg_value TEXT NOT NULL,
                last_modified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS blog_themes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                theme_name VARCHAR(32) NOT NULL UNIQUE,
                css_rules TEXT NOT NULL,
                is_system BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT OR IGNORE INTO blog_themes (theme_name, css_rules, is_system) VALUES
                ('Word Blue', '{"--accent-color1":"#2a579a","--accent-color2":"#1a365f","--accent-color3":"#3e6db5"}', 1),
                ('Excel Green', '{"--accent-color1":"#165331","--accent-color2":"#0E351F","--accent-color3":"#0E703A"}', 1),
                ('PowerPoint Orange', '{"--accent-color1":"#983B22","--accent-color2":"#622616","--accent-color3":"#C43E1C"}', 1),
                ('OneNote Purple', '{"--accent-color1":"#663276","--accent-color2":"#52285E","--accent-color3":"#7719AA"}', 1),
                ('China Red', '{"--accent-color1":"#ac2323","--accent-color2":"#8d1a1a","--accent-color3":"#c42b2b"}', 1);
        "##,
    },
    Migration {
        version: 9,
        name: "create_activity_logs",
        up: r#"
            CREATE TABLE IF NOT EXISTS activity_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type VARCHAR(32) NOT NULL,
                event_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                actor VARCHAR(64),
                operation VARCHAR(128) NOT NULL,
                target_name VARCHAR(256),
                meta TEXT,
                ip_address VARCHAR(64),
                user_agent VARCHAR(512)
            );
            CREATE INDEX IF NOT EXISTS idx_activity_logs_event_time ON activity_logs(event_time);
            CREATE INDEX IF NOT EXISTS idx_activity_logs_event_type ON activity_logs(event_type);
        "#,
    },
];

/// Apply all pending migrations. Returns the number applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool.sqlite()).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!("Applying migration {}: {}", migration.version, migration.name);
            apply_migration(pool.sqlite(), migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;
    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into statements on `;`, dropping empty and comment-only fragments.
///
/// Migration SQL never contains `;` inside string literals.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool.sqlite()).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}
