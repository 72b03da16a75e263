//! # wp-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `wp-core` domain models. Tags live in a JSON column so the tag
//! aggregations can run through `json_each`; full-text search uses an FTS5
//! table keyed by the report's `seq`.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;
use wp_core::geo::BoundingBox;
use wp_core::models::{Author, Comment, GeoKind, Location, Report, TagCount, TopReport, User};
use wp_core::traits::{CommentRepo, ReportRepo, UserRepo};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reports (
        seq INTEGER PRIMARY KEY,
        id BLOB NOT NULL UNIQUE,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        description TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        created TEXT NOT NULL,
        lng REAL NOT NULL,
        lat REAL NOT NULL,
        address TEXT NOT NULL,
        photo TEXT,
        author BLOB NOT NULL REFERENCES users(id)
    )",
    "CREATE INDEX IF NOT EXISTS reports_slug ON reports (slug)",
    "CREATE INDEX IF NOT EXISTS reports_created ON reports (created)",
    "CREATE INDEX IF NOT EXISTS reports_lat_lng ON reports (lat, lng)",
    "CREATE VIRTUAL TABLE IF NOT EXISTS reports_fts USING fts5(
        title, description, tokenize = 'porter unicode61'
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id BLOB PRIMARY KEY,
        created TEXT NOT NULL,
        author BLOB NOT NULL REFERENCES users(id),
        report BLOB NOT NULL REFERENCES reports(id),
        text TEXT NOT NULL,
        rating INTEGER CHECK (rating BETWEEN 1 AND 5)
    )",
    "CREATE INDEX IF NOT EXISTS comments_report ON comments (report, created)",
    // No reference to reports: a heart is plain set membership on the user.
    "CREATE TABLE IF NOT EXISTS hearts (
        user_id BLOB NOT NULL REFERENCES users(id),
        report_id BLOB NOT NULL,
        PRIMARY KEY (user_id, report_id)
    )",
];

const REPORT_COLUMNS: &str =
    "r.id, r.title, r.slug, r.description, r.tags, r.created, r.lng, r.lat, r.address, r.photo, r.author";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects and creates the schema if needed.
    ///
    /// # Developer Note
    /// Every connection to `sqlite::memory:` opens a separate database, so
    /// in-memory stores are pinned to a single long-lived connection.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            pool_options = pool_options.max_connections(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("sqlite store ready at {}", url);

        Ok(Self { pool })
    }
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn row_to_report(row: &SqliteRow) -> anyhow::Result<Report> {
    Ok(Report {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        tags: serde_json::from_str(&row.try_get::<String, _>("tags")?)?,
        created: row.try_get("created")?,
        location: Location {
            kind: GeoKind::Point,
            coordinates: [row.try_get("lng")?, row.try_get("lat")?],
            address: row.try_get("address")?,
        },
        photo: row.try_get("photo")?,
        author: blob_to_uuid(&row.try_get::<Vec<u8>, _>("author")?)?,
    })
}

fn rows_to_reports(rows: &[SqliteRow]) -> anyhow::Result<Vec<Report>> {
    rows.iter().map(row_to_report).collect()
}

fn row_to_comment(row: &SqliteRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        created: row.try_get("created")?,
        author: blob_to_uuid(&row.try_get::<Vec<u8>, _>("author")?)?,
        report: blob_to_uuid(&row.try_get::<Vec<u8>, _>("report")?)?,
        text: row.try_get("text")?,
        rating: row.try_get("rating")?,
    })
}

/// Turns free text into an FTS5 query where any term may match. Terms are
/// quoted so user input never reaches the FTS5 query syntax.
fn fts_query(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[async_trait]
impl ReportRepo for SqliteStore {
    /// Inserts the report and indexes it for search in one transaction.
    async fn insert_report(&self, report: &Report) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let seq = sqlx::query(
            "INSERT INTO reports (id, title, slug, description, tags, created, lng, lat, address, photo, author)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(report.id))
        .bind(&report.title)
        .bind(&report.slug)
        .bind(&report.description)
        .bind(serde_json::to_string(&report.tags)?)
        .bind(report.created)
        .bind(report.location.coordinates[0])
        .bind(report.location.coordinates[1])
        .bind(&report.location.address)
        .bind(&report.photo)
        .bind(uuid_to_blob(report.author))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO reports_fts (rowid, title, description) VALUES (?, ?, ?)")
            .bind(seq)
            .bind(&report.title)
            .bind(&report.description)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// `id`, `created` and `author` are never rewritten.
    async fn save_report(&self, report: &Report) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let seq: Option<i64> = sqlx::query_scalar(
            "UPDATE reports SET title = ?, slug = ?, description = ?, tags = ?, lng = ?, lat = ?, address = ?, photo = ?
             WHERE id = ? RETURNING seq",
        )
        .bind(&report.title)
        .bind(&report.slug)
        .bind(&report.description)
        .bind(serde_json::to_string(&report.tags)?)
        .bind(report.location.coordinates[0])
        .bind(report.location.coordinates[1])
        .bind(&report.location.address)
        .bind(&report.photo)
        .bind(uuid_to_blob(report.id))
        .fetch_optional(&mut *tx)
        .await?;

        let seq = seq.ok_or_else(|| anyhow::anyhow!("report {} vanished during update", report.id))?;

        sqlx::query("DELETE FROM reports_fts WHERE rowid = ?")
            .bind(seq)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO reports_fts (rowid, title, description) VALUES (?, ?, ?)")
            .bind(seq)
            .bind(&report.title)
            .bind(&report.description)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_report(&self, id: Uuid) -> anyhow::Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports r WHERE r.id = ?"))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_report).transpose()
    }

    async fn get_report_by_slug(&self, slug: &str) -> anyhow::Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports r WHERE r.slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_report).transpose()
    }

    /// LIKE is case-insensitive for ASCII, which covers every slug character.
    async fn slugs_with_prefix(&self, base: &str, exclude: Option<Uuid>) -> anyhow::Result<Vec<String>> {
        let exclude = exclude.map(uuid_to_blob);
        let slugs = sqlx::query_scalar("SELECT slug FROM reports WHERE slug LIKE ? || '%' AND (? IS NULL OR id != ?)")
            .bind(base)
            .bind(&exclude)
            .bind(&exclude)
            .fetch_all(&self.pool)
            .await?;
        Ok(slugs)
    }

    async fn list_reports_paginated(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports r ORDER BY r.created DESC, r.seq DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    async fn count_reports(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Ranked by FTS5's bm25 (`rank`), best first.
    async fn search_reports(&self, query: &str, limit: i64) -> anyhow::Result<Vec<Report>> {
        let Some(fts) = fts_query(query) else {
            return Ok(vec![]);
        };

        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS}
             FROM (SELECT rowid AS hit, rank FROM reports_fts WHERE reports_fts MATCH ? ORDER BY rank LIMIT ?) hits
             JOIN reports r ON r.seq = hits.hit
             ORDER BY hits.rank"
        ))
        .bind(fts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    async fn reports_in_box(&self, bbox: BoundingBox) -> anyhow::Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports r
             WHERE r.lng BETWEEN ? AND ? AND r.lat BETWEEN ? AND ?
             ORDER BY r.seq"
        ))
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    async fn reports_with_tag(&self, tag: &str) -> anyhow::Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports r
             WHERE EXISTS (SELECT 1 FROM json_each(r.tags) AS j WHERE j.value = ?)
             ORDER BY r.seq"
        ))
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    async fn reports_with_any_tag(&self) -> anyhow::Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports r WHERE json_array_length(r.tags) > 0 ORDER BY r.seq"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    /// Hearts pointing at missing reports simply drop out of the join.
    async fn hearted_reports(&self, user_id: Uuid) -> anyhow::Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM hearts h JOIN reports r ON r.id = h.report_id
             WHERE h.user_id = ?
             ORDER BY h.rowid"
        ))
        .bind(uuid_to_blob(user_id))
        .fetch_all(&self.pool)
        .await?;

        rows_to_reports(&rows)
    }

    async fn tag_counts(&self) -> anyhow::Result<Vec<TagCount>> {
        let rows = sqlx::query(
            "SELECT j.value AS tag, COUNT(*) AS count
             FROM reports r, json_each(r.tags) AS j
             GROUP BY j.value
             ORDER BY count DESC, tag ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TagCount {
                    tag: row.try_get("tag")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    /// `AVG` skips unrated comments; reports with no rating at all sort last.
    async fn top_reports(&self, min_comments: i64, limit: i64) -> anyhow::Result<Vec<TopReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS}, COUNT(c.id) AS comment_count, AVG(c.rating) AS average_rating
             FROM reports r JOIN comments c ON c.report = r.id
             GROUP BY r.seq
             HAVING COUNT(c.id) >= ?
             ORDER BY average_rating DESC, r.seq ASC
             LIMIT ?"
        ))
        .bind(min_comments)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TopReport {
                    report: row_to_report(row)?,
                    comment_count: row.try_get("comment_count")?,
                    average_rating: row.try_get("average_rating")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CommentRepo for SqliteStore {
    async fn insert_comment(&self, comment: &Comment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO comments (id, created, author, report, text, rating) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(comment.id))
            .bind(comment.created)
            .bind(uuid_to_blob(comment.author))
            .bind(uuid_to_blob(comment.report))
            .bind(&comment.text)
            .bind(comment.rating)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn comments_for_report(&self, report_id: Uuid) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE report = ? ORDER BY created ASC, rowid ASC")
            .bind(uuid_to_blob(report_id))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_comment).collect()
    }
}

impl SqliteStore {
    async fn hearts_of(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let blobs: Vec<Vec<u8>> = sqlx::query_scalar("SELECT report_id FROM hearts WHERE user_id = ? ORDER BY rowid")
            .bind(uuid_to_blob(user_id))
            .fetch_all(&self.pool)
            .await?;

        blobs.iter().map(|b| blob_to_uuid(b)).collect()
    }

    async fn user_from_row(&self, row: &SqliteRow) -> anyhow::Result<User> {
        let id = blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?;
        Ok(User {
            id,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created: row.try_get("created")?,
            hearts: self.hearts_of(id).await?,
        })
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users (id, name, email, password_hash, created) VALUES (?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(user.id))
            .bind(&user.name)
            .bind(&user.email)
            .bind(password_hash)
            .bind(user.created)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, created FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.user_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<(User, String)>> {
        let row = sqlx::query("SELECT id, name, email, created, password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let hash: String = row.try_get("password_hash")?;
                Ok(Some((self.user_from_row(&row).await?, hash)))
            }
            None => Ok(None),
        }
    }

    async fn authors(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Author>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM users WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(uuid_to_blob(*id));
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(Author {
                    id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn add_heart(&self, user_id: Uuid, report_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO hearts (user_id, report_id) VALUES (?, ?)")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(report_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_heart(&self, user_id: Uuid, report_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM hearts WHERE user_id = ? AND report_id = ?")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(report_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
