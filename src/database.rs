use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Pool, Row, Sqlite};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::gamification::ProgressDraft;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub login_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SurveyType {
    Pre,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SurveyResponse {
    pub id: i64,
    pub user_id: i64,
    pub survey_type: SurveyType,
    pub question: String,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressSnapshot {
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
    pub progress: i64,
    pub badges: String,
    pub completed_at: DateTime<Utc>,
}

/// The only tables the viewer and exporter may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Users,
    Sessions,
    SurveyResponses,
    UserProgress,
}

impl TableName {
    pub const ALL: [TableName; 4] = [
        TableName::Users,
        TableName::Sessions,
        TableName::SurveyResponses,
        TableName::UserProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Users => "users",
            TableName::Sessions => "sessions",
            TableName::SurveyResponses => "survey_responses",
            TableName::UserProgress => "user_progress",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableName::Users => &["id", "first_name", "last_name", "grade", "created_at"],
            TableName::Sessions => &["id", "user_id", "login_time"],
            TableName::SurveyResponses => &[
                "id",
                "user_id",
                "survey_type",
                "question",
                "answer",
                "submitted_at",
            ],
            TableName::UserProgress => &[
                "id",
                "user_id",
                "points",
                "progress",
                "badges",
                "completed_at",
            ],
        }
    }

    /// Every column cast to text so rows can be shown and exported uniformly.
    fn select_all_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns()
            .iter()
            .map(|column| format!("CAST({column} AS TEXT)"))
            .collect();
        format!(
            "SELECT {} FROM {} ORDER BY id",
            columns.join(", "),
            self.as_str()
        )
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        TableName::ALL
            .iter()
            .copied()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| AppError::UnknownTable(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    pub table: TableName,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn require_non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Opens (creating if needed) the store at `url` and ensures the schema.
    ///
    /// A single connection is kept so `sqlite::memory:` databases survive for
    /// the lifetime of the pool and writes are serialised.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        let db = Database { pool };
        db.create_schema().await?;
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                grade TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                UNIQUE (first_name, last_name, grade)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users (id),
                login_time DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS survey_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users (id),
                survey_type TEXT NOT NULL CHECK (survey_type IN ('pre', 'post')),
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                submitted_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users (id),
                points INTEGER NOT NULL,
                progress INTEGER NOT NULL,
                badges TEXT NOT NULL,
                completed_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_user(
        &self,
        first_name: &str,
        last_name: &str,
        grade: &str,
    ) -> Result<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, first_name, last_name, grade, created_at
            FROM users
            WHERE first_name = ? AND last_name = ? AND grade = ?
            "#,
        )
        .bind(first_name.trim())
        .bind(last_name.trim())
        .bind(grade.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<UserAccount> {
        sqlx::query_as::<_, UserAccount>(
            "SELECT id, first_name, last_name, grade, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::UserNotFound(id))
    }

    /// Returns the existing account for the (first, last, grade) tuple or
    /// inserts a new one. The insert is a single `ON CONFLICT DO NOTHING`
    /// statement, so overlapping logins for one tuple resolve to one row.
    pub async fn register_user(
        &self,
        first_name: &str,
        last_name: &str,
        grade: &str,
    ) -> Result<UserAccount> {
        let first_name = require_non_empty("first name", first_name)?;
        let last_name = require_non_empty("last name", last_name)?;
        let grade = require_non_empty("grade", grade)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, grade, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (first_name, last_name, grade) DO NOTHING
            "#,
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&grade)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        let user = self
            .find_user(&first_name, &last_name, &grade)
            .await?
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;

        if inserted > 0 {
            log::info!("registered user {} ({} {}, grade {})", user.id, first_name, last_name, grade);
        }
        Ok(user)
    }

    pub async fn record_login(&self, user_id: i64) -> Result<SessionRecord> {
        self.get_user(user_id).await?;

        let login_time = Utc::now();
        let id = sqlx::query("INSERT INTO sessions (user_id, login_time) VALUES (?, ?)")
            .bind(user_id)
            .bind(login_time)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(SessionRecord {
            id,
            user_id,
            login_time,
        })
    }

    pub async fn sessions_for_user(&self, user_id: i64) -> Result<Vec<SessionRecord>> {
        let sessions = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, login_time FROM sessions WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Stores one row per (question, answer) pair in a single transaction.
    pub async fn save_survey(
        &self,
        user_id: i64,
        survey_type: SurveyType,
        answers: &[(String, String)],
    ) -> Result<usize> {
        self.get_user(user_id).await?;

        let submitted_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        for (question, answer) in answers {
            sqlx::query(
                r#"
                INSERT INTO survey_responses (user_id, survey_type, question, answer, submitted_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(survey_type)
            .bind(question)
            .bind(answer)
            .bind(submitted_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(answers.len())
    }

    pub async fn survey_responses(&self, user_id: Option<i64>) -> Result<Vec<SurveyResponse>> {
        let responses = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, SurveyResponse>(
                    r#"
                    SELECT id, user_id, survey_type, question, answer, submitted_at
                    FROM survey_responses
                    WHERE user_id = ?
                    ORDER BY id
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SurveyResponse>(
                    r#"
                    SELECT id, user_id, survey_type, question, answer, submitted_at
                    FROM survey_responses
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(responses)
    }

    pub async fn save_progress(&self, user_id: i64, draft: &ProgressDraft) -> Result<ProgressSnapshot> {
        self.get_user(user_id).await?;

        let completed_at = Utc::now();
        let id = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, points, progress, badges, completed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(draft.points)
        .bind(draft.progress)
        .bind(&draft.badges)
        .bind(completed_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(ProgressSnapshot {
            id,
            user_id,
            points: draft.points,
            progress: draft.progress,
            badges: draft.badges.clone(),
            completed_at,
        })
    }

    pub async fn progress_for_user(&self, user_id: i64) -> Result<Vec<ProgressSnapshot>> {
        let snapshots = sqlx::query_as::<_, ProgressSnapshot>(
            r#"
            SELECT id, user_id, points, progress, badges, completed_at
            FROM user_progress
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    pub async fn fetch_table(&self, table: TableName) -> Result<TableData> {
        let sql = table.select_all_sql();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let columns = table.columns();
        let mut data = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: Option<String> = row.try_get(idx)?;
                values.push(value.unwrap_or_default());
            }
            data.push(values);
        }

        Ok(TableData {
            table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: data,
        })
    }
}
