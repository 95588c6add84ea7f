//! SQLite-backed file manager.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use compass_domain::common::parse_datetime;
use compass_domain::{
    Asset, AssetId, AssetKey, BaseDetails, DomainError, Module, Ruleset, User, UserId,
};

use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{FileManager, FileManagerError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        avatar TEXT,
        onboarded INTEGER NOT NULL DEFAULT 0,
        preferences TEXT NOT NULL DEFAULT '{}',
        rulesets TEXT NOT NULL DEFAULT '[]',
        sheets TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_updated_at ON users(updated_at)",
    r#"
    CREATE TABLE IF NOT EXISTS rulesets (
        id TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT NOT NULL,
        document TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS modules (
        id TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        ruleset_id TEXT,
        title TEXT NOT NULL,
        document TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_modules_ruleset_id ON modules(ruleset_id)",
    r#"
    CREATE TABLE IF NOT EXISTS assets (
        id TEXT PRIMARY KEY NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        ruleset_id TEXT NOT NULL,
        directory TEXT NOT NULL,
        filename TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        data BLOB NOT NULL,
        UNIQUE (ruleset_id, directory, filename)
    )
    "#,
];

// Primary SQLite result codes (extended codes keep these in the low byte).
const SQLITE_CORRUPT: i64 = 11;
const SQLITE_FULL: i64 = 13;
const SQLITE_CONSTRAINT: i64 = 19;
const SQLITE_NOTADB: i64 = 26;

/// Map a sqlx error onto the storage failure taxonomy.
fn classify(operation: &'static str, err: sqlx::Error) -> FileManagerError {
    if let sqlx::Error::Database(db) = &err {
        let code = db
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            .unwrap_or_default();
        match code & 0xff {
            SQLITE_FULL => return FileManagerError::QuotaExceeded { operation },
            SQLITE_CORRUPT | SQLITE_NOTADB => {
                return FileManagerError::corrupted(operation, db.message())
            }
            SQLITE_CONSTRAINT => return FileManagerError::Validation(db.message().to_string()),
            _ => {}
        }
    }
    FileManagerError::database(operation, err)
}

/// Fixed-width RFC3339 so stored timestamps compare correctly as text.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn column<T>(row: &SqliteRow, name: &'static str, operation: &'static str) -> Result<T, FileManagerError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| classify(operation, e))
}

fn timestamps(
    row: &SqliteRow,
    operation: &'static str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), FileManagerError> {
    let created_at = parse_datetime(&column::<String>(row, "created_at", operation)?)?;
    let updated_at = parse_datetime(&column::<String>(row, "updated_at", operation)?)?;
    Ok((created_at, updated_at))
}

/// Identity and timestamps from the row's own columns.
fn details_from_row<I>(row: &SqliteRow, operation: &'static str) -> Result<BaseDetails<I>, FileManagerError>
where
    I: FromStr<Err = DomainError>,
{
    let id: I = column::<String>(row, "id", operation)?.parse()?;
    let (created_at, updated_at) = timestamps(row, operation)?;
    Ok(BaseDetails::restore(id, created_at, updated_at)?)
}

fn user_from_row(row: &SqliteRow) -> Result<User, FileManagerError> {
    const OP: &str = "get_user";
    let preferences: Map<String, Value> =
        serde_json::from_str(&column::<String>(row, "preferences", OP)?)?;

    Ok(User {
        details: details_from_row::<UserId>(row, OP)?,
        username: column(row, "username", OP)?,
        email: column(row, "email", OP)?,
        avatar: column(row, "avatar", OP)?,
        onboarded: column::<i64>(row, "onboarded", OP)? != 0,
        preferences,
        rulesets: serde_json::from_str(&column::<String>(row, "rulesets", OP)?)?,
        sheets: serde_json::from_str(&column::<String>(row, "sheets", OP)?)?,
    })
}

fn asset_from_row(row: &SqliteRow) -> Result<Asset, FileManagerError> {
    const OP: &str = "get_asset";
    let key = AssetKey::new(
        column::<String>(row, "ruleset_id", OP)?.parse()?,
        column::<String>(row, "directory", OP)?,
        column::<String>(row, "filename", OP)?,
    );

    Ok(Asset {
        details: details_from_row::<AssetId>(row, OP)?,
        key,
        mime_type: column(row, "mime_type", OP)?,
        data: column(row, "data", OP)?,
    })
}

/// Persistent storage in a single SQLite file.
///
/// `id` and `created_at` are never rewritten once a row exists, and a write
/// whose `updated_at` is older than the stored row is ignored. Rulesets and
/// modules are stored as JSON documents; their identity and timestamps are
/// always taken from the row columns. Writes to the same record are
/// serialized.
pub struct SqliteFileManager {
    pool: SqlitePool,
    write_locks: KeyedLocks<String>,
}

impl SqliteFileManager {
    pub async fn connect(db_path: &str) -> Result<Self, FileManagerError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| classify("connect", e))?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub async fn in_memory() -> Result<Self, FileManagerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| classify("connect", e))?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, FileManagerError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| classify("ensure_schema", e))?;
        }
        tracing::debug!("SQLite file manager schema ready");

        Ok(Self {
            pool,
            write_locks: KeyedLocks::new(),
        })
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> Result<i64, FileManagerError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify("user_count", e))
    }
}

const UPSERT_RULESET: &str = r#"
    INSERT INTO rulesets (id, created_at, updated_at, title, document)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        updated_at = excluded.updated_at,
        title = excluded.title,
        document = excluded.document
    WHERE excluded.updated_at >= rulesets.updated_at
"#;

const UPSERT_MODULE: &str = r#"
    INSERT INTO modules (id, created_at, updated_at, title, ruleset_id, document)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        updated_at = excluded.updated_at,
        title = excluded.title,
        ruleset_id = excluded.ruleset_id,
        document = excluded.document
    WHERE excluded.updated_at >= modules.updated_at
"#;

#[async_trait]
impl FileManager for SqliteFileManager {
    async fn get_user(&self, username: &str) -> Result<Option<User>, FileManagerError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("get_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_rulesets(&self) -> Result<Vec<Ruleset>, FileManagerError> {
        let rows = sqlx::query(
            "SELECT id, created_at, updated_at, document FROM rulesets ORDER BY created_at, title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("get_rulesets", e))?;

        rows.iter()
            .map(|row| {
                let mut ruleset: Ruleset =
                    serde_json::from_str(&column::<String>(row, "document", "get_rulesets")?)?;
                ruleset.details = details_from_row(row, "get_rulesets")?;
                ruleset
                    .validate_ownership()
                    .map_err(|e| FileManagerError::corrupted("get_rulesets", e))?;
                Ok(ruleset)
            })
            .collect()
    }

    async fn get_modules(&self) -> Result<Vec<Module>, FileManagerError> {
        let rows = sqlx::query(
            "SELECT id, created_at, updated_at, document FROM modules ORDER BY created_at, title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("get_modules", e))?;

        rows.iter()
            .map(|row| {
                let mut module: Module =
                    serde_json::from_str(&column::<String>(row, "document", "get_modules")?)?;
                module.details = details_from_row(row, "get_modules")?;
                module
                    .validate_ownership()
                    .map_err(|e| FileManagerError::corrupted("get_modules", e))?;
                Ok(module)
            })
            .collect()
    }

    async fn save_user(&self, user: &User) -> Result<(), FileManagerError> {
        let _guard = self.write_locks.lock(&format!("user:{}", user.id())).await;

        sqlx::query(
            r#"
            INSERT INTO users (id, created_at, updated_at, username, email, avatar, onboarded,
                               preferences, rulesets, sheets)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                username = excluded.username,
                email = excluded.email,
                avatar = excluded.avatar,
                onboarded = excluded.onboarded,
                preferences = excluded.preferences,
                rulesets = excluded.rulesets,
                sheets = excluded.sheets
            WHERE excluded.updated_at >= users.updated_at
            "#,
        )
        .bind(user.id().to_string())
        .bind(timestamp(user.details.created_at()))
        .bind(timestamp(user.details.updated_at()))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(i64::from(user.onboarded))
        .bind(serde_json::to_string(&user.preferences)?)
        .bind(serde_json::to_string(&user.rulesets)?)
        .bind(serde_json::to_string(&user.sheets)?)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("save_user", e))?;

        tracing::debug!(username = %user.username, "Saved user");
        Ok(())
    }

    async fn save_ruleset(&self, ruleset: &Ruleset) -> Result<(), FileManagerError> {
        ruleset.validate_ownership()?;
        let _guard = self.write_locks.lock(&format!("ruleset:{}", ruleset.id())).await;

        sqlx::query(UPSERT_RULESET)
            .bind(ruleset.id().to_string())
            .bind(timestamp(ruleset.details.created_at()))
            .bind(timestamp(ruleset.details.updated_at()))
            .bind(ruleset.title())
            .bind(serde_json::to_string(ruleset)?)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("save_ruleset", e))?;
        Ok(())
    }

    async fn save_module(&self, module: &Module) -> Result<(), FileManagerError> {
        module.validate_ownership()?;
        let _guard = self.write_locks.lock(&format!("module:{}", module.id())).await;

        sqlx::query(UPSERT_MODULE)
            .bind(module.id().to_string())
            .bind(timestamp(module.details.created_at()))
            .bind(timestamp(module.details.updated_at()))
            .bind(module.title())
            .bind(module.ruleset_id.map(|id| id.to_string()))
            .bind(serde_json::to_string(module)?)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("save_module", e))?;
        Ok(())
    }

    async fn get_asset(&self, key: &AssetKey) -> Result<Option<Asset>, FileManagerError> {
        let row = sqlx::query(
            "SELECT * FROM assets WHERE ruleset_id = ? AND directory = ? AND filename = ?",
        )
        .bind(key.ruleset_id.to_string())
        .bind(&key.directory)
        .bind(&key.filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("get_asset", e))?;

        row.as_ref().map(asset_from_row).transpose()
    }

    async fn save_asset(&self, asset: &Asset) -> Result<(), FileManagerError> {
        let _guard = self.write_locks.lock(&format!("asset:{}", asset.key.path())).await;

        sqlx::query(
            r#"
            INSERT INTO assets (id, created_at, updated_at, ruleset_id, directory, filename,
                                mime_type, data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ruleset_id, directory, filename) DO UPDATE SET
                updated_at = excluded.updated_at,
                mime_type = excluded.mime_type,
                data = excluded.data
            WHERE excluded.updated_at >= assets.updated_at
            "#,
        )
        .bind(asset.id().to_string())
        .bind(timestamp(asset.details.created_at()))
        .bind(timestamp(asset.details.updated_at()))
        .bind(asset.key.ruleset_id.to_string())
        .bind(&asset.key.directory)
        .bind(&asset.key.filename)
        .bind(&asset.mime_type)
        .bind(&asset.data)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("save_asset", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use compass_domain::{Attribute, RulesetId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap()
    }

    async fn open(path: &std::path::Path) -> SqliteFileManager {
        SqliteFileManager::connect(&path.to_string_lossy())
            .await
            .expect("connect")
    }

    #[tokio::test]
    async fn users_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compass.db");

        let mut user = User::new("megan", now()).unwrap().with_email("megan@example.com");
        user.set_preference("theme", Value::from("dark"), now());
        user.add_ruleset(RulesetId::new(), now());

        {
            let fm = open(&path).await;
            fm.save_user(&user).await.expect("save");
        }

        let fm = open(&path).await;
        let loaded = fm.get_user("megan").await.expect("get").expect("present");
        assert_eq!(loaded, user);
        assert_eq!(fm.get_user("ash").await.expect("get"), None);
    }

    #[tokio::test]
    async fn stale_writes_do_not_overwrite_newer_rows() {
        let fm = SqliteFileManager::in_memory()
            .await
            .expect("connect");
        let stale = User::new("megan", now()).unwrap();
        let mut fresh = stale.clone();
        fresh.mark_onboarded(now() + Duration::minutes(10));

        fm.save_user(&fresh).await.expect("save fresh");
        fm.save_user(&stale).await.expect("save stale");

        let loaded = fm.get_user("megan").await.expect("get").expect("present");
        assert!(loaded.onboarded);
        assert_eq!(loaded.details.created_at(), now());
        assert_eq!(fm.user_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_validation_failures() {
        let fm = SqliteFileManager::in_memory()
            .await
            .expect("connect");
        fm.save_user(&User::new("megan", now()).unwrap()).await.expect("first");

        let err = fm
            .save_user(&User::new("megan", now()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FileManagerError::Validation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn rulesets_and_modules_round_trip_with_content() {
        let fm = SqliteFileManager::in_memory()
            .await
            .expect("connect");

        let mut ruleset = Ruleset::new("Mothership", now());
        ruleset.add_attribute(Attribute::new("Sanity"), now()).unwrap();
        let module = Module::new("Dead Planet", now()).for_ruleset(ruleset.id());

        fm.save_ruleset(&ruleset).await.expect("save ruleset");
        fm.save_module(&module).await.expect("save module");

        assert_eq!(fm.get_rulesets().await.expect("rulesets"), vec![ruleset.clone()]);
        let modules = fm.get_modules().await.expect("modules");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].ruleset_id, Some(ruleset.id()));
    }

    #[tokio::test]
    async fn assets_are_found_by_compound_key() {
        let fm = SqliteFileManager::in_memory()
            .await
            .expect("connect");
        let ruleset_id = RulesetId::new();
        let key = AssetKey::new(ruleset_id, "portraits", "elf.png");
        let asset = Asset::new(key.clone(), "image/png", vec![1, 2, 3], now()).unwrap();
        fm.save_asset(&asset).await.expect("save");

        let loaded = fm.get_asset(&key).await.expect("get").expect("present");
        assert_eq!(loaded.data, vec![1, 2, 3]);
        assert_eq!(loaded.id(), asset.id());

        let other_dir = AssetKey::new(ruleset_id, "maps", "elf.png");
        assert_eq!(fm.get_asset(&other_dir).await.expect("get"), None);
    }

    #[tokio::test]
    async fn garbage_files_are_reported_as_corruption() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compass.db");
        std::fs::write(&path, vec![0x5a; 4096]).expect("write");

        let result = SqliteFileManager::connect(&path.to_string_lossy()).await;
        let err = result.err().expect("corrupt file must not open");
        assert!(matches!(err, FileManagerError::Corrupted { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn ruleset_created_at_survives_a_rewrite() {
        let fm = SqliteFileManager::in_memory().await.expect("connect");
        let mut ruleset = Ruleset::new("Mothership", now());
        fm.save_ruleset(&ruleset).await.expect("first save");

        let later = now() + Duration::days(30);
        ruleset.details = BaseDetails::restore(ruleset.id(), later, later).unwrap();
        ruleset.content.title = "Mothership 1e".into();
        fm.save_ruleset(&ruleset).await.expect("second save");

        let stored = fm.get_rulesets().await.expect("rulesets");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].details.created_at(), now());
        assert_eq!(stored[0].details.updated_at(), later);
        assert_eq!(stored[0].title(), "Mothership 1e");
    }

    #[tokio::test]
    async fn module_created_at_survives_a_rewrite() {
        let fm = SqliteFileManager::in_memory().await.expect("connect");
        let mut module = Module::new("Dead Planet", now());
        fm.save_module(&module).await.expect("first save");

        let later = now() + Duration::days(2);
        module.details = BaseDetails::restore(module.id(), later, later).unwrap();
        fm.save_module(&module).await.expect("second save");

        let stored = fm.get_modules().await.expect("modules");
        assert_eq!(stored[0].details.created_at(), now());
    }

    #[tokio::test]
    async fn asset_rewrites_keep_identity_and_skip_stale_data() {
        let fm = SqliteFileManager::in_memory().await.expect("connect");
        let key = AssetKey::new(RulesetId::new(), "portraits", "elf.png");
        let original = Asset::new(key.clone(), "image/png", vec![1], now()).unwrap();
        fm.save_asset(&original).await.expect("save");

        let newer =
            Asset::new(key.clone(), "image/webp", vec![2], now() + Duration::hours(1)).unwrap();
        fm.save_asset(&newer).await.expect("save newer");
        let stale = Asset::new(key.clone(), "image/gif", vec![3], now()).unwrap();
        fm.save_asset(&stale).await.expect("save stale");

        let loaded = fm.get_asset(&key).await.expect("get").expect("present");
        assert_eq!(loaded.id(), original.id());
        assert_eq!(loaded.details.created_at(), now());
        assert_eq!(loaded.details.updated_at(), now() + Duration::hours(1));
        assert_eq!(loaded.data, vec![2]);
    }
}
