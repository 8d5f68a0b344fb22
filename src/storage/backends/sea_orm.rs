use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, Schema, TransactionTrait, sea_query::Expr,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::{Repository, StoredUrl};

/// The `urls` table, mirroring [`StoredUrl`] column for column.
pub mod urls {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "urls")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub uuid: String,
        pub short_url: String,
        #[sea_orm(unique)]
        pub original_url: String,
        pub user_id: Option<String>,
        pub is_deleted: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Relational backend over sea-orm (SQLite, PostgreSQL, MySQL).
///
/// Engine-created records carry the short code as their `uuid`, so the
/// primary key is what enforces short-code uniqueness; `original_url` gets
/// its own unique constraint. Unique violations are translated to
/// `Conflict` so the engine can recover by re-querying instead of failing.
#[derive(Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ShortenerError::database_connection("DATABASE_URL is empty"));
        }

        let db = if database_url.starts_with("sqlite:") {
            Self::connect_sqlite(database_url).await?
        } else {
            Self::connect_generic(database_url).await?
        };

        let repository = SeaOrmRepository { db };
        repository.init_schema().await?;

        info!("relational repository initialized");
        Ok(repository)
    }

    /// 连接 SQLite 数据库（带自动创建）
    async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::SqlitePool;
        use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                ShortenerError::database_connection(format!("invalid sqlite url: {}", e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
            ShortenerError::database_connection(format!("failed to connect to sqlite: {}", e))
        })?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 连接通用数据库（MySQL/PostgreSQL）
    async fn connect_generic(database_url: &str) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(20)
            .min_connections(2)
            .connect_timeout(std::time::Duration::from_secs(8))
            .acquire_timeout(std::time::Duration::from_secs(8))
            .sqlx_logging(false);

        Database::connect(opt).await.map_err(|e| {
            ShortenerError::database_connection(format!("failed to connect to database: {}", e))
        })
    }

    /// Create-if-absent schema step. This is deliberately not a migration
    /// system; the table is created once and never altered here.
    async fn init_schema(&self) -> Result<()> {
        let builder = self.db.get_database_backend();
        let schema = Schema::new(builder);

        let mut stmt = schema.create_table_from_entity(urls::Entity);
        stmt.if_not_exists();

        self.db
            .execute(&stmt)
            .await
            .map_err(|e| ShortenerError::database_operation(format!("schema init failed: {}", e)))?;

        Ok(())
    }

    fn model_to_stored(model: urls::Model) -> StoredUrl {
        StoredUrl {
            uuid: model.uuid,
            short_url: model.short_url,
            original_url: model.original_url,
            user_id: model.user_id,
            is_deleted: model.is_deleted,
        }
    }

    fn stored_to_active_model(entry: &StoredUrl) -> urls::ActiveModel {
        urls::ActiveModel {
            uuid: Set(entry.uuid.clone()),
            short_url: Set(entry.short_url.clone()),
            original_url: Set(entry.original_url.clone()),
            user_id: Set(entry.user_id.clone()),
            is_deleted: Set(entry.is_deleted),
        }
    }

    /// 判断是否是唯一约束冲突错误
    fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
        use sea_orm::RuntimeErr;
        use sea_orm::sqlx::Error;

        let sqlx_err = match err {
            sea_orm::DbErr::Exec(RuntimeErr::SqlxError(e)) => e,
            sea_orm::DbErr::Query(RuntimeErr::SqlxError(e)) => e,
            _ => return false,
        };

        match &**sqlx_err {
            Error::Database(db_err) => {
                let code = db_err.code();
                // SQLite: SQLITE_CONSTRAINT_PRIMARYKEY (1555) / _UNIQUE (2067)
                // MySQL: ER_DUP_ENTRY (1062)
                // PostgreSQL: unique_violation (23505)
                code.as_ref()
                    .map(|c| {
                        c == "1555" || c == "2067"  // SQLite
                            || c == "1062"  // MySQL
                            || c == "23505" // PostgreSQL
                    })
                    .unwrap_or(false)
            }
            _ => false,
        }
    }

    fn map_db_err(context: &str, err: sea_orm::DbErr) -> ShortenerError {
        if Self::is_unique_violation(&err) {
            ShortenerError::conflict(format!("{}: {}", context, err))
        } else {
            ShortenerError::database_operation(format!("{}: {}", context, err))
        }
    }
}

#[async_trait]
impl Repository for SeaOrmRepository {
    async fn load(&self) -> Result<Vec<StoredUrl>> {
        let models = urls::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| ShortenerError::database_operation(format!("load failed: {}", e)))?;

        Ok(models.into_iter().map(Self::model_to_stored).collect())
    }

    async fn save(&self, entry: StoredUrl) -> Result<()> {
        let active_model = Self::stored_to_active_model(&entry);

        // exec_without_returning: the caller already has the record, and the
        // string primary key has no last-insert-id to fetch.
        urls::Entity::insert(active_model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| Self::map_db_err("insert failed", e))?;

        info!("stored url saved: {}", entry.short_url);
        Ok(())
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<StoredUrl>> {
        let model = urls::Entity::find()
            .filter(urls::Column::ShortUrl.eq(code))
            .one(&self.db)
            .await
            .map_err(|e| {
                ShortenerError::database_operation(format!("short code lookup failed: {}", e))
            })?;

        Ok(model.map(Self::model_to_stored))
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<StoredUrl>> {
        let model = urls::Entity::find()
            .filter(urls::Column::OriginalUrl.eq(url))
            .one(&self.db)
            .await
            .map_err(|e| {
                ShortenerError::database_operation(format!("original url lookup failed: {}", e))
            })?;

        Ok(model.map(Self::model_to_stored))
    }

    async fn batch_save(&self, entries: Vec<StoredUrl>, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("batch save cancelled"));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ShortenerError::database_operation(format!("begin failed: {}", e)))?;

        let count = entries.len();
        for entry in entries {
            if cancel.is_cancelled() {
                // Dropping the transaction rolls it back.
                return Err(ShortenerError::cancelled("batch save cancelled"));
            }

            let active_model = Self::stored_to_active_model(&entry);
            urls::Entity::insert(active_model)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| Self::map_db_err("batch insert failed", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| ShortenerError::database_operation(format!("commit failed: {}", e)))?;

        info!("batch saved {} stored urls", count);
        Ok(())
    }

    async fn list_by_owner(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredUrl>> {
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("owner listing cancelled"));
        }

        let models = urls::Entity::find()
            .filter(urls::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| {
                ShortenerError::database_operation(format!("owner listing failed: {}", e))
            })?;

        Ok(models.into_iter().map(Self::model_to_stored).collect())
    }

    async fn mark_deleted(
        &self,
        user_id: &str,
        codes: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if codes.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(ShortenerError::cancelled("mark deleted cancelled"));
        }

        let result = urls::Entity::update_many()
            .col_expr(urls::Column::IsDeleted, Expr::value(true))
            .filter(urls::Column::UserId.eq(user_id))
            .filter(urls::Column::ShortUrl.is_in(codes.iter().map(String::as_str)))
            .exec(&self.db)
            .await
            .map_err(|e| {
                ShortenerError::database_operation(format!("mark deleted failed: {}", e))
            })?;

        if result.rows_affected > 0 {
            info!("marked {} urls deleted for {}", result.rows_affected, user_id);
        } else {
            warn!("mark deleted matched no rows for {}", user_id);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| ShortenerError::database_connection(format!("ping failed: {}", e)))
    }
}
