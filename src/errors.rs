use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortenerError {
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Cancelled(String),
}

impl ShortenerError {
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::DatabaseConnection(_) => "E001",
            ShortenerError::DatabaseOperation(_) => "E002",
            ShortenerError::FileOperation(_) => "E003",
            ShortenerError::Serialization(_) => "E004",
            ShortenerError::Validation(_) => "E005",
            ShortenerError::NotFound(_) => "E006",
            ShortenerError::Conflict(_) => "E007",
            ShortenerError::Cancelled(_) => "E008",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::NotFound(_) => "Resource Not Found",
            ShortenerError::Conflict(_) => "Uniqueness Conflict",
            ShortenerError::Cancelled(_) => "Operation Cancelled",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ShortenerError::DatabaseConnection(msg) => msg,
            ShortenerError::DatabaseOperation(msg) => msg,
            ShortenerError::FileOperation(msg) => msg,
            ShortenerError::Serialization(msg) => msg,
            ShortenerError::Validation(msg) => msg,
            ShortenerError::NotFound(msg) => msg,
            ShortenerError::Conflict(msg) => msg,
            ShortenerError::Cancelled(msg) => msg,
        }
    }

    /// A conflict is recoverable by re-querying; callers branch on this.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ShortenerError::Conflict(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShortenerError::Cancelled(_))
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Conflict(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Cancelled(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;
