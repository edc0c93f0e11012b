use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error taxonomy. Validation variants never reach storage;
/// storage variants never leak their detail into client responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// Guest name missing or shorter than 2 characters after trimming.
    #[error("invalid guest name")]
    InvalidName,

    /// Attendance value other than "yes" / "no".
    #[error("invalid attendance value")]
    InvalidAttendance,

    /// SQLite could not grant write access within the retry window.
    #[error("database is locked")]
    ResourceLocked,

    /// Any other backing-store failure (wraps sqlx::Error).
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Configuration or startup error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Client-facing message for the submission path. Storage detail stays
    /// in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::InvalidName => "Пожалуйста, введите корректное имя",
            AppError::InvalidAttendance => "Неверный статус присутствия",
            AppError::ResourceLocked => {
                "Извините, система временно перегружена. \
                 Пожалуйста, попробуйте отправить ответ через несколько секунд."
            }
            AppError::Database(_) => "Произошла ошибка при сохранении данных",
            AppError::Config(_) => "Произошла непредвиденная ошибка",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if is_locked(&e) {
            AppError::ResourceLocked
        } else {
            AppError::Database(e)
        }
    }
}

/// SQLITE_BUSY surfaces through sqlx as a database error whose message
/// contains "database is locked".
pub fn is_locked(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.message().contains("database is locked"),
        _ => false,
    }
}
