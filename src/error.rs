//! エラー型の定義

use thiserror::Error;

/// アプリケーションのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// 入力の検証に失敗した（400レスポンスへの早期脱出）
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Storageに存在しないフィールドへのアクセス
    #[error("No such field: {0}")]
    MissingField(String),

    /// 無効なヘッダー（CR/LFを含む）
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// 無効なクッキー名/値
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// リクエストボディが上限を超えた
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ValidationFailed(_) => 400,
            Error::MissingField(_) => 500,
            Error::InvalidHeader(_) => 500,
            Error::InvalidCookie(_) => 500,
            Error::InvalidRequestBody(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::InternalServerError(_) => 500,
            Error::ConfigurationError(_) => 500,
        }
    }

    /// 検証失敗による早期脱出かどうか
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Error::ValidationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::ValidationFailed("id".into()).status_code(), 400);
        assert_eq!(Error::PayloadTooLarge("x".into()).status_code(), 413);
        assert_eq!(Error::InvalidHeader("x".into()).status_code(), 500);
    }

    #[test]
    fn test_is_validation_failure() {
        assert!(Error::ValidationFailed("id".into()).is_validation_failure());
        assert!(!Error::MissingField("id".into()).is_validation_failure());
    }
}
