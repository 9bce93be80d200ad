//! コアトレイト定義（Handler）

use bytes::Bytes;

use crate::error::Error;

/// ハンドラーの特性
///
/// リクエストデータは `ctx()` とヘルパー関数から取得し、
/// レスポンスボディを返す。ステータスとヘッダーはコンテキストに設定する。
pub trait Handler: Send + Sync + 'static {
    /// リクエストを処理
    fn handle(&self) -> Result<Bytes, Error>;
}

impl<F, B> Handler for F
where
    F: Fn() -> Result<B, Error> + Send + Sync + 'static,
    B: Into<Bytes>,
{
    fn handle(&self) -> Result<Bytes, Error> {
        self().map(Into::into)
    }
}
