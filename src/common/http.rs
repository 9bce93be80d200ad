//! HTTPレスポンスの基本型とステータス行

use bytes::Bytes;
use http::StatusCode;

use super::context::RequestCtx;

/// ステータス行を生成（例: `404 Not Found`）
pub fn status_line(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// ゲートウェイに渡すレスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// ステータス行（例: `200 OK`）
    pub status: String,
    /// 順序付きのヘッダー
    pub headers: Vec<(String, String)>,
    /// レスポンスボディ
    pub body: Bytes,
}

impl Response {
    /// 新しいレスポンスを作成
    pub fn new(status: StatusCode) -> Self {
        Self {
            status: status_line(status),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// ボディを設定
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// テキストのレスポンスを作成
    pub fn plain(status: StatusCode, text: &'static str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(text)
    }

    /// コンテキストのステータス・ヘッダーとボディからレスポンスを組み立てる
    pub fn from_ctx(c: &RequestCtx, body: Bytes) -> Self {
        Self {
            status: c.status.clone(),
            headers: c.headers.clone(),
            body,
        }
    }

    /// ステータス行の数値部分（解釈できなければ500）
    pub fn status_code(&self) -> u16 {
        self.status
            .split_whitespace()
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(500)
    }

    /// ヘッダー値を取得（大文字小文字を区別しない、最初の一致）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(StatusCode::OK), "200 OK");
        assert_eq!(status_line(StatusCode::BAD_REQUEST), "400 Bad Request");
        assert_eq!(status_line(StatusCode::GONE), "410 Gone");
        assert_eq!(status_line(StatusCode::PAYLOAD_TOO_LARGE), "413 Payload Too Large");
    }

    #[test]
    fn test_response_builder() {
        let res = Response::new(StatusCode::NOT_FOUND)
            .with_header("Content-Type", "text/html")
            .with_header("Set-Cookie", "a=1")
            .with_header("Set-Cookie", "b=2")
            .with_body("not found");

        assert_eq!(res.status, "404 Not Found");
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.headers.len(), 3);
        assert_eq!(res.header("content-type"), Some("text/html"));
        assert_eq!(res.header("set-cookie"), Some("a=1"));
        assert_eq!(&res.body[..], b"not found");
    }

    #[test]
    fn test_status_code_unparseable() {
        let mut res = Response::new(StatusCode::OK);
        res.status = "weird".to_string();
        assert_eq!(res.status_code(), 500);
    }

    #[test]
    fn test_from_ctx() {
        let mut c = RequestCtx::default();
        c.status = "410 Gone".to_string();
        c.headers.push(("X-A".to_string(), "1".to_string()));
        let res = Response::from_ctx(&c, Bytes::from_static(b"gone"));
        assert_eq!(res.status, "410 Gone");
        assert_eq!(res.headers, vec![("X-A".to_string(), "1".to_string())]);
        assert_eq!(&res.body[..], b"gone");
    }
}
