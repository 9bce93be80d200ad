//! レスポンス操作のヘルパー関数群
//!
//! いずれも呼び出し元スレッドのリクエストコンテキストを操作する。

use std::fmt;
use std::io::{self, Read, Write};

use bytes::Bytes;
use log::{debug, warn};

use crate::common::context::ctx;
use crate::common::cookie::{parse_cookie_header, Cookie, Expires};
use crate::common::storage::Storage;
use crate::common::utils::{int_get, validate_header};
use crate::config::config;
use crate::error::Error;
use crate::input::{normalize_or_reject, Schema};

/// レスポンスヘッダーを追加する
///
/// 名前または値にCR/LFが含まれる場合はヘッダーを変更せずにエラーを返す。
/// `unique` が真で同名（大文字小文字を区別しない）のヘッダーが既にあれば何もしない。
pub fn header(name: &str, value: &str, unique: bool) -> Result<(), Error> {
    validate_header(name, value)?;
    ctx().with_mut(|c| {
        if unique && c.headers.iter().any(|(h, _)| h.eq_ignore_ascii_case(name)) {
            return;
        }
        c.headers.push((name.to_string(), value.to_string()));
    });
    Ok(())
}

fn set_error_status(status: &str) {
    ctx().with_mut(|c| {
        c.status = status.to_string();
        c.headers.push(("Content-Type".to_string(), "text/html".to_string()));
    });
}

/// `400 Bad Request` を設定する
pub fn badrequest() -> &'static str {
    set_error_status("400 Bad Request");
    "bad request"
}

/// `404 Not Found` を設定する
pub fn notfound() -> &'static str {
    set_error_status("404 Not Found");
    "not found"
}

/// `410 Gone` を設定する
pub fn gone() -> &'static str {
    set_error_status("410 Gone");
    "gone"
}

/// `500 Internal Server Error` を設定する（ヘッダーは全て置き換えられる）
pub fn internalerror() -> &'static str {
    ctx().with_mut(|c| {
        c.status = "500 Internal Server Error".to_string();
        c.headers = vec![("Content-Type".to_string(), "text/html".to_string())];
    });
    "internal server error"
}

/// クッキーを設定する（Path は常に `/`）
pub fn setcookie(
    name: &str,
    value: &str,
    expires: impl Into<Expires>,
    domain: Option<&str>,
) -> Result<(), Error> {
    let mut cookie = Cookie::try_new(name, value)?
        .with_path("/")
        .with_expires(expires);
    if let Some(domain) = domain.filter(|d| !d.is_empty()) {
        cookie = cookie.with_domain(domain);
    }
    header("Set-Cookie", &cookie.to_header_value()?, false)
}

/// リクエストのクッキーを取得する
///
/// 検証は `input` と同じく、失敗時は400を設定して `Error::ValidationFailed` を返す。
pub fn cookies(schema: &Schema) -> Result<Storage, Error> {
    let raw = ctx().with(|c| parse_cookie_header(c.environ.get("HTTP_COOKIE").unwrap_or("")));
    normalize_or_reject(&raw, schema)
}

/// リクエストボディを取得する
///
/// 初回呼び出し時に `CONTENT_LENGTH` バイトだけ入力ストリームから読み込み、
/// 以降は同じリクエスト内でキャッシュを返す。
pub fn data() -> Result<Bytes, Error> {
    let max_body_size = config().max_body_size;
    let unit = ctx().unit();
    let mut c = unit.lock();
    if let Some(cached) = &c.data {
        return Ok(cached.clone());
    }

    let content_length = int_get(c.environ.get("CONTENT_LENGTH"), 0);
    if content_length > max_body_size {
        return Err(Error::PayloadTooLarge(format!(
            "Request body size {} bytes exceeds maximum allowed size {} bytes",
            content_length, max_body_size
        )));
    }

    let mut buffer = Vec::with_capacity(content_length);
    if content_length > 0 {
        match c.environ.input.as_mut() {
            Some(input) => {
                input
                    .by_ref()
                    .take(content_length as u64)
                    .read_to_end(&mut buffer)
                    .map_err(|e| Error::InvalidRequestBody(format!("Failed to read request body: {}", e)))?;
                if buffer.len() < content_length {
                    warn!(
                        "request body shorter than CONTENT_LENGTH: {} < {}",
                        buffer.len(),
                        content_length
                    );
                }
            }
            None => warn!("CONTENT_LENGTH is {} but no input stream is attached", content_length),
        }
    }

    debug!("read {} bytes of request body", buffer.len());
    let body = Bytes::from(buffer);
    c.data = Some(body.clone());
    Ok(body)
}

/// レスポンスボディに文字列を追記する
pub fn output(text: &str) {
    ctx().with_mut(|c| c.output.push_str(text));
}

/// 各引数を整形して診断出力に書き出す（常に空文字列を返す）
pub fn debug(args: &[&dyn fmt::Debug]) -> String {
    let mut text = String::new();
    for arg in args {
        text.push_str(&format!("{:#?}\n", arg));
    }
    debug_write(&text);
    String::new()
}

/// 診断出力にそのまま書き出す
///
/// リクエストに診断ストリームがあればそこへ、なければ標準エラー出力へ書く。
pub fn debug_write(text: &str) {
    let written = ctx().with_mut(|c| match c.environ.errors.as_mut() {
        Some(out) => out.write_all(text.as_bytes()).and_then(|_| out.flush()).is_ok(),
        None => false,
    });
    if !written {
        let _ = io::stderr().write_all(text.as_bytes());
    }
}
