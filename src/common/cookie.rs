//! HTTPクッキー関連の実装（Set-Cookieの生成とCookieヘッダーの解析）

use chrono::{DateTime, Duration, Utc};

use crate::error::Error;
use crate::input::FormData;
use super::utils::{contains_crlf, is_cookie_name_valid, is_cookie_value_valid};

/// 負の有効期限はこの値に丸められる（古いブラウザ互換のため過去日時に固定）
pub const EXPIRES_CLAMP: i64 = -1_000_000_000;

/// クッキーの有効期限
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Expires {
    /// 属性なし（セッションクッキー）
    #[default]
    Session,
    /// 現在時刻からの秒数
    Seconds(i64),
    /// そのまま出力する文字列
    Raw(String),
}

impl Expires {
    /// 負の秒数を `EXPIRES_CLAMP` に丸める
    pub fn clamped(self) -> Self {
        match self {
            Expires::Seconds(n) if n < 0 => Expires::Seconds(EXPIRES_CLAMP),
            Expires::Raw(s) if s.is_empty() => Expires::Session,
            other => other,
        }
    }

    /// `expires` 属性の値を生成（Sessionの場合はNone）
    pub fn render(&self, now: DateTime<Utc>) -> Result<Option<String>, Error> {
        match self {
            Expires::Session => Ok(None),
            Expires::Raw(s) if s.is_empty() => Ok(None),
            Expires::Raw(s) => Ok(Some(s.clone())),
            Expires::Seconds(n) => {
                let at = Duration::try_seconds(*n)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| Error::InvalidCookie(format!("expires out of range: {}", n)))?;
                Ok(Some(at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()))
            }
        }
    }
}

impl From<i64> for Expires {
    fn from(seconds: i64) -> Self {
        Expires::Seconds(seconds)
    }
}

impl From<&str> for Expires {
    fn from(raw: &str) -> Self {
        Expires::Raw(raw.to_string()).clamped()
    }
}

impl From<String> for Expires {
    fn from(raw: String) -> Self {
        Expires::Raw(raw).clamped()
    }
}

/// HTTPクッキー
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Expires,
}

impl Cookie {
    /// 新しいクッキーをResultで作成（名前はトークンのみ許容）
    pub fn try_new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if !is_cookie_name_valid(&name) {
            return Err(Error::InvalidCookie(format!("cookie name contains invalid characters: {:?}", name)));
        }
        Ok(Self {
            name,
            value: value.into(),
            path: None,
            domain: None,
            expires: Expires::Session,
        })
    }

    /// パスを設定
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// ドメインを設定
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// 有効期限を設定（負の秒数は丸められる）
    pub fn with_expires(mut self, expires: impl Into<Expires>) -> Self {
        self.expires = expires.into().clamped();
        self
    }

    /// Set-Cookieヘッダー値を生成
    pub fn to_header_value(&self) -> Result<String, Error> {
        self.to_header_value_at(Utc::now())
    }

    /// 基準時刻を指定してSet-Cookieヘッダー値を生成
    pub fn to_header_value_at(&self, now: DateTime<Utc>) -> Result<String, Error> {
        let mut cookie_str = format!("{}={}", self.name, quote_cookie_value(&self.value));

        // 属性名の辞書順（Domain, expires, Path）で出力する
        if let Some(domain) = &self.domain {
            if contains_crlf(domain) {
                return Err(Error::InvalidCookie(format!("invalid Domain value: {:?}", domain)));
            }
            cookie_str.push_str(&format!("; Domain={}", domain));
        }

        if let Some(expires) = self.expires.render(now)? {
            if contains_crlf(&expires) {
                return Err(Error::InvalidCookie(format!("invalid expires value: {:?}", expires)));
            }
            cookie_str.push_str(&format!("; expires={}", expires));
        }

        if let Some(path) = &self.path {
            if contains_crlf(path) {
                return Err(Error::InvalidCookie(format!("invalid Path value: {:?}", path)));
            }
            cookie_str.push_str(&format!("; Path={}", path));
        }

        Ok(cookie_str)
    }
}

/// cookie-octet以外を含む値をダブルクォートで囲みエスケープする
pub fn quote_cookie_value(value: &str) -> String {
    if is_cookie_value_valid(value) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for b in value.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            // `;` と `,` は引用符内でも生のまま出力しない
            b';' | b',' => out.push_str(&format!("\\{:03o}", b)),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
    out
}

/// `quote_cookie_value` の逆変換
pub fn unquote_cookie_value(value: &str) -> String {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return value.to_string();
    }
    let inner = &value.as_bytes()[1..value.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == b'\\' && i + 1 < inner.len() {
            let octal = inner.get(i + 1..i + 4).and_then(|d| {
                if d.iter().all(|c| (b'0'..=b'7').contains(c)) {
                    let s = std::str::from_utf8(d).ok()?;
                    u8::from_str_radix(s, 8).ok()
                } else {
                    None
                }
            });
            match octal {
                Some(byte) => {
                    out.push(byte);
                    i += 4;
                }
                None => {
                    out.push(inner[i + 1]);
                    i += 2;
                }
            }
            continue;
        }
        out.push(inner[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Cookieヘッダー（HTTP_COOKIE）を名前→値のマップに解析する
pub fn parse_cookie_header(header: &str) -> FormData {
    let mut cookies = FormData::new();
    for pair in header.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let name = parts.next().unwrap_or("").trim();
        let value = match parts.next() {
            Some(v) => v.trim(),
            None => continue,
        };
        // `$Path` などの属性は無視する
        if name.is_empty() || name.starts_with('$') {
            continue;
        }
        cookies
            .entry(name.to_string())
            .or_default()
            .push(unquote_cookie_value(value));
    }
    cookies
}
