//! エラーログとログ出力時のマスク処理

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;

use chrono::{Local, Utc};

/// エラーログの出力先
pub const ERROR_LOG_FILE: &str = "webctx_error.log";

const REDACTED: &str = "***redacted***";
const MAX_LOGGED_VALUE: usize = 200;

/// エラー内容をログファイルに追記する
pub fn log_error_to_file(message: &str) {
    append_error_entry(ERROR_LOG_FILE, message);
}

/// 指定ファイルにエラーエントリを追記する（書き込みに失敗しても無視する）
pub fn append_error_entry(path: &str, message: &str) {
    let rule = "=".repeat(80);
    let entry = format!(
        "{rule}\nWEBCTX CGI ERROR\nTimestamp (UTC): {}\nTimestamp (Local): {}\nProcess ID: {}\n{}\n{}\n{rule}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f %Z"),
        std::process::id(),
        "-".repeat(80),
        message,
    );
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            let _ = file.write_all(entry.as_bytes());
        }
        Err(e) => log::warn!("could not open error log {}: {}", path, e),
    }
}

/// panic時に記録するリクエスト環境の要約（センシティブな値はマスク）
pub fn gather_panic_context(method: &str, path: &str, vars: &BTreeMap<String, String>) -> String {
    let mut lines = vec![
        "CGI panic context:".to_string(),
        format!("  REQUEST_METHOD={}", method),
        format!("  PATH_INFO={}", path),
    ];

    const BASIC_VARS: [&str; 8] = [
        "QUERY_STRING",
        "CONTENT_TYPE",
        "CONTENT_LENGTH",
        "SERVER_PROTOCOL",
        "SERVER_NAME",
        "SERVER_PORT",
        "REMOTE_ADDR",
        "REMOTE_PORT",
    ];
    for key in BASIC_VARS {
        if let Some(val) = vars.get(key) {
            lines.push(format!("  {}={}", key, redact_value_for_log(key, val)));
        }
    }

    lines.push("  HTTP headers:".to_string());
    let headers: Vec<String> = vars
        .iter()
        .filter(|(k, _)| k.starts_with("HTTP_"))
        .map(|(k, v)| format!("    {}={}", k, redact_value_for_log(k, v)))
        .collect();
    if headers.is_empty() {
        lines.push("    (none)".to_string());
    } else {
        lines.extend(headers);
    }

    lines.join("\n")
}

/// ログ出力用に値をマスク/切り詰めする
pub fn redact_value_for_log(key: &str, value: &str) -> String {
    let key_l = key.to_ascii_lowercase();
    if key_l == "query_string" {
        return redact_query_string(value);
    }
    if is_sensitive_key_like(&key_l) {
        return REDACTED.to_string();
    }
    match value.char_indices().nth(MAX_LOGGED_VALUE) {
        Some((cut, _)) => format!("{}...[truncated]", &value[..cut]),
        None => value.to_string(),
    }
}

/// キー名がセンシティブな値を示していそうか（小文字で渡すこと）
pub fn is_sensitive_key_like(lower_key: &str) -> bool {
    const PATTERNS: [&str; 14] = [
        "authorization",
        "cookie",
        "token",
        "secret",
        "pass",
        "api-key",
        "api_key",
        "apikey",
        "jwt",
        "auth",
        "session",
        "csrf",
        "signature",
        "private",
    ];
    PATTERNS.iter().any(|p| lower_key.contains(p)) || lower_key.ends_with("key")
}

/// クエリ文字列中のセンシティブなパラメータ値をマスクする
pub fn redact_query_string(qs: &str) -> String {
    qs.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let key = part.split('=').next().unwrap_or("");
            if is_sensitive_key_like(&key.to_ascii_lowercase()) {
                format!("{}={}", key, REDACTED)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
