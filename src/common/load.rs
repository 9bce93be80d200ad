//! ゲートウェイ環境からリクエストコンテキストを構築する

use super::context::{ctx, Environ, RequestCtx};

/// 呼び出し元のコンテキストを新しくし、環境から各フィールドを設定する
pub fn load(environ: Environ) {
    let store = ctx();
    store.clear_for_current_unit();
    store.with_mut(|c| fill(c, environ));
}

fn fill(c: &mut RequestCtx, environ: Environ) {
    let var = |key: &str| environ.get(key).unwrap_or("").to_string();

    let https = matches!(
        environ.get("HTTPS").map(str::to_ascii_lowercase).as_deref(),
        Some("on" | "true" | "1")
    );
    let protocol = if https { "https" } else { "http" };
    let host = environ.get("HTTP_HOST").unwrap_or("[unknown]").to_string();
    let home_path = environ
        .get("REAL_SCRIPT_NAME")
        .or_else(|| environ.get("SCRIPT_NAME"))
        .unwrap_or("");

    c.home = format!("{}://{}{}", protocol, host, home_path);
    c.host = var("HTTP_HOST");
    c.ip = var("REMOTE_ADDR");
    c.method = var("REQUEST_METHOD");
    c.path = var("PATH_INFO");
    c.query = match environ.get("QUERY_STRING") {
        Some(q) if !q.is_empty() => format!("?{}", q),
        _ => String::new(),
    };
    c.fullpath = format!("{}{}", c.path, c.query);
    c.environ = environ;
}
