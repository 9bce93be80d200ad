//! サンプルハンドラの実装
//!
//! 統合テストから呼び出す簡単なエンドポイント群。

use log::info;
use serde_json::json;

use webctx::cgi::request::request_headers;
use webctx::{
    cookies, ctx, header, input, notfound, output, setcookie, Error, InputMethod, Schema,
};

fn to_json(value: &serde_json::Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|e| Error::InternalServerError(e.to_string()))
}

/// PATH_INFOで振り分けるアプリケーション
pub fn app() -> Result<String, Error> {
    let path = ctx().with(|c| c.path.clone());
    match path.as_str() {
        "/" => hello(),
        "/echo" => echo(),
        "/greet" => greet(),
        "/visit" => visit(),
        "/stream" => stream(),
        "/panic" => {
            info!("Handling Panic request - this will panic!");
            panic!("Test panic from handler");
        }
        _ => Ok(notfound().to_string()),
    }
}

fn hello() -> Result<String, Error> {
    info!("Handling Hello request");
    header("Content-Type", "application/json", true)?;
    to_json(&json!({
        "message": "Hello from webctx CGI",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// リクエスト情報をそのまま返す
fn echo() -> Result<String, Error> {
    let params = input(InputMethod::Both, &Schema::new().keep_unlisted(true))?;
    let (method, path, fullpath, headers) = ctx().with(|c| {
        (
            c.method.clone(),
            c.path.clone(),
            c.fullpath.clone(),
            request_headers(&c.environ),
        )
    });
    header("Content-Type", "application/json", true)?;
    to_json(&json!({
        "method": method,
        "path": path,
        "fullpath": fullpath,
        "params": params,
        "headers": headers,
    }))
}

/// 必須パラメータ `name` を要求する
fn greet() -> Result<String, Error> {
    let params = input(
        InputMethod::Both,
        &Schema::new()
            .required_with("name", |v| !v.trim().is_empty())
            .integer("times", 1),
    )?;
    let name = params.get_str("name").unwrap_or_default();
    let times = params.get("times").and_then(|v| v.as_i64()).unwrap_or(1).clamp(0, 10);
    header("Content-Type", "text/plain", true)?;
    Ok(vec![format!("Hello, {}!", name); times as usize].join("\n"))
}

/// 訪問回数をクッキーで数える
fn visit() -> Result<String, Error> {
    let jar = cookies(&Schema::new().integer("visits", 0))?;
    let visits = jar.get("visits").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
    setcookie("visits", &visits.to_string(), 3600i64, None)?;
    header("Content-Type", "text/plain", true)?;
    Ok(format!("visits={}", visits))
}

/// `output` で書き出したボディを返す
fn stream() -> Result<String, Error> {
    header("Content-Type", "text/plain", true)?;
    for chunk in ["one ", "two ", "three"] {
        output(chunk);
    }
    Ok(String::new())
}
