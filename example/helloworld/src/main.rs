use serde::{Deserialize, Serialize};
use webctx::{cgi, header, input, setcookie, Error, InputMethod, Schema};

// クエリパラメータの型定義
#[derive(Deserialize)]
struct HelloParams {
    name: String,
    lang: String,
}

// レスポンス用の型定義
#[derive(Serialize)]
struct GreetingResponse {
    message: String,
    timestamp: u64,
}

fn hello_handler() -> Result<String, Error> {
    let params: HelloParams = input(
        InputMethod::Get,
        &Schema::new()
            .optional("name", "World")
            .optional("lang", "en"),
    )?
    .to_struct()?;

    // 言語に基づいて挨拶を変更
    let greeting = match params.lang.as_str() {
        "ja" => format!("こんにちは、{}!", params.name),
        "fr" => format!("Bonjour, {} !", params.name),
        "es" => format!("¡Hola, {}!", params.name),
        "de" => format!("Hallo, {}!", params.name),
        _ => format!("Hello, {}!", params.name),
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    // 選んだ言語を1日覚えておく
    setcookie("lang", &params.lang, 86400i64, None)?;
    header("Content-Type", "application/json", true)?;

    serde_json::to_string(&GreetingResponse {
        message: greeting,
        timestamp: now,
    })
    .map_err(|e| Error::InternalServerError(e.to_string()))
}

#[tokio::main]
async fn main() {
    // ロガーの初期化
    env_logger::init();

    if let Err(e) = cgi::run_cgi(hello_handler).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
