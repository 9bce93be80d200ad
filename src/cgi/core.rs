//! CGIメイン実行ロジック

use bytes::Bytes;
use http::StatusCode;
use log::{debug, error, info, warn};
use tokio::task;

use crate::common::context::{ctx, Environ};
use crate::common::{load, Handler, Response};
use crate::error::Error;
use crate::helpers::{badrequest, internalerror};
use super::error_logging::{gather_panic_context, log_error_to_file};
use super::request::environ_from_process;
use super::response::write_response;

const BAD_REQUEST_STATUS: &str = "400 Bad Request";

/// リクエスト終了時（panic時を含む）に呼び出し元のコンテキストを破棄する
struct UnitGuard;

impl Drop for UnitGuard {
    fn drop(&mut self) {
        ctx().release_current_unit();
    }
}

/// 1リクエストを現在のスレッドで処理する
///
/// 新しいコンテキストに環境を読み込み、ハンドラの結果とコンテキストの
/// ステータス・ヘッダーからレスポンスを組み立てる。
pub fn handle_request<H: Handler + ?Sized>(environ: Environ, handler: &H) -> Response {
    let _guard = UnitGuard;
    load(environ);
    let store = ctx();
    let (method, path) = store.with(|c| (c.method.clone(), c.path.clone()));
    debug!("Processing CGI request: {} {}", method, path);

    match handler.handle() {
        Ok(body) => store.with(|c| {
            let body = if body.is_empty() && !c.output.is_empty() {
                Bytes::from(c.output.clone())
            } else {
                body
            };
            Response::from_ctx(c, body)
        }),
        Err(Error::ValidationFailed(reason)) => {
            debug!("Rejected request {} {}: {}", method, path, reason);
            // ハンドラが直接エラーを返した場合もステータスを400にする
            if store.with(|c| c.status != BAD_REQUEST_STATUS) {
                badrequest();
            }
            store.with(|c| Response::from_ctx(c, Bytes::from_static(b"bad request")))
        }
        Err(Error::PayloadTooLarge(msg)) => {
            warn!("{}", msg);
            Response::plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
        }
        Err(err) => {
            error!("Error processing request: {:?}", err);
            log_error_to_file(&format!("Handler returned error at {} {}: {:?}", method, path, err));
            let body = internalerror();
            store.with(|c| Response::from_ctx(c, Bytes::from_static(body.as_bytes())))
        }
    }
}

/// CGI環境からリクエストを読み込み、ハンドラで処理して標準出力に書き出す
pub async fn run_cgi<H: Handler>(handler: H) -> Result<(), Error> {
    let environ = environ_from_process();
    let method = environ
        .get("REQUEST_METHOD")
        .ok_or_else(|| {
            Error::InvalidRequestBody("REQUEST_METHOD environment variable not set".to_string())
        })?
        .to_string();
    let path = environ.get("PATH_INFO").unwrap_or("/").to_string();
    let vars = environ.vars.clone();

    // ハンドラ全体を1つのスレッドで実行し、コンテキストをそのスレッドに閉じ込める
    let task_result = task::spawn_blocking(move || handle_request(environ, &handler)).await;

    let response = match task_result {
        Ok(res) => res,
        Err(join_err) => {
            let panic_info = if join_err.is_panic() {
                "panic occurred in handler".to_string()
            } else {
                format!("task cancelled: {}", join_err)
            };
            error!("{}", panic_info);
            log_error_to_file(&format!("{} at {} {}", panic_info, method, path));
            if join_err.is_panic() {
                log_error_to_file(&gather_panic_context(&method, &path, &vars));
            }
            Response::plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    };

    let status = response.status.clone();
    write_response(response)?;

    info!("CGI request processed: {} {} -> {}", method, path, status);
    Ok(())
}
