//! CGIレスポンスの出力機能

use std::io::{self, Write};

use http::StatusCode;
use log::error;

use crate::common::Response;
use crate::error::Error;
use super::error_logging::log_error_to_file;
use super::validation::{is_valid_header_name, is_valid_header_value, is_valid_status_line};

/// 出力前にヘッダーとステータス行を検証する
///
/// 予約ヘッダー（Status, Content-Length）は除外する。不正なヘッダーがあれば
/// レスポンス全体を400に、不正なステータス行なら500に置き換える。
fn sanitize(response: Response) -> Response {
    if !is_valid_status_line(&response.status) {
        error!("Invalid status line detected: {:?}", response.status);
        return Response::plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }

    let mut headers = Vec::with_capacity(response.headers.len());
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("Status") || name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        if !is_valid_header_name(name) || !is_valid_header_value(value) {
            error!("Invalid header detected - name: {:?}, value: {:?}", name, value);
            log_error_to_file(&format!(
                "CRLF injection attempt detected in header: {:?}: {:?}",
                name, value
            ));
            return Response::plain(StatusCode::BAD_REQUEST, "Bad Request: Invalid header");
        }
        headers.push((name.clone(), value.clone()));
    }

    Response { headers, ..response }
}

/// レスポンスを任意のライターへ書き出す
pub fn write_response_to<W: Write>(response: Response, out: &mut W) -> Result<(), Error> {
    let response = sanitize(response);

    let mut head = format!("Status: {}\r\n", response.status);
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    // Content-Length はフレームワーク側で付与
    head.push_str(&format!("Content-Length: {}\r\n\r\n", response.body.len()));

    out.write_all(head.as_bytes())
        .map_err(|e| Error::InternalServerError(format!("Failed to write response head: {}", e)))?;
    out.write_all(&response.body)
        .map_err(|e| Error::InternalServerError(format!("Failed to write response body: {}", e)))?;
    Ok(())
}

/// レスポンスを標準出力に書き出す
pub fn write_response(response: Response) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    let res = write_response_to(response, &mut out);
    out.flush()
        .map_err(|e| Error::InternalServerError(format!("Failed to flush stdout: {}", e)))?;
    res
}
