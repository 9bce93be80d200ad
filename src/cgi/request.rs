//! CGIリクエスト環境の構築

use std::collections::BTreeMap;
use std::env;
use std::io;

use crate::common::context::Environ;
use super::validation::{is_valid_header_name, is_valid_header_value};

/// プロセスの環境変数・標準入力・標準エラー出力からEnvironを構築する
pub fn environ_from_process() -> Environ {
    Environ {
        vars: env::vars().collect(),
        input: Some(Box::new(io::stdin())),
        errors: Some(Box::new(io::stderr())),
    }
}

/// CGI変数名をHTTPヘッダー名に変換する（HTTP_X_AUTH_TOKEN -> X-Auth-Token）
pub fn header_name_from_cgi(key: &str) -> Option<String> {
    let raw = match key {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => key,
        _ => key.strip_prefix("HTTP_")?,
    };
    let name = raw
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
            }
        })
        .collect::<Vec<String>>()
        .join("-");
    Some(name)
}

/// 環境からリクエストヘッダーを取得する（不正な名前/値は除外）
pub fn request_headers(environ: &Environ) -> BTreeMap<String, String> {
    environ
        .vars
        .iter()
        .filter_map(|(key, value)| {
            let name = header_name_from_cgi(key)?;
            if !is_valid_header_name(&name) || !is_valid_header_value(value) {
                log::debug!("skipping invalid request header {:?}", key);
                return None;
            }
            Some((name, value.clone()))
        })
        .collect()
}
