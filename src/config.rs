//! プロセス全体の設定
//!
//! セッション・データベース関連の項目は名前だけを保持し、
//! このクレート自身は解釈しない。

use std::env;
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::common::storage::Storage;
use crate::error::Error;

/// リクエストボディの最大サイズのデフォルト値（5MB）
pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// セッションの主要パラメータ
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionParameters {
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub timeout: u64,
    pub max_age: u64,
    pub id_seed: String,
    pub regenerate_id: bool,
    pub ignore_change_ip: bool,
    pub ignore_expiration: bool,
    pub ignore_old_age: bool,
    pub handler: Option<String>,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            cookie_name: "webctx_session_id".to_string(),
            cookie_domain: None,
            timeout: 86400,
            max_age: 86400,
            id_seed: "webctx".to_string(),
            regenerate_id: true,
            ignore_change_ip: false,
            ignore_expiration: false,
            ignore_old_age: true,
            handler: None,
        }
    }
}

/// セッションハンドラのパラメータ
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandlerParameters {
    pub file_dir: Option<String>,
    pub file_prefix: Option<String>,
    pub db_table: Option<String>,
}

/// 設定
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `data()` が受け付けるボディの最大バイト数
    pub max_body_size: usize,
    pub db_parameters: Storage,
    pub db_printing: bool,
    pub session_parameters: SessionParameters,
    pub handler_parameters: HandlerParameters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            db_parameters: Storage::new(),
            db_printing: false,
            session_parameters: SessionParameters::default(),
            handler_parameters: HandlerParameters::default(),
        }
    }
}

impl Config {
    /// 環境変数から設定を構築する
    ///
    /// - `WEBCTX_MAX_BODY_SIZE`: 数値でなければデフォルトの5MB
    /// - `WEBCTX_DB_PRINTING`: `1`/`true`/`on` で有効
    /// - `WEBCTX_SESSION_COOKIE_NAME`
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Some(size) = env::var("WEBCTX_MAX_BODY_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.max_body_size = size;
        }
        if let Ok(flag) = env::var("WEBCTX_DB_PRINTING") {
            config.db_printing = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "on");
        }
        if let Ok(name) = env::var("WEBCTX_SESSION_COOKIE_NAME") {
            if !name.is_empty() {
                config.session_parameters.cookie_name = name;
            }
        }
        config
    }

    /// JSON文書から設定を構築する（省略された項目はデフォルト値）
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::ConfigurationError(e.to_string()))
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

fn slot() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::from_env()))
}

/// 現在の設定のスナップショットを取得
pub fn config() -> Config {
    slot().read().clone()
}

/// 設定を置き換える
pub fn configure(config: Config) {
    *slot().write() = config;
}
