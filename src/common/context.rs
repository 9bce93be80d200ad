//! リクエストコンテキストの実装
//!
//! `ctx()` はプロセス全体で共有される単一のハンドルだが、読み書きは
//! 呼び出し元スレッド専用の `RequestCtx` に振り向けられる。
//! スレッドIDから各コンテキストへのマップだけがロックで保護され、
//! 一度作成されたコンテキストには所有スレッドしかアクセスしない。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::storage::Storage;

/// デフォルトのステータス行
pub const DEFAULT_STATUS: &str = "200 OK";

/// ゲートウェイから渡されるリクエスト環境
#[derive(Default)]
pub struct Environ {
    /// CGI変数（REQUEST_METHOD, CONTENT_LENGTH, HTTP_COOKIE 等）
    pub vars: BTreeMap<String, String>,
    /// リクエストボディの入力ストリーム
    pub input: Option<Box<dyn Read + Send>>,
    /// 診断出力用のストリーム
    pub errors: Option<Box<dyn Write + Send>>,
}

impl Environ {
    /// 新しいEnvironを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 変数を追加
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// 入力ストリームを設定
    pub fn with_input<R: Read + Send + 'static>(mut self, input: R) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// 診断出力ストリームを設定
    pub fn with_errors<W: Write + Send + 'static>(mut self, errors: W) -> Self {
        self.errors = Some(Box::new(errors));
        self
    }

    /// 変数を取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl fmt::Debug for Environ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environ")
            .field("vars", &self.vars)
            .field("input", &self.input.is_some())
            .field("errors", &self.errors.is_some())
            .finish()
    }
}

/// 実行単位ごとのリクエストコンテキスト
#[derive(Debug)]
pub struct RequestCtx {
    pub environ: Environ,
    pub host: String,
    pub home: String,
    pub ip: String,
    pub method: String,
    pub path: String,
    /// クエリがなければ空文字列、あれば `?` から始まる
    pub query: String,
    pub fullpath: String,
    pub status: String,
    pub headers: Vec<(String, String)>,
    pub output: String,
    pub(crate) data: Option<Bytes>,
    /// アプリケーションが自由に使う値
    pub extra: Storage,
}

impl Default for RequestCtx {
    fn default() -> Self {
        Self {
            environ: Environ::default(),
            host: String::new(),
            home: String::new(),
            ip: String::new(),
            method: String::new(),
            path: String::new(),
            query: String::new(),
            fullpath: String::new(),
            status: DEFAULT_STATUS.to_string(),
            headers: Vec::new(),
            output: String::new(),
            data: None,
            extra: Storage::new(),
        }
    }
}

impl RequestCtx {
    /// `environ` の別名
    pub fn env(&self) -> &Environ {
        &self.environ
    }

    /// ボディが既に読み込まれているかどうか
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// 実行単位の専用コンテキストへのハンドル
pub type UnitCtx = Arc<Mutex<RequestCtx>>;

/// スレッドごとに分離されたコンテキストの保管庫
pub struct ContextStore {
    units: RwLock<HashMap<ThreadId, UnitCtx>>,
}

impl ContextStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self {
            units: RwLock::new(HashMap::new()),
        }
    }

    /// 呼び出し元スレッドのコンテキストを取得（初回アクセス時に作成）
    pub fn unit(&self) -> UnitCtx {
        let id = thread::current().id();
        if let Some(unit) = self.units.read().get(&id) {
            return Arc::clone(unit);
        }
        let mut units = self.units.write();
        Arc::clone(units.entry(id).or_insert_with(|| {
            log::trace!("creating request context for {:?}", id);
            Arc::new(Mutex::new(RequestCtx::default()))
        }))
    }

    /// 呼び出し元のコンテキストを参照する
    ///
    /// クロージャ内から再度 `with`/`with_mut` を呼ぶとデッドロックする。
    pub fn with<R>(&self, f: impl FnOnce(&RequestCtx) -> R) -> R {
        let unit = self.unit();
        let guard = unit.lock();
        f(&guard)
    }

    /// 呼び出し元のコンテキストを変更する
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut RequestCtx) -> R) -> R {
        let unit = self.unit();
        let mut guard = unit.lock();
        f(&mut guard)
    }

    /// アプリケーション値を取得
    pub fn get(&self, key: &str) -> Option<Value> {
        self.with(|c| c.extra.get(key).cloned())
    }

    /// アプリケーション値を設定
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.with_mut(|c| c.extra.set(key, value));
    }

    /// 呼び出し元のコンテキストを新しい空のものに置き換える
    pub fn clear_for_current_unit(&self) {
        let id = thread::current().id();
        let fresh = Arc::new(Mutex::new(RequestCtx::default()));
        self.units.write().insert(id, fresh);
    }

    /// 呼び出し元のコンテキストを破棄する（リクエスト終了時）
    pub fn release_current_unit(&self) {
        let id = thread::current().id();
        if self.units.write().remove(&id).is_some() {
            log::trace!("released request context for {:?}", id);
        }
    }

    /// 生存しているコンテキストの数
    pub fn active_units(&self) -> usize {
        self.units.read().len()
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

static CONTEXT: OnceLock<ContextStore> = OnceLock::new();

/// プロセス全体で共有されるコンテキストハンドル
pub fn ctx() -> &'static ContextStore {
    CONTEXT.get_or_init(ContextStore::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_same_instance_within_unit() {
        let store = ContextStore::new();
        let a = store.unit();
        let b = store.unit();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.active_units(), 1);
        assert_eq!(store.with(|c| c.status.clone()), DEFAULT_STATUS);
    }

    #[test]
    fn test_units_are_isolated() {
        let store = Arc::new(ContextStore::new());
        let barrier = Arc::new(Barrier::new(2));

        store.set("owner", "main");
        store.with_mut(|c| c.status = "404 Not Found".to_string());

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    // 他スレッドの値は見えない
                    assert_eq!(store.get("owner"), None);
                    assert_eq!(store.with(|c| c.status.clone()), DEFAULT_STATUS);
                    store.set("owner", format!("worker-{}", i));
                    // 両スレッドが書き込んでから読む
                    barrier.wait();
                    assert_eq!(store.get("owner"), Some(Value::from(format!("worker-{}", i))));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get("owner"), Some(Value::from("main")));
        assert_eq!(store.with(|c| c.status.clone()), "404 Not Found");
        assert_eq!(store.active_units(), 3);
    }

    #[test]
    fn test_clear_for_current_unit() {
        let store = ContextStore::new();
        store.set("user", "alice");
        let before = store.unit();

        store.clear_for_current_unit();

        let after = store.unit();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(store.get("user"), None);
        assert_eq!(store.with(|c| c.headers.len()), 0);
    }

    #[test]
    fn test_clear_does_not_touch_other_units() {
        let store = Arc::new(ContextStore::new());
        store.set("key", "kept");

        let worker = Arc::clone(&store);
        thread::spawn(move || {
            worker.set("key", "temp");
            worker.clear_for_current_unit();
            assert_eq!(worker.get("key"), None);
        })
        .join()
        .unwrap();

        assert_eq!(store.get("key"), Some(Value::from("kept")));
    }

    #[test]
    fn test_release_current_unit() {
        let store = ContextStore::new();
        store.set("a", 1);
        assert_eq!(store.active_units(), 1);
        store.release_current_unit();
        assert_eq!(store.active_units(), 0);
        // 再アクセスで新しいコンテキストが作られる
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_environ_builder() {
        let env = Environ::new()
            .with_var("REQUEST_METHOD", "GET")
            .with_input(std::io::empty());
        assert_eq!(env.get("REQUEST_METHOD"), Some("GET"));
        assert_eq!(env.get("CONTENT_LENGTH"), None);
        assert!(format!("{:?}", env).contains("input: true"));
    }
}
