//! 名前付きの値を保持する汎用コンテナ（Storage）の実装
//!
//! キーによるアクセスとフィールドとしてのアクセスの両方を提供する。
//! どちらも同じ `serde_json::Map` を参照するため常に一致する。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// 挿入順を保持するキー/値コンテナ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Storage {
    values: Map<String, Value>,
}

impl Storage {
    /// 空のStorageを作成
    pub fn new() -> Self {
        Self { values: Map::new() }
    }

    /// キーで値を取得
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// キーで値を取得（存在しない場合は指定のデフォルト値）
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.values.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// 文字列値を取得
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// フィールドとして値を取得（存在しない場合はエラー）
    pub fn attr(&self, key: &str) -> Result<&Value, Error> {
        self.values
            .get(key)
            .ok_or_else(|| Error::MissingField(key.to_string()))
    }

    /// 値を設定（既存キーの位置は変わらない）
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// 値を削除して返却
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    /// 指定されたキーが存在するかチェック
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 全てのキーを挿入順に取得
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Storageの内容を名前付きフィールドを持つ構造体として取り出す
    ///
    /// 値の欠落や型の不一致は入力の問題として `Error::ValidationFailed` になる。
    pub fn to_struct<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| Error::ValidationFailed(e.to_string()))
    }

    /// 内部のマップを取り出す
    pub fn into_inner(self) -> Map<String, Value> {
        self.values
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Storage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut storage = Storage::new();
        for (k, v) in iter {
            storage.set(k, v);
        }
        storage
    }
}

impl IntoIterator for Storage {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl From<Map<String, Value>> for Storage {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_basic() {
        let mut storage = Storage::new();
        storage.set("name", "Alice");
        storage.set("age", 30);

        assert_eq!(storage.get("name"), Some(&json!("Alice")));
        assert_eq!(storage.get_str("name"), Some("Alice"));
        assert_eq!(storage.get("age"), Some(&json!(30)));
        assert_eq!(storage.get("missing"), None);
        assert_eq!(storage.get_or("missing", "fallback"), json!("fallback"));
    }

    #[test]
    fn test_storage_attr_missing() {
        let storage = Storage::new();
        match storage.attr("nope") {
            Err(Error::MissingField(name)) => assert_eq!(name, "nope"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_storage_keeps_insertion_order() {
        let mut storage = Storage::new();
        storage.set("zeta", 1);
        storage.set("alpha", 2);
        storage.set("mid", 3);
        // 既存キーの上書きは順序を変えない
        storage.set("zeta", 4);

        let keys: Vec<&String> = storage.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(storage.get("zeta"), Some(&json!(4)));
    }

    #[test]
    fn test_storage_remove_and_contains() {
        let mut storage: Storage = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert!(storage.contains_key("a"));
        assert_eq!(storage.remove("a"), Some(json!(1)));
        assert!(!storage.contains_key("a"));
        assert_eq!(storage.len(), 1);
        assert!(!storage.is_empty());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_storage_to_struct() {
        let mut storage = Storage::new();
        storage.set("name", "Bob");
        storage.set("tags", json!(["x", "y"]));

        let person: Person = storage.to_struct().unwrap();
        assert_eq!(person.name, "Bob");
        assert_eq!(person.tags, vec!["x", "y"]);

        // フィールドビューとキービューは同じデータ
        assert_eq!(storage.attr("name").unwrap(), &json!(person.name));
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        #[allow(dead_code)]
        page: u32,
    }

    #[test]
    fn test_storage_to_struct_type_mismatch_is_validation_failure() {
        let mut storage = Storage::new();
        storage.set("page", "3");

        let err = storage.to_struct::<Page>().unwrap_err();
        assert!(err.is_validation_failure(), "unexpected error: {:?}", err);
        assert_eq!(err.status_code(), 400);

        let missing = Storage::new().to_struct::<Page>().unwrap_err();
        assert!(missing.is_validation_failure());
    }

    #[test]
    fn test_storage_serializes_as_object() {
        let mut storage = Storage::new();
        storage.set("b", 1);
        storage.set("a", 2);
        assert_eq!(serde_json::to_string(&storage).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
