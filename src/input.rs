//! 入力パラメータの正規化
//!
//! GET/POSTで送られた値を宣言されたフィールドスキーマと突き合わせ、
//! 必須チェック・デフォルト値の適用・型変換を行って `Storage` を返す。
//! 検証に失敗した場合は `badrequest()` でコンテキストを400に設定し、
//! `Error::ValidationFailed` を返す（ハンドラは `?` でそのまま抜けられる）。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::common::context::ctx;
use crate::common::storage::Storage;
use crate::common::utils::percent_decode;
use crate::error::Error;
use crate::helpers::{badrequest, data};

/// 送信された値（キーごとに送信順の全ての値）
pub type FormData = BTreeMap<String, Vec<String>>;

/// 値の検証関数
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// どちらのソースから入力を読むか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMethod {
    /// GETとPOSTの両方（POSTが優先）
    #[default]
    Both,
    Get,
    Post,
}

impl InputMethod {
    fn reads_get(self) -> bool {
        matches!(self, InputMethod::Both | InputMethod::Get)
    }

    fn reads_post(self) -> bool {
        matches!(self, InputMethod::Both | InputMethod::Post)
    }
}

/// フィールドの型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 最後に送信された値
    Text,
    /// 送信された全ての値
    List,
    /// 最後に送信された値を整数として解釈
    Integer,
}

/// 検証エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    Missing(String),

    #[error("field rejected by validator: {0}")]
    Rejected(String),

    #[error("cannot coerce field {name}: {reason}")]
    Coercion { name: String, reason: String },
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::ValidationFailed(err.to_string())
    }
}

/// スキーマ中の1フィールドの宣言
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    validator: Option<Validator>,
}

impl Field {
    /// 必須のテキストフィールド
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            required: true,
            default: None,
            validator: None,
        }
    }

    /// デフォルト値付きの任意フィールド
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            required: false,
            default: Some(default.into()),
            validator: None,
        }
    }

    /// 型を設定
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// 検証関数を設定（送信された各値に適用される）
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    fn resolve(&self, submitted: Option<&Vec<String>>) -> Result<Option<Value>, ValidationError> {
        let values = match submitted {
            Some(values) if !values.is_empty() => values,
            _ => {
                if let Some(default) = &self.default {
                    return Ok(Some(default.clone()));
                }
                if self.required {
                    return Err(ValidationError::Missing(self.name.clone()));
                }
                return Ok(None);
            }
        };

        if let Some(validator) = &self.validator {
            if !values.iter().all(|v| validator(v)) {
                return Err(ValidationError::Rejected(self.name.clone()));
            }
        }

        // valuesは空でないことを上で確認済み
        let last = &values[values.len() - 1];
        let value = match self.kind {
            FieldKind::Text => Value::from(last.clone()),
            FieldKind::List => Value::from(values.clone()),
            FieldKind::Integer => {
                let n = last.trim().parse::<i64>().map_err(|e| ValidationError::Coercion {
                    name: self.name.clone(),
                    reason: e.to_string(),
                })?;
                Value::from(n)
            }
        };
        Ok(Some(value))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// 入力のフィールドスキーマ
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    keep_unlisted: bool,
}

impl Schema {
    /// 空のスキーマを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// フィールドを追加（同名のフィールドは置き換える）
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// 必須のテキストフィールドを追加
    pub fn required(self, name: impl Into<String>) -> Self {
        self.field(Field::required(name))
    }

    /// 検証関数付きの必須フィールドを追加
    pub fn required_with<F>(self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.field(Field::required(name).validate(validator))
    }

    /// デフォルト値付きのテキストフィールドを追加
    pub fn optional(self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.field(Field::optional(name, default.into()))
    }

    /// リストフィールドを追加（未送信なら空リスト）
    pub fn list(self, name: impl Into<String>) -> Self {
        self.field(Field::optional(name, Value::Array(Vec::new())).kind(FieldKind::List))
    }

    /// 整数フィールドを追加
    pub fn integer(self, name: impl Into<String>, default: i64) -> Self {
        self.field(Field::optional(name, default).kind(FieldKind::Integer))
    }

    /// 宣言されていないキーも結果に含めるかどうか
    pub fn keep_unlisted(mut self, keep: bool) -> Self {
        self.keep_unlisted = keep;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// `application/x-www-form-urlencoded` 形式の文字列を解析する（空値も保持）
pub fn parse_form(text: &str) -> FormData {
    let mut form = FormData::new();
    for pair in text.split(['&', ';']) {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = percent_decode(parts.next().unwrap_or(""));
        let value = percent_decode(parts.next().unwrap_or(""));
        form.entry(key).or_default().push(value);
    }
    form
}

/// GETとPOSTの値をマージする（同じキーはPOSTが優先）
pub fn merge(get: FormData, post: FormData) -> FormData {
    let mut merged = get;
    merged.extend(post);
    merged
}

/// 送信値をスキーマに従って正規化する
pub fn normalize(raw: &FormData, schema: &Schema) -> Result<Storage, ValidationError> {
    let mut out = Storage::new();
    for field in &schema.fields {
        if let Some(value) = field.resolve(raw.get(&field.name))? {
            out.set(field.name.clone(), value);
        }
    }
    if schema.keep_unlisted {
        for (key, values) in raw {
            if schema.declares(key) {
                continue;
            }
            if let Some(last) = values.last() {
                out.set(key.clone(), last.clone());
            }
        }
    }
    Ok(out)
}

/// 正規化し、失敗時は400レスポンスを設定してエラーを返す
pub(crate) fn normalize_or_reject(raw: &FormData, schema: &Schema) -> Result<Storage, Error> {
    normalize(raw, schema).map_err(|err| {
        debug!("input validation failed: {}", err);
        badrequest();
        Error::from(err)
    })
}

/// 現在のリクエストのGET/POSTパラメータを取得する
pub fn input(method: InputMethod, schema: &Schema) -> Result<Storage, Error> {
    let (request_method, query_string, content_type) = ctx().with(|c| {
        (
            c.environ.get("REQUEST_METHOD").unwrap_or("").to_ascii_uppercase(),
            c.environ.get("QUERY_STRING").unwrap_or("").to_string(),
            c.environ.get("CONTENT_TYPE").unwrap_or("").to_ascii_lowercase(),
        )
    });

    let mut post = FormData::new();
    if method.reads_post() && request_method == "POST" {
        let body = data()?;
        if content_type.starts_with("multipart/") {
            log::warn!("multipart request bodies are not parsed; ignoring POST fields");
        } else {
            post = parse_form(&String::from_utf8_lossy(&body));
        }
    }

    let get = if method.reads_get() {
        parse_form(&query_string)
    } else {
        FormData::new()
    };

    normalize_or_reject(&merge(get, post), schema)
}
