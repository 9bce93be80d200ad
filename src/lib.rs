//! webctx: CGIゲートウェイとアプリケーションの間に置く薄いリクエストコンテキスト層
//!
//! 環境変数からリクエストコンテキストを組み立て、入力値の正規化・検証、
//! ヘッダーとクッキーの出力、エラーレスポンスのヘルパーを提供します。
//! コンテキストは実行スレッドごとに分離されます。

pub mod cgi;
pub mod common;
pub mod config;
pub mod error;
pub mod helpers;
pub mod input;

pub use common::{ctx, load, Environ, Handler, Response, Storage};
pub use config::{config, configure, Config};
pub use error::Error;
pub use helpers::{
    badrequest, cookies, data, debug, debug_write, gone, header, internalerror, notfound, output,
    setcookie,
};
pub use input::{input, normalize, Field, FieldKind, FormData, InputMethod, Schema, ValidationError};
