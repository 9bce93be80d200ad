//! 共通の抽象化レイヤーとトレイト定義

pub mod context;
pub mod cookie;
pub mod http;
pub mod load;
pub mod storage;
pub mod traits;
pub mod utils;

pub use context::{ctx, ContextStore, Environ, RequestCtx, UnitCtx, DEFAULT_STATUS};
pub use cookie::{parse_cookie_header, Cookie, Expires, EXPIRES_CLAMP};
pub use http::{status_line, Response};
pub use load::load;
pub use storage::Storage;
pub use traits::Handler;
pub use utils::*;
