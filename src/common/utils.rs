//! 共通ユーティリティ関数群（URLデコード、整数変換、ヘッダー/クッキー検証）

use crate::cgi::validation::{is_valid_header_name, is_valid_header_value};
use crate::error::Error;

/// URLエンコーディングのデコード関数（`+` は空白に変換）
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (from_hex(bytes[i + 1]), from_hex(bytes[i + 2])) {
                result.push(h * 16 + l);
                i += 3;
                continue;
            }
        } else if bytes[i] == b'+' {
            result.push(b' ');
            i += 1;
            continue;
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// 16進数文字をバイト値に変換するヘルパー関数
fn from_hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// 文字列を整数に変換する（未設定・数値でない場合はデフォルト値）
pub fn int_get(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// CRまたはLFを含むかどうか（レスポンス分割攻撃の検出）
pub fn contains_crlf(value: &str) -> bool {
    value.contains('\r') || value.contains('\n')
}

/// ヘルパー: ヘッダー名/値を検証し、不正ならErrorを返す
///
/// CR/LFに加えて出力時と同じ規則（名前はtoken、値は可視ASCII・空白・タブ）で検証する。
pub fn validate_header(name: &str, value: &str) -> Result<(), Error> {
    if contains_crlf(name) || contains_crlf(value) {
        return Err(Error::InvalidHeader(format!(
            "invalid characters in header {:?}",
            name
        )));
    }
    if !is_valid_header_name(name) || !is_valid_header_value(value) {
        return Err(Error::InvalidHeader(format!(
            "header {:?} must be a token with a visible ASCII value",
            name
        )));
    }
    Ok(())
}

/// Cookie名が安全なトークンか（RFC6265準拠の簡易版）
pub fn is_cookie_name_valid(name: &str) -> bool {
    if name.is_empty() { return false; }
    // tokenと同等: 制御/空白とセパレータを除外
    const FORBIDDEN: &[char] = &['(',')','<','>','@',',',';',':','\\','"','/','[',']','?','=','{','}',' ','\t','\r','\n'];
    name.chars().all(|c| c.is_ascii() && !c.is_ascii_control() && !FORBIDDEN.contains(&c))
}

/// Cookie値が安全か（RFC6265 cookie-octetの簡易版）
/// 許容: 0x21, 0x23-0x2B, 0x2D-0x3A, 0x3C-0x5B, 0x5D-0x7E
pub fn is_cookie_value_valid(value: &str) -> bool {
    value.chars().all(|c| {
        let b = c as u32;
        matches!(b,
            0x21 |
            0x23..=0x2B |
            0x2D..=0x3A |
            0x3C..=0x5B |
            0x5D..=0x7E
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Hello%20World"), "Hello World");
        assert_eq!(percent_decode("test%2Bvalue"), "test+value");
        assert_eq!(percent_decode("normal"), "normal");
        assert_eq!(percent_decode("plus+space"), "plus space"); // +もスペースに変換
        assert_eq!(percent_decode("%E3%81%82%E3%81%84%E3%81%86%E3%81%88%E3%81%8A"), "あいうえお");
        // 末尾の不完全なエスケープはそのまま
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%2"), "a%2");
        assert_eq!(percent_decode("%41"), "A");
    }

    #[test]
    fn test_int_get() {
        assert_eq!(int_get(Some("42"), 0), 42);
        assert_eq!(int_get(Some(" 7 "), 0), 7);
        assert_eq!(int_get(Some("abc"), 0), 0);
        assert_eq!(int_get(Some("-3"), 0), 0);
        assert_eq!(int_get(None, 5), 5);
    }
}

#[cfg(test)]
mod sec_tests {
    use super::*;

    #[test]
    fn header_rejects_crlf() {
        assert!(validate_header("X-Foo", "bar").is_ok());
        assert!(validate_header("X-Foo", "value\twith tab").is_ok());
        assert!(validate_header("X-Foo", "bar\nbar").is_err());
        assert!(validate_header("X-Foo", "bar\rbar").is_err());
        assert!(validate_header("X-Foo\r\nSet-Cookie", "x").is_err());
        // 出力時に拒否される値はここで拒否する
        assert!(matches!(validate_header("X-Name", "café"), Err(Error::InvalidHeader(_))));
        assert!(validate_header("X-Name", "nul\x00").is_err());
        assert!(validate_header("X Name", "v").is_err());
    }

    #[test]
    fn cookie_name_and_value_validation() {
        assert!(is_cookie_name_valid("SESSIONID"));
        assert!(!is_cookie_name_valid("bad name"));
        assert!(!is_cookie_name_valid("bad;name"));
        assert!(!is_cookie_name_valid("bad=name"));
        assert!(!is_cookie_name_valid(""));

        assert!(is_cookie_value_valid("abcDEF123-_.:~"));
        assert!(is_cookie_value_valid(""));
        assert!(!is_cookie_value_valid("bad;value"));
        assert!(!is_cookie_value_valid("bad,value"));
        assert!(!is_cookie_value_valid("bad value"));
        assert!(!is_cookie_value_valid("bad\nvalue"));
    }
}
