//! 出力直前のヘッダー/ステータス行の検証

/// ヘッダー名が安全かどうか検証する（RFC 7230のtchar、ASCII限定）
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
        })
}

/// ヘッダー値が安全かどうか検証する
/// 許可: HTAB(0x09), SP(0x20), 可視ASCII(0x21–0x7E)
pub fn is_valid_header_value(value: &str) -> bool {
    value
        .as_bytes()
        .iter()
        .all(|&c| c == b'\t' || c == b' ' || (0x21..=0x7e).contains(&c))
}

/// ステータス行が `NNN 理由句` の形式で制御文字を含まないか
pub fn is_valid_status_line(status: &str) -> bool {
    let mut parts = status.splitn(2, ' ');
    let code = parts.next().unwrap_or("");
    code.len() == 3
        && code.bytes().all(|c| c.is_ascii_digit())
        && is_valid_header_value(parts.next().unwrap_or(""))
}
