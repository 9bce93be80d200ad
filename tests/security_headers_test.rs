use bytes::Bytes;
use webctx::cgi::handle_request;
use webctx::cgi::response::write_response_to;
use webctx::common::parse_cookie_header;
use webctx::{header, setcookie, Environ, Error};

fn render(environ: Environ, handler: impl Fn() -> Result<Bytes, Error> + Send + Sync + 'static) -> String {
    let response = handle_request(environ, &handler);
    let mut out = Vec::new();
    write_response_to(response, &mut out).expect("write failed");
    String::from_utf8(out).expect("utf8")
}

#[test]
fn header_rejects_crlf_and_leaves_headers_unchanged() {
    let out = render(Environ::new(), || {
        header("X-Safe", "1", false)?;
        assert!(matches!(
            header("X-Evil", "a\r\nSet-Cookie: pwned=1", false),
            Err(Error::InvalidHeader(_))
        ));
        assert!(header("X-Evil\n", "a", false).is_err());
        Ok(Bytes::from_static(b"ok"))
    });

    assert!(out.starts_with("Status: 200 OK\r\n"));
    assert!(out.contains("X-Safe: 1\r\n"));
    assert!(!out.contains("pwned"));
}

#[test]
fn header_rejects_non_ascii_value_before_output() {
    let out = render(Environ::new(), || {
        assert!(matches!(header("X-Name", "café", false), Err(Error::InvalidHeader(_))));
        header("X-Name", "cafe", false)?;
        Ok(Bytes::from_static(b"ok"))
    });

    // 不正な値はヘッダーに入らないので、レスポンス全体は置き換えられない
    assert!(out.starts_with("Status: 200 OK\r\n"));
    assert!(out.contains("X-Name: cafe\r\n"));
    assert!(out.ends_with("ok"));
}

#[test]
fn setcookie_rejects_crlf_in_domain() {
    let out = render(Environ::new(), || {
        let res = setcookie("sid", "abc", "", Some("example.com\r\nX-Evil: 1"));
        assert!(matches!(res, Err(Error::InvalidCookie(_))));
        Ok(Bytes::from_static(b"ok"))
    });
    assert!(!out.contains("Set-Cookie"));
    assert!(!out.contains("X-Evil"));
}

#[test]
fn unique_header_keeps_first_value() {
    let out = render(Environ::new(), || {
        header("Content-Type", "application/json", true)?;
        header("content-type", "text/plain", true)?;
        Ok(Bytes::new())
    });
    assert!(out.contains("Content-Type: application/json\r\n"));
    assert!(!out.contains("text/plain"));
}

#[test]
fn cookie_value_with_separators_is_quoted() {
    let out = render(Environ::new(), || {
        setcookie("msg", "a b;c", "", None)?;
        Ok(Bytes::new())
    });
    assert!(out.contains("Set-Cookie: msg=\"a b\\073c\"; Path=/\r\n"));
}

#[test]
fn cookie_value_cannot_inject_attributes() {
    let out = render(Environ::new(), || {
        setcookie("sid", "x; Domain=evil.example", "", None)?;
        setcookie("a", "1,2", "", None)?;
        Ok(Bytes::new())
    });

    let set_cookies: Vec<&str> = out
        .lines()
        .filter_map(|l| l.strip_prefix("Set-Cookie: "))
        .collect();
    assert_eq!(set_cookies.len(), 2);
    assert_eq!(set_cookies[0], "sid=\"x\\073 Domain=evil.example\"; Path=/");
    assert!(!set_cookies[0].contains("; Domain="));
    assert_eq!(set_cookies[1], "a=\"1\\0542\"; Path=/");

    // ブラウザから送り返された値は元に戻る
    let pair = set_cookies[0].split("; Path=").next().unwrap_or("");
    let jar = parse_cookie_header(pair);
    assert_eq!(jar.get("sid"), Some(&vec!["x; Domain=evil.example".to_string()]));
}
