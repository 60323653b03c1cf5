//! Shared URL/form parsing and fragment helpers for route handlers.

/// Parse URL-encoded form body into key-value pairs.
/// Handles `key=value&key2=value2` format (from HTMX POST bodies).
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((percent_decode(key), percent_decode(val)))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Decoded bytes are read as UTF-8, so
/// faction and unit names outside ASCII survive.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = core::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(val) => {
                        out.push(val);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a query string into key-value pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let q = query.strip_prefix('?').unwrap_or(query);
    parse_form_body(q)
}

/// Helper to get a value by key from a list of key-value pairs.
pub fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parse a numeric parameter, `None` when missing or malformed.
pub fn get_num<T: core::str::FromStr>(params: &[(String, String)], key: &str) -> Option<T> {
    get_param(params, key).and_then(|s| s.trim().parse().ok())
}

/// Escape text for HTML bodies and double-quoted attributes. Catalog text is
/// authored outside this crate.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a single-quoted JavaScript string literal inside a
/// `<script>` block.
pub fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            _ => out.push(c),
        }
    }
    out
}

pub fn error_fragment(message: &str) -> String {
    format!(
        r#"<span class="text-red-500">{}</span>"#,
        escape_html(message)
    )
}

pub fn ok_fragment(message: &str) -> String {
    format!(
        r#"<span class="text-emerald-400">{}</span>"#,
        escape_html(message)
    )
}

/// A `<script>` that downloads `contents` as a file named `filename`.
pub fn download_script(filename: &str, mime: &str, contents: &str) -> String {
    format!(
        r#"<script>
(function() {{
  var b = new Blob(['{contents}'], {{type: '{mime}'}});
  var a = document.createElement('a');
  a.href = URL.createObjectURL(b);
  a.download = '{filename}';
  a.click();
  URL.revokeObjectURL(a.href);
  console.log('[muster] exported {filename}');
}})();
</script>"#,
        contents = escape_js(contents),
        mime = mime,
        filename = escape_js(filename),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_body_works() {
        let pairs = parse_form_body("entry=3&slot=gear&upgrade=targeting_scopes");
        assert_eq!(pairs.len(), 3);
        assert_eq!(get_param(&pairs, "slot"), Some("gear"));
        assert_eq!(get_num::<u64>(&pairs, "entry"), Some(3));
        assert_eq!(get_num::<u64>(&pairs, "slot"), None);
    }

    #[test]
    fn parse_form_body_empty() {
        assert!(parse_form_body("").is_empty());
    }

    #[test]
    fn percent_decode_plus_as_space() {
        assert_eq!(percent_decode("special+forces"), "special forces");
    }

    #[test]
    fn percent_decode_hex_and_utf8() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("Bo%C3%A9"), "Boé");
    }

    #[test]
    fn percent_decode_keeps_broken_escapes() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn parse_query_strips_prefix() {
        let pairs = parse_query("?rank=corps");
        assert_eq!(get_param(&pairs, "rank"), Some("corps"));
    }

    #[test]
    fn escape_html_covers_markup() {
        assert_eq!(escape_html(r#"<b a="x">&'"#), "&lt;b a=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn escape_js_blocks_script_breakout() {
        let out = escape_js("it's </script>\n");
        assert_eq!(out, "it\\'s \\x3c/script>\\n");
    }
}
