//! Shared URL/form parsing and rendering helpers for route handlers.

use crate::game::state::with_session_mut;
use crate::store::StoreWrite;

/// Parse URL-encoded form body into key-value pairs.
/// Handles `key=value&key2=value2` format (from HTMX POST bodies).
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((percent_decode(key), percent_decode(val)))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Decoded bytes are reassembled as
/// UTF-8, so `%C3%A9` comes back as `é`.
pub fn percent_decode(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    let mut iter = input.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hi = iter.next();
                let lo = iter.next();
                let decoded = match (hi, lo) {
                    (Some(h), Some(l)) => core::str::from_utf8(&[h, l])
                        .ok()
                        .and_then(|s| u8::from_str_radix(s, 16).ok()),
                    _ => None,
                };
                match decoded {
                    Some(val) => bytes.push(val),
                    None => {
                        bytes.push(b'%');
                        bytes.extend(hi);
                        bytes.extend(lo);
                    }
                }
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
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

/// Parse a comma-separated zone list (`"1,3,4"`). Unparseable entries and
/// duplicates are dropped.
pub fn parse_zone_list(raw: &str) -> Vec<u32> {
    let mut zones: Vec<u32> = Vec::new();
    for z in raw.split(',').filter_map(|s| s.trim().parse().ok()) {
        if !zones.contains(&z) {
            zones.push(z);
        }
    }
    zones
}

/// Escape text for HTML element content and double-quoted attributes.
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

/// Encode a string as a JS string literal safe to embed in a `<script>`.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

/// Render queued store writes as a script that replays them into
/// `localStorage`. Empty when nothing is queued.
pub fn persist_script(writes: &[StoreWrite]) -> String {
    if writes.is_empty() {
        return String::new();
    }
    let mut js = String::from("<script>try{");
    for write in writes {
        match write {
            StoreWrite::Set { key, value } => js.push_str(&format!(
                "localStorage.setItem({},{});",
                js_string(key),
                js_string(value)
            )),
            StoreWrite::Remove { key } => {
                js.push_str(&format!("localStorage.removeItem({});", js_string(key)))
            }
        }
    }
    js.push_str("}catch(e){console.error('[concept-wheel] localStorage write failed',e);}</script>");
    js
}

/// Append the session's pending store writes to a response fragment.
pub fn flush_writes(mut html: String) -> String {
    let writes = with_session_mut(|s| s.store.take_pending());
    html.push_str(&persist_script(&writes));
    html
}

/// Red error span used by every route for rejected input.
pub fn error_span(message: &str) -> String {
    format!(
        r#"<span class="text-kip-red">{}</span>"#,
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_body_works() {
        let pairs = parse_form_body("kind=correct&handle=2&zones=1%2C3");
        assert_eq!(pairs.len(), 3);
        assert_eq!(get_param(&pairs, "kind"), Some("correct"));
        assert_eq!(get_param(&pairs, "zones"), Some("1,3"));
    }

    #[test]
    fn parse_form_body_empty() {
        let pairs = parse_form_body("");
        assert!(pairs.is_empty());
    }

    #[test]
    fn percent_decode_plus_as_space() {
        assert_eq!(percent_decode("hello+world"), "hello world");
    }

    #[test]
    fn percent_decode_hex() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
    }

    #[test]
    fn percent_decode_multibyte() {
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn percent_decode_keeps_broken_escapes() {
        assert_eq!(percent_decode("100%zz"), "100%zz");
        assert_eq!(percent_decode("50%"), "50%");
    }

    #[test]
    fn parse_query_strips_prefix() {
        let pairs = parse_query("?source=mistakes");
        assert_eq!(get_param(&pairs, "source"), Some("mistakes"));
    }

    #[test]
    fn zone_list_skips_junk_and_duplicates() {
        assert_eq!(parse_zone_list("1,3, 4,x,3"), vec![1, 3, 4]);
        assert!(parse_zone_list("").is_empty());
    }

    #[test]
    fn escape_html_covers_markup() {
        assert_eq!(
            escape_html(r#"<b a="x">&'"#),
            "&lt;b a=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn persist_script_replays_writes() {
        let js = persist_script(&[
            StoreWrite::Set {
                key: "nmScore".to_string(),
                value: "15".to_string(),
            },
            StoreWrite::Remove {
                key: "nmAnswers".to_string(),
            },
        ]);
        assert!(js.contains(r#"localStorage.setItem("nmScore","15");"#));
        assert!(js.contains(r#"localStorage.removeItem("nmAnswers");"#));
        assert!(persist_script(&[]).is_empty());
    }

    #[test]
    fn js_string_cannot_close_script() {
        assert_eq!(js_string("</script>"), r#""<\/script>""#);
    }
}
