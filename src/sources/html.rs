//! Minimal HTML helpers for adapters that scrape metadata out of embedded
//! markup (hnrss summaries, Telegram preview pages). Not a general HTML
//! parser; only handles the constructs those pages actually emit.

/// Drop tags, turning paragraph/line-break boundaries into newlines.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let closing = tag.starts_with('/');
                let name = tag
                    .trim_start_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .trim_end_matches('/')
                    .to_ascii_lowercase();
                if (closing && name == "p") || name == "br" {
                    out.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => out.push(ch),
        }
    }

    decode_entities(out.trim())
}

/// Decode the handful of entities these pages use.
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&nbsp;", " ")
}

/// Extract the text between `start` (after `from`) and `end`.
pub(crate) fn between<'a>(haystack: &'a str, from: usize, start: &str, end: &str) -> Option<&'a str> {
    let rest = &haystack[from..];
    let begin = rest.find(start)? + start.len();
    let len = rest[begin..].find(end)?;
    Some(&rest[begin..begin + len])
}
