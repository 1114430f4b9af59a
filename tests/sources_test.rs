//! Adapter registry dispatch, URL auto-detection and feed content parsing.

use feedjam::sources::rss::parse_feed_content;
use feedjam::{AdapterRegistry, SourceType};

const RSS_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <description>Posts about things</description>
    <item>
      <title>First post</title>
      <link>https://example.com/first</link>
      <guid>https://example.com/first</guid>
      <description>Hello world</description>
      <pubDate>Wed, 01 Jul 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second post</title>
      <link>https://example.com/second</link>
      <guid isPermaLink="false">post-2</guid>
      <description>More content</description>
    </item>
  </channel>
</rss>"#;

const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Release notes</title>
  <updated>2026-07-01T12:00:00Z</updated>
  <entry>
    <id>tag:github.com,2008:Repository/1/v1.0</id>
    <title>v1.0</title>
    <link rel="alternate" type="text/html" href="https://github.com/acme/widget/releases/tag/v1.0"/>
    <updated>2026-07-01T12:00:00Z</updated>
    <content type="html">Initial release</content>
  </entry>
</feed>"#;

#[test]
fn specific_adapters_detected_before_rss_fallback() {
    let registry = AdapterRegistry::new();

    let cases = [
        ("https://hnrss.org/frontpage", SourceType::HackerNews),
        ("https://news.ycombinator.com/rss", SourceType::HackerNews),
        ("https://t.me/somechannel", SourceType::Telegram),
        ("https://www.reddit.com/r/rust/", SourceType::Reddit),
        ("https://www.youtube.com/channel/UCabc", SourceType::Youtube),
        ("https://github.com/rust-lang/rust", SourceType::Github),
        // Anything else lands on the RSS fallback, even without feed-ish
        // markers in the URL.
        ("https://example.com/blog/feed.xml", SourceType::Rss),
        ("https://example.com/whatever", SourceType::Rss),
    ];

    for (url, expected) in cases {
        let adapter = registry.detect(url);
        assert_eq!(adapter.source_type(), expected, "url: {url}");
    }
}

#[test]
fn email_sources_have_no_polling_adapter() {
    let registry = AdapterRegistry::new();
    assert!(registry.for_type(SourceType::Email).is_none());
    assert!(registry.for_type(SourceType::Rss).is_some());
    assert!(registry.for_type(SourceType::HackerNews).is_some());
    assert!(registry.for_type(SourceType::Telegram).is_some());
}

#[test]
fn adapters_derive_stable_source_names() {
    let registry = AdapterRegistry::new();

    let cases = [
        ("https://hnrss.org/best", "hackernews-best"),
        ("https://www.reddit.com/r/rust/", "reddit-r-rust"),
        ("https://t.me/rustnews", "telegram-rustnews"),
        ("https://github.com/rust-lang/rust", "github-rust-lang-rust"),
        ("https://example.com/blog/feed.xml", "example.com-blog-feed.xml"),
        ("https://example.com/rss", "example.com"),
    ];

    for (url, expected) in cases {
        let adapter = registry.detect(url);
        assert_eq!(adapter.source_name(url), expected, "url: {url}");
    }
}

#[test]
fn rss_items_carry_guid_link_and_published() {
    let items = parse_feed_content(RSS_FIXTURE, "example-blog").unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "First post");
    assert_eq!(items[0].link.as_deref(), Some("https://example.com/first"));
    assert_eq!(items[0].local_id.as_deref(), Some("https://example.com/first"));
    assert_eq!(items[0].source_name, "example-blog");
    assert_eq!(items[0].description.as_deref(), Some("Hello world"));
    assert!(items[0].published.is_some());

    // Non-permalink guid is still the dedup key.
    assert_eq!(items[1].local_id.as_deref(), Some("post-2"));
    assert!(items[1].published.is_none());
}

#[test]
fn atom_entries_parse_as_items() {
    let items = parse_feed_content(ATOM_FIXTURE, "github-acme-widget").unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "v1.0");
    assert_eq!(
        items[0].link.as_deref(),
        Some("https://github.com/acme/widget/releases/tag/v1.0")
    );
    assert_eq!(
        items[0].local_id.as_deref(),
        Some("tag:github.com,2008:Repository/1/v1.0")
    );
}

#[test]
fn malformed_content_is_a_parse_error() {
    let result = parse_feed_content("this is not a feed at all", "broken");
    assert!(result.is_err());
}
