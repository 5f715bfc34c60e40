// tests/feed_parse.rs
use podcast_promo_bot::feed;
use podcast_promo_bot::pool;
use podcast_promo_bot::resolve::scan;

const FIXTURE: &str = include_str!("fixtures/podcast_rss.xml");

#[test]
fn fixture_parses_with_dates_and_blobs() {
    let items = feed::parse(FIXTURE).unwrap();
    assert_eq!(items.len(), 5);

    let ep42 = &items[0];
    assert_eq!(ep42.title, "#42 コンパイラの気持ちになる回");
    assert_eq!(
        ep42.link.as_deref(),
        Some("https://techradio.example.com/episodes/42")
    );
    assert_eq!(ep42.guid.as_deref(), Some("techradio-ep-42"));
    assert!(ep42.published_at.is_some());
    // Enclosure URL and entity-decoded description both land in raw.
    assert!(ep42.raw.contains("cdn.example.com/techradio/42.mp3"));
    assert!(ep42.raw.contains("open.spotify.com/episode/51R2qnAfyLzLzDK8cVjRyx"));

    // JST pubDates convert to unix seconds: ep42 is newer than ep41.
    assert!(ep42.published_at > items[1].published_at);

    // The undated housekeeping item survives with no timestamp.
    let undated = items.iter().find(|it| it.title == "番組のお知らせ").unwrap();
    assert_eq!(undated.published_at, None);
    assert_eq!(undated.link, None);
}

#[test]
fn duplicate_entries_collapse_on_identity() {
    let items = feed::parse(FIXTURE).unwrap();
    let deduped = pool::dedup(items);
    assert_eq!(deduped.len(), 4);

    let ep40: Vec<_> = deduped
        .iter()
        .filter(|it| it.title == "#40 年末スペシャル")
        .collect();
    assert_eq!(ep40.len(), 1);
    // First occurrence wins: the one with the enclosure.
    assert!(ep40[0].raw.contains("No platform links"));
}

#[test]
fn scan_resolves_straight_from_fixture_items() {
    let items = feed::parse(FIXTURE).unwrap();

    // URL form, tracking stripped.
    let ep42 = scan::scan_item(&items[0]).map(|u| scan::strip_tracking(&u));
    assert_eq!(
        ep42.as_deref(),
        Some("https://open.spotify.com/episode/51R2qnAfyLzLzDK8cVjRyx")
    );

    // URI form normalized into the canonical https link.
    let ep41 = scan::scan_item(&items[1]);
    assert_eq!(
        ep41.as_deref(),
        Some("https://open.spotify.com/episode/3Xb5JqYyeWxXyGGUzvacdo")
    );

    // No platform link at all.
    assert_eq!(scan::scan_item(&items[2]), None);
}
