use chrono::{Duration, NaiveDate, TimeZone, Utc};

use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Row {
    id: i64,
    published_at: Option<DateTime<Utc>>,
}

impl Keyset for Row {
    fn sort_key(&self) -> SortKey {
        SortKey::new(self.published_at, self.id)
    }
}

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn row(id: i64, published_at: Option<DateTime<Utc>>) -> Row {
    Row { id, published_at }
}

/// In-memory stand-in for the store: sort, apply the boundary, over-fetch.
fn fetch_page(rows: &[Row], cursor: Option<&Cursor>, limit: i64) -> Page<Row> {
    let mut sorted: Vec<Row> = rows.to_vec();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    let fetched: Vec<Row> = sorted
        .into_iter()
        .filter(|r| cursor.is_none_or(|c| r.sort_key().is_after(c)))
        .take(usize::try_from(limit + 1).expect("limit"))
        .collect();
    Page::from_overfetch(fetched, limit)
}

fn collect_all(rows: &[Row], limit: i64) -> Vec<Row> {
    let mut out = Vec::new();
    let mut cursor: Option<Cursor> = None;
    loop {
        // Round-trip through the wire form like a real client would.
        let decoded = cursor.map(|c| Cursor::decode(&c.encode()).expect("decode"));
        let page = fetch_page(rows, decoded.as_ref(), limit);
        out.extend(page.items.iter().cloned());
        if !page.has_more {
            assert!(page.next_cursor.is_none());
            break;
        }
        cursor = page.next_cursor;
    }
    out
}

// ---------------------------------------------------------------------------
// Cursor wire form
// ---------------------------------------------------------------------------

#[test]
fn cursor_round_trips_with_timestamp() {
    let cursor = Cursor::new(Some(ts(4, 9) + Duration::microseconds(123_456)), 42);
    let decoded = Cursor::decode(&cursor.encode()).expect("decode");
    assert_eq!(decoded, cursor);
}

#[test]
fn cursor_round_trips_with_null_primary() {
    let cursor = Cursor::new(None, 7);
    let encoded = cursor.encode();
    assert!(encoded.contains("\"primary_key\":null"), "got {encoded}");
    assert_eq!(Cursor::decode(&encoded).expect("decode"), cursor);
}

#[test]
fn cursor_decode_accepts_hand_written_token() {
    let decoded = Cursor::decode(r#"{"primary_key":"2025-03-04T09:00:00Z","id":3}"#)
        .expect("decode");
    assert_eq!(decoded, Cursor::new(Some(ts(4, 9)), 3));
}

#[test]
fn cursor_decode_rejects_wrong_shapes() {
    for raw in [
        "",
        "not json",
        "42",
        "[1,2]",
        r#"{"id":3}"#,
        r#"{"primary_key":null}"#,
        r#"{"primary_key":"yesterday","id":3}"#,
        r#"{"primary_key":null,"id":"3"}"#,
        r#"{"primary_key":null,"id":3,"extra":true}"#,
    ] {
        let result = Cursor::decode(raw);
        assert!(
            matches!(result, Err(ValidationError::InvalidCursor(_))),
            "expected InvalidCursor for {raw:?}, got {result:?}"
        );
    }
}

#[test]
fn cursor_decode_rejects_non_positive_id() {
    assert!(matches!(
        Cursor::decode(r#"{"primary_key":null,"id":0}"#),
        Err(ValidationError::InvalidCursor(_))
    ));
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn identical_timestamps_break_ties_by_descending_id() {
    let t = ts(1, 12);
    let mut rows = vec![row(7, Some(t)), row(10, Some(t))];
    rows.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![10, 7]);
}

#[test]
fn null_primary_rows_sort_after_all_timestamped_rows() {
    let mut rows = vec![
        row(100, None),
        row(1, Some(ts(1, 0))),
        row(50, None),
        row(2, Some(ts(2, 0))),
    ];
    rows.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    assert_eq!(
        rows.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![2, 1, 100, 50]
    );
}

#[test]
fn sort_keys_of_distinct_rows_never_tie() {
    let t = ts(3, 3);
    let rows = [row(1, Some(t)), row(2, Some(t)), row(3, None), row(4, None)];
    for a in &rows {
        for b in &rows {
            if a.id != b.id {
                assert_ne!(a.sort_key(), b.sort_key());
            }
        }
    }
}

#[test]
fn boundary_with_timestamp_cursor_admits_null_tail() {
    let cursor = Cursor::new(Some(ts(5, 0)), 9);
    assert!(row(1, None).sort_key().is_after(&cursor));
    assert!(row(1, Some(ts(4, 0))).sort_key().is_after(&cursor));
    assert!(row(8, Some(ts(5, 0))).sort_key().is_after(&cursor));
    assert!(!row(9, Some(ts(5, 0))).sort_key().is_after(&cursor));
    assert!(!row(10, Some(ts(5, 0))).sort_key().is_after(&cursor));
    assert!(!row(1, Some(ts(6, 0))).sort_key().is_after(&cursor));
}

#[test]
fn boundary_with_null_cursor_only_admits_lower_null_ids() {
    let cursor = Cursor::new(None, 9);
    assert!(row(8, None).sort_key().is_after(&cursor));
    assert!(!row(10, None).sort_key().is_after(&cursor));
    assert!(!row(1, Some(ts(1, 0))).sort_key().is_after(&cursor));
}

// ---------------------------------------------------------------------------
// Over-fetch and page walks
// ---------------------------------------------------------------------------

#[test]
fn from_overfetch_drops_extra_row_and_sets_cursor() {
    let rows = vec![
        row(5, Some(ts(5, 0))),
        row(4, Some(ts(4, 0))),
        row(3, Some(ts(3, 0))),
    ];
    let page = Page::from_overfetch(rows, 2);
    assert!(page.has_more);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_cursor, Some(Cursor::new(Some(ts(4, 0)), 4)));
}

#[test]
fn from_overfetch_without_extra_row_has_no_cursor() {
    let rows = vec![row(5, Some(ts(5, 0))), row(4, Some(ts(4, 0)))];
    let page = Page::from_overfetch(rows, 2);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
    assert_eq!(page.items.len(), 2);
}

#[test]
fn five_rows_limit_two_walks_three_pages() {
    let rows: Vec<Row> = (1..=5).map(|d| row(i64::from(d), Some(ts(d, 0)))).collect();

    let first = fetch_page(&rows, None, 2);
    assert_eq!(first.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 4]);
    assert!(first.has_more);
    assert_eq!(first.next_cursor, Some(Cursor::new(Some(ts(4, 0)), 4)));

    let second = fetch_page(&rows, first.next_cursor.as_ref(), 2);
    assert_eq!(second.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 2]);
    assert!(second.has_more);

    let third = fetch_page(&rows, second.next_cursor.as_ref(), 2);
    assert_eq!(third.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    assert!(!third.has_more);
    assert!(third.next_cursor.is_none());
}

#[test]
fn chained_pages_partition_the_feed_exactly() {
    let t = ts(10, 8);
    let rows = vec![
        row(1, Some(ts(1, 0))),
        row(2, None),
        row(3, Some(t)),
        row(4, Some(t)),
        row(5, Some(t)),
        row(6, None),
        row(7, Some(ts(12, 0))),
        row(8, Some(ts(1, 0))),
        row(9, None),
        row(10, Some(t)),
        row(11, Some(ts(2, 0))),
    ];
    let mut expected = rows.clone();
    expected.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));

    for limit in 1..=12 {
        let walked = collect_all(&rows, limit);
        assert_eq!(walked, expected, "limit {limit}");
    }
}

#[test]
fn has_more_is_exact_when_rows_equal_limit() {
    let rows: Vec<Row> = (1..=4).map(|d| row(i64::from(d), Some(ts(d, 0)))).collect();
    let page = fetch_page(&rows, None, 4);
    assert!(!page.has_more);
    let page = fetch_page(&rows, None, 3);
    assert!(page.has_more);
}

#[test]
fn page_map_keeps_boundary() {
    let page = Page::from_overfetch(vec![row(2, None), row(1, None)], 1);
    let mapped = page.map(|r| r.id * 10);
    assert_eq!(mapped.items, vec![20]);
    assert!(mapped.has_more);
    assert_eq!(mapped.next_cursor, Some(Cursor::new(None, 2)));
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[test]
fn resolve_limit_applies_default_cap_and_floor() {
    assert_eq!(resolve_limit(None, 12), Ok(12));
    assert_eq!(resolve_limit(Some(5), 12), Ok(5));
    assert_eq!(resolve_limit(Some(500), 12), Ok(MAX_PAGE_LIMIT));
    assert_eq!(resolve_limit(Some(0), 12), Err(ValidationError::InvalidLimit(0)));
    assert_eq!(resolve_limit(Some(-3), 12), Err(ValidationError::InvalidLimit(-3)));
}

#[test]
fn date_sort_key_uses_midnight_utc() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 4).expect("date");
    let key = SortKey::from_date(date, 1);
    assert_eq!(key.primary, Some(ts(4, 0)));
}
