//! Offline tests: pool configuration and row sort keys. No database needed.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use econbrief_core::reports::{ExecutiveSummary, MarketOverview, SentimentCounts};
use econbrief_core::{AppConfig, Cursor, Environment, Keyset, Page, Sentiment};
use econbrief_db::{ArticleRow, DailyReportRow, PoolConfig};
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

fn article_row(id: i64, day: Option<u32>) -> ArticleRow {
    ArticleRow {
        id,
        title: format!("Article {id}"),
        link: format!("https://news.example.com/{id}"),
        description: None,
        published_at: day.map(|d| {
            Utc.with_ymd_and_hms(2025, 3, d, 8, 0, 0)
                .single()
                .expect("timestamp")
        }),
        source: None,
        region: None,
        category: Some("finance".to_string()),
        headline_summary: None,
        so_what: None,
        impact_analysis: None,
        related_context: None,
        sentiment: None,
        importance_score: None,
        keywords: vec![],
        created_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout, Duration::from_secs(9));
}

#[test]
fn article_row_cursor_uses_published_at_and_id() {
    let rows = vec![article_row(9, Some(5)), article_row(8, Some(4)), article_row(3, None)];
    let page = Page::from_overfetch(rows, 2);
    assert!(page.has_more);
    let cursor = page.next_cursor.expect("cursor");
    assert_eq!(cursor.id, 8);
    assert_eq!(cursor.primary_key, page.items[1].published_at);
}

#[test]
fn undated_article_row_yields_null_primary_cursor() {
    let row = article_row(3, None);
    assert_eq!(Cursor::from(row.sort_key()), Cursor::new(None, 3));
}

#[test]
fn daily_report_row_sort_key_is_report_date_midnight() {
    let row = DailyReportRow {
        id: 4,
        report_date: NaiveDate::from_ymd_opt(2025, 3, 4).expect("date"),
        executive_summary: Json(ExecutiveSummary {
            headline: "Calm".to_string(),
            overview: "Nothing moved.".to_string(),
            sentiment: Sentiment::Neutral,
            highlights: vec![],
        }),
        market_overview: Json(MarketOverview::default()),
        key_insights: Json(vec![]),
        sentiment_counts: Json(SentimentCounts::default()),
        top_keywords: vec![],
        article_ids: vec![],
        article_count: 0,
        created_at: Utc::now(),
    };

    let cursor = Cursor::from(row.sort_key());
    assert_eq!(
        cursor.primary_key.map(|ts| ts.date_naive()),
        Some(row.report_date)
    );
    assert_eq!(cursor.primary_key.map(|ts| ts.time()), Some(NaiveTime::MIN));
    assert_eq!(cursor.id, 4);
}
