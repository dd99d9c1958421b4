use std::path::Path;

use super::*;
use crate::import::{parse_json, ArticleBatch};

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["econbrief-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["econbrief-cli", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["econbrief-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_import_articles_file() {
    let cli = Cli::try_parse_from([
        "econbrief-cli",
        "import",
        "articles",
        "--file",
        "out/articles.json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Import {
            command: ImportCommands::Articles { ref file }
        }) if file == Path::new("out/articles.json")
    ));
}

#[test]
fn parses_import_daily_report_kebab_case() {
    let cli = Cli::try_parse_from([
        "econbrief-cli",
        "import",
        "daily-report",
        "--file",
        "report.json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Import {
            command: ImportCommands::DailyReport { .. }
        })
    ));
}

#[test]
fn personalized_report_requires_user() {
    let result = Cli::try_parse_from([
        "econbrief-cli",
        "import",
        "personalized-report",
        "--file",
        "report.json",
    ]);
    assert!(result.is_err());

    let cli = Cli::try_parse_from([
        "econbrief-cli",
        "import",
        "personalized-report",
        "--user",
        "user_alice",
        "--file",
        "report.json",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Import {
            command: ImportCommands::PersonalizedReport { ref user, .. }
        }) if user == "user_alice"
    ));
}

#[test]
fn import_requires_file() {
    assert!(Cli::try_parse_from(["econbrief-cli", "import", "articles"]).is_err());
}

#[test]
fn article_batch_accepts_array_or_single_object() {
    let many: ArticleBatch = parse_json(
        r#"[
            {"title": "Rates hold", "link": "https://news.example.com/1"},
            {"title": "Yields climb", "link": "https://news.example.com/2", "category": "finance"}
        ]"#,
        "articles",
    )
    .expect("array");
    let records = many.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].category, Some(econbrief_core::Category::Finance));

    let one: ArticleBatch = parse_json(
        r#"{"title": "Solo", "link": "https://news.example.com/3"}"#,
        "articles",
    )
    .expect("object");
    assert_eq!(one.into_records()[0].title, "Solo");
}

#[test]
fn malformed_json_names_the_payload() {
    let err = parse_json::<ArticleBatch>("{not json", "articles").expect_err("should fail");
    assert!(err.to_string().contains("articles"));
}
