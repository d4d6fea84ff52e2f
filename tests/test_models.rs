//! Tests for wire models: field aliases, lenient parsing and derived values.

use chrono::{TimeZone, Utc};
use serde_json::json;
use sp_ranking_sdk::controller::RunSnapshot;
use sp_ranking_sdk::models::{
    parse_timestamp, Filters, FormulaMode, PageSpec, RankingRow, ResultsPage, RunOrigin,
    RunState, RunStatus, SortDirection, SortKey, SortSpec, StartRunResponse, StatusResponse,
    SymbolCatalog,
};
use sp_ranking_sdk::RankingError;

// ---------------------------------------------------------------------------
// RankingRow
// ---------------------------------------------------------------------------

#[test]
fn row_accepts_snake_case_columns() {
    let row: RankingRow = serde_json::from_value(json!({
        "symbol": "AAPL",
        "name": "Apple",
        "sector": "Technology",
        "market_cap": 3.0e12,
        "score_buffett": 81.5,
        "score_cramer": 77.0,
        "combined_rank": 3,
        "completeness": 96.0,
        "last_updated": "2024-05-01 12:30:00",
        "change_1d": 1.2
    }))
    .unwrap();

    assert_eq!(row.market_cap, Some(3.0e12));
    assert_eq!(row.score_buffett, Some(81.5));
    assert_eq!(row.combined_rank, Some(3.0));
    assert_eq!(row.change_1d, 1.2);
    assert_eq!(
        row.last_updated,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
    );
}

#[test]
fn row_accepts_camel_case_and_serializes_camel_case() {
    let row: RankingRow = serde_json::from_value(json!({
        "symbol": "MSFT",
        "marketCap": 1.0,
        "change1W": 2.0,
        "lastUpdated": 1714566600
    }))
    .unwrap();
    assert_eq!(row.market_cap, Some(1.0));
    assert_eq!(row.change_1w, 2.0);
    assert_eq!(
        row.last_updated,
        Some(Utc.timestamp_opt(1714566600, 0).unwrap())
    );

    let out = serde_json::to_value(&row).unwrap();
    assert!(out.get("marketCap").is_some());
    assert!(out.get("change1W").is_some());
    assert!(out.get("market_cap").is_none());
}

#[test]
fn row_tolerates_bad_timestamps_and_missing_fields() {
    let row: RankingRow =
        serde_json::from_value(json!({"symbol": "XOM", "last_updated": "yesterday"})).unwrap();
    assert_eq!(row.last_updated, None);
    assert_eq!(row.name, "");
    assert_eq!(row.price, 0.0);
}

#[test]
fn parse_timestamp_formats() {
    let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    assert_eq!(parse_timestamp("2024-05-01T12:30:00Z"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01T14:30:00+02:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01T12:30:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01 12:30:00.000"), Some(expected));
    assert_eq!(parse_timestamp(""), None);
}

#[test]
fn display_score_prefers_placeholder() {
    let mut row = RankingRow::new("A");
    assert_eq!(row.display_score(), None);
    row.score_cramer = Some(2.0);
    assert_eq!(row.display_score(), Some(2.0));
    row.score_buffett = Some(1.0);
    assert_eq!(row.display_score(), Some(1.0));
    row.score = Some(5.0);
    assert_eq!(row.display_score(), Some(5.0));
}

// ---------------------------------------------------------------------------
// Results page and catalog
// ---------------------------------------------------------------------------

#[test]
fn results_page_total_never_below_row_count() {
    let page: ResultsPage =
        serde_json::from_value(json!({"items": [{"symbol": "A"}, {"symbol": "B"}], "total": 1}))
            .unwrap();
    let (rows, total) = page.into_parts();
    assert_eq!(rows.len(), 2);
    assert_eq!(total, 2);

    let page: ResultsPage = serde_json::from_value(json!({})).unwrap();
    assert_eq!(page.into_parts().1, 0);

    let page: ResultsPage = serde_json::from_value(json!({"items": null, "total": 40})).unwrap();
    let (rows, total) = page.into_parts();
    assert!(rows.is_empty());
    assert_eq!(total, 40);
}

#[test]
fn catalog_derives_unique_sectors() {
    let catalog: SymbolCatalog = serde_json::from_value(json!({
        "symbols": [
            {"symbol": "AAPL", "sector": "Technology"},
            {"symbol": "XOM", "sector": "Energy"},
            {"symbol": "MSFT", "sector": "Technology"},
            {"symbol": "ZZZ"}
        ]
    }))
    .unwrap();
    assert_eq!(catalog.sector_list(), vec!["Technology", "Energy"]);
}

// ---------------------------------------------------------------------------
// Run wire types
// ---------------------------------------------------------------------------

#[test]
fn start_response_accepts_numeric_and_legacy_ids() {
    let r: StartRunResponse = serde_json::from_value(json!({"run_id": 42})).unwrap();
    assert_eq!(r.run_id(), Some("42"));

    let r: StartRunResponse = serde_json::from_value(json!({"id": "abc"})).unwrap();
    assert_eq!(r.run_id(), Some("abc"));

    let r: StartRunResponse = serde_json::from_value(json!({"run_id": "", "status": "queued"})).unwrap();
    assert_eq!(r.run_id(), None);

    let r: StartRunResponse = serde_json::from_value(json!({})).unwrap();
    assert_eq!(r.run_id(), None);
}

#[test]
fn status_response_maps_to_server_state() {
    let r: StatusResponse = serde_json::from_value(json!({
        "run_id": 5, "status": "RUNNING", "progress": 40, "message": "scoring"
    }))
    .unwrap();
    let state = r.into_run_state("fallback").unwrap();
    assert_eq!(state.run_id.as_deref(), Some("5"));
    assert_eq!(state.status, RunStatus::Running);
    assert_eq!(state.progress, Some(40.0));
    assert_eq!(state.message.as_deref(), Some("scoring"));
    assert_eq!(state.origin, RunOrigin::Server);
}

#[test]
fn status_response_uses_state_field_and_fallback_id() {
    let r: StatusResponse = serde_json::from_value(json!({"state": "completed"})).unwrap();
    let state = r.into_run_state("9").unwrap();
    assert_eq!(state.run_id.as_deref(), Some("9"));
    assert_eq!(state.status, RunStatus::Completed);
}

#[test]
fn unknown_or_missing_status_is_an_error() {
    let r: StatusResponse = serde_json::from_value(json!({"status": "paused"})).unwrap();
    assert!(matches!(
        r.into_run_state("1"),
        Err(RankingError::UnknownRunStatus(s)) if s == "paused"
    ));
    let r: StatusResponse = serde_json::from_value(json!({})).unwrap();
    assert!(r.into_run_state("1").is_err());
}

#[test]
fn server_idle_status_is_rejected() {
    let r: StatusResponse = serde_json::from_value(json!({"status": "idle"})).unwrap();
    assert!(matches!(
        r.into_run_state("1"),
        Err(RankingError::UnknownRunStatus(s)) if s == "idle"
    ));
    assert_eq!("idle".parse::<RunStatus>().unwrap(), RunStatus::Idle);
}

#[test]
fn run_status_classification() {
    for s in [RunStatus::Completed, RunStatus::Failed, RunStatus::Error] {
        assert!(s.is_terminal());
    }
    for s in [RunStatus::Idle, RunStatus::Queued, RunStatus::Running] {
        assert!(!s.is_terminal());
        assert!(!s.refreshes_results());
    }
    assert!(RunStatus::Completed.refreshes_results());
    assert!(RunStatus::Failed.refreshes_results());
    assert!(!RunStatus::Error.refreshes_results());
}

#[test]
fn run_snapshot_status_text() {
    let mut snap = RunSnapshot::default();
    assert_eq!(snap.status_text(), "Idle");

    snap.in_progress = true;
    snap.state = RunState::predicted_queued();
    assert_eq!(snap.status_text(), "Running 0%...");
    snap.state.progress = None;
    assert_eq!(snap.status_text(), "Running...");

    snap.in_progress = false;
    snap.state = RunState::failed(None, "boom");
    assert_eq!(snap.status_text(), "failed");
    snap.state.run_id = Some("3".to_string());
    assert_eq!(snap.status_text(), "failed • Run #3");
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

#[test]
fn formula_mode_parses_case_insensitively() {
    assert_eq!("Buffett".parse::<FormulaMode>().unwrap(), FormulaMode::Buffett);
    assert_eq!(" both ".parse::<FormulaMode>().unwrap(), FormulaMode::Both);
    assert!("graham".parse::<FormulaMode>().is_err());
    assert_eq!(FormulaMode::default(), FormulaMode::Both);
    assert_eq!(json!(FormulaMode::Cramer), json!("cramer"));
}

#[test]
fn filters_bounds_and_serialization() {
    assert_eq!(Filters::parse_bound("  ").unwrap(), None);
    assert_eq!(Filters::parse_bound("1e9").unwrap(), Some(1e9));
    assert!(Filters::parse_bound("lots").is_err());

    let filters = Filters::default()
        .with_sector("Energy")
        .with_sector("Energy")
        .with_sector(" ")
        .with_completeness(Some(50.0));
    assert_eq!(filters.sectors, vec!["Energy"]);
    assert!(filters.validate().is_ok());
    assert_eq!(
        serde_json::to_value(&filters).unwrap(),
        json!({"sectors": ["Energy"], "completeness": 50.0})
    );
    assert_eq!(serde_json::to_value(Filters::default()).unwrap(), json!({}));
}

#[test]
fn sort_spec_toggling() {
    let spec = SortSpec::default();
    assert_eq!(spec.key, SortKey::CombinedRank);
    let spec = spec.toggled(SortKey::CombinedRank);
    assert_eq!(spec.direction, SortDirection::Desc);
    let spec = spec.toggled(SortKey::LastUpdated);
    assert_eq!(spec, SortSpec::new(SortKey::LastUpdated, SortDirection::Asc));
    assert_eq!(SortKey::ScoreBuffett.to_string(), "score_buffett");
}

#[test]
fn page_spec_helpers() {
    assert!(PageSpec::new(0, 30).is_err());
    let page = PageSpec::new(1, 10).unwrap();
    assert_eq!(page.offset(), 10);
    assert_eq!(page.total_pages(0), 1);
    assert_eq!(page.total_pages(21), 3);
    assert!(page.has_next(21));
    assert!(!page.has_next(20));
    assert!(page.has_prev());
    assert_eq!(page.display_range(15), (11, 15));
    assert_eq!(page.display_range(5), (0, 0));
}
