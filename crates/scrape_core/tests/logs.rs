use pretty_assertions::assert_eq;
use scrape_core::{update, AppState, Effect, JobId, LogBuffer, LogLevel, LogRecord, Msg};

fn watching(id: &str) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::JobCreated {
            job_id: JobId::new(id),
        },
    );
    state
}

fn deliver(state: AppState, id: &str, record: LogRecord) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::LogReceived {
            job_id: JobId::new(id),
            record,
        },
    )
}

fn record(n: usize, level: LogLevel) -> LogRecord {
    LogRecord::new(format!("12:00:{n:02}"), format!("line {n}"), level)
}

#[test]
fn clear_then_n_deliveries_yields_n_records_in_order() {
    let mut buffer = LogBuffer::new();
    buffer.push(record(0, LogLevel::Info));
    buffer.clear();
    assert!(buffer.is_empty());

    for n in 1..=5 {
        buffer.push(record(n, LogLevel::Info));
    }

    assert_eq!(buffer.len(), 5);
    let messages: Vec<_> = buffer.records().iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["line 1", "line 2", "line 3", "line 4", "line 5"]);
}

#[test]
fn export_formats_one_line_per_record() {
    let mut buffer = LogBuffer::new();
    buffer.push(LogRecord::new("10:00:01", "Starting", LogLevel::Info));
    buffer.push(LogRecord::new("10:00:02", "Page 1 of 3", LogLevel::Warning));
    buffer.push(LogRecord::new("10:00:03", "Done", LogLevel::Success));

    assert_eq!(
        buffer.export(),
        "[10:00:01] Starting\n[10:00:02] Page 1 of 3\n[10:00:03] Done"
    );
    assert_eq!(LogBuffer::new().export(), "");
}

#[test]
fn levels_keep_order_and_identity() {
    let levels = [
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Success,
    ];
    let mut state = watching("abc123");
    for (n, level) in levels.iter().enumerate() {
        let (next, effects) = deliver(state, "abc123", record(n, *level));
        assert_eq!(effects, vec![Effect::ScrollToLatest]);
        state = next;
    }

    let view = state.view();
    let seen: Vec<_> = view.logs.iter().map(|r| r.level).collect();
    assert_eq!(seen, levels.to_vec());
}

#[test]
fn view_reads_records_from_the_buffer_without_copying() {
    let mut state = watching("abc123");
    for n in 0..3 {
        let (next, _) = deliver(state, "abc123", record(n, LogLevel::Info));
        state = next;
    }

    let view = state.view();
    assert_eq!(view.logs.len(), 3);
    assert!(std::ptr::eq(view.logs, state.logs().records()));
}

#[test]
fn auto_scroll_disabled_keeps_buffer_but_skips_scroll() {
    let state = watching("abc123");
    let (state, _) = update(state, Msg::AutoScrollToggled(false));

    let (state, effects) = deliver(state, "abc123", record(1, LogLevel::Info));
    assert!(effects.is_empty());
    assert_eq!(state.logs().len(), 1);

    let (_, effects) = update(state, Msg::AutoScrollToggled(true));
    assert_eq!(effects, vec![Effect::ScrollToLatest]);
}

#[test]
fn records_for_other_jobs_are_dropped() {
    let state = watching("abc123");
    let (state, effects) = deliver(state, "stale", record(1, LogLevel::Info));

    assert!(effects.is_empty());
    assert!(state.logs().is_empty());
}

#[test]
fn clear_and_export_messages() {
    let state = watching("abc123");
    let (state, _) = deliver(state, "abc123", record(1, LogLevel::Info));
    let (state, _) = deliver(state, "abc123", record(2, LogLevel::Error));

    let (state, effects) = update(state, Msg::ExportLogsClicked);
    assert_eq!(
        effects,
        vec![Effect::SaveLogExport {
            filename: "scraper-logs-abc123.txt".to_string(),
            contents: "[12:00:01] line 1\n[12:00:02] line 2".to_string(),
        }]
    );

    let (mut state, effects) = update(state, Msg::ClearLogsClicked);
    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    assert!(state.logs().is_empty());

    let (_, effects) = update(state, Msg::ExportLogsClicked);
    assert!(effects.is_empty());
}

#[test]
fn log_record_wire_format() {
    let record: LogRecord = serde_json::from_str(
        r#"{"timestamp":"14:32:07","message":"Association 3/10","level":"success"}"#,
    )
    .unwrap();
    assert_eq!(
        record,
        LogRecord::new("14:32:07", "Association 3/10", LogLevel::Success)
    );

    let unknown = serde_json::from_str::<LogRecord>(
        r#"{"timestamp":"14:32:07","message":"x","level":"debug"}"#,
    );
    assert!(unknown.is_err());
}
