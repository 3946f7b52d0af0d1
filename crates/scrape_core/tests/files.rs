use chrono::NaiveDateTime;
use pretty_assertions::assert_eq;
use scrape_core::{update, AppState, Effect, Msg, ResultFile};

fn file(name: &str, size: u64) -> ResultFile {
    let at: NaiveDateTime = "2024-05-01T10:05:00".parse().unwrap();
    ResultFile {
        filename: name.to_string(),
        size,
        created_at: at,
        modified_at: at,
    }
}

fn with_files(names: &[&str]) -> AppState {
    let files = names.iter().map(|name| file(name, 2048)).collect();
    let (state, _) = update(AppState::new(), Msg::FilesRefreshed(files));
    state
}

fn msg_delete_clicked(name: &str) -> Msg {
    Msg::DeleteClicked {
        filename: name.to_string(),
    }
}

fn msg_delete_confirmed(name: &str) -> Msg {
    Msg::DeleteConfirmed {
        filename: name.to_string(),
    }
}

#[test]
fn refresh_replaces_snapshot_in_server_order() {
    let state = with_files(&["b.csv", "a.csv"]);
    let (mut state, _) = update(state, Msg::FilesRefreshed(vec![file("c.csv", 10)]));

    assert!(state.consume_dirty());
    let view = state.view();
    assert!(view.files_loaded);
    let names: Vec<_> = view.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["c.csv"]);
    assert_eq!(view.files[0].size, "10 B");
}

#[test]
fn delete_requires_confirmation_then_marks_busy() {
    let state = with_files(&["out_abc123.csv"]);

    let (state, effects) = update(state, msg_delete_clicked("out_abc123.csv"));
    assert_eq!(
        effects,
        vec![Effect::ConfirmDelete {
            filename: "out_abc123.csv".to_string()
        }]
    );
    assert!(!state.files().is_busy("out_abc123.csv"));

    let (state, effects) = update(state, msg_delete_confirmed("out_abc123.csv"));
    assert_eq!(
        effects,
        vec![Effect::DeleteFile {
            filename: "out_abc123.csv".to_string()
        }]
    );
    assert!(state.view().files[0].busy);
}

#[test]
fn cancelled_delete_has_no_effect() {
    let state = with_files(&["a.csv"]);
    let (state, _) = update(state, msg_delete_clicked("a.csv"));
    let (state, effects) = update(
        state,
        Msg::DeleteCancelled {
            filename: "a.csv".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.files().is_busy("a.csv"));
}

#[test]
fn one_delete_in_flight_per_filename() {
    let state = with_files(&["a.csv", "b.csv"]);
    let (state, first) = update(state, msg_delete_confirmed("a.csv"));
    let (state, second) = update(state, msg_delete_confirmed("a.csv"));
    let (state, other) = update(state, msg_delete_confirmed("b.csv"));

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(other.len(), 1);

    let (_, effects) = update(state, msg_delete_clicked("a.csv"));
    assert!(effects.is_empty());
}

#[test]
fn successful_delete_forces_refetch_instead_of_local_removal() {
    let state = with_files(&["out_abc123.csv"]);
    let (state, _) = update(state, msg_delete_confirmed("out_abc123.csv"));

    let (state, effects) = update(
        state,
        Msg::FileDeleted {
            filename: "out_abc123.csv".to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::RefreshFiles]);
    assert!(state.files().contains("out_abc123.csv"));
    assert!(!state.files().is_busy("out_abc123.csv"));

    let (state, _) = update(state, Msg::FilesRefreshed(Vec::new()));
    assert!(state.view().files.is_empty());
}

#[test]
fn failed_delete_clears_busy_and_keeps_snapshot() {
    let state = with_files(&["a.csv"]);
    let (state, _) = update(state, msg_delete_confirmed("a.csv"));
    let before = state.files().files().to_vec();

    let (state, effects) = update(
        state,
        Msg::FileDeleteFailed {
            filename: "a.csv".to_string(),
            message: "http status 500".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.files().is_busy("a.csv"));
    assert_eq!(state.files().files(), before.as_slice());
}

#[test]
fn deleting_unknown_filename_is_rejected() {
    let state = with_files(&["a.csv"]);

    let (state, effects) = update(state, msg_delete_clicked("missing.csv"));
    assert!(effects.is_empty());
    let (state, effects) = update(state, msg_delete_confirmed("missing.csv"));
    assert!(effects.is_empty());
    assert!(!state.files().is_busy("missing.csv"));

    let (_, effects) = update(AppState::new(), msg_delete_confirmed("a.csv"));
    assert!(effects.is_empty());
}

#[test]
fn download_and_refresh_requests_do_not_touch_snapshot() {
    let state = with_files(&["a.csv"]);
    let before = state.files().clone();

    let (state, effects) = update(
        state,
        Msg::DownloadClicked {
            filename: "a.csv".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::DownloadFile {
            filename: "a.csv".to_string()
        }]
    );
    let (state, effects) = update(
        state,
        Msg::DownloadFailed {
            filename: "a.csv".to_string(),
            message: "network error".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.files(), &before);

    let (state, effects) = update(state, Msg::RefreshFilesClicked);
    assert_eq!(effects, vec![Effect::RefreshFiles]);
    assert!(state.files().is_refreshing());

    let (state, _) = update(
        state,
        Msg::FilesRefreshFailed {
            message: "timeout".to_string(),
        },
    );
    assert!(!state.files().is_refreshing());
    assert_eq!(state.files().files(), before.files());
}

#[test]
fn result_file_wire_format() {
    let files: Vec<ResultFile> = serde_json::from_str(
        r#"[{"filename":"out.csv","size":1536,"created_at":"2024-05-01T10:05:00.5","modified_at":"2024-05-01T10:06:00"}]"#,
    )
    .unwrap();
    assert_eq!(files[0].filename, "out.csv");
    assert_eq!(files[0].size, 1536);
}
