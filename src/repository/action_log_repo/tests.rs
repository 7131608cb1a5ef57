use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::NaiveDate;
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    conn
}

fn make_test_log(kind: &str, id: i64, actor: &str, hour: u32) -> ActionLog {
    let mut log = ActionLog::new(ActionType::PlacePurchaseOrder, actor, kind, Some(id));
    log.action_ts = NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap();
    log
}

#[test]
fn test_insert_and_find_by_id() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(&conn);

    let log = make_test_log("purchase_order", 1, "alice", 9)
        .with_payload(&serde_json::json!({"reference": "PO-0001"}));
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.actor, "alice");
    assert_eq!(found.entity_kind, "purchase_order");
    assert_eq!(found.entity_id, Some(1));
    assert_eq!(found.action_ts, log.action_ts);
    assert_eq!(found.payload_json.unwrap()["reference"], "PO-0001");

    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_find_by_entity_in_time_order() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(&conn);

    repo.insert(&make_test_log("build", 7, "bob", 11)).unwrap();
    repo.insert(&make_test_log("build", 7, "alice", 8)).unwrap();
    repo.insert(&make_test_log("build", 8, "alice", 9)).unwrap();

    let logs = repo.find_by_entity("build", 7).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].actor, "alice");
    assert_eq!(logs[1].actor, "bob");
}

#[test]
fn test_time_range_recent_and_count() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(&conn);

    let logs: Vec<ActionLog> = (8..12)
        .map(|h| make_test_log("sales_order", 1, if h % 2 == 0 { "alice" } else { "bob" }, h))
        .collect();
    assert_eq!(repo.batch_insert(&logs).unwrap(), 4);

    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let ranged = repo
        .find_by_time_range(
            day.and_hms_opt(9, 0, 0).unwrap(),
            day.and_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap();
    assert_eq!(ranged.len(), 2);

    let recent = repo.find_recent(1).unwrap();
    assert_eq!(recent[0].action_ts, day.and_hms_opt(11, 0, 0).unwrap());

    assert_eq!(repo.count_by_actor("alice").unwrap(), 2);
}
