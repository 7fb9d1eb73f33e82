mod common;

use serde_json::json;
use shiftbeat_realtime::realtime::rooms::RoomId;
use shiftbeat_realtime::realtime::RealtimeService;
use shiftbeat_realtime::ws::protocol;

use common::{connect, drain_events, find_event, identity};

#[tokio::test]
async fn employee_cannot_join_foreign_organization() {
    let service = RealtimeService::new();
    let mut conn = connect(&service, identity("u-1", "Ada", "employee", Some("org-5")));
    drain_events(&mut conn.rx);

    service.handle_join_organization(conn.id, &conn.tx, "org-7");

    let error = find_event(&mut conn.rx, "error").expect("error event");
    assert!(error["message"].as_str().unwrap().contains("authorized"));
    // No state mutation: not in the foreign room, still in its own
    assert!(!service
        .rooms()
        .members_of(&RoomId::organization("org-7"))
        .contains(&conn.id));
    assert!(service
        .rooms()
        .members_of(&RoomId::organization("org-5"))
        .contains(&conn.id));
}

#[tokio::test]
async fn admin_may_join_any_organization() {
    let service = RealtimeService::new();
    let mut conn = connect(&service, identity("u-1", "Ada", "admin", Some("org-5")));
    drain_events(&mut conn.rx);

    service.handle_join_organization(conn.id, &conn.tx, "org-7");

    let joined = find_event(&mut conn.rx, "joined_organization").expect("joined event");
    assert_eq!(joined["organizationId"], "org-7");
    assert!(service
        .rooms()
        .members_of(&RoomId::organization("org-7"))
        .contains(&conn.id));
    // At most one organization room per connection
    assert!(!service
        .rooms()
        .members_of(&RoomId::organization("org-5"))
        .contains(&conn.id));
}

#[tokio::test]
async fn tenant_broadcast_is_isolated_per_organization() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    let mut b = connect(&service, identity("u-2", "Ben", "employee", Some("org-2")));

    service.handle_join_organization(a.id, &a.tx, "org-1");
    service.handle_join_organization(b.id, &b.tx, "org-2");
    drain_events(&mut a.rx);
    drain_events(&mut b.rx);

    service.broadcast_to_tenant("org-1", "x", json!({}));

    assert!(find_event(&mut a.rx, "x").is_some());
    assert!(find_event(&mut b.rx, "x").is_none());
}

#[tokio::test]
async fn dashboard_broadcast_targets_one_board_only() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    service.handle_dashboard_subscribe(a.id, &a.tx, "sales");
    let subscribed = find_event(&mut a.rx, "dashboard_subscribed").expect("subscribed event");
    assert_eq!(subscribed["dashboardType"], "sales");

    service.broadcast_to_dashboard("org-1", "sales", "y", json!({}));
    assert!(find_event(&mut a.rx, "y").is_some());

    service.broadcast_to_dashboard("org-1", "ops", "y", json!({}));
    assert!(find_event(&mut a.rx, "y").is_none());
}

#[tokio::test]
async fn dashboard_type_defaults_to_overview_on_the_wire() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    protocol::handle_text_message(r#"{"event":"dashboard_subscribe"}"#, &a.tx, &service, a.id);

    let subscribed = find_event(&mut a.rx, "dashboard_subscribed").expect("subscribed event");
    assert_eq!(subscribed["dashboardType"], "overview");
    assert!(service
        .rooms()
        .members_of(&RoomId::dashboard("org-1", "overview"))
        .contains(&a.id));
}

#[tokio::test]
async fn dashboard_verbs_without_organization_report_the_failing_action() {
    let service = RealtimeService::new();
    let mut platform = connect(&service, identity("u-0", "Root", "admin", None));
    drain_events(&mut platform.rx);

    service.handle_dashboard_subscribe(platform.id, &platform.tx, "sales");
    let error = find_event(&mut platform.rx, "error").expect("subscribe error");
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("dashboard subscription"));

    service.handle_dashboard_unsubscribe(platform.id, &platform.tx, "sales");
    let error = find_event(&mut platform.rx, "error").expect("unsubscribe error");
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("dashboard unsubscription"));
}

#[tokio::test]
async fn attendance_update_is_stamped_and_fanned_to_tenant_room() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    let mut b = connect(&service, identity("u-2", "Ben", "manager", Some("org-1")));
    drain_events(&mut a.rx);
    drain_events(&mut b.rx);

    service.handle_attendance_update(a.id, &a.tx, json!({ "status": "signed_in" }));

    for rx in [&mut a.rx, &mut b.rx] {
        let update = find_event(rx, "attendance_updated").expect("update delivered");
        assert_eq!(update["status"], "signed_in");
        assert_eq!(update["updatedBy"]["id"], "u-1");
        assert_eq!(update["updatedBy"]["name"], "Ada");
        assert!(update["timestamp"].is_i64());
    }
}

#[tokio::test]
async fn ping_answers_pong_and_refreshes_activity() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    let stale = chrono::Utc::now() - chrono::Duration::minutes(20);
    service.registry().touch_at(a.id, stale);

    protocol::handle_text_message(r#"{"event":"ping"}"#, &a.tx, &service, a.id);

    let pong = find_event(&mut a.rx, "pong").expect("pong event");
    assert!(pong["timestamp"].is_i64());
    assert!(service.registry().get(a.id).unwrap().last_activity > stale);
}

#[tokio::test]
async fn send_to_user_reports_match_as_boolean() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    assert!(service.send_to_user("u-1", "leave_approved", json!({ "leaveId": 42 })));
    let delivered = find_event(&mut a.rx, "leave_approved").expect("direct delivery");
    assert_eq!(delivered["leaveId"], 42);

    assert!(!service.send_to_user("u-404", "leave_approved", json!({})));
}

#[tokio::test]
async fn malformed_and_unknown_frames_yield_error_events_only() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    protocol::handle_text_message("not json", &a.tx, &service, a.id);
    assert!(find_event(&mut a.rx, "error").is_some());

    protocol::handle_text_message(r#"{"event":"warp_drive"}"#, &a.tx, &service, a.id);
    let error = find_event(&mut a.rx, "error").expect("error event");
    assert!(error["message"].as_str().unwrap().contains("warp_drive"));

    protocol::handle_text_message(r#"{"event":"join_organization","data":{}}"#, &a.tx, &service, a.id);
    let error = find_event(&mut a.rx, "error").expect("error event");
    assert!(error["message"].as_str().unwrap().contains("organizationId"));

    // Connection remains healthy
    assert!(service.registry().get(a.id).is_some());
}

#[tokio::test]
async fn leave_organization_confirms_and_prunes_membership() {
    let service = RealtimeService::new();
    let mut a = connect(&service, identity("u-1", "Ada", "employee", Some("org-1")));
    drain_events(&mut a.rx);

    protocol::handle_text_message(
        r#"{"event":"leave_organization","data":{"organizationId":"org-1"}}"#,
        &a.tx,
        &service,
        a.id,
    );

    let left = find_event(&mut a.rx, "left_organization").expect("left event");
    assert_eq!(left["organizationId"], "org-1");
    assert!(!service.rooms().contains(&RoomId::organization("org-1")));
}
