#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{MockPendingUpdate, Script, ScriptedStore};
use stagehand_core::logging_facility::test_capture::init_test_capture;
use stagehand_core::{log_op_end, log_op_error, log_op_start};
use stagehand_core::{ErrorKind, PendingUpdate, RetryPolicy, StagedError, Transaction};
use stagehand_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use stagehand_core_types::{RequestContext, RequestId, TraceId};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let start_events = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(start_events, 1);
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = StagedError::commit_failed("stale base");
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have an end_error event");

    assert_eq!(error_event.field("err_kind"), Some("CommitFailed"));
    assert_eq!(error_event.field("err_code"), Some("ERR_COMMIT_FAILED"));
    assert_eq!(error_event.field("err_message"), Some("stale base"));
}

#[test]
fn test_log_op_start_with_extra_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_fields_unique_4";

    log_op_start!(op_name, object_id = "db.events", base_version = 3u64);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("object_id"), Some("db.events"));
    assert_eq!(events[0].field("base_version"), Some("3"));
}

#[test]
fn test_transaction_commit_logs_start_and_end() {
    // Given: a transaction with a known request id
    let capture = init_test_capture();
    let request_id = RequestId::from_string("req-log-success-unique".to_string());
    let store = ScriptedStore::new();
    let mut update = MockPendingUpdate::against(store);
    update.set_name("orders");
    let mut tx = Transaction::with_context(RequestContext::with_request_id(request_id))
        .with_retry_policy(RetryPolicy::no_retry());
    tx.add(update);

    // When
    tx.commit().unwrap();

    // Then: exactly one start and one end carry that request id
    let ours = |event: &str| {
        capture.count_events(|e| {
            e.op.as_deref() == Some("transaction.commit")
                && e.event.as_deref() == Some(event)
                && e.field("request_id") == Some("req-log-success-unique")
        })
    };
    assert_eq!(ours(EVENT_START), 1);
    assert_eq!(ours(EVENT_END), 1);
    assert_eq!(ours(EVENT_END_ERROR), 0);
}

#[test]
fn test_transaction_commit_logs_error_kind() {
    let capture = init_test_capture();
    let request_id = RequestId::from_string("req-log-unknown-unique".to_string());
    let store = ScriptedStore::new();
    store.push(Script::LostAck);
    let mut update = MockPendingUpdate::against(store);
    update.set_name("orders");
    let mut tx = Transaction::with_context(RequestContext::with_request_id(request_id))
        .with_retry_policy(RetryPolicy::no_retry());
    tx.add(update);

    let err = tx.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CommitStateUnknown);

    let error_event = capture
        .events_for_op("transaction.commit")
        .into_iter()
        .find(|e| {
            e.event.as_deref() == Some(EVENT_END_ERROR)
                && e.field("request_id") == Some("req-log-unknown-unique")
        })
        .expect("Should have an end_error event for this request");
    assert_eq!(error_event.field("err_code"), Some("ERR_COMMIT_STATE_UNKNOWN"));
}

#[test]
fn test_transaction_commit_logs_trace_id() {
    // Given: a context that joins an upstream trace
    let capture = init_test_capture();
    let request_id = RequestId::from_string("req-log-trace-unique".to_string());
    let trace_id = TraceId::from_string("trace-upstream-7".to_string());
    let context = RequestContext::with_request_id(request_id).with_trace_id(trace_id);
    let mut update = MockPendingUpdate::against(ScriptedStore::new());
    update.set_name("orders");
    let mut tx = Transaction::with_context(context).with_retry_policy(RetryPolicy::no_retry());
    tx.add(update);

    // When
    tx.commit().unwrap();

    // Then: start and end both carry the trace id
    let events: Vec<_> = capture
        .events_for_op("transaction.commit")
        .into_iter()
        .filter(|e| e.field("request_id") == Some("req-log-trace-unique"))
        .collect();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| e.field("trace_id") == Some("trace-upstream-7")));
}

#[test]
fn test_transaction_without_trace_omits_trace_field() {
    let capture = init_test_capture();
    let request_id = RequestId::from_string("req-log-notrace-unique".to_string());
    let mut tx = Transaction::with_context(RequestContext::with_request_id(request_id))
        .with_retry_policy(RetryPolicy::no_retry());

    tx.commit().unwrap();

    let events: Vec<_> = capture
        .events_for_op("transaction.commit")
        .into_iter()
        .filter(|e| e.field("request_id") == Some("req-log-notrace-unique"))
        .collect();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.field("trace_id").is_none()));
}
