//! Poller state machine scenarios on a scripted transport and virtual clock

mod fixtures;

use std::sync::Arc;
use std::time::{Duration, Instant};

use fixtures::{optimization_done, optimization_status, upload_status};
use rapid_protocol::JobId;
use rapidcompact_cli::cancel::CancelToken;
use rapidcompact_cli::host::{ScriptedTransport, StatusReply, TransportError};
use rapidcompact_cli::poll::{
    render_finished, Clock, JobHandle, JobPoller, ManualClock, NoProgress, PollError, PollOptions,
    RecordingProgress, StatusRule, TerminalProgress,
};
use serde_json::json;

const STATUS_URL: &str = "https://api.example.test/api/rapidmodel/7";

fn optimization_handle() -> JobHandle {
    JobHandle::new(
        JobId::Number(7),
        STATUS_URL,
        StatusRule::optimization(vec!["sent_to_queue".to_string()]),
    )
}

fn poller(transport: &Arc<ScriptedTransport>, clock: &Arc<ManualClock>) -> JobPoller {
    JobPoller::new(transport.clone(), "tok").with_clock(clock.clone())
}

fn every_two_seconds() -> PollOptions {
    PollOptions::every(Duration::from_secs(2))
}

#[test]
fn test_progress_then_done_with_downloads() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(optimization_status("sent_to_queue", Some(10), None))
        .push_json(optimization_status("sent_to_queue", Some(55), Some("meshing")))
        .push_json(json!({
            "data": {
                "optimization_status": "done",
                "downloads": { "all": { "glb": "https://dl.example.test/a.glb" } }
            }
        }));
    let clock = Arc::new(ManualClock::new());
    let mut progress = RecordingProgress::default();

    let payload = poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut progress)
        .unwrap();

    assert_eq!(
        progress.updates,
        vec![(10, None), (55, Some("meshing".to_string()))]
    );
    assert_eq!(payload["downloads"]["all"]["glb"], "https://dl.example.test/a.glb");
    assert_eq!(progress.completed.as_ref(), Some(&payload));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2), Duration::from_secs(2)]);
    assert_eq!(transport.query_count(), 3);
}

#[test]
fn test_queries_carry_bearer_token() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(optimization_done(json!({})));
    let clock = Arc::new(ManualClock::new());

    poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap();

    let queries = transport.queries();
    assert_eq!(queries[0].url, STATUS_URL);
    assert_eq!(queries[0].token, "tok");
}

#[test]
fn test_rate_limit_backs_off_without_callback() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push(StatusReply::rate_limited())
        .push(StatusReply::new(429, "{\"data\":{\"optimization_status\":\"done\"}}"))
        .push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());
    let mut progress = RecordingProgress::default();

    let result = poller(&transport, &clock).poll_until_complete(
        &optimization_handle(),
        &every_two_seconds(),
        &mut progress,
    );

    assert!(result.is_ok());
    assert!(progress.updates.is_empty());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30), Duration::from_secs(30)]);
    assert_eq!(transport.query_count(), 3);
}

#[test]
fn test_custom_rate_limit_delay() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push(StatusReply::rate_limited())
        .push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());

    poller(&transport, &clock)
        .with_rate_limit_delay(Duration::from_secs(5))
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
}

#[test]
fn test_unexpected_status_fails_on_first_occurrence() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(optimization_status("failed", Some(40), None))
        .push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());
    let mut progress = RecordingProgress::default();

    let err = poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut progress)
        .unwrap_err();

    assert_eq!(err, PollError::UnexpectedStatus("failed".to_string()));
    assert_eq!(transport.query_count(), 1);
    assert_eq!(transport.remaining(), 1);
    assert!(clock.sleeps().is_empty());
    // progress carried by the failing reply is still observed
    assert_eq!(progress.updates, vec![(40, None)]);
    assert!(progress.completed.is_none());
}

#[test]
fn test_transport_failure_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_error(TransportError::ConnectionFailed("refused".to_string()))
        .push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());

    let err = poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap_err();

    assert!(matches!(err, PollError::Communication(ref msg) if msg.contains("refused")));
    assert_eq!(transport.query_count(), 1);
}

#[test]
fn test_server_error_and_garbage_are_communication_errors() {
    for reply in [
        StatusReply::new(503, "Service Unavailable"),
        StatusReply::new(200, "<html>maintenance</html>"),
        StatusReply::json(&json!({ "data": { "upload_status": "complete" } })),
    ] {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(reply);
        let clock = Arc::new(ManualClock::new());

        let err = poller(&transport, &clock)
            .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
            .unwrap_err();

        assert!(matches!(err, PollError::Communication(_)), "{err:?}");
        assert_eq!(transport.query_count(), 1);
    }
}

#[test]
fn test_cancelled_before_first_query() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = poller(&transport, &clock)
        .with_cancel(cancel)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap_err();

    assert_eq!(err, PollError::Cancelled);
    assert_eq!(transport.query_count(), 0);
}

/// Virtual clock that fires a cancellation during its first sleep.
struct CancellingClock {
    inner: ManualClock,
    cancel: CancelToken,
}

impl Clock for CancellingClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        self.cancel.cancel();
        self.inner.sleep(duration, cancel);
    }
}

#[test]
fn test_cancel_during_sleep_stops_before_next_query() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(optimization_status("sent_to_queue", Some(20), None))
        .push_json(optimization_status("done", None, None));
    let cancel = CancelToken::new();
    let clock = Arc::new(CancellingClock {
        inner: ManualClock::new(),
        cancel: cancel.clone(),
    });

    let err = JobPoller::new(transport.clone(), "tok")
        .with_clock(clock)
        .with_cancel(cancel)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap_err();

    assert_eq!(err, PollError::Cancelled);
    assert_eq!(transport.query_count(), 1);
}

#[test]
fn test_deadline_clamps_sleep_and_stops() {
    let transport = Arc::new(ScriptedTransport::new());
    for _ in 0..10 {
        transport.push_json(optimization_status("sent_to_queue", None, None));
    }
    let clock = Arc::new(ManualClock::new());
    let options = every_two_seconds().with_deadline(Some(Duration::from_secs(5)));

    let err = poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &options, &mut NoProgress)
        .unwrap_err();

    assert_eq!(
        err,
        PollError::DeadlineExceeded {
            waited: Duration::from_secs(5)
        }
    );
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(2), Duration::from_secs(2), Duration::from_secs(1)]
    );
    assert_eq!(transport.query_count(), 3);
}

#[test]
fn test_without_deadline_polls_until_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    for _ in 0..50 {
        transport.push_json(optimization_status("sent_to_queue", None, None));
    }
    transport.push_json(optimization_status("done", None, None));
    let clock = Arc::new(ManualClock::new());

    poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut NoProgress)
        .unwrap();

    assert_eq!(transport.query_count(), 51);
    assert_eq!(clock.total_slept(), Duration::from_secs(100));
}

#[test]
fn test_upload_two_phase_poll() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(upload_status("unzipping"))
        .push_json(upload_status("processing"))
        .push_json(upload_status("processing"))
        .push_json(upload_status("complete"));
    let clock = Arc::new(ManualClock::new());
    let poller = poller(&transport, &clock);
    let url = "https://api.example.test/api/rawmodel/3";
    let options = PollOptions::every(Duration::from_secs(1));

    let unzip = JobHandle::new(JobId::Number(3), url, StatusRule::unzip_phase());
    let payload = poller
        .poll_until_complete(&unzip, &options, &mut NoProgress)
        .unwrap();
    assert_eq!(payload["upload_status"], "processing");

    let analysis_rule = StatusRule::upload_analysis(vec![
        "uploading".to_string(),
        "unzipping".to_string(),
        "processing".to_string(),
    ]);
    let analysis = JobHandle::new(JobId::Number(3), url, analysis_rule);
    poller
        .poll_until_complete(&analysis, &options, &mut NoProgress)
        .unwrap();

    assert_eq!(transport.query_count(), 4);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 2]);
}

#[test]
fn test_upload_analysis_rejects_unknown_status() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(upload_status("error"));
    let clock = Arc::new(ManualClock::new());
    let handle = JobHandle::new(
        JobId::Number(3),
        "https://api.example.test/api/rawmodel/3",
        StatusRule::upload_analysis(vec!["processing".to_string()]),
    );

    let err = poller(&transport, &clock)
        .poll_until_complete(&handle, &PollOptions::every(Duration::from_secs(1)), &mut NoProgress)
        .unwrap_err();
    assert_eq!(err, PollError::UnexpectedStatus("error".to_string()));
}

#[test]
fn test_terminal_rendering_of_a_full_poll() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(optimization_status("sent_to_queue", Some(10), None))
        .push_json(optimization_status("sent_to_queue", Some(55), Some("meshing")))
        .push_json(optimization_done(json!({})));
    let clock = Arc::new(ManualClock::new());
    let mut progress = TerminalProgress::new(Vec::new());

    poller(&transport, &clock)
        .poll_until_complete(&optimization_handle(), &every_two_seconds(), &mut progress)
        .unwrap();

    let out = String::from_utf8(progress.into_inner()).unwrap();
    let frames: Vec<&str> = out.split('\r').filter(|f| !f.is_empty()).collect();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0], "Progress: [##__________________]  10%");
    assert!(frames[1].starts_with("Progress: [###########_________]  55%  |  meshing"));
    assert_eq!(frames[1].trim_end(), "Progress: [###########_________]  55%  |  meshing");
    // the done reply carries progress 100, then the finished line
    assert!(frames[2].starts_with("Progress: [####################] 100%"));
    assert_eq!(frames[3], format!("{}\n", render_finished()));
}
