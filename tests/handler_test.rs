use std::sync::Arc;
use std::time::Duration;

use scribe::display::{Display, TextSlot};
use scribe::endpoint::mock::{MockEndpoint, MockReply};
use scribe::endpoint::{EndpointError, SummaryResult};
use scribe::events::{CycleOutcome, Event};
use scribe::form::Form;
use scribe::handler::{RenderPolicy, SubmissionHandler};

/// Build a form with a handler attached; returns the form, the display
/// region and the mock so tests can inspect all three.
fn page(mock: MockEndpoint, policy: RenderPolicy) -> (Form, Arc<TextSlot>, Arc<MockEndpoint>) {
    let form = Form::new("summarize-form");
    let display = Arc::new(TextSlot::new());
    let mock = Arc::new(mock);
    SubmissionHandler::new(mock.clone(), display.clone(), policy).attach(&form);
    (form, display, mock)
}

fn reply(result: SummaryResult) -> MockEndpoint {
    MockEndpoint::new(vec![MockReply::ok(result)])
}

#[tokio::test]
async fn summary_is_displayed_verbatim() {
    let (form, display, _) = page(
        reply(SummaryResult::with_summary("Cats sleep a lot.")),
        RenderPolicy::default(),
    );

    form.submit().settled().await;

    assert_eq!(display.text().as_deref(), Some("Cats sleep a lot."));
}

#[tokio::test]
async fn error_is_displayed_with_prefix() {
    let (form, display, _) = page(
        reply(SummaryResult::with_error("No text provided for summarization.")),
        RenderPolicy::default(),
    );

    form.submit().settled().await;

    assert_eq!(
        display.text().as_deref(),
        Some("Error: No text provided for summarization.")
    );
}

#[tokio::test]
async fn empty_response_shows_unknown_error() {
    let (form, display, _) = page(reply(SummaryResult::default()), RenderPolicy::default());

    form.submit().settled().await;

    assert_eq!(display.text().as_deref(), Some("Error: Unknown error"));
}

#[tokio::test]
async fn submit_always_prevents_default() {
    let (form, _, _) = page(reply(SummaryResult::default()), RenderPolicy::default());

    let event = form.submit();
    assert!(event.default_prevented());
    event.settled().await;
}

#[tokio::test]
async fn form_fields_reach_the_endpoint() {
    let (form, _, mock) = page(
        reply(SummaryResult::with_summary("ok")),
        RenderPolicy::default(),
    );
    form.set_text("topic", "cats");

    form.submit().settled().await;

    let received = mock.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].get_text("topic"), Some("cats"));
}

#[tokio::test]
async fn editing_form_after_submit_does_not_change_payload() {
    let (form, _, mock) = page(
        MockEndpoint::always(
            MockReply::ok(SummaryResult::with_summary("ok")).after(Duration::from_millis(20)),
        ),
        RenderPolicy::default(),
    );
    form.set_text("text", "original");

    let event = form.submit();
    form.set_text("text", "edited");
    form.set_text("late", "field");
    event.settled().await;

    let received = mock.received();
    assert_eq!(received[0].get_text("text"), Some("original"));
    assert!(received[0].get("late").is_none());
}

#[tokio::test]
async fn one_request_per_submission() {
    let (form, display, mock) = page(
        MockEndpoint::always(MockReply::ok(SummaryResult::with_summary("s"))),
        RenderPolicy::default(),
    );

    for _ in 0..3 {
        form.submit().settled().await;
    }

    assert_eq!(mock.calls(), 3);
    assert_eq!(display.writes(), 3);
}

/// Two quick submissions where the first answer arrives after the second.
fn racing_endpoint() -> MockEndpoint {
    MockEndpoint::keyed(
        "text",
        vec![
            (
                "first",
                MockReply::ok(SummaryResult::with_summary("first summary"))
                    .after(Duration::from_millis(100)),
            ),
            (
                "second",
                MockReply::ok(SummaryResult::with_summary("second summary")),
            ),
        ],
    )
}

#[tokio::test]
async fn stale_response_is_discarded_by_default() {
    let (form, display, _) = page(racing_endpoint(), RenderPolicy::LatestSubmission);

    form.set_text("text", "first");
    let first = form.submit();
    form.set_text("text", "second");
    let second = form.submit();

    let second_outcomes = second.settled().await;
    let first_outcomes = first.settled().await;

    assert_eq!(
        second_outcomes,
        vec![CycleOutcome::Rendered("second summary".to_string())]
    );
    assert_eq!(first_outcomes, vec![CycleOutcome::Discarded]);
    assert_eq!(display.text().as_deref(), Some("second summary"));
    assert_eq!(display.writes(), 1);
}

#[tokio::test]
async fn last_writer_wins_shows_last_arriving_response() {
    let (form, display, _) = page(racing_endpoint(), RenderPolicy::LastWriterWins);

    form.set_text("text", "first");
    let first = form.submit();
    form.set_text("text", "second");
    let second = form.submit();

    second.settled().await;
    assert_eq!(display.text().as_deref(), Some("second summary"));

    first.settled().await;
    assert_eq!(display.text().as_deref(), Some("first summary"));
    assert_eq!(display.writes(), 2);
}

#[tokio::test]
async fn discarded_cycle_is_announced() {
    let form = Form::new("summarize-form");
    let handler = SubmissionHandler::new(
        Arc::new(racing_endpoint()),
        Arc::new(TextSlot::new()),
        RenderPolicy::LatestSubmission,
    )
    .attach(&form);
    let mut rx = handler.bus().subscribe();

    form.set_text("text", "first");
    let first = form.submit();
    form.set_text("text", "second");
    let second = form.submit();
    second.settled().await;
    first.settled().await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&Event::Discarded { seq: 1, latest: 2 }));
    assert!(events.contains(&Event::Rendered {
        seq: 2,
        text: "second summary".to_string()
    }));
}

/// A display that stalls while writing one particular text, like a
/// blocked terminal.
struct StallingDisplay {
    slot: TextSlot,
    stall_on: &'static str,
}

impl Display for StallingDisplay {
    fn set_text(&self, text: &str) {
        if text == self.stall_on {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.slot.set_text(text);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_write_is_not_overtaken_by_a_newer_cycle() {
    let form = Form::new("summarize-form");
    let display = Arc::new(StallingDisplay {
        slot: TextSlot::new(),
        stall_on: "first summary",
    });
    SubmissionHandler::new(
        Arc::new(MockEndpoint::keyed(
            "text",
            vec![
                ("first", MockReply::ok(SummaryResult::with_summary("first summary"))),
                ("second", MockReply::ok(SummaryResult::with_summary("second summary"))),
            ],
        )),
        display.clone(),
        RenderPolicy::LatestSubmission,
    )
    .attach(&form);

    form.set_text("text", "first");
    let first = form.submit();
    // Let the first cycle reach its (stalled) display write.
    tokio::time::sleep(Duration::from_millis(50)).await;
    form.set_text("text", "second");
    let second = form.submit();

    let second_outcomes = second.settled().await;
    let first_outcomes = first.settled().await;

    assert_eq!(
        first_outcomes,
        vec![CycleOutcome::Rendered("first summary".to_string())]
    );
    assert_eq!(
        second_outcomes,
        vec![CycleOutcome::Rendered("second summary".to_string())]
    );
    assert_eq!(display.slot.text().as_deref(), Some("second summary"));
    assert_eq!(display.slot.writes(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_response_is_discarded_on_a_threaded_runtime() {
    let (form, display, _) = page(racing_endpoint(), RenderPolicy::LatestSubmission);

    form.set_text("text", "first");
    let first = form.submit();
    form.set_text("text", "second");
    let second = form.submit();

    let second_outcomes = second.settled().await;
    let first_outcomes = first.settled().await;

    assert_eq!(
        second_outcomes,
        vec![CycleOutcome::Rendered("second summary".to_string())]
    );
    assert_eq!(first_outcomes, vec![CycleOutcome::Discarded]);
    assert_eq!(display.text().as_deref(), Some("second summary"));
}

#[tokio::test]
async fn sequential_identical_submissions_are_idempotent() {
    let (form, display, _) = page(
        MockEndpoint::always(MockReply::ok(SummaryResult::with_summary("stable"))),
        RenderPolicy::default(),
    );
    form.set_text("text", "same input");

    form.submit().settled().await;
    let first = display.text();
    form.submit().settled().await;
    let second = display.text();

    assert_eq!(first.as_deref(), Some("stable"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn transport_failure_renders_generic_message() {
    let (form, display, _) = page(
        MockEndpoint::new(vec![MockReply::err(EndpointError::Transport(
            "connection refused".to_string(),
        ))]),
        RenderPolicy::default(),
    );

    form.submit().settled().await;

    assert_eq!(display.text().as_deref(), Some("Error: Request failed"));
}

#[tokio::test]
async fn decode_failure_renders_generic_message() {
    let (form, display, _) = page(
        MockEndpoint::new(vec![MockReply::err(EndpointError::Decode(
            "expected value at line 1 column 1".to_string(),
        ))]),
        RenderPolicy::default(),
    );

    form.submit().settled().await;

    assert_eq!(display.text().as_deref(), Some("Error: Request failed"));
}

#[tokio::test]
async fn failure_then_success_overwrites_display() {
    let (form, display, _) = page(
        MockEndpoint::new(vec![
            MockReply::err(EndpointError::Transport("reset".to_string())),
            MockReply::ok(SummaryResult::with_summary("recovered")),
        ]),
        RenderPolicy::default(),
    );

    form.submit().settled().await;
    assert_eq!(display.text().as_deref(), Some("Error: Request failed"));

    form.submit().settled().await;
    assert_eq!(display.text().as_deref(), Some("recovered"));
}
