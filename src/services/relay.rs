use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::errors::{RelayError, UpstreamFailure, UpstreamKind};
use crate::models::{
    AvailabilityArgs, AvailabilityReply, AvailabilityRequest, BookingArgs, BookingReply,
    BookingRequest, WebhookOutcome,
};
use crate::services::webhook::{HttpWebhookClient, WebhookClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckAvailability,
    BookAppointment,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CheckAvailability => "check_availability",
            Operation::BookAppointment => "book_appointment",
        }
    }

    fn activity(&self) -> &'static str {
        match self {
            Operation::CheckAvailability => "checking availability",
            Operation::BookAppointment => "booking the appointment",
        }
    }
}

/// Lifecycle of a single invocation. Validation failures jump to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Dispatching,
    Interpreting,
    Done,
}

/// Validates tool calls, forwards them to the webhook and turns every outcome
/// into a caller-facing string. Holds no mutable state.
pub struct RelayCore {
    client: Arc<dyn WebhookClient>,
    timeout: Duration,
}

impl RelayCore {
    pub fn new(client: Arc<dyn WebhookClient>, config: &RelayConfig) -> Self {
        Self {
            client,
            timeout: config.timeout,
        }
    }

    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = HttpWebhookClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub async fn check_availability(&self, args: AvailabilityArgs) -> String {
        let op = Operation::CheckAvailability;
        let result = self.try_check_availability(args).await;
        finish(op, result)
    }

    pub async fn book_appointment(&self, args: BookingArgs) -> String {
        let op = Operation::BookAppointment;
        let result = self.try_book_appointment(args).await;
        finish(op, result)
    }

    pub async fn try_check_availability(
        &self,
        args: AvailabilityArgs,
    ) -> Result<String, RelayError> {
        tracing::debug!(stage = ?Stage::Validating, "check_availability");
        let req = AvailabilityRequest::try_from(args)?;

        tracing::info!(
            start = %req.start,
            end = %req.end,
            conversation_id = %req.conversation_id,
            call_sid = %req.call_id,
            "checking availability"
        );
        let query = req.to_query();
        let payload = self.dispatch(self.client.get(&query)).await?;

        tracing::debug!(stage = ?Stage::Interpreting, "check_availability");
        let reply = AvailabilityReply::from_body(&payload).map_err(RelayError::UpstreamContract)?;
        Ok(reply.to_human_readable(&req))
    }

    pub async fn try_book_appointment(&self, args: BookingArgs) -> Result<String, RelayError> {
        tracing::debug!(stage = ?Stage::Validating, "book_appointment");
        let req = BookingRequest::try_from(args)?;

        tracing::info!(
            time_utc = %req.time_utc,
            conversation_id = %req.conversation_id,
            call_sid = %req.call_id,
            "booking appointment"
        );
        let payload = self.dispatch(self.client.post(&req.payload())).await?;

        tracing::debug!(stage = ?Stage::Interpreting, "book_appointment");
        let reply = BookingReply::from_body(&payload).map_err(RelayError::UpstreamContract)?;
        if let Some(msg) = &reply.message {
            tracing::debug!(message = %msg, "webhook booking message");
        }
        Ok(req.confirmation(&reply))
    }

    /// Runs one webhook call under the configured deadline, independent of
    /// whatever timeout the transport enforces itself.
    async fn dispatch<F>(&self, call: F) -> Result<String, UpstreamFailure>
    where
        F: Future<Output = WebhookOutcome>,
    {
        tracing::debug!(stage = ?Stage::Dispatching, timeout = ?self.timeout);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(UpstreamFailure::new(
                UpstreamKind::Timeout,
                format!("no response within {:?}", self.timeout),
            )),
        }
    }
}

fn finish(op: Operation, result: Result<String, RelayError>) -> String {
    let out = match result {
        Ok(msg) => {
            tracing::info!(tool = op.as_str(), "tool call succeeded");
            msg
        }
        Err(e) => render_error(op, &e),
    };
    tracing::debug!(stage = ?Stage::Done, tool = op.as_str());
    out
}

/// Maps a failure to the string handed back to the agent host. Upstream
/// details stay in the logs.
pub fn render_error(op: Operation, err: &RelayError) -> String {
    match err {
        RelayError::Validation { field, reason } => {
            tracing::info!(tool = op.as_str(), field = %field, reason = %reason, "rejected tool arguments");
            format!("Error: {err}")
        }
        RelayError::Upstream(failure) => {
            tracing::error!(tool = op.as_str(), kind = %failure.kind, detail = %failure.detail, "webhook call failed");
            let activity = op.activity();
            match failure.kind {
                UpstreamKind::Timeout => {
                    format!("Error: the calendar service did not respond in time while {activity}.")
                }
                UpstreamKind::Connection => {
                    format!("Error: could not connect to the calendar service while {activity}.")
                }
                UpstreamKind::Status(code) => {
                    format!("Error: the calendar service returned HTTP {code} while {activity}.")
                }
                UpstreamKind::Transport => {
                    format!("Error: the request to the calendar service failed while {activity}.")
                }
            }
        }
        RelayError::UpstreamContract(detail) => {
            tracing::warn!(tool = op.as_str(), detail = %detail, "webhook response did not match expected shape");
            match op {
                Operation::CheckAvailability => {
                    "Error: unable to parse availability from the calendar service.".to_string()
                }
                Operation::BookAppointment => {
                    "Error: unable to confirm the booking with the calendar service.".to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    struct MockWebhook {
        outcome: WebhookOutcome,
        delay: Duration,
        calls: AtomicUsize,
        last_query: Mutex<Vec<(&'static str, String)>>,
        last_body: Mutex<Option<serde_json::Value>>,
    }

    impl MockWebhook {
        fn replying(outcome: WebhookOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                last_query: Mutex::new(vec![]),
                last_body: Mutex::new(None),
            })
        }

        fn ok(payload: &str) -> Arc<Self> {
            Self::replying(WebhookOutcome::Success {
                payload: payload.to_string(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WebhookClient for MockWebhook {
        async fn get(&self, query: &[(&'static str, String)]) -> WebhookOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = query.to_vec();
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }

        async fn post(&self, body: &serde_json::Value) -> WebhookOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_body.lock().unwrap() = Some(body.clone());
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    fn relay(mock: Arc<MockWebhook>) -> RelayCore {
        RelayCore::new(mock, &RelayConfig::default())
    }

    fn availability_args() -> AvailabilityArgs {
        AvailabilityArgs {
            start_date: Some("2024-01-15T09:00:00+10:00".to_string()),
            end_date: Some("2024-01-22T17:00:00+10:00".to_string()),
            conversation_id: Some("conv_123".to_string()),
            call_sid: Some("call_456".to_string()),
            proposed_time: None,
        }
    }

    fn booking_args() -> BookingArgs {
        serde_json::from_value(serde_json::json!({
            "attendee": {
                "phone_number": "+61403722371",
                "first_name": "John",
                "last_name": "Doe",
                "address": "123 Main St, Sydney",
                "email": "john.doe@example.com",
            },
            "time_utc": "2024-01-15T14:00:00+10:00",
            "conversation_id": "conv_123",
            "callSid": "call_456",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_availability_success_single_request() {
        let mock = MockWebhook::ok(r#"{"slots":[{"start":"2024-01-15T09:00:00+10:00","end":"2024-01-15T10:00:00+10:00"}]}"#);
        let out = relay(mock.clone()).check_availability(availability_args()).await;

        assert_eq!(mock.calls(), 1);
        assert!(out.starts_with("Available times:"), "{out}");
        let query = mock.last_query.lock().unwrap().clone();
        assert!(query.contains(&("conversation_id", "conv_123".to_string())));
        assert!(query.contains(&("callSid", "call_456".to_string())));
    }

    #[tokio::test]
    async fn test_availability_end_before_start_no_request() {
        let mock = MockWebhook::ok("{}");
        let mut args = availability_args();
        args.end_date = Some("2024-01-10T09:00:00+10:00".to_string());

        let out = relay(mock.clone()).check_availability(args).await;
        assert_eq!(mock.calls(), 0);
        assert_eq!(out, "Error: invalid end_date: must not be before start_date");
    }

    #[tokio::test]
    async fn test_availability_contract_error_hides_payload() {
        let mock = MockWebhook::ok(r#"{"weird":"<secret>"}"#);
        let out = relay(mock).check_availability(availability_args()).await;
        assert_eq!(out, "Error: unable to parse availability from the calendar service.");
        assert!(!out.contains("secret"));
    }

    #[tokio::test]
    async fn test_availability_status_failure() {
        let mock = MockWebhook::replying(WebhookOutcome::Failure {
            kind: UpstreamKind::Status(500),
            detail: "Internal Server Error".to_string(),
        });
        let out = relay(mock).check_availability(availability_args()).await;
        assert_eq!(
            out,
            "Error: the calendar service returned HTTP 500 while checking availability."
        );
    }

    #[tokio::test]
    async fn test_booking_success() {
        let mock = MockWebhook::ok(r#"{"id":"evt_1"}"#);
        let out = relay(mock.clone()).book_appointment(booking_args()).await;

        assert_eq!(mock.calls(), 1);
        assert_eq!(
            out,
            "Successfully booked appointment for John Doe at 2024-01-15T14:00:00+10:00. Event ID: evt_1"
        );
        let body = mock.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["callSid"], "call_456");
        assert_eq!(body["attendee"]["phone_number"], "+61403722371");
        assert_eq!(body["attendee"]["email"], "john.doe@example.com");
        assert_eq!(body["time_utc"], "2024-01-15T14:00:00+10:00");
        assert!(body.get("description").is_none());
    }

    #[tokio::test]
    async fn test_booking_bad_phone_no_request() {
        let mock = MockWebhook::ok("{}");
        let mut args = booking_args();
        args.attendee.as_mut().unwrap().phone_number = Some("12345".to_string());

        let out = relay(mock.clone()).book_appointment(args).await;
        assert_eq!(mock.calls(), 0);
        assert!(out.starts_with("Error: invalid attendee.phone_number"), "{out}");
    }

    #[tokio::test]
    async fn test_booking_rejected_by_webhook() {
        let mock = MockWebhook::ok(r#"{"success":false,"error":"slot taken"}"#);
        let out = relay(mock).book_appointment(booking_args()).await;
        assert_eq!(out, "Error: unable to confirm the booking with the calendar service.");
    }

    #[tokio::test]
    async fn test_dispatch_deadline() {
        let mock = Arc::new(MockWebhook {
            outcome: WebhookOutcome::Success {
                payload: "late".to_string(),
            },
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(vec![]),
            last_body: Mutex::new(None),
        });
        let config = RelayConfig {
            timeout: Duration::from_millis(50),
            ..RelayConfig::default()
        };
        let relay = RelayCore::new(mock, &config);

        let started = std::time::Instant::now();
        let out = relay.check_availability(availability_args()).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            out,
            "Error: the calendar service did not respond in time while checking availability."
        );
    }

    #[test]
    fn test_render_connection_error() {
        let err = RelayError::Upstream(UpstreamFailure::new(UpstreamKind::Connection, "refused"));
        assert_eq!(
            render_error(Operation::BookAppointment, &err),
            "Error: could not connect to the calendar service while booking the appointment."
        );
    }
}
