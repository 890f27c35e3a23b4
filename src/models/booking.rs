use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::errors::RelayError;
use crate::services::validation::{
    collapse_aliases, format_timestamp, optional, parse_timestamp, require, validate_email,
    validate_phone, FieldAliases,
};

const BOOKING_FIELDS: &[FieldAliases] = &[
    ("time_utc", &["timeUtc"]),
    ("conversation_id", &["conversationId"]),
    ("callSid", &["callId", "call_sid", "call_id"]),
];

const ATTENDEE_FIELDS: &[FieldAliases] = &[
    ("phone_number", &["phoneNumber"]),
    ("first_name", &["firstName"]),
    ("last_name", &["lastName"]),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendeeArgs {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw `book_appointment` arguments as sent by the agent host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingArgs {
    #[serde(default)]
    pub attendee: Option<AttendeeArgs>,
    #[serde(default)]
    pub time_utc: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default, rename = "callSid")]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl BookingArgs {
    /// Reads tool arguments in either webhook or camelCase spelling, including
    /// the nested attendee. Sending several spellings of one field is allowed.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut value = collapse_aliases(value, BOOKING_FIELDS);
        if let Some(attendee) = value.get_mut("attendee") {
            *attendee = collapse_aliases(attendee.take(), ATTENDEE_FIELDS);
        }
        serde_json::from_value(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attendee {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: Option<String>,
}

impl Attendee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl TryFrom<AttendeeArgs> for Attendee {
    type Error = RelayError;

    fn try_from(args: AttendeeArgs) -> Result<Self, Self::Error> {
        let phone_number = require("attendee.phone_number", args.phone_number)?;
        validate_phone("attendee.phone_number", &phone_number)?;
        let first_name = require("attendee.first_name", args.first_name)?;
        let last_name = require("attendee.last_name", args.last_name)?;
        let address = require("attendee.address", args.address)?;
        let email = optional(args.email);
        if let Some(email) = &email {
            validate_email("attendee.email", email)?;
        }

        Ok(Self {
            phone_number,
            first_name,
            last_name,
            address,
            email,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub attendee: Attendee,
    pub time_utc: DateTime<FixedOffset>,
    pub conversation_id: String,
    pub call_id: String,
    pub description: Option<String>,
}

impl TryFrom<BookingArgs> for BookingRequest {
    type Error = RelayError;

    fn try_from(args: BookingArgs) -> Result<Self, Self::Error> {
        let attendee = args
            .attendee
            .ok_or_else(|| RelayError::validation("attendee", "is required"))?;
        let attendee = Attendee::try_from(attendee)?;
        let time_utc = parse_timestamp("time_utc", &require("time_utc", args.time_utc)?)?;
        let conversation_id = require("conversation_id", args.conversation_id)?;
        let call_id = require("callSid", args.call_sid)?;

        Ok(Self {
            attendee,
            time_utc,
            conversation_id,
            call_id,
            description: optional(args.description),
        })
    }
}

impl BookingRequest {
    /// JSON body POSTed to the webhook. `email` and `description` are left
    /// out when absent.
    pub fn payload(&self) -> Value {
        let attendee = &self.attendee;
        let mut body = json!({
            "attendee": {
                "phone_number": attendee.phone_number,
                "first_name": attendee.first_name,
                "last_name": attendee.last_name,
                "address": attendee.address,
            },
            "time_utc": format_timestamp(&self.time_utc),
            "conversation_id": self.conversation_id,
            "callSid": self.call_id,
        });
        if let Some(email) = &attendee.email {
            body["attendee"]["email"] = json!(email);
        }
        if let Some(description) = &self.description {
            body["description"] = json!(description);
        }
        body
    }

    pub fn confirmation(&self, reply: &BookingReply) -> String {
        let mut msg = format!(
            "Successfully booked appointment for {} at {}.",
            self.attendee.full_name(),
            format_timestamp(&self.time_utc)
        );
        if let Some(id) = &reply.event_id {
            msg.push_str(&format!(" Event ID: {id}"));
        }
        msg
    }
}

/// What the webhook told us about a booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingReply {
    pub event_id: Option<String>,
    pub message: Option<String>,
}

const EVENT_ID_KEYS: &[&str] = &["event_id", "eventId", "booking_id", "bookingId", "id"];
const MESSAGE_KEYS: &[&str] = &["message", "output", "result"];

impl BookingReply {
    /// An empty 2xx body counts as confirmation. A JSON body that reports
    /// `success: false` or an `error` is a contract violation.
    pub fn from_body(body: &str) -> Result<Self, String> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                return Ok(Self {
                    event_id: None,
                    message: Some(trimmed.to_string()),
                })
            }
        };

        match value {
            Value::Null | Value::Bool(true) => Ok(Self::default()),
            Value::String(s) => Ok(Self {
                event_id: None,
                message: Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            }),
            Value::Object(map) => from_object(&map),
            Value::Array(items) => match items.first() {
                None => Ok(Self::default()),
                Some(Value::Object(map)) => from_object(map),
                Some(other) => Err(format!("unexpected array entry: {other}")),
            },
            other => Err(format!("unsupported JSON payload: {other}")),
        }
    }
}

fn from_object(map: &Map<String, Value>) -> Result<BookingReply, String> {
    if map.get("success") == Some(&Value::Bool(false)) {
        let reason = map
            .get("error")
            .or_else(|| map.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given");
        return Err(format!("webhook reported failure: {reason}"));
    }
    if let Some(err) = map.get("error").and_then(Value::as_str) {
        if !err.trim().is_empty() {
            return Err(format!("webhook reported error: {err}"));
        }
    }

    let event_id = EVENT_ID_KEYS.iter().find_map(|k| match map.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    let message = MESSAGE_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);

    Ok(BookingReply { event_id, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee_args() -> AttendeeArgs {
        AttendeeArgs {
            phone_number: Some("+61403722371".to_string()),
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            address: Some("123 Main St, Sydney".to_string()),
            email: Some("john.doe@example.com".to_string()),
        }
    }

    fn args() -> BookingArgs {
        BookingArgs {
            attendee: Some(attendee_args()),
            time_utc: Some("2024-01-15T14:00:00+10:00".to_string()),
            conversation_id: Some("conv_123".to_string()),
            call_sid: Some("call_456".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_valid_booking() {
        let req = BookingRequest::try_from(args()).unwrap();
        assert_eq!(req.attendee.full_name(), "John Doe");
        assert_eq!(req.attendee.email.as_deref(), Some("john.doe@example.com"));
    }

    #[test]
    fn test_missing_attendee() {
        let mut a = args();
        a.attendee = None;
        let err = BookingRequest::try_from(a).unwrap_err();
        assert_eq!(err.to_string(), "invalid attendee: is required");
    }

    #[test]
    fn test_bad_phone_names_field() {
        let mut a = args();
        a.attendee.as_mut().unwrap().phone_number = Some("0403 722 371".to_string());
        let err = BookingRequest::try_from(a).unwrap_err();
        assert!(err.to_string().starts_with("invalid attendee.phone_number:"));
    }

    #[test]
    fn test_blank_required_attendee_fields() {
        for field in ["first_name", "last_name", "address"] {
            let mut a = args();
            let att = a.attendee.as_mut().unwrap();
            match field {
                "first_name" => att.first_name = Some(" ".to_string()),
                "last_name" => att.last_name = None,
                _ => att.address = Some(String::new()),
            }
            let err = BookingRequest::try_from(a).unwrap_err();
            assert!(err.to_string().contains(&format!("attendee.{field}")), "{err}");
        }
    }

    #[test]
    fn test_bad_email() {
        let mut a = args();
        a.attendee.as_mut().unwrap().email = Some("not-an-email".to_string());
        let err = BookingRequest::try_from(a).unwrap_err();
        assert!(err.to_string().contains("attendee.email"));
    }

    #[test]
    fn test_blank_email_treated_as_absent() {
        let mut a = args();
        a.attendee.as_mut().unwrap().email = Some("  ".to_string());
        let req = BookingRequest::try_from(a).unwrap();
        assert!(req.attendee.email.is_none());
    }

    #[test]
    fn test_time_without_offset_rejected() {
        let mut a = args();
        a.time_utc = Some("2024-01-15T14:00:00".to_string());
        let err = BookingRequest::try_from(a).unwrap_err();
        assert!(err.to_string().contains("time_utc"));
    }

    #[test]
    fn test_payload_shape() {
        let mut a = args();
        a.description = Some("Roof inspection".to_string());
        let req = BookingRequest::try_from(a).unwrap();
        let json = req.payload();
        assert_eq!(
            json,
            serde_json::json!({
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
                "description": "Roof inspection",
            })
        );
    }

    #[test]
    fn test_payload_omits_optional_fields() {
        let mut a = args();
        a.attendee.as_mut().unwrap().email = None;
        let req = BookingRequest::try_from(a).unwrap();
        let json = req.payload();
        assert!(json["attendee"].get("email").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_camel_case_args() {
        let json = serde_json::json!({
            "attendee": {
                "phoneNumber": "+61403722371",
                "firstName": "John",
                "lastName": "Doe",
                "address": "123 Main St, Sydney",
            },
            "timeUtc": "2024-01-15T14:00:00+10:00",
            "conversationId": "conv_123",
            "callId": "call_456",
        });
        let args = BookingArgs::from_value(json).unwrap();
        assert!(BookingRequest::try_from(args).is_ok());
    }

    #[test]
    fn test_both_spellings_of_one_field() {
        let json = serde_json::json!({
            "attendee": {
                "phone_number": "",
                "phoneNumber": "+61403722371",
                "first_name": "John",
                "firstName": "John",
                "last_name": "Doe",
                "address": "123 Main St, Sydney",
            },
            "time_utc": "2024-01-15T14:00:00+10:00",
            "timeUtc": "2024-01-15T14:00:00+10:00",
            "conversation_id": "conv_123",
            "callSid": "call_456",
            "callId": "call_456",
        });
        let req = BookingRequest::try_from(BookingArgs::from_value(json).unwrap()).unwrap();
        assert_eq!(req.attendee.phone_number, "+61403722371");
        assert_eq!(req.call_id, "call_456");
    }

    #[test]
    fn test_confirmation_message() {
        let req = BookingRequest::try_from(args()).unwrap();
        let reply = BookingReply::from_body(r#"{"id":"evt_789","status":"confirmed"}"#).unwrap();
        assert_eq!(
            req.confirmation(&reply),
            "Successfully booked appointment for John Doe at 2024-01-15T14:00:00+10:00. Event ID: evt_789"
        );
        assert_eq!(
            req.confirmation(&BookingReply::default()),
            "Successfully booked appointment for John Doe at 2024-01-15T14:00:00+10:00."
        );
    }

    #[test]
    fn test_reply_lenient_shapes() {
        assert_eq!(BookingReply::from_body("").unwrap(), BookingReply::default());
        assert_eq!(
            BookingReply::from_body("Booked!").unwrap().message.as_deref(),
            Some("Booked!")
        );
        assert_eq!(
            BookingReply::from_body(r#"[{"eventId":"abc"}]"#).unwrap().event_id.as_deref(),
            Some("abc")
        );
        assert_eq!(
            BookingReply::from_body(r#"{"booking_id":42}"#).unwrap().event_id.as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_reply_reported_failure() {
        let err = BookingReply::from_body(r#"{"success":false,"error":"slot taken"}"#).unwrap_err();
        assert!(err.contains("slot taken"));
        assert!(BookingReply::from_body(r#"{"error":"calendar offline"}"#).is_err());
        assert!(BookingReply::from_body("false").is_err());
        assert!(BookingReply::from_body("[1]").is_err());
    }
}
