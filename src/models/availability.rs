use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::RelayError;
use crate::services::validation::{
    collapse_aliases, format_timestamp, optional, parse_timestamp, require, FieldAliases,
};

const AVAILABILITY_FIELDS: &[FieldAliases] = &[
    ("start_date", &["start", "startDate"]),
    ("end_date", &["end", "endDate"]),
    ("conversation_id", &["conversationId"]),
    ("callSid", &["callId", "call_sid", "call_id"]),
    ("proposed_time", &["proposedTime"]),
];

/// Raw `check_availability` arguments as sent by the agent host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityArgs {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default, rename = "callSid")]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub proposed_time: Option<String>,
}

impl AvailabilityArgs {
    /// Reads tool arguments in either webhook or camelCase spelling. Sending
    /// several spellings of one field is allowed.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(collapse_aliases(value, AVAILABILITY_FIELDS))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRequest {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub conversation_id: String,
    pub call_id: String,
    pub proposed_time: Option<DateTime<FixedOffset>>,
}

impl TryFrom<AvailabilityArgs> for AvailabilityRequest {
    type Error = RelayError;

    fn try_from(args: AvailabilityArgs) -> Result<Self, Self::Error> {
        let start = parse_timestamp("start_date", &require("start_date", args.start_date)?)?;
        let end = parse_timestamp("end_date", &require("end_date", args.end_date)?)?;
        if end < start {
            return Err(RelayError::validation(
                "end_date",
                "must not be before start_date",
            ));
        }

        let conversation_id = require("conversation_id", args.conversation_id)?;
        let call_id = require("callSid", args.call_sid)?;

        let proposed_time = optional(args.proposed_time)
            .map(|p| parse_timestamp("proposed_time", &p))
            .transpose()?;

        Ok(Self {
            start,
            end,
            conversation_id,
            call_id,
            proposed_time,
        })
    }
}

impl AvailabilityRequest {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("start_date", format_timestamp(&self.start)),
            ("end_date", format_timestamp(&self.end)),
            ("conversation_id", self.conversation_id.clone()),
            ("callSid", self.call_id.clone()),
        ];
        if let Some(proposed) = &self.proposed_time {
            query.push(("proposed_time", format_timestamp(proposed)));
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub start: String,
    pub end: Option<String>,
}

/// What the webhook told us about availability.
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilityReply {
    Slots(Vec<Slot>),
    Message(String),
}

const SLOT_LIST_KEYS: &[&str] = &[
    "slots",
    "available_slots",
    "availableSlots",
    "availability",
    "times",
];
const MESSAGE_KEYS: &[&str] = &["availability", "message", "output", "text", "result"];
const SLOT_START_KEYS: &[&str] = &["start", "start_time", "startTime", "from"];
const SLOT_END_KEYS: &[&str] = &["end", "end_time", "endTime", "to"];

impl AvailabilityReply {
    /// Interprets a 2xx body. Plain text is accepted as-is; JSON must be a
    /// slot list or carry a message. Anything else is a contract violation.
    pub fn from_body(body: &str) -> Result<Self, String> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err("empty response body".to_string());
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => return Ok(AvailabilityReply::Message(trimmed.to_string())),
        };

        match value {
            Value::String(s) if !s.trim().is_empty() => {
                Ok(AvailabilityReply::Message(s.trim().to_string()))
            }
            Value::Array(items) => from_items(&items),
            Value::Object(map) => from_object(&map),
            other => Err(format!("unsupported JSON payload: {other}")),
        }
    }

    pub fn to_human_readable(&self, req: &AvailabilityRequest) -> String {
        match self {
            AvailabilityReply::Message(msg) => msg.clone(),
            AvailabilityReply::Slots(slots) if slots.is_empty() => format!(
                "No available times were found between {} and {}.",
                format_timestamp(&req.start),
                format_timestamp(&req.end)
            ),
            AvailabilityReply::Slots(slots) => {
                let lines = slots
                    .iter()
                    .map(|s| match &s.end {
                        Some(end) => format!("- {} to {}", s.start, end),
                        None => format!("- {}", s.start),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("Available times:\n{lines}")
            }
        }
    }
}

fn from_object(map: &Map<String, Value>) -> Result<AvailabilityReply, String> {
    for key in SLOT_LIST_KEYS {
        if let Some(Value::Array(items)) = map.get(*key) {
            return from_items(items);
        }
    }
    if let Some(msg) = message_of(map) {
        return Ok(AvailabilityReply::Message(msg));
    }
    Err("JSON object without slots or message".to_string())
}

fn from_items(items: &[Value]) -> Result<AvailabilityReply, String> {
    if items.is_empty() {
        return Ok(AvailabilityReply::Slots(Vec::new()));
    }

    if let Some(slots) = items.iter().map(slot_of).collect::<Option<Vec<_>>>() {
        return Ok(AvailabilityReply::Slots(slots));
    }

    // n8n-style responses wrap the text in `[{"output": "..."}]`
    let messages = items
        .iter()
        .map(|item| item.as_object().and_then(message_of))
        .collect::<Option<Vec<_>>>();
    match messages {
        Some(m) => Ok(AvailabilityReply::Message(m.join("\n"))),
        None => Err("array entries are neither slots nor messages".to_string()),
    }
}

fn slot_of(item: &Value) -> Option<Slot> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(Slot {
            start: s.trim().to_string(),
            end: None,
        }),
        Value::Object(map) => {
            let start = first_str(map, SLOT_START_KEYS)?;
            Some(Slot {
                start,
                end: first_str(map, SLOT_END_KEYS),
            })
        }
        _ => None,
    }
}

fn message_of(map: &Map<String, Value>) -> Option<String> {
    first_str(map, MESSAGE_KEYS)
}

fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
