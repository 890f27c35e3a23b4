use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::Tool;
use crate::errors::RelayError;
use crate::models::{AvailabilityArgs, BookingArgs};
use crate::services::relay::{render_error, Operation, RelayCore};

pub struct CheckAvailabilityTool {
    relay: Arc<RelayCore>,
}

impl CheckAvailabilityTool {
    pub fn new(relay: Arc<RelayCore>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &'static str {
        Operation::CheckAvailability.as_str()
    }

    fn description(&self) -> &'static str {
        "Check calendar availability between two times. Provide dates in ISO 8601 \
         format with a timezone offset (e.g. 2025-07-05T09:00:00+10:00). Use the \
         returned times when offering the caller a slot."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Start of the search window, ISO 8601 with offset"
                },
                "end_date": {
                    "type": "string",
                    "description": "End of the search window, ISO 8601 with offset, not before start_date"
                },
                "conversation_id": {
                    "type": "string",
                    "description": "Conversation identifier"
                },
                "callSid": {
                    "type": "string",
                    "description": "Call identifier"
                },
                "proposed_time": {
                    "type": "string",
                    "description": "Time the caller asked for, ISO 8601 with offset (optional)"
                }
            },
            "required": ["start_date", "end_date", "conversation_id", "callSid"]
        })
    }

    async fn invoke(&self, args: serde_json::Value) -> String {
        match AvailabilityArgs::from_value(args) {
            Ok(args) => self.relay.check_availability(args).await,
            Err(e) => render_error(
                Operation::CheckAvailability,
                &RelayError::validation("arguments", e.to_string()),
            ),
        }
    }
}

pub struct BookAppointmentTool {
    relay: Arc<RelayCore>,
}

impl BookAppointmentTool {
    pub fn new(relay: Arc<RelayCore>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn name(&self) -> &'static str {
        Operation::BookAppointment.as_str()
    }

    fn description(&self) -> &'static str {
        "Book an appointment. Only book a time returned by check_availability. \
         Provide time_utc in ISO 8601 format with a timezone offset \
         (e.g. 2025-07-05T11:00:00+10:00). If booking fails, suggest another time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "attendee": {
                    "type": "object",
                    "properties": {
                        "phone_number": {
                            "type": "string",
                            "description": "E.164 phone number, e.g. +61403722371"
                        },
                        "first_name": { "type": "string" },
                        "last_name": { "type": "string" },
                        "address": {
                            "type": "string",
                            "description": "Appointment address or location"
                        },
                        "email": {
                            "type": "string",
                            "description": "Email address (optional)"
                        }
                    },
                    "required": ["phone_number", "first_name", "last_name", "address"]
                },
                "time_utc": {
                    "type": "string",
                    "description": "Appointment start, ISO 8601 with offset"
                },
                "conversation_id": { "type": "string" },
                "callSid": { "type": "string" },
                "description": {
                    "type": "string",
                    "description": "Notes for the appointment (optional)"
                }
            },
            "required": ["attendee", "time_utc", "conversation_id", "callSid"]
        })
    }

    async fn invoke(&self, args: serde_json::Value) -> String {
        match BookingArgs::from_value(args) {
            Ok(args) => self.relay.book_appointment(args).await,
            Err(e) => render_error(
                Operation::BookAppointment,
                &RelayError::validation("arguments", e.to_string()),
            ),
        }
    }
}
