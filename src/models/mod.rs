pub mod availability;
pub mod booking;
pub mod outcome;

pub use availability::{AvailabilityArgs, AvailabilityReply, AvailabilityRequest, Slot};
pub use booking::{Attendee, AttendeeArgs, BookingArgs, BookingReply, BookingRequest};
pub use outcome::WebhookOutcome;
