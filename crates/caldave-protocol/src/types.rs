//! Message types exchanged over the WebSocket.

use std::fmt;
use std::str::FromStr;

use caldave_core::{AvailableSlot, parse_date_prefix};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// The `type` tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Client asks for the free slots of a date.
    RequestAvailability,
    /// Server answers with the free slots of a date.
    AvailabilityResponse,
    /// Client asks for a calendar refetch over a date range.
    UpdateAvailability,
    /// The busy-interval cache changed.
    EventsUpdated,
}

impl MessageType {
    /// All known message types.
    pub const ALL: [MessageType; 4] = [
        MessageType::RequestAvailability,
        MessageType::AvailabilityResponse,
        MessageType::UpdateAvailability,
        MessageType::EventsUpdated,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RequestAvailability => "REQUEST_AVAILABILITY",
            MessageType::AvailabilityResponse => "AVAILABILITY_RESPONSE",
            MessageType::UpdateAvailability => "UPDATE_AVAILABILITY",
            MessageType::EventsUpdated => "EVENTS_UPDATED",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(())
    }
}

/// Untyped wire envelope: `{"type": ..., "payload": ...}`.
///
/// Envelopes with an unrecognized `type` are kept in this form and relayed
/// to every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-dependent payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Payload of `REQUEST_AVAILABILITY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    /// Requested day, `YYYY-MM-DD` optionally followed by a time segment.
    pub date: String,
}

impl AvailabilityRequest {
    /// Creates a request for `date`.
    pub fn new(date: impl Into<String>) -> Self {
        Self { date: date.into() }
    }

    /// The requested calendar day.
    pub fn day(&self) -> ProtocolResult<NaiveDate> {
        parse_date_prefix(&self.date).ok_or_else(|| ProtocolError::InvalidDate {
            field: "date",
            value: self.date.clone(),
        })
    }
}

/// Payload of `AVAILABILITY_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    /// Date string exactly as the client sent it.
    pub date: String,
    /// Free slots, ascending.
    pub available_times: Vec<AvailableSlot>,
}

/// Payload of `UPDATE_AVAILABILITY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventsRequest {
    /// First day to fetch.
    pub start_date: String,
    /// Last day to fetch.
    pub end_date: String,
}

impl UpdateEventsRequest {
    /// Creates an update request for a date range.
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// Parsed `(start, end)` days. Ordering is not checked here.
    pub fn range(&self) -> ProtocolResult<(NaiveDate, NaiveDate)> {
        let start = parse_date_prefix(&self.start_date).ok_or_else(|| {
            ProtocolError::InvalidDate {
                field: "startDate",
                value: self.start_date.clone(),
            }
        })?;
        let end = parse_date_prefix(&self.end_date).ok_or_else(|| ProtocolError::InvalidDate {
            field: "endDate",
            value: self.end_date.clone(),
        })?;
        Ok((start, end))
    }
}

/// A decoded message.
///
/// Requests keep the payload as sent next to the days parsed from it, so
/// handlers never parse twice.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    RequestAvailability {
        request: AvailabilityRequest,
        day: NaiveDate,
    },
    AvailabilityResponse(AvailabilityResponse),
    UpdateAvailability {
        request: UpdateEventsRequest,
        start: NaiveDate,
        end: NaiveDate,
    },
    EventsUpdated,
    /// Any type this server does not interpret.
    Relay(Envelope),
}

impl Message {
    /// Builds a `REQUEST_AVAILABILITY`, rejecting an unparseable date.
    pub fn request_availability(request: AvailabilityRequest) -> ProtocolResult<Self> {
        let day = request.day()?;
        Ok(Message::RequestAvailability { request, day })
    }

    /// Builds an `UPDATE_AVAILABILITY`, rejecting unparseable dates.
    pub fn update_availability(request: UpdateEventsRequest) -> ProtocolResult<Self> {
        let (start, end) = request.range()?;
        Ok(Message::UpdateAvailability {
            request,
            start,
            end,
        })
    }

    /// Builds an `AVAILABILITY_RESPONSE`.
    pub fn availability_response(date: impl Into<String>, slots: Vec<AvailableSlot>) -> Self {
        Message::AvailabilityResponse(AvailabilityResponse {
            date: date.into(),
            available_times: slots,
        })
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Message::RequestAvailability { .. } => MessageType::RequestAvailability.as_str(),
            Message::AvailabilityResponse(_) => MessageType::AvailabilityResponse.as_str(),
            Message::UpdateAvailability { .. } => MessageType::UpdateAvailability.as_str(),
            Message::EventsUpdated => MessageType::EventsUpdated.as_str(),
            Message::Relay(envelope) => &envelope.kind,
        }
    }

    /// Known type of this message, `None` for relayed envelopes.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Message::RequestAvailability { .. } => Some(MessageType::RequestAvailability),
            Message::AvailabilityResponse(_) => Some(MessageType::AvailabilityResponse),
            Message::UpdateAvailability { .. } => Some(MessageType::UpdateAvailability),
            Message::EventsUpdated => Some(MessageType::EventsUpdated),
            Message::Relay(_) => None,
        }
    }
}
