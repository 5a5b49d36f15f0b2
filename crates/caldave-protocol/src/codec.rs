//! Text-frame codec.
//!
//! Decoding happens in two steps: the frame is parsed into an untyped
//! [`Envelope`], then the payload is checked against the shape declared by
//! its `type`. Unknown types are not an error; they come back as
//! [`Message::Relay`].

use serde::Serialize;

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{
    AvailabilityRequest, AvailabilityResponse, Envelope, Message, MessageType, UpdateEventsRequest,
};

#[derive(Serialize)]
struct Outgoing<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: MessageType,
    payload: &'a T,
}

/// Decodes one inbound text frame.
///
/// # Example
///
/// ```rust
/// use caldave_protocol::{decode_text, Message};
///
/// let message = decode_text(r#"{"type":"EVENTS_UPDATED","payload":null}"#).unwrap();
/// assert_eq!(message, Message::EventsUpdated);
/// ```
pub fn decode_text(text: &str) -> ProtocolResult<Message> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    if text.trim().is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }

    let envelope: Envelope = serde_json::from_str(text)?;
    let Ok(kind) = envelope.kind.parse::<MessageType>() else {
        return Ok(Message::Relay(envelope));
    };

    let payload = envelope.payload;
    let message = match kind {
        MessageType::RequestAvailability => {
            Message::request_availability(typed::<AvailabilityRequest>(kind, payload)?)?
        }
        MessageType::AvailabilityResponse => {
            Message::AvailabilityResponse(typed::<AvailabilityResponse>(kind, payload)?)
        }
        MessageType::UpdateAvailability => {
            Message::update_availability(typed::<UpdateEventsRequest>(kind, payload)?)?
        }
        MessageType::EventsUpdated => {
            typed::<()>(kind, payload)?;
            Message::EventsUpdated
        }
    };
    Ok(message)
}

fn typed<T: serde::de::DeserializeOwned>(
    kind: MessageType,
    payload: serde_json::Value,
) -> ProtocolResult<T> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::InvalidPayload {
        kind: kind.as_str(),
        source,
    })
}

/// Encodes a message as a text frame.
pub fn encode_text(message: &Message) -> ProtocolResult<String> {
    let text = match message {
        Message::RequestAvailability { request, .. } => {
            outgoing(MessageType::RequestAvailability, request)
        }
        Message::AvailabilityResponse(payload) => {
            outgoing(MessageType::AvailabilityResponse, payload)
        }
        Message::UpdateAvailability { request, .. } => {
            outgoing(MessageType::UpdateAvailability, request)
        }
        Message::EventsUpdated => outgoing(MessageType::EventsUpdated, &()),
        Message::Relay(envelope) => serde_json::to_string(envelope),
    }?;

    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: text.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(text)
}

fn outgoing<T: Serialize>(kind: MessageType, payload: &T) -> serde_json::Result<String> {
    serde_json::to_string(&Outgoing { kind, payload })
}
