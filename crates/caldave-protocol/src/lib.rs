//! WebSocket message protocol for caldave.
//!
//! Every text frame carries one JSON envelope:
//!
//! ```text
//! {"type": "<MESSAGE_TYPE>", "payload": <type-dependent>}
//! ```
//!
//! | type                    | payload                                      |
//! |-------------------------|----------------------------------------------|
//! | `REQUEST_AVAILABILITY`  | `{"date": "YYYY-MM-DD"}`                     |
//! | `AVAILABILITY_RESPONSE` | `{"date": ..., "availableTimes": [...]}`     |
//! | `UPDATE_AVAILABILITY`   | `{"startDate": ..., "endDate": ...}`         |
//! | `EVENTS_UPDATED`        | `null`                                       |
//!
//! Any other `type` is passed through untouched.
//!
//! # Example
//!
//! ```rust
//! use caldave_protocol::{decode_text, encode_text, Message};
//!
//! let text = encode_text(&Message::EventsUpdated).unwrap();
//! assert_eq!(decode_text(&text).unwrap(), Message::EventsUpdated);
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode_text, encode_text};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{
    AvailabilityRequest, AvailabilityResponse, Envelope, Message, MessageType,
    UpdateEventsRequest,
};

/// Maximum inbound or outbound frame size (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
