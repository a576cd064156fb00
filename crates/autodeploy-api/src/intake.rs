//! Decides what happens to an inbound webhook delivery.
//!
//! Verification, parsing and filtering run here in that order, with no I/O,
//! so the whole request path can be tested without a socket.

use autodeploy_core::{
    EventFilter, FilterDecision, FilterError, ParseError, PushEvent, SignatureError,
    WebhookSecret, parse_event, verify_signature,
};
use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// The parts of a delivery intake looks at.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub event_type: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub delivery: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> WebhookRequest<'a> {
    pub fn from_parts(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            event_type: header(EVENT_HEADER),
            signature: header(SIGNATURE_HEADER),
            delivery: header(DELIVERY_HEADER),
            body,
        }
    }
}

/// Outcome of intake for one delivery.
#[derive(Debug)]
pub enum Intake {
    /// Push to the deploy branch; queue it.
    Enqueue { event: PushEvent, branch: String },
    /// Authentic but nothing to do.
    Ignore(Ignored),
    /// The delivery is not acceptable.
    Reject(IntakeError),
}

impl Intake {
    /// Response status for this outcome.
    pub fn status(&self) -> StatusCode {
        match self {
            Intake::Enqueue { .. } | Intake::Ignore(_) => StatusCode::OK,
            Intake::Reject(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    UnsupportedEventType(String),
    OtherBranch { branch: String },
}

impl std::fmt::Display for Ignored {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ignored::UnsupportedEventType(event_type) => {
                write!(f, "event type {event_type:?} is not handled")
            }
            Ignored::OtherBranch { branch } => write!(f, "push to {branch}, not deploying"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("payload validation failed: {0}")]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("expected repository {expected} but got {actual}")]
    ForeignRepository { expected: String, actual: String },
}

/// Run a delivery through verification, parsing and filtering.
pub fn evaluate(
    filter: &EventFilter,
    secret: &WebhookSecret,
    request: &WebhookRequest<'_>,
) -> Intake {
    let payload = match verify_signature(request.body, request.signature, secret) {
        Ok(payload) => payload,
        Err(e) => return Intake::Reject(e.into()),
    };

    let event = match parse_event(request.event_type, payload, request.delivery) {
        Ok(event) => event,
        Err(ParseError::UnsupportedEventType(event_type)) => {
            return Intake::Ignore(Ignored::UnsupportedEventType(event_type));
        }
        Err(e) => return Intake::Reject(e.into()),
    };

    match filter.evaluate(&event) {
        Ok(FilterDecision::Deploy { branch }) => Intake::Enqueue { event, branch },
        Ok(FilterDecision::OtherBranch { branch }) => {
            Intake::Ignore(Ignored::OtherBranch { branch })
        }
        Ok(FilterDecision::ForeignRepository { expected, actual }) => {
            Intake::Reject(IntakeError::ForeignRepository { expected, actual })
        }
        Err(e) => Intake::Reject(e.into()),
    }
}
