//! Event envelope: the canonical, transport-independent unit of work.
//!
//! Envelopes are built once by a transport adapter and never mutated
//! afterwards. Fields are private; the only ways in are [`Envelope::new`]
//! (plus the `with_*` builders) and the decoding paths in this module.

use serde::{Deserialize, Serialize};

use crate::types::Payload;

/// Errors raised while turning wire input into an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Input is not well-formed structured data.
    #[error("invalid event encoding: {0}")]
    Decode(String),
    /// A required field is absent.
    #[error("missing required field `{field}`")]
    Validation { field: String },
}

impl EnvelopeError {
    /// Missing-field error for the given field path.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Prefixes the field path with a batch position, e.g. `events[2].channel`.
    #[must_use]
    pub fn at_index(self, index: usize) -> Self {
        match self {
            Self::Validation { field } => Self::Validation {
                field: format!("events[{index}].{field}"),
            },
            other => other,
        }
    }
}

/// One event, independent of the transport it arrived on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    id: String,
    app_id: String,
    channel: String,
    #[serde(rename = "type")]
    event_type: String,
    data: Payload,
    meta: Payload,
}

impl Envelope {
    /// Creates an envelope with the given identity and routing channel and
    /// empty `type`, `data`, and `meta`.
    pub fn new(id: impl Into<String>, app_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            app_id: app_id.into(),
            channel: channel.into(),
            event_type: String::new(),
            data: Payload::new(),
            meta: Payload::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: Payload) -> Self {
        self.meta = meta;
        self
    }

    /// Decodes a JSON object (the `POST /process` body) into an envelope.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::Decode`] when `bytes` is not a JSON object of the
    /// expected shape, [`EnvelopeError::Validation`] when `channel` is absent.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let wire: WireEvent =
            serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        Self::try_from(wire)
    }

    /// Serializes the envelope to the same JSON object shape accepted by
    /// [`Envelope::from_json_slice`].
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures (not expected for well-formed values).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[must_use]
    pub fn data(&self) -> &Payload {
        &self.data
    }

    #[must_use]
    pub fn meta(&self) -> &Payload {
        &self.meta
    }
}

/// Wire shape of an event before validation.
///
/// Shared by the JSON body of the HTTP transport and the `MsgPack` body of the
/// RPC transport so that both apply identical defaulting and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "appId")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Payload,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub meta: Payload,
}

impl TryFrom<WireEvent> for Envelope {
    type Error = EnvelopeError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let channel = wire.channel.ok_or_else(|| EnvelopeError::missing("channel"))?;
        Ok(Self {
            id: wire.id,
            app_id: wire.app_id,
            channel,
            event_type: wire.event_type,
            data: wire.data,
            meta: wire.meta,
        })
    }
}

impl From<&Envelope> for WireEvent {
    fn from(env: &Envelope) -> Self {
        Self {
            id: env.id.clone(),
            app_id: env.app_id.clone(),
            channel: Some(env.channel.clone()),
            event_type: env.event_type.clone(),
            data: env.data.clone(),
            meta: env.meta.clone(),
        }
    }
}

/// Treats an explicit `null` mapping the same as an absent one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Payload, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Payload>::deserialize(deserializer)?.unwrap_or_default())
}

/// Validates a decoded sequence of wire events, reporting the first
/// offending position.
///
/// # Errors
///
/// [`EnvelopeError::Validation`] naming `events[i].<field>` for the first
/// event that fails validation.
pub fn envelopes_from_wire(events: Vec<WireEvent>) -> Result<Vec<Envelope>, EnvelopeError> {
    events
        .into_iter()
        .enumerate()
        .map(|(i, wire)| Envelope::try_from(wire).map_err(|e| e.at_index(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn decodes_full_event() {
        let body = br#"{
            "id": "evt-1",
            "app_id": "demo",
            "channel": "ticker:BTCUSD",
            "type": "price",
            "data": {"price": 64000.5},
            "meta": {"trace": "abc"}
        }"#;
        let env = Envelope::from_json_slice(body).unwrap();
        assert_eq!(env.id(), "evt-1");
        assert_eq!(env.app_id(), "demo");
        assert_eq!(env.channel(), "ticker:BTCUSD");
        assert_eq!(env.event_type(), "price");
        assert_eq!(env.data()["price"], Value::Float(64_000.5));
        assert_eq!(env.meta()["trace"], Value::from("abc"));
    }

    #[test]
    fn only_channel_is_required() {
        let env = Envelope::from_json_slice(br#"{"channel": "room:general"}"#).unwrap();
        assert_eq!(env.id(), "");
        assert_eq!(env.app_id(), "");
        assert_eq!(env.event_type(), "");
        assert!(env.data().is_empty());
        assert!(env.meta().is_empty());
    }

    #[test]
    fn null_payloads_become_empty() {
        let env =
            Envelope::from_json_slice(br#"{"channel": "a", "data": null, "meta": null}"#).unwrap();
        assert!(env.data().is_empty());
        assert!(env.meta().is_empty());
    }

    #[test]
    fn missing_channel_is_validation_error() {
        let err = Envelope::from_json_slice(br#"{"id": "x"}"#).unwrap_err();
        assert_eq!(err, EnvelopeError::missing("channel"));
    }

    #[test]
    fn null_channel_is_validation_error() {
        let err = Envelope::from_json_slice(br#"{"channel": null}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::Validation { .. }));
    }

    #[test]
    fn empty_channel_is_accepted() {
        let env = Envelope::from_json_slice(br#"{"channel": ""}"#).unwrap();
        assert_eq!(env.channel(), "");
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = Envelope::from_json_slice(b"{not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn non_object_is_decode_error() {
        let err = Envelope::from_json_slice(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn wrong_field_type_is_decode_error() {
        let err = Envelope::from_json_slice(br#"{"channel": 5}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn json_serialization_matches_decode_shape() {
        let mut data = Payload::new();
        data.insert("qty".to_string(), Value::Int(3));
        let env = Envelope::new("e", "app", "match:42")
            .with_type("fill")
            .with_data(data);

        let json = env.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"id":"e","app_id":"app","channel":"match:42","type":"fill","data":{"qty":3},"meta":{}}"#
        );
        let back = Envelope::from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn batch_validation_names_offending_index() {
        let events = vec![
            WireEvent {
                channel: Some("a".to_string()),
                ..WireEvent::default()
            },
            WireEvent::default(),
        ];
        let err = envelopes_from_wire(events).unwrap_err();
        assert_eq!(err, EnvelopeError::missing("events[1].channel"));
    }

    #[test]
    fn wire_event_from_envelope_carries_channel() {
        let env = Envelope::new("1", "app", "ticker:ETH");
        let wire = WireEvent::from(&env);
        assert_eq!(wire.channel.as_deref(), Some("ticker:ETH"));
        assert_eq!(Envelope::try_from(wire).unwrap(), env);
    }
}
