use serde::Deserialize;

/// Top-level Meta webhook envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Sender phone number, digits only (Meta omits the `+`).
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<TextBody>,
}

impl Message {
    /// The text body for `type = "text"` messages.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        if self.message_type == "text" {
            self.text.as_ref().map(|t| t.body.as_str())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Delivery/read status update.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

impl WebhookPayload {
    /// The first change value in the envelope, which is where Meta puts
    /// message deliveries.
    #[must_use]
    pub fn first_value(&self) -> Option<&ChangeValue> {
        self.entry.first()?.changes.first()?.value.as_ref()
    }

    /// Sender display name from the contacts block, when present.
    #[must_use]
    pub fn sender_name(&self, wa_id: &str) -> Option<&str> {
        self.first_value()?
            .contacts
            .iter()
            .find(|c| c.wa_id == wa_id)
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.as_str())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_message_envelope() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": {"phone_number_id": "106540352242922"},
                        "contacts": [{"wa_id": "5511999999999", "profile": {"name": "Maria"}}],
                        "messages": [{
                            "from": "5511999999999",
                            "id": "wamid.xyz",
                            "timestamp": "1688000000",
                            "type": "text",
                            "text": {"body": "hello"}
                        }]
                    }
                }]
            }]
        }))
        .unwrap();

        let value = payload.first_value().unwrap();
        assert_eq!(value.metadata.as_ref().unwrap().phone_number_id, "106540352242922");
        assert_eq!(value.messages[0].text_body(), Some("hello"));
        assert_eq!(payload.sender_name("5511999999999"), Some("Maria"));
    }

    #[test]
    fn non_text_message_has_no_body() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "from": "5511999999999",
            "id": "wamid.img",
            "type": "image"
        }))
        .unwrap();
        assert_eq!(message.text_body(), None);
    }

    #[test]
    fn empty_envelope_is_tolerated() {
        let payload: WebhookPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.first_value().is_none());
    }
}
