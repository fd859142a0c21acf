use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app::ChatTurn;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
}

/// Answer from the chatbot endpoint. The endpoint signals failures in
/// the JSON body (`error`), not in the status line; a body that parses
/// with neither field is a valid "no answer" response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    pub error: Option<String>,
    pub reply: Option<String>,
}

#[derive(Clone)]
pub struct ChatbotClient {
    client: Client,
    base_url: String,
}

impl ChatbotClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sends the newest user turn together with the whole history.
    /// Exactly one request per submission; any transport failure or
    /// non-JSON body surfaces as an error.
    pub async fn send(&self, history: &[ChatTurn]) -> Result<ChatReply> {
        let url = format!("{}/shop/chatbot", self.base_url);

        let message = history
            .last()
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();

        let request = ChatRequest { message, history };

        let response = self.client.post(&url).json(&request).send().await?;

        let reply: ChatReply = response.json().await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ChatRole;

    #[test]
    fn test_request_wire_shape() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                content: "Sveiki".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                content: "Labdien!".to_string(),
            },
            ChatTurn {
                role: ChatRole::User,
                content: "Kādas preces ir pieejamas?".to_string(),
            },
        ];
        let request = ChatRequest {
            message: &history.last().unwrap().content,
            history: &history,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], "Kādas preces ir pieejamas?");
        assert_eq!(value["history"].as_array().unwrap().len(), 3);
        assert_eq!(value["history"][0]["role"], "user");
        assert_eq!(value["history"][1]["role"], "assistant");
        assert_eq!(value["history"][2]["content"], "Kādas preces ir pieejamas?");
    }

    #[test]
    fn test_reply_parses_reply_field() {
        let reply: ChatReply = serde_json::from_str(r#"{"reply": "Labdien!"}"#).unwrap();
        assert_eq!(reply.reply.as_deref(), Some("Labdien!"));
        assert!(reply.error.is_none());
    }

    #[test]
    fn test_reply_parses_error_field() {
        let reply: ChatReply = serde_json::from_str(r#"{"error": "bad input"}"#).unwrap();
        assert_eq!(reply.error.as_deref(), Some("bad input"));
        assert!(reply.reply.is_none());
    }

    #[test]
    fn test_reply_parses_empty_object() {
        let reply: ChatReply = serde_json::from_str("{}").unwrap();
        assert!(reply.reply.is_none());
        assert!(reply.error.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ChatbotClient::new("http://localhost:5000/");
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
