use async_trait::async_trait;
use std::collections::HashMap;

use crate::{
    error::{ConduitError, Result},
    response::Response,
};

/// Raw callback parameters as posted by the USSD gateway
pub type RawRequest = HashMap<String, String>;

/// Identity and input extracted from one gateway callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    pub session_id: String,
    pub subscriber_id: String,
    pub routing_key: String,
    pub network_code: Option<String>,
    /// Everything the subscriber typed so far, `*` separated
    pub raw_input: Option<String>,
    /// Latest input only
    pub input: Option<String>,
}

/// Translates between a gateway's wire format and the engine
#[async_trait]
pub trait Provider: Send + Sync {
    async fn parse(&self, raw: &RawRequest) -> Result<ParsedRequest>;
    async fn format(&self, response: &Response) -> Result<String>;
}

/// Digits only
pub fn normalize_phone_number(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Last `*`-separated token of the cumulative input, or `None` when nothing
/// has been typed yet. Trailing separators are ignored.
pub fn latest_input(text: &str) -> Option<String> {
    let text = text.trim().trim_end_matches('*');
    if text.is_empty() {
        return None;
    }
    text.rsplit('*').next().map(str::to_string)
}

/// Africa's Talking USSD gateway
#[derive(Debug, Default, Clone, Copy)]
pub struct AfricasTalkingProvider;

impl AfricasTalkingProvider {
    pub fn new() -> Self {
        Self
    }
}

fn required<'a>(raw: &'a RawRequest, field: &str) -> Result<&'a str> {
    raw.get(field)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConduitError::MalformedRequest(format!("missing '{field}'")))
}

#[async_trait]
impl Provider for AfricasTalkingProvider {
    async fn parse(&self, raw: &RawRequest) -> Result<ParsedRequest> {
        let text = raw.get("text").cloned();
        Ok(ParsedRequest {
            session_id: required(raw, "sessionId")?.to_string(),
            subscriber_id: normalize_phone_number(required(raw, "phoneNumber")?),
            routing_key: required(raw, "serviceCode")?.to_string(),
            network_code: raw.get("networkCode").cloned(),
            input: text.as_deref().and_then(latest_input),
            raw_input: text,
        })
    }

    async fn format(&self, response: &Response) -> Result<String> {
        let prefix = if response.is_end() { "END" } else { "CON" };
        Ok(format!("{prefix} {}", response.text()))
    }
}
