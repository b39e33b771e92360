//! Scripted transport for unit tests

use std::collections::{BTreeMap, VecDeque};

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::RequestError;

/// A request as it left the client, with the access cookie at send time
#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub request: HttpRequest,
    pub token: Option<String>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: VecDeque<Result<HttpResponse, RequestError>>,
    cookies: BTreeMap<String, String>,
    pub sent: Vec<SentRequest>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, response: HttpResponse) -> Self {
        self.responses.push_back(Ok(response));
        self
    }

    pub fn fail(mut self, error: RequestError) -> Self {
        self.responses.push_back(Err(error));
        self
    }

    pub fn push(&mut self, response: HttpResponse) {
        self.responses.push_back(Ok(response));
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        self.sent.push(SentRequest {
            request: request.clone(),
            token: self.cookies.get("token").cloned(),
        });
        self.responses
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Transport("script exhausted".to_string())))
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }
}

pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

/// Token-expired response setting the given `(name, value)` cookies
pub(crate) fn rotation_response(cookies: &[(&str, &str)]) -> HttpResponse {
    let mut response = HttpResponse::new(426, "");
    response.cookies = cookies
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    response
}

/// Board response from `columns[x][y]` and a two-color palette (ids 1 and 2)
pub(crate) fn board_response(columns: &[&[u32]]) -> HttpResponse {
    let board: Vec<Vec<serde_json::Value>> = columns
        .iter()
        .map(|column| {
            column
                .iter()
                .map(|id| serde_json::json!({ "color_id": id }))
                .collect()
        })
        .collect();
    json_response(
        200,
        serde_json::json!({
            "board": board,
            "colors": [
                { "id": 1, "red": 255, "green": 255, "blue": 255 },
                { "id": 2, "red": 0, "green": 0, "blue": 0 },
            ],
        }),
    )
}

pub(crate) fn profile_response(timers: &[String]) -> HttpResponse {
    json_response(
        200,
        serde_json::json!({
            "userInfos": { "timers": timers, "pixel_buffer": 0, "username": "tester", "id": 7 }
        }),
    )
}
