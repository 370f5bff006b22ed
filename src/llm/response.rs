use std::time::Duration;

use async_openai::{
    config::{Config, OpenAIConfig},
    error::{ApiError, OpenAIError, WrappedError},
    types::responses::{
        CreateResponseArgs, InputMessage, InputRole, OutputItem, OutputMessageContent, Response,
    },
};
use reqwest::{
    StatusCode,
    header::{HeaderMap, RETRY_AFTER},
};

use super::error::{CompletionError, parse_retry_after};

const MAX_OUTPUT_TOKENS: u32 = 8192;
const RESPONSES_PATH: &str = "/responses";
const MODELS_PATH: &str = "/models";
const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

impl From<OpenAIError> for CompletionError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::ApiError(api_error) if is_rate_limit_code(&api_error) => {
                CompletionError::RateLimited {
                    retry_after: parse_retry_after(&api_error.message),
                    message: api_error.to_string(),
                }
            }
            other => CompletionError::from_message(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::from_message(err.to_string())
    }
}

fn is_rate_limit_code(api_error: &ApiError) -> bool {
    api_error.code.as_deref() == Some(RATE_LIMIT_CODE)
        || api_error.r#type.as_deref() == Some(RATE_LIMIT_CODE)
}

/// Sends `prompt` as a single user message and returns the first non-empty
/// text item of the reply.
///
/// The request is issued once. Error statuses come back as
/// [`CompletionError::Status`] or [`CompletionError::RateLimited`], the latter
/// carrying the `Retry-After` header when the server sent one.
pub async fn request_single_text_response(
    http: &reqwest::Client,
    config: &OpenAIConfig,
    model: &str,
    prompt: &str,
) -> Result<String, CompletionError> {
    let request = CreateResponseArgs::default()
        .model(model)
        .max_output_tokens(MAX_OUTPUT_TOKENS)
        .input(vec![InputMessage {
            role: InputRole::User,
            content: vec![prompt.into()],
            status: None,
        }])
        .build()?;

    let request = http
        .post(config.url(RESPONSES_PATH))
        .query(&config.query())
        .headers(config.headers())
        .json(&request);
    let body = send_once(request).await?;

    let response: Response = serde_json::from_str(&body).map_err(|err| {
        CompletionError::Request(format!("failed to decode model response: {err}"))
    })?;
    first_text(response)
}

/// Lists the endpoint's models, discarding the reply.
pub async fn list_models(
    http: &reqwest::Client,
    config: &OpenAIConfig,
) -> Result<(), CompletionError> {
    let request = http
        .get(config.url(MODELS_PATH))
        .query(&config.query())
        .headers(config.headers());
    send_once(request).await.map(drop)
}

/// Sends a request without retrying and returns the body of a successful
/// reply.
async fn send_once(request: reqwest::RequestBuilder) -> Result<String, CompletionError> {
    let reply = request.send().await?;
    let status = reply.status();
    let retry_after = retry_after_header(reply.headers());
    let body = reply.text().await?;
    if !status.is_success() {
        return Err(status_error(status, retry_after, &body));
    }
    Ok(body)
}

fn first_text(response: Response) -> Result<String, CompletionError> {
    for item in response.output {
        if let OutputItem::Message(message) = item {
            for content in message.content {
                if let OutputMessageContent::OutputText(text) = content {
                    let trimmed = text.text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Ok(trimmed.to_string());
                }
            }
        }
    }

    Err(CompletionError::EmptyResponse)
}

/// Seconds form of `Retry-After`. HTTP dates are ignored.
fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = value.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> CompletionError {
    let api_error = serde_json::from_str::<WrappedError>(body)
        .ok()
        .map(|wrapped| wrapped.error);
    let message = match &api_error {
        Some(api_error) => api_error.to_string(),
        None => body.trim().to_string(),
    };

    let rate_limited =
        status == StatusCode::TOO_MANY_REQUESTS || api_error.as_ref().is_some_and(is_rate_limit_code);
    if rate_limited {
        return CompletionError::RateLimited {
            retry_after: retry_after.or_else(|| parse_retry_after(&message)),
            message,
        };
    }

    CompletionError::Status {
        status: status.as_u16(),
        message,
    }
}
