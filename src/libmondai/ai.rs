//! DashScope multimodal-generation client and the JSON contract of its reply.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "qwen-vl-max-latest";
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
const GENERATION_PATH: &str = "/services/aigc/multimodal-generation/generation";

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const INSTRUCTION: &str = "请以JSON格式回答图片中的问题。\
如果是选择题，则返回{\"question\": \"问题\", \"answer\": [\"选项（A/B/C/...）\"]}，选项为圆形则为单选，选项为矩形则为多选；\
如果是填空题，则返回{\"question\": \"问题\", \"answer\": [\"填空1答案\", \"填空2答案\", ...]}；\
如果是主观题，则返回{\"question\": \"问题\", \"answer\": [\"主观题答案\"]}";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("cannot read image {path:?}: {source}")]
    ImageRead { path: PathBuf, source: io::Error },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected response: {0}")]
    Envelope(String),
    #[error("{0}")]
    ReplyParse(#[source] serde_json::Error),
}

/// What the model is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AiReply {
    #[serde(default)]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn parse_reply(text: &str) -> Result<AiReply, AiError> {
    serde_json::from_str(text.trim()).map_err(AiError::ReplyParse)
}

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub credential: String,
    pub image: PathBuf,
}

/// Anything that can show an image to a vision model and hand back the raw
/// text of its reply.
pub trait VisionClient: Send + Sync + 'static {
    fn ask(&self, request: &VisionRequest) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct DashScopeClient {
    http: reqwest::blocking::Client,
    model: String,
    base_url: String,
}

impl DashScopeClient {
    pub fn new(model: &str, base_url: &str, timeout: Option<Duration>) -> Result<Self, AiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl VisionClient for DashScopeClient {
    fn ask(&self, request: &VisionRequest) -> Result<String, AiError> {
        let image = image_data_uri(&request.image)?;
        let body = build_request(&self.model, image);
        let url = format!("{}{}", self.base_url, GENERATION_PATH);
        debug!("[AI] POST {} (model {})", url, self.model);

        let response = self
            .http
            .post(url)
            .bearer_auth(&request.credential)
            .json(&body)
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            warn!("[AI] Service answered {}", status);
            return Err(service_error(status.as_u16(), &text));
        }
        reply_text(&text)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationInput {
    messages: Vec<GenerationMessage>,
}

#[derive(Debug, Serialize)]
struct GenerationMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ContentPart {
    Text(String),
    Image(String),
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    response_format: ResponseFormat,
    vl_high_resolution_images: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

fn build_request(model: &str, image: String) -> GenerationRequest<'_> {
    GenerationRequest {
        model,
        input: GenerationInput {
            messages: vec![
                GenerationMessage {
                    role: "system",
                    content: vec![ContentPart::Text(SYSTEM_PROMPT.to_string())],
                },
                GenerationMessage {
                    role: "user",
                    content: vec![
                        ContentPart::Image(image),
                        ContentPart::Text(INSTRUCTION.to_string()),
                    ],
                },
            ],
        },
        parameters: GenerationParameters {
            response_format: ResponseFormat {
                kind: "json_object",
            },
            vl_high_resolution_images: true,
        },
    }
}

fn image_data_uri(path: &Path) -> Result<String, AiError> {
    let bytes = fs::read(path).map_err(|source| AiError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for(path),
        STANDARD.encode(bytes)
    ))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceFailure {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn reply_text(body: &str) -> Result<String, AiError> {
    let response: GenerationResponse =
        serde_json::from_str(body).map_err(|e| AiError::Envelope(e.to_string()))?;
    let choice = response
        .output
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Envelope(String::from("no choices in output")))?;
    choice
        .message
        .content
        .into_iter()
        .find_map(|part| part.text)
        .ok_or_else(|| AiError::Envelope(String::from("no text in reply message")))
}

fn service_error(status: u16, body: &str) -> AiError {
    match serde_json::from_str::<ServiceFailure>(body) {
        Ok(failure) => AiError::Service {
            status,
            code: failure.code,
            message: failure.message,
        },
        Err(_) => AiError::Service {
            status,
            code: String::new(),
            message: body.to_string(),
        },
    }
}
