use async_trait::async_trait;
use dpdrbot_core::{AssistantBackend, Role, RunId, RunRequest, RunStatus, ThreadId, ThreadMessage};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: String,
    #[serde(default)]
    last_error: Option<LastError>,
}

#[derive(Debug, Deserialize)]
struct LastError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

fn map_status(run: RunObject) -> RunStatus {
    match run.status.as_str() {
        "completed" => RunStatus::Completed,
        "failed" => {
            let reason = run
                .last_error
                .and_then(|e| e.message.or(e.code))
                .unwrap_or_else(|| "unknown error".to_string());
            RunStatus::Failed { reason }
        }
        "cancelled" | "expired" | "incomplete" => RunStatus::Failed { reason: run.status },
        _ => RunStatus::Submitted,
    }
}

fn map_message(message: MessageObject) -> Option<ThreadMessage> {
    let role = match message.role.as_str() {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };
    let text = message
        .content
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.value),
            ContentPart::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(ThreadMessage { role, text })
}

/// Client for the Assistants thread/run API (v2).
#[derive(Clone)]
pub struct OpenAIAssistantsProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIAssistantsProvider {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        info!("Creating OpenAIAssistantsProvider");
        let mut headers = HeaderMap::new();
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and decode its JSON body, surfacing API error messages.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            anyhow::bail!("assistant API returned {status}: {detail}");
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantBackend for OpenAIAssistantsProvider {
    async fn create_thread(&self) -> anyhow::Result<ThreadId> {
        let created: Created = self
            .send(self.client.post(self.url("/threads")).json(&json!({})))
            .await?;
        info!("Created thread {}", created.id);
        Ok(ThreadId(created.id))
    }

    async fn append_message(
        &self,
        thread: &ThreadId,
        role: Role,
        text: &str,
    ) -> anyhow::Result<()> {
        let _: Created = self
            .send(
                self.client
                    .post(self.url(&format!("/threads/{thread}/messages")))
                    .json(&json!({ "role": role.as_str(), "content": text })),
            )
            .await?;
        debug!("Appended {} message to thread {thread}", role.as_str());
        Ok(())
    }

    async fn create_run(&self, thread: &ThreadId, request: &RunRequest) -> anyhow::Result<RunId> {
        info!(
            "Creating run on thread {thread}: model={}, temperature={}",
            request.model, request.temperature
        );
        let created: Created = self
            .send(
                self.client
                    .post(self.url(&format!("/threads/{thread}/runs")))
                    .json(request),
            )
            .await?;
        Ok(RunId(created.id))
    }

    async fn run_status(&self, thread: &ThreadId, run: &RunId) -> anyhow::Result<RunStatus> {
        let object: RunObject = self
            .send(
                self.client
                    .get(self.url(&format!("/threads/{thread}/runs/{run}"))),
            )
            .await?;
        debug!("Run {run} status: {}", object.status);
        Ok(map_status(object))
    }

    async fn list_messages(&self, thread: &ThreadId) -> anyhow::Result<Vec<ThreadMessage>> {
        let list: MessageList = self
            .send(
                self.client
                    .get(self.url(&format!("/threads/{thread}/messages?order=desc"))),
            )
            .await?;
        Ok(list.data.into_iter().filter_map(map_message).collect())
    }
}
