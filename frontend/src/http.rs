use log::debug;
use serde::Serialize;
use shared::{CreateTaskRequest, DeleteTaskRequest, Task, UpdateTaskRequest};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::config::ApiConfig;
use crate::store::{StoreError, TaskStore};

/// `TaskStore` backed by the browser's `fetch`.
#[derive(Debug, Clone, Default)]
pub struct HttpStore {
    config: ApiConfig,
}

impl HttpStore {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    async fn get(&self, path: &str) -> Result<String, StoreError> {
        self.send("GET", path, None).await
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, StoreError> {
        let body = serde_json::to_string(body)?;
        self.send("POST", path, Some(body)).await
    }

    async fn send(&self, method: &str, path: &str, body: Option<String>) -> Result<String, StoreError> {
        let url = self.config.endpoint(path);
        debug!("{} {} {}", method, url, body.as_deref().unwrap_or(""));

        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(RequestMode::Cors);
        if let Some(body) = &body {
            opts.set_body(&JsValue::from_str(body));
        }

        let request = Request::new_with_str_and_init(&url, &opts)
            .map_err(|e| transport("Failed to create request", e))?;
        if body.is_some() {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(|e| transport("Failed to set header", e))?;
        }

        let window = web_sys::window()
            .ok_or_else(|| StoreError::Transport("no browser window".to_string()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| transport("Failed to send request", e))?
            .into();

        let text_promise = response
            .text()
            .map_err(|e| transport("Failed to read response", e))?;
        let text = JsFuture::from(text_promise)
            .await
            .map_err(|e| transport("Failed to get text", e))?
            .as_string()
            .unwrap_or_default();

        debug!("{} {} -> {}", method, url, response.status());
        if !response.ok() {
            return Err(StoreError::Status {
                status: response.status(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn transport(context: &str, error: JsValue) -> StoreError {
    StoreError::Transport(format!("{}: {:?}", context, error))
}

impl TaskStore for HttpStore {
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let text = self.get("all").await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn create(&self, request: &CreateTaskRequest) -> Result<Task, StoreError> {
        let text = self.post("add", request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn update(&self, request: &UpdateTaskRequest) -> Result<(), StoreError> {
        self.post("update", request).await.map(drop)
    }

    async fn delete(&self, request: &DeleteTaskRequest) -> Result<(), StoreError> {
        self.post("delete", request).await.map(drop)
    }

    async fn import(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.post("import", tasks).await.map(drop)
    }
}
