//! Functions the JavaScript UI calls into.

use js_sys::{Array, Promise};
use log::warn;
use shared::validate::validate_file;
use shared::{codec, Filter, TaskId};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::config::ApiConfig;
use crate::controller::TaskController;
use crate::error::TodoError;
use crate::files::{file_meta, read_file_text, save_text_file};
use crate::http::HttpStore;

#[wasm_bindgen]
pub struct TodoApp {
    controller: TaskController<HttpStore>,
}

#[wasm_bindgen]
impl TodoApp {
    #[wasm_bindgen(constructor)]
    pub fn new(api_base: Option<String>) -> TodoApp {
        let store = HttpStore::new(ApiConfig::from_option(api_base));
        TodoApp {
            controller: TaskController::new(store),
        }
    }

    #[wasm_bindgen(js_name = loadAll)]
    pub fn load_all(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.load_all().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn create(&self, name: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let name = name.trim();
            if name.is_empty() {
                warn!("Ignoring blank task name");
            } else {
                controller.create(name).await;
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = toggleCompleted)]
    pub fn toggle_completed(&self, id: TaskId) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.toggle_completed(id).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn remove(&self, id: TaskId) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.remove(id).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn rename(&self, id: TaskId, new_name: String) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                warn!("Ignoring blank name for task {}", id);
            } else {
                controller.rename(id, new_name).await;
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves with the number of imported tasks, rejects with a message to show.
    #[wasm_bindgen(js_name = importFile)]
    pub fn import_file(&self, file: web_sys::File) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            validate_file(&file_meta(&file)).map_err(|e| to_js(e.into()))?;
            let text = read_file_text(&file).await?;
            let count = controller.import_text(&text).await.map_err(to_js)?;
            Ok(JsValue::from(count as u32))
        })
    }

    #[wasm_bindgen(js_name = exportFile)]
    pub fn export_file(&self) -> Result<(), JsValue> {
        let report = self.controller.export_text().map_err(to_js)?;
        let file_name = codec::export_file_name(chrono::Utc::now());
        save_text_file(&report, &file_name)
    }

    pub fn tasks(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.tasks())?)
    }

    #[wasm_bindgen(js_name = visibleTasks)]
    pub fn visible_tasks(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.visible_tasks())?)
    }

    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&self, name: &str) -> Result<(), JsValue> {
        let filter = Filter::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown filter: {}", name)))?;
        self.controller.set_filter(filter);
        Ok(())
    }

    pub fn filter(&self) -> String {
        self.controller.filter().name().to_string()
    }

    #[wasm_bindgen(js_name = filterNames)]
    pub fn filter_names(&self) -> Array {
        Filter::ALL
            .iter()
            .map(|filter| JsValue::from_str(filter.name()))
            .collect()
    }

    /// Heading text, counting the tasks the current filter shows.
    #[wasm_bindgen(js_name = remainingLabel)]
    pub fn remaining_label(&self) -> String {
        let count = self.controller.remaining_count();
        let noun = if count == 1 { "task" } else { "tasks" };
        format!("{} {} remaining", count, noun)
    }
}

fn to_js(error: TodoError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
