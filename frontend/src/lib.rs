pub mod config;
pub mod controller;
pub mod error;
pub mod store;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
pub mod files;
#[cfg(target_arch = "wasm32")]
pub mod http;

#[cfg(target_arch = "wasm32")]
pub use app::TodoApp;
pub use config::ApiConfig;
pub use controller::{FailurePolicy, Operation, TaskController};
pub use error::TodoError;
pub use store::{StoreError, TaskStore};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
}
