//! Browser file handling around import and export.

use shared::codec::EXPORT_MIME_TYPE;
use shared::validate::FileMeta;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, File, HtmlAnchorElement, Url};

pub fn file_meta(file: &File) -> FileMeta {
    FileMeta::new(file.name(), file.type_(), file.size() as u64)
}

pub async fn read_file_text(file: &File) -> Result<String, JsValue> {
    JsFuture::from(file.text())
        .await?
        .as_string()
        .ok_or_else(|| JsValue::from_str("File content is not text"))
}

/// Offer `contents` as a download named `file_name`.
pub fn save_text_file(contents: &str, file_name: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = BlobPropertyBag::new();
    options.set_type(EXPORT_MIME_TYPE);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document available"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("Document has no body"))?;

    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    body.append_child(&anchor)?;
    anchor.click();
    body.remove_child(&anchor)?;

    Url::revoke_object_url(&url)
}
