use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("window is not available")]
    NoWindow,
    #[error("document is not available")]
    NoDocument,
    #[error("missing element: {0}")]
    MissingElement(&'static str),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("javascript error: {0}")]
    Js(String),
    #[error("invalid site config: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<JsValue> for PageError {
    fn from(value: JsValue) -> Self {
        match value.as_string() {
            Some(message) => PageError::Js(message),
            None => PageError::Js(format!("{:?}", value)),
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;
