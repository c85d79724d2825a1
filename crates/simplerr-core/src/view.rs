//! Handler return values.

use serde_json::Value;

use crate::response::Response;

/// What a view hands back to the dispatcher.
///
/// The dispatcher converts the view into a [`Response`] based on the
/// matched route: template routes render `Json`/`None` as context,
/// file routes treat `Text` as a path relative to the site root, and
/// plain routes map `Text` to html and `Json` to a JSON body.
#[derive(Debug)]
pub enum View {
    /// Nothing. Valid only on template routes (empty context);
    /// anywhere else the dispatcher treats it as a server error.
    None,
    /// Plain text, or the file path on `file` routes.
    Text(String),
    /// JSON data, or the template context on template routes.
    Json(Value),
    /// A fully built response, passed through untouched.
    Response(Response),
}

impl From<()> for View {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Value> for View {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Response> for View {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}
