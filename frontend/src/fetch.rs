use async_trait::async_trait;
use client::{HttpRequest, HttpResponse, Transport, TransportError, DEFAULT_BASE_URL};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

/// Browser `fetch` against the fixed backend address.
#[derive(Debug, Clone)]
pub struct FetchTransport {
    base_url: String,
}

impl Default for FetchTransport {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn failed(what: &str) -> TransportError {
    TransportError(what.to_string())
}

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        if let Some(body) = &request.body {
            opts.set_body(&JsValue::from_str(body));
        }

        let url = format!("{}{}", self.base_url, request.path);
        let fetch_request = Request::new_with_str_and_init(&url, &opts)
            .map_err(|_| failed("Failed to create request"))?;

        let headers = fetch_request.headers();
        if request.body.is_some() {
            headers
                .set("Content-Type", "application/json")
                .map_err(|_| failed("Failed to set header"))?;
        }
        if let Some(token) = &request.bearer {
            headers
                .set("Authorization", &format!("Bearer {token}"))
                .map_err(|_| failed("Failed to set header"))?;
        }

        let window = web_sys::window().ok_or_else(|| failed("No window"))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&fetch_request))
            .await
            .map_err(|_| failed("Failed to fetch"))?
            .into();

        let text_promise = response.text().map_err(|_| failed("Failed to read response"))?;
        let body = JsFuture::from(text_promise)
            .await
            .map_err(|_| failed("Failed to get text"))?
            .as_string()
            .ok_or_else(|| failed("Failed to convert to string"))?;

        Ok(HttpResponse {
            status: response.status(),
            body,
        })
    }
}
