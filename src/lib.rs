#![cfg_attr(doc, doc = include_str!("../README.md"))]

#[cfg(feature = "chat")]
pub mod chat;
pub mod error;
pub(crate) mod serde_helpers;
#[cfg(feature = "ws")]
pub mod ws;

use std::fmt::Write as _;

#[cfg(feature = "chat")]
use reqwest::{Request, StatusCode, header::HeaderMap};
use serde::Serialize;
#[cfg(feature = "chat")]
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable overriding the REST API base URL.
pub const API_URL_VAR: &str = "PEERCHAT_API_URL";

/// Environment variable overriding the WebSocket base URL.
pub const WS_URL_VAR: &str = "PEERCHAT_WS_URL";

/// Default REST API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.peerchat.app";

/// Default WebSocket endpoint. The session identity is appended as a
/// `userId` query parameter, see [`session_endpoint`].
pub const DEFAULT_WS_ENDPOINT: &str = "wss://chat.peerchat.app/ws";

/// Build the WebSocket URL for one chat session.
///
/// The server scopes a connection to a single user identity via the
/// `userId` query parameter; the path of `base` is left untouched.
///
/// # Errors
///
/// Returns a [`Kind::Internal`](error::Kind::Internal) error when `base` is
/// not a valid URL.
pub fn session_endpoint(base: &str, user_id: &str) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("userId", user_id);
    Ok(url.into())
}

/// Trait for converting request types to URL query parameters.
///
/// This trait is automatically implemented for all types that implement
/// [`Serialize`]. It uses [`serde_html_form`] to serialize the struct fields
/// into a query string. Arrays are serialized as repeated keys
/// (`key=val1&key=val2`).
pub trait ToQueryParams: Serialize {
    /// Converts the request to a URL query string.
    ///
    /// Returns an empty string if no parameters are set, otherwise returns
    /// a string starting with `?` followed by URL-encoded key-value pairs.
    /// Also uses an optional cursor as a parameter, if provided.
    fn query_params(&self, next_cursor: Option<&str>) -> String {
        let mut params = serde_html_form::to_string(self)
            .inspect_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::error!("Unable to convert to URL-encoded string {e:?}");
                #[cfg(not(feature = "tracing"))]
                let _: &serde_html_form::ser::Error = e;
            })
            .unwrap_or_default();

        if let Some(cursor) = next_cursor {
            if !params.is_empty() {
                params.push('&');
            }
            let _ = write!(params, "next_cursor={cursor}");
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{params}")
        }
    }
}

impl<T: Serialize> ToQueryParams for T {}

#[cfg(feature = "chat")]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip(client, request, headers),
        fields(
            method = %request.method(),
            path = request.url().path(),
            status_code
        )
    )
)]
async fn request<Response: DeserializeOwned>(
    client: &reqwest::Client,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Response> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        *request.headers_mut() = h;
    }

    let response = client.execute(request).await?;
    let status_code = response.status();

    #[cfg(feature = "tracing")]
    tracing::Span::current().record("status_code", status_code.as_u16());

    if !status_code.is_success() {
        let message = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::warn!(
            status = %status_code,
            method = %method,
            path = %path,
            message = %message,
            "API request failed"
        );

        return Err(Error::status(status_code, method, path, message));
    }

    let json_value = response.json::<serde_json::Value>().await?;
    let response_data: Option<Response> = serde_helpers::deserialize_with_warnings(json_value)?;

    if let Some(response) = response_data {
        Ok(response)
    } else {
        #[cfg(feature = "tracing")]
        tracing::warn!(method = %method, path = %path, "API resource not found");
        Err(Error::status(
            StatusCode::NOT_FOUND,
            method,
            path,
            "Unable to find requested resource",
        ))
    }
}
