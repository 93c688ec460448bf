//! Wire request description handed to the transport collaborator.

use masking::{Maskable, Secret};
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, PosError};

/// Headers attached to an outbound request.
pub type Headers = Vec<(String, Maskable<String>)>;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Method {
    Get,
    Post,
}

/// Body encodings produced by the request formatters. The serialization
/// collaborator (or the provided [`RequestContent::encode_to_string`]) turns
/// the boxed value into the bit-exact wire encoding; XML element order is the
/// struct field order and must be preserved.
pub enum RequestContent {
    /// JSON body
    Json(Box<dyn masking::ErasedMaskSerialize + Send>),
    /// `application/x-www-form-urlencoded` body
    FormUrlEncoded(Box<dyn masking::ErasedMaskSerialize + Send>),
    /// XML body
    Xml(Box<dyn masking::ErasedMaskSerialize + Send>),
}

impl std::fmt::Debug for RequestContent {
    // Bodies carry PANs and credentials; only the variant is ever printed.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json(_) => "JsonRequestBody",
            Self::FormUrlEncoded(_) => "FormUrlEncodedRequestBody",
            Self::Xml(_) => "XmlRequestBody",
        })
    }
}

impl RequestContent {
    /// The `Content-Type` header value matching this body encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::FormUrlEncoded(_) => "application/x-www-form-urlencoded",
            Self::Xml(_) => "text/xml",
        }
    }

    /// Render the body into its wire encoding.
    pub fn encode_to_string(&self) -> CustomResult<Secret<String>, PosError> {
        let rendered = match self {
            Self::Json(body) => serde_json::to_string(&body)
                .map_err(|_| PosError::RequestEncodingFailed)?,
            Self::FormUrlEncoded(body) => serde_urlencoded::to_string(body)
                .map_err(|_| PosError::RequestEncodingFailed)?,
            Self::Xml(body) => quick_xml::se::to_string(&body)
                .map_err(|_| PosError::RequestEncodingFailed)?,
        };
        Ok(Secret::new(rendered))
    }
}

/// A fully described outbound call for the transport collaborator to execute.
#[derive(Debug)]
pub struct Request {
    pub url: String,
    pub headers: Headers,
    pub method: Method,
    pub body: Option<RequestContent>,
}

impl Request {
    /// Creates a new request with the specified HTTP method and URL.
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: String::from(url),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets the body of the request to the provided value.
    pub fn set_body<T: Into<RequestContent>>(&mut self, body: T) {
        self.body.replace(body.into());
    }

    /// Adds a new header to the request.
    pub fn add_header(&mut self, header: &str, value: Maskable<String>) {
        self.headers.push((String::from(header), value));
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    pub url: String,
    pub headers: Headers,
    pub method: Method,
    pub body: Option<RequestContent>,
}

impl RequestBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            method: Method::Get,
            url: String::with_capacity(1024),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets the URL for the request.
    pub fn url(mut self, url: &str) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the method for the request.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds the provided headers to the request.
    pub fn headers(mut self, headers: Vec<(String, Maskable<String>)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the body of the request.
    pub fn set_body<T: Into<RequestContent>>(mut self, body: T) -> Self {
        self.body.replace(body.into());
        self
    }

    /// Builds the request.
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
