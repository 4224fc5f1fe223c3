//! Per-call state threaded through the pipeline stages

use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;

use babel_json_rpc::{JsonRpcRequest, RequestContext, RequestId};

/// Mutable state shared by the stages of a single call.
///
/// Starts with the raw body and headers; the params stage fills in the
/// request, the auth stage the [`RequestContext`].
#[derive(Debug)]
pub struct PipelineContext {
    body: Bytes,
    headers: HeaderMap,
    id: Option<RequestId>,
    request: Option<JsonRpcRequest>,
    request_context: RequestContext,
}

impl PipelineContext {
    pub fn new(body: Bytes, headers: HeaderMap) -> Self {
        Self {
            body,
            headers,
            id: None,
            request: None,
            request_context: RequestContext::anonymous(),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Id to echo in the response, once known
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<RequestId>) {
        self.id = id;
    }

    pub fn request(&self) -> Option<&JsonRpcRequest> {
        self.request.as_ref()
    }

    pub fn method(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.method.as_str())
    }

    pub fn params(&self) -> &[Value] {
        self.request
            .as_ref()
            .map(|r| r.params.as_slice())
            .unwrap_or_default()
    }

    pub fn set_request(&mut self, request: JsonRpcRequest) {
        self.id = request.id.clone();
        self.request = Some(request);
    }

    pub fn request_context(&self) -> &RequestContext {
        &self.request_context
    }

    pub fn set_request_context(&mut self, context: RequestContext) {
        self.request_context = context;
    }

    /// Hand the validated request and context to the dispatch stage
    pub fn into_parts(self) -> (Option<JsonRpcRequest>, RequestContext) {
        (self.request, self.request_context)
    }
}
