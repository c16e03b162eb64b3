//! Service proxy: the consumer-side request pipeline.
//!
//! One proxy stands in for one remote interface. Every call runs
//! discover → select → retry(send) → tolerate and hands back the response
//! data; no connection survives the call.

use std::sync::Arc;
use tracing::debug;

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{from_value, RpcRequest, RpcResponse, ServiceMetaInfo, Value};
use minirpc_registry::Registry;
use serde::de::DeserializeOwned;

use crate::fault::retry::RetryStrategy;
use crate::fault::tolerant::{ToleranceContext, TolerantStrategy};
use crate::load_balancer::{LoadBalancer, RequestContext, METHOD_NAME_KEY};
use crate::transport::{self, CallOptions};

pub struct ServiceProxy {
    service_name: String,
    service_version: String,
    registry: Arc<dyn Registry>,
    load_balancer: Arc<dyn LoadBalancer>,
    retry: Arc<dyn RetryStrategy>,
    tolerant: Arc<dyn TolerantStrategy>,
    options: CallOptions,
}

impl ServiceProxy {
    pub(crate) fn new(
        service_name: String,
        service_version: String,
        registry: Arc<dyn Registry>,
        load_balancer: Arc<dyn LoadBalancer>,
        retry: Arc<dyn RetryStrategy>,
        tolerant: Arc<dyn TolerantStrategy>,
        options: CallOptions,
    ) -> Self {
        ServiceProxy {
            service_name,
            service_version,
            registry,
            load_balancer,
            retry,
            tolerant,
            options,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Runs the full pipeline for `request` and returns the raw response.
    ///
    /// An exception-carrying response counts as a failed attempt inside the
    /// retry loop, so provider-side failures are retried and tolerated like
    /// transport failures.
    pub async fn invoke(&self, request: RpcRequest) -> RpcResult<RpcResponse> {
        let meta = ServiceMetaInfo::new(
            self.service_name.as_str(),
            self.service_version.as_str(),
            String::new(),
            0,
        );
        let service_key = meta.service_key();

        let candidates = self.registry.discover(&service_key).await?;
        if candidates.is_empty() {
            debug!(service_key, "discovery returned no endpoints");
            let context = self.tolerance_context(request, Vec::new(), None);
            return self
                .tolerant
                .do_tolerant(&context, RpcError::NoEndpoints(service_key))
                .await;
        }

        let mut selection_context = RequestContext::new();
        selection_context.insert(METHOD_NAME_KEY.to_string(), request.method_name.clone());
        let selected = match self.load_balancer.select(&selection_context, &candidates) {
            Some(endpoint) => endpoint,
            None => {
                let context = self.tolerance_context(request, candidates, None);
                return self
                    .tolerant
                    .do_tolerant(&context, RpcError::NoEndpoints(service_key))
                    .await;
            }
        };
        debug!(
            service_key,
            endpoint = %selected.service_address(),
            "endpoint selected"
        );

        let operation = {
            let request = request.clone();
            let endpoint = selected.clone();
            let options = self.options.clone();
            move || -> futures::future::BoxFuture<'static, RpcResult<RpcResponse>> {
                let request = request.clone();
                let endpoint = endpoint.clone();
                let options = options.clone();
                Box::pin(async move {
                    let response = transport::do_request(&request, &endpoint, &options).await?;
                    check_exception(response)
                })
            }
        };

        match self.retry.do_retry(&operation).await {
            Ok(response) => Ok(response),
            Err(cause) => {
                let context = self.tolerance_context(request, candidates, Some(selected));
                self.tolerant.do_tolerant(&context, cause).await
            }
        }
    }

    /// Typed convenience over [`invoke`](Self::invoke): builds the request,
    /// runs the pipeline and decodes the response data into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        parameter_types: Vec<String>,
        args: Vec<Value>,
    ) -> RpcResult<T> {
        let request = RpcRequest::new(&self.service_name, method, parameter_types, args)
            .with_version(&self.service_version);
        let response = self.invoke(request).await?;
        let data = response.data.ok_or_else(|| {
            RpcError::Dispatch(format!("absent response data: {}", response.message))
        })?;
        from_value(&data)
    }

    fn tolerance_context(
        &self,
        request: RpcRequest,
        candidates: Vec<ServiceMetaInfo>,
        selected: Option<ServiceMetaInfo>,
    ) -> ToleranceContext {
        ToleranceContext {
            request,
            candidates,
            selected,
            options: self.options.clone(),
        }
    }
}

/// Turns an exception-carrying response into a dispatch error.
fn check_exception(response: RpcResponse) -> RpcResult<RpcResponse> {
    match &response.exception {
        Some(exception) => Err(RpcError::Dispatch(format!(
            "{}: {}",
            exception.kind, exception.message
        ))),
        None => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minirpc_common::protocol::RpcException;

    #[test]
    fn test_clean_response_passes_through() {
        let response = RpcResponse::ok(Value::I64(1), "i64");
        assert_eq!(check_exception(response.clone()).unwrap(), response);
    }

    #[test]
    fn test_exception_response_becomes_dispatch_error() {
        let response =
            RpcResponse::failure(RpcException::new("DispatchError", "no such method: f"));
        match check_exception(response) {
            Err(RpcError::Dispatch(message)) => {
                assert!(message.contains("DispatchError"));
                assert!(message.contains("no such method"));
            }
            other => panic!("expected a dispatch error, got {other:?}"),
        }
    }
}
