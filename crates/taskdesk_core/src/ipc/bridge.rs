use super::error::{IpcError, IpcResult};
use futures::future::LocalBoxFuture;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::rc::Rc;
use std::time::Instant;

/// Shared immutable host result.
///
/// `Rc<Value>` only hands out `&Value`, so every nested array/object is
/// read-only for all holders and can be passed around without copies.
pub type Frozen = Rc<Value>;

/// Future returned by one [`Transport::call`].
pub type TransportFuture = LocalBoxFuture<'static, IpcResult<Value>>;

/// Host call primitive: one method name plus one `params` object in, one raw
/// `{result, error}` envelope out.
///
/// Timeouts and retries, if any, belong to implementations of this trait.
pub trait Transport {
    fn call(&self, method: &str, params: Value) -> TransportFuture;
}

/// Freezes a host value for sharing.
pub fn freeze(value: Value) -> Frozen {
    Rc::new(value)
}

/// Thin wrapper over a [`Transport`] that enforces the envelope contract.
#[derive(Clone)]
pub struct IpcBridge {
    transport: Rc<dyn Transport>,
}

impl IpcBridge {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Invokes one host method and returns its frozen `result`.
    ///
    /// # Errors
    /// - [`IpcError::Remote`] when the envelope carries a non-null `error`.
    /// - [`IpcError::MalformedResponse`] when the envelope is not an object.
    /// - [`IpcError::Transport`] when the call primitive fails.
    pub async fn invoke(&self, method: &str, params: Value) -> IpcResult<Frozen> {
        let started_at = Instant::now();
        debug!("event=ipc_invoke module=ipc status=start method={method}");

        let outcome = match self.transport.call(method, params).await {
            Ok(response) => unwrap_envelope(response),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => {
                debug!(
                    "event=ipc_invoke module=ipc status=ok method={} duration_ms={}",
                    method,
                    started_at.elapsed().as_millis()
                );
                Ok(freeze(result))
            }
            Err(err) => {
                warn!(
                    "event=ipc_invoke module=ipc status=error method={} duration_ms={} error={}",
                    method,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn unwrap_envelope(response: Value) -> IpcResult<Value> {
    let mut envelope = match response {
        Value::Object(envelope) => envelope,
        other => {
            return Err(IpcError::MalformedResponse(format!(
                "response envelope must be an object, got `{other}`"
            )));
        }
    };

    match envelope.remove("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => return Err(IpcError::Remote(message)),
        Some(Value::Object(details)) => return Err(IpcError::Remote(error_message(details))),
        Some(other) => return Err(IpcError::Remote(other.to_string())),
    }

    Ok(envelope.remove("result").unwrap_or(Value::Null))
}

fn error_message(mut details: Map<String, Value>) -> String {
    match details.remove("message") {
        Some(Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => Value::Object(details).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{IpcBridge, Transport, TransportFuture};
    use crate::ipc::IpcError;
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedTransport {
        response: Value,
        calls: RefCell<Vec<(String, Value)>>,
    }

    impl FixedTransport {
        fn bridge(response: Value) -> (IpcBridge, Rc<FixedTransport>) {
            let transport = Rc::new(FixedTransport {
                response,
                calls: RefCell::new(Vec::new()),
            });
            (IpcBridge::new(transport.clone()), transport)
        }
    }

    impl Transport for FixedTransport {
        fn call(&self, method: &str, params: Value) -> TransportFuture {
            self.calls.borrow_mut().push((method.to_string(), params));
            Box::pin(futures::future::ready(Ok(self.response.clone())))
        }
    }

    struct BrokenTransport;

    impl Transport for BrokenTransport {
        fn call(&self, _method: &str, _params: Value) -> TransportFuture {
            Box::pin(futures::future::ready(Err(IpcError::Transport(
                "channel closed".to_string(),
            ))))
        }
    }

    #[test]
    fn invoke_returns_result_field_on_success() {
        let (bridge, transport) =
            FixedTransport::bridge(json!({"result": {"data": [1, 2]}, "error": null}));

        let result = block_on(bridge.invoke("list_projects", json!({}))).expect("invoke ok");
        assert_eq!(*result, json!({"data": [1, 2]}));

        let calls = transport.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "list_projects");
    }

    #[test]
    fn invoke_rejects_string_error() {
        let (bridge, _) = FixedTransport::bridge(json!({"result": null, "error": "boom"}));
        let err = block_on(bridge.invoke("get_task", json!({"id": "t1"}))).unwrap_err();
        assert!(matches!(err, IpcError::Remote(message) if message == "boom"));
    }

    #[test]
    fn invoke_rejects_error_object_with_message() {
        let (bridge, _) = FixedTransport::bridge(
            json!({"result": {"data": {"id": "x"}}, "error": {"message": "not found"}}),
        );
        let err = block_on(bridge.invoke("get_task", json!({"id": "x"}))).unwrap_err();
        assert!(matches!(err, IpcError::Remote(message) if message == "not found"));
    }

    #[test]
    fn invoke_rejects_non_object_envelope() {
        let (bridge, _) = FixedTransport::bridge(json!("ok"));
        let err = block_on(bridge.invoke("list_tasks", json!({}))).unwrap_err();
        assert!(matches!(err, IpcError::MalformedResponse(_)));
    }

    #[test]
    fn invoke_propagates_transport_failure() {
        let bridge = IpcBridge::new(Rc::new(BrokenTransport));
        let err = block_on(bridge.invoke("list_tasks", json!({}))).unwrap_err();
        assert!(matches!(err, IpcError::Transport(_)));
    }

    #[test]
    fn missing_result_freezes_null() {
        let (bridge, _) = FixedTransport::bridge(json!({"error": null}));
        let result = block_on(bridge.invoke("delete_task", json!({"id": "t1"}))).unwrap();
        assert!(result.is_null());
    }
}
