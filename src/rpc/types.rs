//! Method call descriptions handed to the session.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single API method invocation: `namespace.method` plus its parameters.
///
/// Parameters are kept in key order so that encoding the same request twice
/// produces the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    method: String,
    params: BTreeMap<String, Value>,
}

impl MethodRequest {
    /// Request for a fully qualified method name such as `users.get`.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn from_parts<I, K, V>(namespace: &str, method: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            method: format!("{namespace}.{method}"),
            params: params
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn builder(namespace: &str, method: &str) -> MethodRequestBuilder {
        MethodRequestBuilder {
            request: Self::new(format!("{namespace}.{method}")),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }
}

/// Fluent builder for [`MethodRequest`].
#[derive(Debug, Clone)]
pub struct MethodRequestBuilder {
    request: MethodRequest,
}

impl MethodRequestBuilder {
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.params.insert(key.into(), value.into());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.request
            .params
            .extend(params.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    pub fn build(self) -> MethodRequest {
        self.request
    }
}

/// Named method group, e.g. `users` or `wall`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    name: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a request for `self.name + "." + method`.
    pub fn method(&self, method: &str) -> MethodRequestBuilder {
        MethodRequest::builder(&self.name, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_joins_namespace_and_method() {
        let request = MethodRequest::builder("users", "get")
            .param("user_ids", vec![1, 2])
            .param("fields", "photo_50")
            .build();
        assert_eq!(request.method(), "users.get");
        assert_eq!(request.params()["user_ids"], json!([1, 2]));
        assert_eq!(request.params()["fields"], json!("photo_50"));
    }

    #[test]
    fn namespace_produces_builders() {
        let wall = Namespace::new("wall");
        let request = wall.method("post").param("message", "hi").build();
        assert_eq!(request.method(), "wall.post");
    }

    #[test]
    fn from_parts_collects_params() {
        let request = MethodRequest::from_parts("friends", "get", [("count", 10), ("offset", 0)]);
        assert_eq!(request.method(), "friends.get");
        assert_eq!(request.params().len(), 2);
    }
}
