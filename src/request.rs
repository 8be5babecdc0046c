//! The data the sampling decision is made over, and the decision itself.

/// A request the embedding tracing SDK is asking the engine to classify.
///
/// All fields are strings; an empty string means "unknown" and matches any
/// wildcard pattern unconditionally (see [`crate::wildcard::field_matches`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub host: String,
    pub method: String,
    pub url_path: String,
    pub service_name: String,
    pub service_type: String,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = url_path.into();
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }
}

/// The outcome of a sampling decision.
///
/// `rule_name` is absent when a fallback (local strategy, or no rule
/// matched and there was no Default) produced the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub sample: bool,
    pub rule_name: Option<String>,
}

impl Decision {
    pub fn sampled(rule_name: impl Into<String>) -> Self {
        Self {
            sample: true,
            rule_name: Some(rule_name.into()),
        }
    }

    pub fn not_sampled(rule_name: impl Into<String>) -> Self {
        Self {
            sample: false,
            rule_name: Some(rule_name.into()),
        }
    }

    pub fn fallback(sample: bool) -> Self {
        Self {
            sample,
            rule_name: None,
        }
    }
}

/// The match predicate and sampling policy shared by local and central
/// rules: wildcard patterns plus a reservoir capacity and bernoulli rate.
#[derive(Debug, Clone)]
pub struct Properties {
    pub host: String,
    pub http_method: String,
    pub url_path: String,
    pub service_name: String,
    pub fixed_target: u64,
    pub rate: f64,
}

impl Properties {
    /// True if every predicate field matches the request, where an empty
    /// request field matches unconditionally.
    pub fn applies_to(&self, req: &Request) -> bool {
        use crate::wildcard::field_matches;
        field_matches(&self.host, &req.host)
            && field_matches(&self.http_method, &req.method)
            && field_matches(&self.url_path, &req.url_path)
            && field_matches(&self.service_name, &req.service_name)
    }
}
