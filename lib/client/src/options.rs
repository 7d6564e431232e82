use crate::{HttpClient, MetadataExtractor, DEFAULT_ACCEPT, DEFAULT_CACHE_CAPACITY, DEFAULT_USER_AGENT};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Options for creating a [FragmentClient](crate::FragmentClient).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The value of the `Accept` header.
    pub accept: String,
    /// The value of the `User-Agent` header.
    pub user_agent: String,
    /// The number of fragments kept in the cache.
    pub cache_capacity: usize,
    /// The timeout of a single page request. Only used by the default HTTP client.
    pub timeout: Option<Duration>,
    /// Namespace prefixes used to shorten IRIs in binding restrictions.
    pub prefixes: BTreeMap<String, String>,
    /// The HTTP client. Defaults to a [ReqwestHttpClient](crate::ReqwestHttpClient).
    pub http_client: Option<Arc<dyn HttpClient>>,
    /// The metadata extractor. Defaults to a [HydraMetadataExtractor](crate::HydraMetadataExtractor).
    pub metadata_extractor: Option<Arc<dyn MetadataExtractor>>,
}

impl ClientOptions {
    #[must_use]
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    #[must_use]
    pub fn with_metadata_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.metadata_extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), namespace.into());
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout: None,
            prefixes: BTreeMap::new(),
            http_client: None,
            metadata_extractor: None,
        }
    }
}
