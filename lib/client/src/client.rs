use crate::fragment::FetchContext;
use crate::{
    CanonicalRequest, ClientOptions, ClientStatistics, Fragment, FragmentError,
    HydraMetadataExtractor, ReqwestHttpClient, RequestCache,
};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tpf_fusion_model::{SolutionMapping, TriplePattern};

/// A client for (bindings-restricted) Triple Pattern Fragments.
///
/// The client discovers how to request fragments from the controls of a start fragment. Requests
/// are canonicalized and cached, so requesting an equivalent fragment twice only fetches it once.
///
/// The client is cheap to clone. Clones share the cache and the statistics.
#[derive(Clone)]
pub struct FragmentClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    start_url: String,
    start_fragment: Fragment,
    context: Arc<FetchContext>,
    cache: RequestCache<Fragment>,
    prefixes: BTreeMap<String, String>,
    statistics: Arc<ClientStatistics>,
}

impl FragmentClient {
    /// Creates a new client and starts loading the start fragment located at `start_url`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(start_url: impl Into<String>, options: ClientOptions) -> Result<Self, FragmentError> {
        let start_url = start_url.into();
        let http_client = match options.http_client {
            Some(http_client) => http_client,
            None => Arc::new(ReqwestHttpClient::new(options.timeout)?),
        };
        let metadata_extractor = options
            .metadata_extractor
            .unwrap_or_else(|| Arc::new(HydraMetadataExtractor));
        let statistics = Arc::new(ClientStatistics::default());

        let context = Arc::new(FetchContext {
            http_client,
            metadata_extractor,
            accept: options.accept,
            user_agent: options.user_agent,
            referer: Some(start_url.clone()),
            statistics: Arc::clone(&statistics),
        });

        let start_fragment = Fragment::pending();
        start_fragment.load_from_url(start_url.clone(), Arc::clone(&context));

        Ok(Self {
            inner: Arc::new(ClientInner {
                start_url,
                start_fragment,
                context,
                cache: RequestCache::new(options.cache_capacity),
                prefixes: options.prefixes,
                statistics,
            }),
        })
    }

    /// Returns the URL of the start fragment.
    pub fn start_url(&self) -> &str {
        &self.inner.start_url
    }

    /// Returns the statistics that are shared by this client and every iterator that uses it.
    pub fn statistics(&self) -> &Arc<ClientStatistics> {
        &self.inner.statistics
    }

    /// Returns the fragment with the triples that match `pattern` and are compatible with at least
    /// one mapping of `batch`.
    ///
    /// Blank nodes in `pattern` match any term. The returned fragment is a new cursor that starts
    /// at the first triple, even if an equivalent fragment was requested before.
    pub fn fragment(&self, pattern: &TriplePattern, batch: Option<&[SolutionMapping]>) -> Fragment {
        let request = CanonicalRequest::new(pattern, batch);
        let (fragment, created) = self
            .inner
            .cache
            .get_or_insert_with(request.cache_key(), Fragment::pending);

        if created {
            self.inner.statistics.record_request(request.batch_size());
            tokio::spawn(resolve(Arc::clone(&self.inner), request, fragment.clone()));
        }
        fragment
    }
}

/// Waits for the controls of the start fragment and starts loading `fragment`.
async fn resolve(inner: Arc<ClientInner>, request: CanonicalRequest, fragment: Fragment) {
    let controls = match inner.start_fragment.controls().await {
        Ok(controls) => controls,
        Err(error) => {
            fragment.fail(FragmentError::StartFragment(Arc::new(error)));
            return;
        }
    };

    match request.page_url(&controls, &inner.prefixes) {
        Ok(Some(url)) => fragment.load_from_url(url, Arc::clone(&inner.context)),
        Ok(None) => fragment.empty(),
        Err(error @ FragmentError::NoSearchForm) => {
            fragment.fail(FragmentError::StartFragment(Arc::new(error)));
        }
        Err(error) => fragment.fail(error),
    }
}

impl Debug for FragmentClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentClient")
            .field("start_url", &self.inner.start_url)
            .field("cache", &self.inner.cache)
            .field("prefixes", &self.inner.prefixes)
            .finish_non_exhaustive()
    }
}
