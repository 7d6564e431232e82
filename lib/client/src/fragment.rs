use crate::{
    parse_page, ClientStatistics, FragmentControls, FragmentError, FragmentMetadata, HttpClient,
    HttpRequest, MetadataExtractor, PageMetadata,
};
use futures::future::poll_fn;
use futures::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, Waker};
use tpf_fusion_model::Triple;

/// A stream of the triples that match a fragment request.
///
/// All pages of a fragment are appended to a log that is shared by every clone of the fragment.
/// Each clone is an independent cursor that starts at the beginning of the log, so every clone
/// observes the complete sequence of triples. Pages after the first are only requested once a
/// reader has consumed everything that is buffered.
///
/// The stream yields the triples of the fragment, at most one error, and then ends.
#[derive(Debug)]
pub struct Fragment {
    shared: Arc<FragmentShared>,
    position: usize,
    finished: bool,
}

#[derive(Debug)]
struct FragmentShared {
    state: Mutex<FragmentState>,
}

#[derive(Debug, Default)]
struct FragmentState {
    url: Option<String>,
    triples: Vec<Triple>,
    status: FragmentStatus,
    metadata: Option<FragmentMetadata>,
    controls: Option<FragmentControls>,
    /// Readers that wait for a new page or a terminal state.
    wakers: Vec<Waker>,
    /// Whether a reader has consumed all buffered triples.
    demanded: bool,
    /// The loader task waiting for `demanded`.
    loader: Option<Waker>,
}

#[derive(Debug, Clone, Default)]
enum FragmentStatus {
    #[default]
    Loading,
    Ended,
    Failed(FragmentError),
}

impl Fragment {
    /// Creates a fragment that is loading. Its content must be provided by starting a loader or by
    /// ending it.
    pub(crate) fn pending() -> Self {
        Self {
            shared: Arc::new(FragmentShared {
                state: Mutex::new(FragmentState::default()),
            }),
            position: 0,
            finished: false,
        }
    }

    /// Starts loading the fragment from `url` in a background task. Must be called within a Tokio
    /// runtime.
    pub(crate) fn load_from_url(&self, url: String, context: Arc<FetchContext>) {
        self.shared.lock().url = Some(url.clone());
        let fragment = Arc::downgrade(&self.shared);
        tokio::spawn(load_pages(fragment, context, url));
    }

    /// Returns the next buffered triple without waiting.
    pub fn try_read(&mut self) -> Option<Triple> {
        if self.finished {
            return None;
        }

        let mut state = self.shared.lock();
        if let Some(triple) = state.triples.get(self.position).cloned() {
            self.position += 1;
            return Some(triple);
        }

        let loader = state.request_page();
        drop(state);
        wake(loader);
        None
    }

    /// Returns the metadata of the fragment once it is known.
    ///
    /// A fragment that ended without metadata has an unknown number of triples. Returns an error if
    /// the fragment failed before metadata was found.
    pub async fn metadata(&self) -> Result<FragmentMetadata, FragmentError> {
        poll_fn(|cx| {
            let mut state = self.shared.lock();
            if let Some(metadata) = state.metadata {
                return Poll::Ready(Ok(metadata));
            }
            match state.status.clone() {
                FragmentStatus::Loading => {
                    state.register(cx.waker());
                    Poll::Pending
                }
                FragmentStatus::Ended => Poll::Ready(Ok(FragmentMetadata::default())),
                FragmentStatus::Failed(error) => Poll::Ready(Err(error)),
            }
        })
        .await
    }

    /// Returns the hypermedia controls of the fragment once they are known.
    pub async fn controls(&self) -> Result<FragmentControls, FragmentError> {
        poll_fn(|cx| {
            let mut state = self.shared.lock();
            if let Some(controls) = &state.controls {
                return Poll::Ready(Ok(controls.clone()));
            }
            match state.status.clone() {
                FragmentStatus::Loading => {
                    state.register(cx.waker());
                    Poll::Pending
                }
                FragmentStatus::Ended => Poll::Ready(Err(FragmentError::MissingControls {
                    url: state.url.clone().unwrap_or_default(),
                })),
                FragmentStatus::Failed(error) => Poll::Ready(Err(error)),
            }
        })
        .await
    }

    /// Sets the number of matching triples unless it is already known.
    pub fn force_metadata(&self, total_triples: u64) {
        self.shared.update(|state| {
            state.metadata.get_or_insert(FragmentMetadata {
                total_triples: Some(total_triples),
            });
        });
    }

    /// Ends the fragment without any triples. The number of matching triples is set to zero
    /// unless it is already known.
    pub fn empty(&self) {
        self.shared.update(|state| {
            state.metadata.get_or_insert(FragmentMetadata {
                total_triples: Some(0),
            });
            state.finish(FragmentStatus::Ended);
        });
    }

    /// Lets the fragment fail with `error` unless it already reached a terminal state.
    pub(crate) fn fail(&self, error: FragmentError) {
        self.shared
            .update(|state| state.finish(FragmentStatus::Failed(error)));
    }

    /// Releases this cursor. Other clones are not affected and an ongoing request is not aborted.
    pub fn close(&mut self) {
        self.finished = true;
    }
}

impl Clone for Fragment {
    /// Creates a new cursor that starts at the beginning of the fragment.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            position: 0,
            finished: false,
        }
    }
}

impl Stream for Fragment {
    type Item = Result<Triple, FragmentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let mut state = this.shared.lock();
        if let Some(triple) = state.triples.get(this.position).cloned() {
            this.position += 1;
            return Poll::Ready(Some(Ok(triple)));
        }

        match state.status.clone() {
            FragmentStatus::Loading => {
                state.register(cx.waker());
                let loader = state.request_page();
                drop(state);
                wake(loader);
                Poll::Pending
            }
            FragmentStatus::Ended => {
                this.finished = true;
                Poll::Ready(None)
            }
            FragmentStatus::Failed(error) => {
                this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
        }
    }
}

impl FragmentShared {
    fn lock(&self) -> MutexGuard<'_, FragmentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `update` and wakes every waiting reader.
    fn update(&self, update: impl FnOnce(&mut FragmentState)) {
        let wakers = {
            let mut state = self.lock();
            update(&mut state);
            std::mem::take(&mut state.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// Appends a page to the log and returns the URL of the next page.
    fn append_page(&self, triples: Vec<Triple>, page: PageMetadata) -> Option<String> {
        let mut next_page = None;
        self.update(|state| {
            if state.metadata.is_none() {
                state.metadata = page.metadata;
            }
            next_page = page.controls.as_ref().and_then(|c| c.next_page.clone());
            if state.controls.is_none() {
                state.controls = page.controls;
            }
            state.triples.extend(triples);
            state.demanded = false;
        });
        next_page
    }
}

impl Drop for FragmentShared {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        wake(state.loader.take());
    }
}

impl FragmentState {
    fn register(&mut self, waker: &Waker) {
        if !self.wakers.iter().any(|w| w.will_wake(waker)) {
            self.wakers.push(waker.clone());
        }
    }

    /// Signals that a reader has consumed every buffered triple. Returns the waker of the loader.
    fn request_page(&mut self) -> Option<Waker> {
        if !matches!(self.status, FragmentStatus::Loading) {
            return None;
        }
        self.demanded = true;
        self.loader.take()
    }

    fn finish(&mut self, status: FragmentStatus) {
        if matches!(self.status, FragmentStatus::Loading) {
            self.status = status;
        }
    }
}

fn wake(waker: Option<Waker>) {
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// Loads the pages of a fragment, starting with `url`.
///
/// The task only holds a weak reference to the fragment and stops once every clone of the
/// fragment has been dropped.
async fn load_pages(fragment: Weak<FragmentShared>, context: Arc<FetchContext>, url: String) {
    let mut url = url;
    loop {
        let result = context.fetch_page(&url).await;
        let Some(shared) = fragment.upgrade() else {
            return;
        };

        let next_page = match result {
            Ok((triples, metadata)) => shared.append_page(triples, metadata),
            Err(error) => {
                tracing::debug!("Loading {url} failed: {error}");
                shared.update(|state| state.finish(FragmentStatus::Failed(error)));
                return;
            }
        };
        let Some(next_page) = next_page else {
            shared.update(|state| state.finish(FragmentStatus::Ended));
            return;
        };
        drop(shared);

        if !wait_for_demand(&fragment).await {
            return;
        }
        url = next_page;
    }
}

/// Waits until a reader requests the next page. Returns `false` if the fragment was dropped.
async fn wait_for_demand(fragment: &Weak<FragmentShared>) -> bool {
    poll_fn(|cx| {
        let Some(shared) = fragment.upgrade() else {
            return Poll::Ready(false);
        };
        let mut state = shared.lock();
        if state.demanded {
            return Poll::Ready(true);
        }
        state.loader = Some(cx.waker().clone());
        Poll::Pending
    })
    .await
}

/// Everything needed for fetching the pages of fragments.
#[derive(Debug)]
pub(crate) struct FetchContext {
    pub http_client: Arc<dyn HttpClient>,
    pub metadata_extractor: Arc<dyn MetadataExtractor>,
    pub accept: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub statistics: Arc<ClientStatistics>,
}

impl FetchContext {
    /// Fetches and parses a single page. Returns the data triples and the page's metadata.
    async fn fetch_page(&self, url: &str) -> Result<(Vec<Triple>, PageMetadata), FragmentError> {
        let mut request = HttpRequest::new(url)
            .with_header("accept", &self.accept)
            .with_header("user-agent", &self.user_agent);
        if let Some(referer) = &self.referer {
            request = request.with_header("referer", referer);
        }

        tracing::debug!("Requesting {url}");
        let response = self.http_client.get(request).await?;
        if response.status != 200 {
            return Err(FragmentError::Status {
                url: url.to_owned(),
                status: response.status,
            });
        }

        let content_type = response.content_type.unwrap_or_default();
        let page = parse_page(url, &content_type, &response.body)?;
        let metadata = self.metadata_extractor.extract(url, &page.metadata);
        self.statistics.record_triples_received(page.data.len());
        Ok((page.data, metadata))
    }
}
