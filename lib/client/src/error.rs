use oxrdfio::RdfParseError;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// An error raised by an [HttpClient](crate::HttpClient) implementation.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The request could not be sent or the response could not be received.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Arc<dyn Error + Send + Sync>,
    },
    /// The HTTP client could not be constructed.
    #[error("Could not create the HTTP client: {0}")]
    Builder(Arc<dyn Error + Send + Sync>),
}

impl HttpError {
    /// Wraps a transport-level error for `url`.
    pub fn transport(url: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            url: url.into(),
            source: Arc::new(source),
        }
    }
}

/// An error that occurs while loading a fragment.
///
/// Fragment errors are delivered to every clone of a fragment and must therefore be [Clone].
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FragmentError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("Could not retrieve {url} ({status})")]
    Status { url: String, status: u16 },
    #[error("No parser for {content_type} at {url}")]
    NoParser { url: String, content_type: String },
    #[error("Could not parse the response of {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: Arc<RdfParseError>,
    },
    #[error("The fragment {url} has no hypermedia controls")]
    MissingControls { url: String },
    #[error("The start fragment does not describe a triple pattern search form")]
    NoSearchForm,
    #[error("Invalid URI template: {template}")]
    InvalidTemplate { template: String },
    #[error("Could not load the start fragment: {0}")]
    StartFragment(#[source] Arc<FragmentError>),
}

impl FragmentError {
    /// Returns whether this error originates from the start fragment. Such errors make every
    /// further fragment request impossible and should not be ignored.
    pub fn is_start_fragment_error(&self) -> bool {
        matches!(self, FragmentError::StartFragment(_))
    }
}
