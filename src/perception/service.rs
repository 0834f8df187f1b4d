use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::task::{Context, Poll};
use futures::Future;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing::warn;

use crate::capture::Snapshot;
use crate::perception::analysis::{parse_analysis, AnalysisResult};
use crate::perception::backend::VisionBackend;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One outbound inference call as a service: encode request, await the
/// backend, parse the structured judgement.
#[derive(Clone)]
struct AnalysisService {
    inner: Arc<dyn VisionBackend>,
}

impl AnalysisService {
    fn new(inner: Arc<dyn VisionBackend>) -> Self {
        Self { inner }
    }
}

impl Service<Snapshot> for AnalysisService {
    type Response = AnalysisResult;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, snapshot: Snapshot) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let text = inner.describe(&snapshot.to_base64()).await?;
            let analysis = parse_analysis(&text)?;
            Ok(analysis)
        })
    }
}

pub struct PerceptionBuilder {
    backend: Arc<dyn VisionBackend>,
    timeout: Option<Duration>,
}

impl PerceptionBuilder {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            timeout: None,
        }
    }

    /// Bounds worst-case latency of the outbound call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Perception {
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(AnalysisService::new(self.backend));
        Perception {
            service: BoxService::new(service),
        }
    }
}

/// Infallible wrapper around the analysis service: any failure (network,
/// timeout, malformed or missing JSON) is absorbed into the fixed fallback
/// result, so callers never see an error.
pub struct Perception {
    service: BoxService<Snapshot, AnalysisResult, BoxError>,
}

impl Perception {
    pub fn builder(backend: Arc<dyn VisionBackend>) -> PerceptionBuilder {
        PerceptionBuilder::new(backend)
    }

    pub async fn analyze(&mut self, snapshot: Snapshot) -> AnalysisResult {
        let seq = snapshot.seq;
        let outcome = match self.service.ready().await {
            Ok(service) => service.call(snapshot).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("LLM analysis error for capture {}: {}", seq, e);
                AnalysisResult::fallback()
            }
        }
    }
}
