use async_trait::async_trait;
use reqwest::{Request, Response};

/// Minimal HTTP execution seam, so auth decoration and tests can wrap the
/// underlying client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
