//! Link validation: advisory HEAD probes against the image host.
//!
//! Validation never gates output. It runs after the CSV is written, logs one
//! warning per unreachable link, and swallows every failure class (timeout,
//! non-200, wrong content type, transport error) as "not found".

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct LinkChecker {
    client: Client,
    timeout: Duration,
}

impl LinkChecker {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent("catalog-csv/0.1")
            .build()?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// HEAD the URL and require HTTP 200 with an image content type.
    pub fn image_exists(&self, url: &str) -> bool {
        match self.client.head(url).timeout(self.timeout).send() {
            Ok(response) => {
                let is_image = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|ct| ct.contains("image"))
                    .unwrap_or(false);
                response.status().as_u16() == 200 && is_image
            }
            Err(e) if e.is_timeout() => {
                error!(
                    "request to {} timed out after {} seconds",
                    url,
                    self.timeout.as_secs()
                );
                false
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Probe every distinct non-empty link across a bounded worker pool.
    /// Completion order is unspecified; results only reach the log.
    pub fn check_all(&self, links: &[&str], max_workers: usize) {
        let unique: BTreeSet<&str> = links.iter().copied().filter(|l| !l.is_empty()).collect();
        let queue: Vec<&str> = unique.into_iter().collect();
        if queue.is_empty() {
            return;
        }

        info!("checking {} image links ...", queue.len());
        let cursor = AtomicUsize::new(0);
        let workers = max_workers.max(1).min(queue.len());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(url) = queue.get(i) else { break };
                    if self.image_exists(url) {
                        info!("exists: {}", url);
                    } else {
                        warn!("image not found: {}", url);
                    }
                });
            }
        });
    }
}
