//! Data access: fetching pages from the data source and submitting edits.
//!
//! Fetches run on worker threads. Results come back to the UI thread through
//! [`Broadcast`] channels that the UI drains once per frame.

use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use image::DynamicImage;
use serde::de::DeserializeOwned;

use crate::config::Endpoints;
use crate::error::{DataError, SubmitError};
use crate::model::{CoordinateRecord, Manifest};

// ── Broadcast ───────────────────────────────────────────────────────────────

/// Fan-out channel. Subscribers only see messages published after they
/// subscribed; nothing is replayed.
pub struct Broadcast<T> {
    subscribers: Arc<Mutex<Vec<Sender<T>>>>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Broadcast<T> {
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends to every live subscriber and forgets dropped ones.
    pub fn publish(&self, value: T) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(value.clone()).is_ok());
    }
}

// ── Messages ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct PageImage {
    pub page: u32,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRecord {
    pub page: u32,
    pub record: CoordinateRecord,
    pub manifest: Manifest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchFailure {
    pub page: u32,
    pub message: String,
}

/// Everything the data source returns for one page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageData {
    pub manifest: Manifest,
    pub record: CoordinateRecord,
    pub image_url: String,
}

#[derive(Clone, Default)]
struct PageChannels {
    image_paths: Broadcast<PageImage>,
    coordinates: Broadcast<PageRecord>,
    failures: Broadcast<FetchFailure>,
}

impl PageChannels {
    fn deliver(&self, page: u32, result: Result<PageData, DataError>) {
        match result {
            Ok(data) => {
                self.image_paths.publish(PageImage {
                    page,
                    url: data.image_url,
                });
                self.coordinates.publish(PageRecord {
                    page,
                    record: data.record,
                    manifest: data.manifest,
                });
            }
            Err(e) => {
                log::error!("Failed to load page {page}: {e}");
                self.failures.publish(FetchFailure {
                    page,
                    message: e.to_string(),
                });
            }
        }
    }
}

// ── Transport ───────────────────────────────────────────────────────────────

pub trait Transport: Send + Sync {
    /// GETs `url` and returns the body.
    fn get(&self, url: &str) -> Result<Vec<u8>, DataError>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, DataError> {
        log::debug!("GET {url}");
        let response = self.agent.get(url).call().map_err(|e| DataError::Http {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| DataError::Io {
                url: url.to_string(),
                source: e,
            })?;
        Ok(body)
    }
}

fn get_json<T: DeserializeOwned>(transport: &dyn Transport, url: &str) -> Result<T, DataError> {
    let body = transport.get(url)?;
    serde_json::from_slice(&body).map_err(|e| DataError::Json {
        url: url.to_string(),
        source: e,
    })
}

/// Fetches the manifest and the page's coordinates together. Fails if either does.
pub fn load_page(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    page: u32,
) -> Result<PageData, DataError> {
    let manifest_url = endpoints.manifest_url.as_str();
    let coordinates_url = endpoints.coordinates(page);

    std::thread::scope(|s| {
        let manifest = s.spawn(|| get_json::<Manifest>(transport, manifest_url));
        let record = get_json::<CoordinateRecord>(transport, &coordinates_url);
        let manifest = manifest.join().map_err(|_| DataError::WorkerPanicked)?;
        Ok(PageData {
            manifest: manifest?,
            record: record?,
            image_url: endpoints.image(page),
        })
    })
}

pub fn fetch_image(transport: &dyn Transport, url: &str) -> Result<DynamicImage, DataError> {
    let bytes = transport.get(url)?;
    image::load_from_memory(&bytes).map_err(|e| DataError::Image {
        url: url.to_string(),
        source: e,
    })
}

// ── Submit ──────────────────────────────────────────────────────────────────

pub trait Submitter {
    fn submit(&self, record: &CoordinateRecord, page: u32) -> Result<(), SubmitError>;
}

/// Accepts every submission without sending it anywhere.
#[derive(Debug, Default)]
pub struct StubSubmitter;

impl Submitter for StubSubmitter {
    fn submit(&self, record: &CoordinateRecord, page: u32) -> Result<(), SubmitError> {
        log::info!(
            "Submit for page {page} accepted locally (timestamp {})",
            record.timestamp
        );
        Ok(())
    }
}

// ── Service ─────────────────────────────────────────────────────────────────

pub struct DataService {
    transport: Arc<dyn Transport>,
    submitter: Box<dyn Submitter>,
    endpoints: Endpoints,
    channels: PageChannels,
}

impl DataService {
    pub fn new(
        transport: Arc<dyn Transport>,
        submitter: Box<dyn Submitter>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            submitter,
            endpoints,
            channels: PageChannels::default(),
        }
    }

    pub fn image_paths(&self) -> Receiver<PageImage> {
        self.channels.image_paths.subscribe()
    }

    pub fn coordinates(&self) -> Receiver<PageRecord> {
        self.channels.coordinates.subscribe()
    }

    pub fn failures(&self) -> Receiver<FetchFailure> {
        self.channels.failures.subscribe()
    }

    /// Starts loading `page` in the background.
    ///
    /// On success the image path and the record are published. On failure
    /// only a [`FetchFailure`] is.
    pub fn fetch_page(&self, page: u32) {
        let transport = Arc::clone(&self.transport);
        let endpoints = self.endpoints.clone();
        let channels = self.channels.clone();
        log::info!("Fetching page {page}");

        let spawned = std::thread::Builder::new()
            .name(format!("fetch-page-{page}"))
            .spawn(move || {
                let result = load_page(transport.as_ref(), &endpoints, page);
                channels.deliver(page, result);
            });
        if let Err(e) = spawned {
            self.channels.failures.publish(FetchFailure {
                page,
                message: format!("could not start fetch: {e}"),
            });
        }
    }

    /// Downloads and decodes an image in the background.
    pub fn load_image(&self, url: String) -> Receiver<Result<DynamicImage, DataError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let transport = Arc::clone(&self.transport);
        let spawned = std::thread::Builder::new()
            .name("fetch-image".to_string())
            .spawn(move || {
                let _ = tx.send(fetch_image(transport.as_ref(), &url));
            });
        if let Err(e) = spawned {
            log::error!("Could not start image download: {e}");
        }
        rx
    }

    pub fn submit(&self, record: &CoordinateRecord, page: u32) -> Result<(), SubmitError> {
        self.submitter.submit(record, page)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::sample_record;
    use std::collections::HashMap;

    /// Serves canned bodies; any other URL fails. Records every request.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        bodies: HashMap<String, Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub fn count(&self, url: &str) -> usize {
            self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl Transport for MockTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>, DataError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().ok_or_else(|| DataError::Io {
                url: url.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no route"),
            })
        }
    }

    pub(crate) fn endpoints() -> Endpoints {
        Endpoints {
            manifest_url: "mock://input.json".into(),
            coordinates_url: "mock://coordinates{page}.json".into(),
            image_url: "mock://ptosis-{page}.jpg".into(),
        }
    }

    pub(crate) const MANIFEST: &str =
        r#"{"fileName": "input", "ptosisImages": ["ptosis-1.jpg", "ptosis-2.jpg"], "scope": "left-right"}"#;

    pub(crate) fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::new(4, 3)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Serves the manifest plus coordinates and a photo for each page.
    pub(crate) fn serving_pages(pages: &[u32]) -> MockTransport {
        let record = serde_json::to_vec(&sample_record()).unwrap();
        let photo = png_bytes();
        let mut transport = MockTransport::default().serve("mock://input.json", MANIFEST);
        for page in pages {
            transport = transport
                .serve(&format!("mock://coordinates{page}.json"), record.clone())
                .serve(&format!("mock://ptosis-{page}.jpg"), photo.clone());
        }
        transport
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let channel = Broadcast::default();
        let early = channel.subscribe();
        channel.publish(1);
        let late = channel.subscribe();
        channel.publish(2);

        assert_eq!(early.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        // no replay for late subscribers
        assert_eq!(late.try_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_broadcast_prunes_dropped_subscribers() {
        let channel = Broadcast::default();
        drop(channel.subscribe());
        let kept = channel.subscribe();
        channel.publish("x");
        assert_eq!(channel.subscribers.lock().unwrap().len(), 1);
        assert_eq!(kept.try_recv(), Ok("x"));
    }

    #[test]
    fn test_load_page_joins_both_documents() {
        let transport = serving_pages(&[2]);
        let data = load_page(&transport, &endpoints(), 2).unwrap();
        assert_eq!(data.record, sample_record());
        assert_eq!(data.manifest.scope, "left-right");
        assert_eq!(data.image_url, "mock://ptosis-2.jpg");
        assert_eq!(transport.count("mock://input.json"), 1);
        assert_eq!(transport.count("mock://coordinates2.json"), 1);
    }

    #[test]
    fn test_load_page_rejects_bad_json() {
        let transport = MockTransport::default()
            .serve("mock://input.json", MANIFEST)
            .serve("mock://coordinates1.json", "{\"ODTopX\": 1}");
        let err = load_page(&transport, &endpoints(), 1).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }), "{err}");
    }

    #[test]
    fn test_fetch_publishes_image_then_record() {
        let service = DataService::new(
            Arc::new(serving_pages(&[1])),
            Box::new(StubSubmitter),
            endpoints(),
        );
        let images = service.image_paths();
        let records = service.coordinates();

        service.fetch_page(1);

        let image = images.recv_timeout(WAIT).unwrap();
        assert_eq!(image.url, "mock://ptosis-1.jpg");
        let record = records.recv_timeout(WAIT).unwrap();
        assert_eq!(record.page, 1);
        assert_eq!(record.record, sample_record());
    }

    #[test]
    fn test_failed_coordinates_publish_nothing() {
        // manifest is served, coordinates are not
        let transport = MockTransport::default().serve("mock://input.json", MANIFEST);
        let service = DataService::new(Arc::new(transport), Box::new(StubSubmitter), endpoints());
        let images = service.image_paths();
        let records = service.coordinates();
        let failures = service.failures();

        service.fetch_page(4);

        let failure = failures.recv_timeout(WAIT).unwrap();
        assert_eq!(failure.page, 4);
        assert!(failure.message.contains("coordinates4.json"));
        assert!(images.try_recv().is_err());
        assert!(records.try_recv().is_err());
    }

    #[test]
    fn test_failed_manifest_publishes_nothing() {
        let record = serde_json::to_vec(&sample_record()).unwrap();
        let transport = MockTransport::default().serve("mock://coordinates2.json", record);
        let service = DataService::new(Arc::new(transport), Box::new(StubSubmitter), endpoints());
        let images = service.image_paths();
        let records = service.coordinates();
        let failures = service.failures();

        service.fetch_page(2);

        let failure = failures.recv_timeout(WAIT).unwrap();
        assert_eq!(failure.page, 2);
        assert!(failure.message.contains("input.json"));
        assert!(images.try_recv().is_err());
        assert!(records.try_recv().is_err());
    }

    #[test]
    fn test_fetch_image_decodes_png() {
        let transport = MockTransport::default().serve("mock://ptosis-1.jpg", png_bytes());
        let img = fetch_image(&transport, "mock://ptosis-1.jpg").unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    #[test]
    fn test_fetch_image_reports_decode_errors() {
        let transport = MockTransport::default().serve("mock://ptosis-1.jpg", "not an image");
        let err = fetch_image(&transport, "mock://ptosis-1.jpg").unwrap_err();
        assert!(matches!(err, DataError::Image { .. }));
    }

    #[test]
    fn test_stub_submit_accepts() {
        assert!(StubSubmitter.submit(&sample_record(), 1).is_ok());
    }
}
