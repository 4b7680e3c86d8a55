//! The annotation session: everything the view shows and edits, without egui.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use image::DynamicImage;

use crate::data::{DataService, FetchFailure, PageImage, PageRecord};
use crate::error::DataError;
use crate::geometry::ArrowSet;
use crate::gesture::{Gesture, GestureController};
use crate::model::CoordinateRecord;
use crate::pagination::{PageSelection, Pagination};
use crate::storage::KeyValueStore;

pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Idle,
    Loading { page: u32 },
    Ready { page: u32 },
    Failed { page: u32, message: String },
}

/// What the view should do with its page image.
#[derive(Debug)]
pub enum ImageUpdate {
    /// A new page was requested; the old image no longer applies.
    Clear,
    Show(DynamicImage),
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

impl Notification {
    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < NOTIFICATION_DURATION
    }
}

pub struct Session {
    data: DataService,
    store: Box<dyn KeyValueStore>,
    selection: PageSelection,
    pagination: Pagination,
    gestures: GestureController,

    record: Option<CoordinateRecord>,
    arrows: Option<ArrowSet>,
    scope: Option<String>,
    load_state: LoadState,

    image_paths: Receiver<PageImage>,
    coordinates: Receiver<PageRecord>,
    failures: Receiver<FetchFailure>,
    pending_image: Option<Receiver<Result<DynamicImage, DataError>>>,
    image_update: Option<ImageUpdate>,

    notification: Option<Notification>,
}

impl Session {
    pub fn new(data: DataService, mut store: Box<dyn KeyValueStore>, page_count: u32) -> Self {
        let mut selection = PageSelection::load(store.as_ref());
        let pagination = Pagination::new(page_count, selection.page());
        if !pagination.is_highlighted(selection.page()) {
            log::warn!(
                "Stored page {} has no marker, using page {}",
                selection.page(),
                pagination.highlighted()
            );
            selection.set(pagination.highlighted(), store.as_mut());
        }
        Self {
            image_paths: data.image_paths(),
            coordinates: data.coordinates(),
            failures: data.failures(),
            data,
            store,
            selection,
            pagination,
            gestures: GestureController::default(),
            record: None,
            arrows: None,
            scope: None,
            load_state: LoadState::Idle,
            pending_image: None,
            image_update: None,
            notification: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn page(&self) -> u32 {
        self.selection.page()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn record(&self) -> Option<&CoordinateRecord> {
        self.record.as_ref()
    }

    pub fn arrows(&self) -> Option<&ArrowSet> {
        self.arrows.as_ref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn active_gesture(&self) -> Option<Gesture> {
        self.gestures.active()
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// True while something is in flight and the view should keep polling.
    pub fn is_busy(&self) -> bool {
        matches!(self.load_state, LoadState::Loading { .. }) || self.pending_image.is_some()
    }

    /// True once the current page's record is loaded and may be edited or saved.
    pub fn is_editable(&self) -> bool {
        self.record.is_some() && self.load_state == LoadState::Ready { page: self.page() }
    }

    /// The latest change to the page image, handed out once.
    pub fn take_image_update(&mut self) -> Option<ImageUpdate> {
        self.image_update.take()
    }

    pub fn notification(&self, now: Instant) -> Option<&Notification> {
        self.notification.as_ref().filter(|n| n.is_visible(now))
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Loads the selected page. Called once the view exists.
    pub fn on_ready(&mut self) {
        self.request(self.page());
    }

    pub fn retry(&mut self) {
        self.request(self.page());
    }

    fn request(&mut self, page: u32) {
        self.gestures.end();
        self.record = None;
        self.arrows = None;
        self.pending_image = None;
        self.image_update = Some(ImageUpdate::Clear);
        self.load_state = LoadState::Loading { page };
        self.data.fetch_page(page);
    }

    /// Drains finished fetches. Returns true if anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        let current = self.page();

        while let Ok(msg) = self.coordinates.try_recv() {
            if msg.page != current {
                log::debug!("Dropping stale record for page {}", msg.page);
                continue;
            }
            log::debug!(
                "Manifest {} lists {} images",
                msg.manifest.file_name,
                msg.manifest.images.len()
            );
            self.set_record(msg.record);
            self.scope = Some(msg.manifest.scope);
            self.load_state = LoadState::Ready { page: current };
            changed = true;
        }

        while let Ok(msg) = self.image_paths.try_recv() {
            if msg.page == current {
                self.pending_image = Some(self.data.load_image(msg.url));
            }
        }

        while let Ok(failure) = self.failures.try_recv() {
            if failure.page == current {
                self.load_state = LoadState::Failed {
                    page: failure.page,
                    message: failure.message,
                };
                changed = true;
            }
        }

        if let Some(rx) = &self.pending_image {
            let failed = match rx.try_recv() {
                Ok(Ok(image)) => {
                    self.image_update = Some(ImageUpdate::Show(image));
                    self.pending_image = None;
                    changed = true;
                    None
                }
                Ok(Err(e)) => Some(e.to_string()),
                Err(crossbeam_channel::TryRecvError::Empty) => None,
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    Some("image download stopped unexpectedly".to_string())
                }
            };
            if let Some(message) = failed {
                log::error!("Image for page {current} failed: {message}");
                self.pending_image = None;
                self.gestures.end();
                self.load_state = LoadState::Failed {
                    page: current,
                    message,
                };
                changed = true;
            }
        }

        changed
    }

    fn set_record(&mut self, record: CoordinateRecord) {
        self.gestures.end();
        self.record = Some(record);
        self.redraw();
    }

    fn redraw(&mut self) {
        self.arrows = self.record.as_ref().map(ArrowSet::compute);
    }

    // ── Gestures ────────────────────────────────────────────────────────────

    pub fn begin_gesture(&mut self, gesture: Gesture) {
        self.gestures.begin(gesture);
    }

    /// Applies a pointer offset in image space to the active gesture.
    pub fn pointer_moved(&mut self, pointer: (f32, f32)) -> bool {
        if !self.is_editable() {
            return false;
        }
        let Some(record) = self.record.as_mut() else {
            return false;
        };
        if !self.gestures.pointer_moved(record, pointer) {
            return false;
        }
        self.redraw();
        true
    }

    pub fn end_gesture(&mut self) {
        self.gestures.end();
    }

    // ── Pagination ──────────────────────────────────────────────────────────

    /// Switches to `page` and fetches it. Unknown markers are ignored.
    pub fn change_page(&mut self, page: u32) -> bool {
        if !self.pagination.highlight(page) {
            log::warn!("No page marker {page}");
            return false;
        }
        self.selection.set(page, self.store.as_mut());
        self.request(page);
        true
    }

    // ── Save ────────────────────────────────────────────────────────────────

    /// Submits the current page's record. Does nothing unless the page is loaded.
    pub fn save(&mut self, now: Instant) {
        if !self.is_editable() {
            return;
        }
        let Some(record) = &self.record else {
            return;
        };
        match self.data.submit(record, self.page()) {
            Ok(()) => self.notify("Saved", false, now),
            Err(e) => {
                log::error!("Save failed: {e}");
                self.notify(format!("Save failed: {e}"), true, now);
            }
        }
    }

    pub fn notify(&mut self, text: impl Into<String>, is_error: bool, now: Instant) {
        self.notification = Some(Notification {
            text: text.into(),
            is_error,
            shown_at: now,
        });
    }
}
