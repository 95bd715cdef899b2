//! Viewer model: the current project and its dirty tracking.
//!
//! Wraps at most one [`ProjectState`] together with an `is_stale` flag that
//! flips on any entity mutation. The model never decides whether pending
//! changes should be saved: it refuses to switch projects while stale, and
//! the presentation layer must first answer the save/discard/cancel prompt
//! via [`ViewerModel::resolve_stale`].

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::ProjectError;
use crate::events::EventEmitter;
use crate::model::{
    BlockRef, ChannelRef, DeviceRef, FormulationRef, ImageRef, PanelRef, PayloadRef, SampleRef,
    VectorRef,
};
use crate::state::{PROJECT_FILENAME, ProjectState};

/// Three-way answer to the save prompt raised before switching projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// Persist pending changes, then allow the switch.
    Save,
    /// Drop pending changes, then allow the switch.
    Discard,
    /// Keep the current project and its pending changes.
    Cancel,
}

/// Events emitted by a [`ViewerModel`].
#[derive(Debug)]
pub struct ViewerEvents {
    pub path: EventEmitter<PathBuf>,
    pub is_stale: EventEmitter<bool>,
}

/// Shared handle to the dirty flag, cloned into every stale binding.
#[derive(Clone)]
struct StaleFlag {
    inner: Rc<StaleInner>,
}

struct StaleInner {
    value: Cell<bool>,
    event: EventEmitter<bool>,
}

impl StaleFlag {
    fn new(event: EventEmitter<bool>) -> Self {
        Self {
            inner: Rc::new(StaleInner {
                value: Cell::new(false),
                event,
            }),
        }
    }

    fn get(&self) -> bool {
        self.inner.value.get()
    }

    fn set(&self, val: bool) {
        if self.inner.value.get() != val {
            self.inner.value.set(val);
            self.inner.event.emit(&val);
        }
    }

    fn mark(&self) {
        self.set(true);
    }
}

/// The currently open project, if any, with dirty tracking.
pub struct ViewerModel {
    state: Option<ProjectState>,
    stale: StaleFlag,
    pub events: ViewerEvents,
}

impl ViewerModel {
    pub fn new() -> Self {
        let events = ViewerEvents {
            path: EventEmitter::new(),
            is_stale: EventEmitter::new(),
        };

        events
            .is_stale
            .connect(|val| log::debug!("is_stale changed to {}", val));
        events
            .path
            .connect(|path| log::debug!("path changed to {:?}", path));

        let stale = StaleFlag::new(events.is_stale.clone());
        Self {
            state: None,
            stale,
            events,
        }
    }

    /// Whether a project is open.
    pub fn is_set(&self) -> bool {
        self.state.is_some()
    }

    /// Whether there are unsaved changes.
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    pub fn state(&self) -> Option<&ProjectState> {
        self.state.as_ref()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.state.as_ref().map(|s| s.path().to_path_buf())
    }

    /// Change (or clear) the project path.
    ///
    /// Refused while stale: the caller must resolve pending changes first
    /// (see [`resolve_stale`](Self::resolve_stale)). Non-directories and
    /// filesystem roots are also refused. Returns whether the path changed;
    /// refusals emit no path event.
    pub fn set_path(&mut self, val: Option<PathBuf>) -> Result<bool, ProjectError> {
        if self.is_stale() {
            log::warn!(
                "path setter called while stale; resolve pending changes before switching projects"
            );
            return Ok(false);
        }

        let Some(val) = val else {
            log::debug!("path setter called with empty path; path unset");
            self.state = None;
            return Ok(true);
        };

        if self.is_set() && self.path().as_deref() == Some(val.as_path()) {
            log::debug!("no change in path");
            return Ok(false);
        }

        if !val.is_dir() {
            log::warn!("{:?} is not a directory; path not changed", val);
            return Ok(false);
        }

        if val.file_name().is_none() {
            log::warn!("{:?} is a base folder; path not changed", val);
            return Ok(false);
        }

        let had_file = val.join(PROJECT_FILENAME).exists();

        let state = ProjectState::load(&val)?;
        self.wire_stale_bindings(&state);
        self.state = Some(state);

        if !had_file {
            // a brand-new project has nothing on disk yet
            self.stale.mark();
        }

        self.events.path.emit(&val);
        Ok(true)
    }

    /// Persist the current project if it is set and stale.
    pub fn save(&self) -> Result<(), ProjectError> {
        let Some(state) = &self.state else {
            log::debug!("no project path set, so not saving");
            return Ok(());
        };
        if !self.is_stale() {
            log::debug!("up to date, so not saving");
            return Ok(());
        }

        state.save()?;
        self.stale.set(false);
        Ok(())
    }

    /// Apply the caller's answer to the save prompt.
    ///
    /// After `Save` or `Discard` the model is no longer stale and a
    /// subsequent [`set_path`](Self::set_path) proceeds; `Cancel` leaves
    /// everything as it was.
    pub fn resolve_stale(&self, action: SaveAction) -> Result<(), ProjectError> {
        match action {
            SaveAction::Save => self.save(),
            SaveAction::Discard => {
                self.stale.set(false);
                Ok(())
            }
            SaveAction::Cancel => Ok(()),
        }
    }

    /// Connect every mutation-relevant event of every entity, present and
    /// future, to the stale flag.
    fn wire_stale_bindings(&self, state: &ProjectState) {
        let stale = &self.stale;

        state.events.description.connect(mark_on(stale));

        // payloads
        state.payloads().events().changed.connect(mark_on(stale));
        let s = stale.clone();
        state.payloads().events().added.connect(move |add| {
            log::debug!("new payload {:?} added", add.item.name());
            bind_payload(&add.item, &s);
        });
        state
            .payloads()
            .events()
            .deleted
            .connect(|_| log::debug!("payload removed"));
        for payload in state.payloads().items() {
            bind_payload(&payload, stale);
        }

        // blocks
        state.blocks().events().changed.connect(mark_on(stale));
        let s = stale.clone();
        state.blocks().events().added.connect(move |add| {
            log::debug!("new block {:?} added", add.item.name());
            bind_block(&add.item, &s);
        });
        state
            .blocks()
            .events()
            .deleted
            .connect(|_| log::debug!("block removed"));
        for block in state.blocks().items() {
            bind_block(&block, stale);
        }

        // panels
        state.panels().events().changed.connect(mark_on(stale));
        let s = stale.clone();
        state.panels().events().added.connect(move |add| {
            log::debug!("new panel {:?} added", add.item.name());
            bind_panel(&add.item, &s);
        });
        state
            .panels()
            .events()
            .deleted
            .connect(|_| log::debug!("panel removed"));
        for panel in state.panels().items() {
            bind_panel(&panel, stale);
        }

        // images
        for image in state.images() {
            bind_image(image, stale);
        }
    }
}

impl Default for ViewerModel {
    fn default() -> Self {
        Self::new()
    }
}

fn mark_on<T>(stale: &StaleFlag) -> impl Fn(&T) + 'static {
    let stale = stale.clone();
    move |_| stale.mark()
}

fn bind_payload(payload: &PayloadRef, stale: &StaleFlag) {
    payload.events.name.connect(mark_on(stale));
    payload.events.long_orient.connect(mark_on(stale));
    payload.events.long_dir.connect(mark_on(stale));
    payload.events.ang_dir.connect(mark_on(stale));
    payload.events.notes.connect(mark_on(stale));

    payload.formulations().events().changed.connect(mark_on(stale));
    let s = stale.clone();
    payload
        .formulations()
        .events()
        .added
        .connect(move |add| bind_formulation(&add.item, &s));
    for formulation in payload.formulations().items() {
        bind_formulation(&formulation, stale);
    }
}

fn bind_formulation(formulation: &FormulationRef, stale: &StaleFlag) {
    formulation.events.name.connect(mark_on(stale));
    formulation.events.level.connect(mark_on(stale));
    formulation.angle().events.value.connect(mark_on(stale));
}

fn bind_block(block: &BlockRef, stale: &StaleFlag) {
    block.events.name.connect(mark_on(stale));
    block.events.notes.connect(mark_on(stale));

    block.samples().events().changed.connect(mark_on(stale));
    let s = stale.clone();
    block
        .samples()
        .events()
        .added
        .connect(move |add| bind_sample(&add.item, &s));
    for sample in block.samples().items() {
        bind_sample(&sample, stale);
    }

    block.devices().events().changed.connect(mark_on(stale));
    let s = stale.clone();
    block
        .devices()
        .events()
        .added
        .connect(move |add| bind_device(&add.item, &s));
    for device in block.devices().items() {
        bind_device(&device, stale);
    }

    block.vectors().events().changed.connect(mark_on(stale));
    let s = stale.clone();
    block
        .vectors()
        .events()
        .added
        .connect(move |add| bind_vector(&add.item, &s));
    for vector in block.vectors().items() {
        bind_vector(&vector, stale);
    }
}

fn bind_sample(sample: &SampleRef, stale: &StaleFlag) {
    sample.events.name.connect(mark_on(stale));
    sample.cohorts().events().changed.connect(mark_on(stale));
}

fn bind_device(device: &DeviceRef, stale: &StaleFlag) {
    device.events.name.connect(mark_on(stale));
    device.events.payload_name.connect(mark_on(stale));
    device.events.sample_name.connect(mark_on(stale));
}

fn bind_vector(vector: &VectorRef, stale: &StaleFlag) {
    vector.pos().events.x.connect(mark_on(stale));
    vector.pos().events.y.connect(mark_on(stale));
    vector.angle().events.value.connect(mark_on(stale));
}

fn bind_panel(panel: &PanelRef, stale: &StaleFlag) {
    panel.events.name.connect(mark_on(stale));

    panel.channels().events().changed.connect(mark_on(stale));
    let s = stale.clone();
    panel
        .channels()
        .events()
        .added
        .connect(move |add| bind_channel(&add.item, &s));
    for channel in panel.channels().items() {
        bind_channel(&channel, stale);
    }
}

fn bind_channel(channel: &ChannelRef, stale: &StaleFlag) {
    channel.events.biomarker.connect(mark_on(stale));
    channel.events.chromogen.connect(mark_on(stale));
    channel.events.notes.connect(mark_on(stale));
}

fn bind_image(image: &ImageRef, stale: &StaleFlag) {
    image.events.block_name.connect(mark_on(stale));
    image.events.panel_name.connect(mark_on(stale));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    fn project_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn opened(dir: &Path) -> ViewerModel {
        let mut model = ViewerModel::new();
        model.set_path(Some(dir.to_path_buf())).unwrap();
        model
    }

    #[test]
    fn test_new_model_is_unset_and_clean() {
        let model = ViewerModel::new();
        assert!(!model.is_set());
        assert!(!model.is_stale());
        assert_eq!(model.path(), None);
    }

    #[test]
    fn test_open_without_project_file_marks_stale() {
        let dir = project_dir();
        let model = opened(dir.path());

        assert!(model.is_set());
        // nothing exists on disk yet, so the new project needs saving
        assert!(model.is_stale());
    }

    #[test]
    fn test_open_existing_project_is_clean() {
        let dir = project_dir();
        {
            let model = opened(dir.path());
            model.save().unwrap();
        }

        let model = opened(dir.path());
        assert!(model.is_set());
        assert!(!model.is_stale());
    }

    #[test]
    fn test_mutation_marks_stale() {
        let dir = project_dir();
        let model = opened(dir.path());
        model.save().unwrap();
        assert!(!model.is_stale());

        model.state().unwrap().set_description("changed");
        assert!(model.is_stale());
    }

    #[test]
    fn test_mutating_entity_added_after_open_marks_stale() {
        let dir = project_dir();
        let model = opened(dir.path());
        model.save().unwrap();

        let payload = model.state().unwrap().add_payload();
        assert!(model.is_stale());
        model.save().unwrap();

        // bindings must cover entities created after the wiring pass
        payload.set_notes("late change");
        assert!(model.is_stale());
    }

    #[test]
    fn test_save_clears_stale_and_writes_file() {
        let dir = project_dir();
        let model = opened(dir.path());

        model.save().unwrap();
        assert!(!model.is_stale());
        assert!(dir.path().join(PROJECT_FILENAME).exists());
    }

    #[test]
    fn test_save_is_noop_when_clean() {
        let dir = project_dir();
        let model = opened(dir.path());
        model.save().unwrap();

        let before = fs::read_to_string(dir.path().join(PROJECT_FILENAME)).unwrap();
        fs::write(dir.path().join(PROJECT_FILENAME), "sentinel").unwrap();

        // not stale, so nothing may touch the file
        model.save().unwrap();
        let after = fs::read_to_string(dir.path().join(PROJECT_FILENAME)).unwrap();
        assert_eq!(after, "sentinel");
        assert_ne!(before, after);
    }

    #[test]
    fn test_set_path_refused_while_stale() {
        let dir = project_dir();
        let other = project_dir();

        let mut model = opened(dir.path());
        assert!(model.is_stale());

        let path_events = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&path_events);
        model
            .events
            .path
            .connect(move |p| seen.borrow_mut().push(p.clone()));

        let changed = model.set_path(Some(other.path().to_path_buf())).unwrap();
        assert!(!changed);
        assert_eq!(model.path(), Some(dir.path().to_path_buf()));
        assert!(path_events.borrow().is_empty());
    }

    #[test]
    fn test_resolve_stale_save_allows_switch() {
        let dir = project_dir();
        let other = project_dir();

        let mut model = opened(dir.path());
        assert!(model.is_stale());

        model.resolve_stale(SaveAction::Save).unwrap();
        assert!(!model.is_stale());
        assert!(dir.path().join(PROJECT_FILENAME).exists());

        assert!(model.set_path(Some(other.path().to_path_buf())).unwrap());
        assert_eq!(model.path(), Some(other.path().to_path_buf()));
    }

    #[test]
    fn test_resolve_stale_discard_skips_save() {
        let dir = project_dir();
        let model = opened(dir.path());
        assert!(model.is_stale());

        model.resolve_stale(SaveAction::Discard).unwrap();
        assert!(!model.is_stale());
        assert!(!dir.path().join(PROJECT_FILENAME).exists());
    }

    #[test]
    fn test_resolve_stale_cancel_keeps_pending_changes() {
        let dir = project_dir();
        let model = opened(dir.path());
        assert!(model.is_stale());

        model.resolve_stale(SaveAction::Cancel).unwrap();
        assert!(model.is_stale());
    }

    #[test]
    fn test_set_path_rejects_non_directory() {
        let dir = project_dir();
        let file = dir.path().join("not-a-dir.txt");
        fs::write(&file, b"").unwrap();

        let mut model = ViewerModel::new();
        assert!(!model.set_path(Some(file)).unwrap());
        assert!(!model.is_set());
    }

    #[test]
    fn test_set_path_rejects_root() {
        let mut model = ViewerModel::new();
        assert!(!model.set_path(Some(PathBuf::from("/"))).unwrap());
        assert!(!model.is_set());
    }

    #[test]
    fn test_set_path_same_path_is_noop() {
        let dir = project_dir();
        let mut model = opened(dir.path());
        model.resolve_stale(SaveAction::Discard).unwrap();

        assert!(!model.set_path(Some(dir.path().to_path_buf())).unwrap());
    }

    #[test]
    fn test_clear_path_discards_state() {
        let dir = project_dir();
        let mut model = opened(dir.path());
        model.resolve_stale(SaveAction::Discard).unwrap();

        assert!(model.set_path(None).unwrap());
        assert!(!model.is_set());
        assert_eq!(model.path(), None);
    }
}
