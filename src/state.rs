//! Project state: the aggregate of every entity collection for one project
//! directory, with JSON persistence and image reconciliation.
//!
//! `description`, `payloads`, `blocks`, `panels`, and `task_graph` load
//! directly from the `project.json` document. `images` is the odd one out:
//! recorded entries are merged with a scan of the `images/` directory, so
//! files moved, added, or deleted outside the tool are picked up on load.
//!
//! Cross-collection name references (device to payload, image to block and
//! panel) are kept resolvable by cascades wired directly off rename and
//! deletion events: a reference always names a live entity or is empty.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ProjectError;
use crate::events::{EventEmitter, EventedList};
use crate::model::{
    Block, BlockData, BlockRef, Image, ImageData, ImageRef, Panel, PanelData, PanelRef, Payload,
    PayloadData, PayloadRef, TaskGraph, TaskGraphData, scan_image_relpaths,
};
use crate::natsort::natural_cmp;

/// Name of the settings file inside a project directory.
pub const PROJECT_FILENAME: &str = "project.json";

/// The serialized form of a whole project.
///
/// `name` is included to help identify the file without having to find the
/// parent folder; it is never read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDoc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payloads: Vec<PayloadData>,
    #[serde(default)]
    pub blocks: Vec<BlockData>,
    #[serde(default)]
    pub panels: Vec<PanelData>,
    #[serde(default)]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub task_graph: TaskGraphData,
}

/// Events emitted by a [`ProjectState`].
#[derive(Debug)]
pub struct StateEvents {
    pub description: EventEmitter<String>,
}

/// All entity collections for one project directory.
pub struct ProjectState {
    path: PathBuf,
    description: RefCell<String>,
    payloads: EventedList<PayloadRef>,
    blocks: EventedList<BlockRef>,
    panels: EventedList<PanelRef>,
    images: Rc<Vec<ImageRef>>,
    task_graph: TaskGraph,
    pub events: StateEvents,
}

impl ProjectState {
    /// Load the project at `path`.
    ///
    /// A missing or malformed `project.json` falls back to an empty default
    /// document; ambiguous image identities (duplicate base filenames under
    /// `images/`) abort the load.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let path = path.into();
        let filepath = path.join(PROJECT_FILENAME);

        let doc = if filepath.exists() {
            let text = fs::read_to_string(&filepath)?;
            match serde_json::from_str::<ProjectDoc>(&text) {
                Ok(doc) => {
                    log::debug!("project settings read from {:?}", filepath);
                    doc
                }
                Err(e) => {
                    log::warn!("reading settings failed ({}); using default values", e);
                    ProjectDoc::default()
                }
            }
        } else {
            log::debug!("project file not found; using default values");
            ProjectDoc::default()
        };

        let images = reconcile_images(&path, &doc.images)?;

        let state = Self {
            path,
            description: RefCell::new(doc.description),
            payloads: EventedList::from_vec(doc.payloads.iter().map(Payload::from_data).collect()),
            blocks: EventedList::from_vec(doc.blocks.iter().map(Block::from_data).collect()),
            panels: EventedList::from_vec(doc.panels.iter().map(Panel::from_data).collect()),
            images: Rc::new(images),
            task_graph: TaskGraph::from_data(&doc.task_graph),
            events: StateEvents {
                description: EventEmitter::new(),
            },
        };
        state.wire_cascades();
        Ok(state)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn description(&self) -> String {
        self.description.borrow().clone()
    }

    pub fn set_description(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut description = self.description.borrow_mut();
            if *description == val {
                return;
            }
            *description = val.clone();
        }
        self.events.description.emit(&val);
    }

    pub fn payloads(&self) -> &EventedList<PayloadRef> {
        &self.payloads
    }

    pub fn blocks(&self) -> &EventedList<BlockRef> {
        &self.blocks
    }

    pub fn panels(&self) -> &EventedList<PanelRef> {
        &self.panels
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn task_graph(&self) -> &TaskGraph {
        &self.task_graph
    }

    /// Append a payload with a default name.
    pub fn add_payload(&self) -> PayloadRef {
        let n = self.payloads.len();
        let payload = Payload::new(format!("New payload {}", n + 1));
        self.payloads.push(payload.clone());
        payload
    }

    /// Remove the payload at `index`; device references to it are reset.
    pub fn delete_payload(&self, index: usize) -> PayloadRef {
        self.payloads.remove(index)
    }

    /// Append a block with a default name.
    pub fn add_block(&self) -> BlockRef {
        let n = self.blocks.len();
        let block = Block::new(format!("New block {}", n + 1));
        self.blocks.push(block.clone());
        block
    }

    /// Remove the block at `index`; image references to it are reset.
    pub fn delete_block(&self, index: usize) -> BlockRef {
        self.blocks.remove(index)
    }

    /// Append a panel with a default name.
    pub fn add_panel(&self) -> PanelRef {
        let n = self.panels.len();
        let panel = Panel::new(format!("New panel {}", n + 1));
        self.panels.push(panel.clone());
        panel
    }

    /// Remove the panel at `index`; image references to it are reset.
    pub fn delete_panel(&self, index: usize) -> PanelRef {
        self.panels.remove(index)
    }

    /// Indexes of payloads failing validation or sharing a name.
    pub fn invalid_payload_indexes(&self) -> BTreeSet<usize> {
        let payloads = self.payloads.items();
        let mut invalid: BTreeSet<usize> = payloads
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_valid())
            .map(|(i, _)| i)
            .collect();

        let names: Vec<String> = payloads.iter().map(|p| p.name()).collect();
        invalid.extend(duplicate_indexes(&names));

        invalid
    }

    /// Indexes of blocks failing validation, sharing a name, containing
    /// duplicate sample names, or containing an unnamed device.
    pub fn invalid_block_indexes(&self) -> BTreeSet<usize> {
        let blocks = self.blocks.items();
        let mut invalid: BTreeSet<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_valid())
            .map(|(i, _)| i)
            .collect();

        let names: Vec<String> = blocks.iter().map(|b| b.name()).collect();
        invalid.extend(duplicate_indexes(&names));

        for (index, block) in blocks.iter().enumerate() {
            let sample_names: Vec<String> =
                block.samples().items().iter().map(|s| s.name()).collect();
            if !duplicate_indexes(&sample_names).is_empty() {
                invalid.insert(index);
            }

            // unnamed devices flag the whole block even though device
            // validity already covers them
            if block
                .devices()
                .items()
                .iter()
                .any(|d| d.name().is_empty())
            {
                invalid.insert(index);
            }
        }

        invalid
    }

    /// Indexes of panels failing validation or sharing a name.
    pub fn invalid_panel_indexes(&self) -> BTreeSet<usize> {
        let panels = self.panels.items();
        let mut invalid: BTreeSet<usize> = panels
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_valid())
            .map(|(i, _)| i)
            .collect();

        let names: Vec<String> = panels.iter().map(|p| p.name()).collect();
        invalid.extend(duplicate_indexes(&names));

        invalid
    }

    /// Images carry no hard validity constraint; every index passes.
    pub fn invalid_image_indexes(&self) -> BTreeSet<usize> {
        BTreeSet::new()
    }

    /// The current serialized form of the whole project.
    pub fn to_doc(&self) -> ProjectDoc {
        ProjectDoc {
            name: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            description: self.description(),
            payloads: self.payloads.items().iter().map(|p| p.to_data()).collect(),
            blocks: self.blocks.items().iter().map(|b| b.to_data()).collect(),
            panels: self.panels.items().iter().map(|p| p.to_data()).collect(),
            images: self.images.iter().map(|i| i.to_data()).collect(),
            task_graph: self.task_graph.to_data(),
        }
    }

    /// Persist the project to `project.json`, pretty-printed, overwriting in
    /// place via a temporary file so a failed write cannot truncate the
    /// previous save.
    pub fn save(&self) -> Result<(), ProjectError> {
        let text = serde_json::to_string_pretty(&self.to_doc())?;

        let filepath = self.path.join(PROJECT_FILENAME);
        let tmp = self.path.join(format!("{}.tmp", PROJECT_FILENAME));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &filepath)?;

        log::debug!("project settings saved to {:?}", filepath);
        Ok(())
    }

    /// Wire the rename/deletion cascades that keep cross-collection name
    /// references resolvable.
    fn wire_cascades(&self) {
        // payload names flow into device references
        for payload in self.payloads.items() {
            bind_payload_rename(&payload, &self.blocks);
        }
        let blocks = self.blocks.clone();
        self.payloads
            .events()
            .added
            .connect(move |add| bind_payload_rename(&add.item, &blocks));
        let payloads = self.payloads.clone();
        let blocks = self.blocks.clone();
        self.payloads
            .events()
            .deleted
            .connect(move |_| prune_payload_names(&payloads, &blocks));

        // block names flow into image tags
        for block in self.blocks.items() {
            bind_block_rename(&block, &self.images);
        }
        let images = Rc::clone(&self.images);
        self.blocks
            .events()
            .added
            .connect(move |add| bind_block_rename(&add.item, &images));
        let blocks = self.blocks.clone();
        let images = Rc::clone(&self.images);
        self.blocks
            .events()
            .deleted
            .connect(move |_| prune_block_names(&blocks, &images));

        // panel names flow into image tags
        for panel in self.panels.items() {
            bind_panel_rename(&panel, &self.images);
        }
        let images = Rc::clone(&self.images);
        self.panels
            .events()
            .added
            .connect(move |add| bind_panel_rename(&add.item, &images));
        let panels = self.panels.clone();
        let images = Rc::clone(&self.images);
        self.panels
            .events()
            .deleted
            .connect(move |_| prune_panel_names(&panels, &images));
    }
}

impl std::fmt::Debug for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectState")
            .field("path", &self.path)
            .field("description", &self.description())
            .field("payloads", &self.payloads)
            .field("blocks", &self.blocks)
            .field("panels", &self.panels)
            .field("images", &self.images)
            .finish()
    }
}

/// Merge recorded image entries with the files actually present on disk.
fn reconcile_images(path: &Path, records: &[ImageData]) -> Result<Vec<ImageRef>, ProjectError> {
    let mut present = scan_image_relpaths(path)?;

    let mut images: Vec<ImageRef> = Vec::new();
    for record in records {
        let image = match Image::from_data(record) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("dropping invalid image record: {}", e);
                continue;
            }
        };

        // recorded path still present on disk: nothing to repair
        if let Some(found) = present.iter().position(|p| *p == image.relpath()) {
            present.remove(found);
            images.push(image);
            continue;
        }

        // same base filename elsewhere: the file was moved outside the tool
        let relpath = image.relpath();
        let found = relpath.file_name().and_then(|name| {
            present
                .iter()
                .position(|p| p.file_name() == Some(name))
        });
        match found {
            Some(found) => {
                let new_relpath = present.remove(found);
                log::debug!("{:?} moved to {:?}", relpath, new_relpath);
                image.set_relpath(new_relpath);
                images.push(image);
            }
            None => log::warn!("unable to find {:?}", relpath),
        }
    }

    // anything left on disk is new and starts untagged
    for relpath in present {
        images.push(Image::new(relpath));
    }

    images.sort_by(|a, b| {
        natural_cmp(
            &a.relpath().to_string_lossy(),
            &b.relpath().to_string_lossy(),
        )
    });

    Ok(images)
}

/// Indexes of entries whose name occurs more than once.
fn duplicate_indexes(names: &[String]) -> BTreeSet<usize> {
    let mut indexes = BTreeSet::new();
    for (i, name) in names.iter().enumerate() {
        if names.iter().filter(|n| *n == name).count() > 1 {
            indexes.insert(i);
        }
    }
    indexes
}

fn bind_payload_rename(payload: &PayloadRef, blocks: &EventedList<BlockRef>) {
    let blocks = blocks.clone();
    payload.events.name.connect(move |change| {
        for block in blocks.items() {
            for device in block.devices().items() {
                if device.payload_name() == change.old {
                    device.set_payload_name(change.new.clone());
                }
            }
        }
    });
}

fn prune_payload_names(payloads: &EventedList<PayloadRef>, blocks: &EventedList<BlockRef>) {
    let names: Vec<String> = payloads.items().iter().map(|p| p.name()).collect();
    for block in blocks.items() {
        for device in block.devices().items() {
            if !names.contains(&device.payload_name()) {
                device.set_payload_name(String::new());
            }
        }
    }
}

fn bind_block_rename(block: &BlockRef, images: &Rc<Vec<ImageRef>>) {
    let images = Rc::clone(images);
    block.events.name.connect(move |change| {
        for image in images.iter() {
            if image.block_name() == change.old {
                image.set_block_name(change.new.clone());
            }
        }
    });
}

fn prune_block_names(blocks: &EventedList<BlockRef>, images: &Rc<Vec<ImageRef>>) {
    let names: Vec<String> = blocks.items().iter().map(|b| b.name()).collect();
    for image in images.iter() {
        if !names.contains(&image.block_name()) {
            image.set_block_name(String::new());
        }
    }
}

fn bind_panel_rename(panel: &PanelRef, images: &Rc<Vec<ImageRef>>) {
    let images = Rc::clone(images);
    panel.events.name.connect(move |change| {
        for image in images.iter() {
            if image.panel_name() == change.old {
                image.set_panel_name(change.new.clone());
            }
        }
    });
}

fn prune_panel_names(panels: &EventedList<PanelRef>, images: &Rc<Vec<ImageRef>>) {
    let names: Vec<String> = panels.items().iter().map(|p| p.name()).collect();
    for image in images.iter() {
        if !names.contains(&image.panel_name()) {
            image.set_panel_name(String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn write_doc(dir: &Path, doc: &ProjectDoc) {
        let text = serde_json::to_string_pretty(doc).unwrap();
        fs::write(dir.join(PROJECT_FILENAME), text).unwrap();
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        assert_eq!(state.description(), "");
        assert!(state.payloads().is_empty());
        assert!(state.blocks().is_empty());
        assert!(state.panels().is_empty());
        assert!(state.images().is_empty());
    }

    #[test]
    fn test_load_malformed_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILENAME), b"{not json").unwrap();

        let state = ProjectState::load(dir.path()).unwrap();
        assert_eq!(state.description(), "");
        assert!(state.payloads().is_empty());
    }

    #[test]
    fn test_reconcile_keeps_recorded_entry_when_present() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/a/b.svs"));

        let doc = ProjectDoc {
            images: vec![ImageData {
                relpath: Some("a/b.svs".to_string()),
                block_name: "B1".to_string(),
                panel_name: "P1".to_string(),
            }],
            ..Default::default()
        };
        write_doc(dir.path(), &doc);

        let state = ProjectState::load(dir.path()).unwrap();
        assert_eq!(state.images().len(), 1);
        let image = &state.images()[0];
        assert_eq!(image.relpath(), PathBuf::from("a/b.svs"));
        // the keep branch preserves tags; only the scan branch starts empty
        assert_eq!(image.block_name(), "B1");
        assert_eq!(image.panel_name(), "P1");
    }

    #[test]
    fn test_reconcile_repairs_moved_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/moved/slide1.svs"));

        let doc = ProjectDoc {
            images: vec![ImageData {
                relpath: Some("orig/slide1.svs".to_string()),
                block_name: "B1".to_string(),
                panel_name: String::new(),
            }],
            ..Default::default()
        };
        write_doc(dir.path(), &doc);

        let state = ProjectState::load(dir.path()).unwrap();
        assert_eq!(state.images().len(), 1);
        let image = &state.images()[0];
        assert_eq!(image.relpath(), PathBuf::from("moved/slide1.svs"));
        assert_eq!(image.block_name(), "B1");
    }

    #[test]
    fn test_reconcile_drops_missing_and_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();

        let doc = ProjectDoc {
            images: vec![
                ImageData {
                    relpath: Some("gone.svs".to_string()),
                    block_name: String::new(),
                    panel_name: String::new(),
                },
                ImageData {
                    relpath: None,
                    block_name: "B1".to_string(),
                    panel_name: String::new(),
                },
            ],
            ..Default::default()
        };
        write_doc(dir.path(), &doc);

        let state = ProjectState::load(dir.path()).unwrap();
        assert!(state.images().is_empty());
    }

    #[test]
    fn test_reconcile_adds_new_files_untagged() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/new.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        assert_eq!(state.images().len(), 1);
        assert_eq!(state.images()[0].block_name(), "");
        assert_eq!(state.images()[0].panel_name(), "");
    }

    #[test]
    fn test_reconcile_sorts_naturally() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/img10.svs"));
        touch(&dir.path().join("images/img2.svs"));
        touch(&dir.path().join("images/img1.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        let order: Vec<PathBuf> = state.images().iter().map(|i| i.relpath()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("img1.svs"),
                PathBuf::from("img2.svs"),
                PathBuf::from("img10.svs"),
            ]
        );
    }

    #[test]
    fn test_load_rejects_duplicate_basenames() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/a/slide.svs"));
        touch(&dir.path().join("images/b/slide.svs"));

        assert!(matches!(
            ProjectState::load(dir.path()),
            Err(ProjectError::DuplicateImageFilenames { .. })
        ));
    }

    #[test]
    fn test_duplicate_payload_names_flag_both() {
        use crate::model::{AngDir, LongDir, LongOrient};

        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        for name in ["Drug1", "Drug1", "Drug2"] {
            let payload = state.add_payload();
            payload.set_name(name);
            payload.set_long_orient(LongOrient::TipIntoPage);
            payload.set_long_dir(LongDir::IncreasingTowardsTip);
            payload.set_ang_dir(AngDir::Clockwise);
        }

        // each payload passes is_valid() on its own; only the shared name
        // flags the first two
        let invalid = state.invalid_payload_indexes();
        assert_eq!(invalid, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_invalid_block_indexes_cover_all_rules() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        // duplicate sample names within a block
        let block = state.add_block();
        let s1 = block.add_sample();
        s1.set_name("S1");
        let s2 = block.add_sample();
        s2.set_name("S1");
        assert!(state.invalid_block_indexes().contains(&0));
        s2.set_name("S2");
        assert!(state.invalid_block_indexes().is_empty());

        // unnamed device
        let device = block.add_device();
        device.set_name("");
        assert!(state.invalid_block_indexes().contains(&0));
    }

    #[test]
    fn test_payload_rename_cascades_to_devices() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        let payload = state.add_payload();
        payload.set_name("Drug A");

        let block = state.add_block();
        let tagged = block.add_device();
        tagged.set_payload_name("Drug A");
        let untagged = block.add_device();
        untagged.set_payload_name("Drug B");

        let other_block = state.add_block();
        let in_other = other_block.add_device();
        in_other.set_payload_name("Drug A");

        payload.set_name("Drug A2");

        assert_eq!(tagged.payload_name(), "Drug A2");
        assert_eq!(in_other.payload_name(), "Drug A2");
        assert_eq!(untagged.payload_name(), "Drug B");
    }

    #[test]
    fn test_payload_delete_resets_device_references() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        let payload = state.add_payload();
        payload.set_name("Drug A");
        let kept = state.add_payload();
        kept.set_name("Drug B");

        let block = state.add_block();
        let orphaned = block.add_device();
        orphaned.set_payload_name("Drug A");
        let still_tagged = block.add_device();
        still_tagged.set_payload_name("Drug B");

        state.delete_payload(0);

        assert_eq!(orphaned.payload_name(), "");
        assert_eq!(still_tagged.payload_name(), "Drug B");
    }

    #[test]
    fn test_block_rename_and_delete_cascade_to_images() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/one.svs"));
        touch(&dir.path().join("images/two.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        let block = state.add_block();
        block.set_name("X");
        let other = state.add_block();
        other.set_name("Y");

        state.images()[0].set_block_name("X");
        state.images()[1].set_block_name("Y");

        block.set_name("Z");
        assert_eq!(state.images()[0].block_name(), "Z");
        assert_eq!(state.images()[1].block_name(), "Y");

        state.delete_block(0);
        assert_eq!(state.images()[0].block_name(), "");
        assert_eq!(state.images()[1].block_name(), "Y");
    }

    #[test]
    fn test_panel_rename_and_delete_cascade_to_images() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/one.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        let panel = state.add_panel();
        panel.set_name("IHC-1");
        state.images()[0].set_panel_name("IHC-1");

        panel.set_name("IHC-2");
        assert_eq!(state.images()[0].panel_name(), "IHC-2");

        state.delete_panel(0);
        assert_eq!(state.images()[0].panel_name(), "");
    }

    #[test]
    fn test_cascades_apply_to_entities_added_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProjectState::load(dir.path()).unwrap();

        // both the payload and the block arrive after the cascades are wired
        let payload = state.add_payload();
        payload.set_name("Drug A");
        let block = state.add_block();
        let device = block.add_device();
        device.set_payload_name("Drug A");

        payload.set_name("Drug B");
        assert_eq!(device.payload_name(), "Drug B");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/slide1.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        state.set_description("pilot study");

        let payload = state.add_payload();
        payload.set_name("Drug A");
        payload.add_formulation().set_level("L1");

        let block = state.add_block();
        let sample = block.add_sample();
        sample.cohorts().insert("treatment", "vehicle");
        let device = block.add_device();
        device.set_payload_name("Drug A");
        device.set_sample_name(sample.name());

        let panel = state.add_panel();
        panel.add_channel().set_chromogen("DAB");

        state.images()[0].set_block_name(block.name());

        state.save().unwrap();

        let reloaded = ProjectState::load(dir.path()).unwrap();
        assert_eq!(reloaded.to_doc(), state.to_doc());
    }

    #[test]
    fn test_saved_doc_carries_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("my_project");
        fs::create_dir(&project).unwrap();

        let state = ProjectState::load(&project).unwrap();
        assert_eq!(state.to_doc().name, "my_project");
    }

    #[test]
    fn test_invalid_image_indexes_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("images/one.svs"));

        let state = ProjectState::load(dir.path()).unwrap();
        assert!(state.invalid_image_indexes().is_empty());
    }
}
