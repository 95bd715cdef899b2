//! Blocks: physical arrangements of devices, samples, and tissue.
//!
//! A block owns index-aligned device and placement-vector lists, and keeps
//! its device-to-sample references resolvable on its own: renaming a sample
//! rewrites matching references, deleting one clears references that no
//! longer resolve.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{NameChange, angle_from_json};
use crate::events::{EventEmitter, EventedDict, EventedList};
use crate::geom::{Angle, Point};

/// A device placement on the block diagram.
///
/// The angle is serialized in integer degrees for human readability.
pub struct Vector {
    pos: Point,
    angle: Angle,
}

/// Shared handle to a [`Vector`].
pub type VectorRef = Rc<Vector>;

impl Vector {
    /// A vector with no placement made yet.
    pub fn new() -> VectorRef {
        Rc::new(Self {
            pos: Point::unset(),
            angle: Angle::from_deg(0.0),
        })
    }

    pub fn with_pos(x: i32, y: i32, angle_deg: f64) -> VectorRef {
        Rc::new(Self {
            pos: Point::new(Some(x), Some(y)),
            angle: Angle::from_deg(angle_deg),
        })
    }

    pub fn pos(&self) -> &Point {
        &self.pos
    }

    pub fn angle(&self) -> &Angle {
        &self.angle
    }

    pub fn is_valid(&self) -> bool {
        self.pos.is_valid()
    }

    pub fn to_data(&self) -> VectorData {
        VectorData {
            pos: self.pos.as_tuple(),
            angle: self.angle.int_deg(),
        }
    }

    pub fn from_data(data: &VectorData) -> VectorRef {
        Rc::new(Self {
            pos: Point::new(data.pos.0, data.pos.1),
            angle: Angle::from_deg(data.angle as f64),
        })
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector(pos={:?}, angle={:?})", self.pos, self.angle)
    }
}

/// Serializable vector record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorData {
    #[serde(default)]
    pub pos: (Option<i32>, Option<i32>),
    #[serde(default, deserialize_with = "angle_from_json")]
    pub angle: i64,
}

/// Events emitted by a [`Sample`].
#[derive(Debug)]
pub struct SampleEvents {
    pub name: EventEmitter<NameChange>,
}

/// A tissue sample within a block, carrying sparse cohort-group values.
pub struct Sample {
    name: RefCell<String>,
    cohorts: EventedDict,
    pub events: SampleEvents,
}

/// Shared handle to a [`Sample`].
pub type SampleRef = Rc<Sample>;

impl Sample {
    pub fn new(name: impl Into<String>) -> SampleRef {
        Self::from_parts(name.into(), BTreeMap::new())
    }

    fn from_parts(name: String, cohorts: BTreeMap<String, String>) -> SampleRef {
        Rc::new(Self {
            name: RefCell::new(name),
            cohorts: EventedDict::from_map(cohorts),
            events: SampleEvents {
                name: EventEmitter::new(),
            },
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the sample, notifying subscribers with both names so device
    /// references can follow.
    pub fn set_name(&self, val: impl Into<String>) {
        let val = val.into();
        let old = {
            let mut name = self.name.borrow_mut();
            if *name == val {
                return;
            }
            std::mem::replace(&mut *name, val.clone())
        };
        self.events.name.emit(&NameChange { old, new: val });
    }

    pub fn cohorts(&self) -> &EventedDict {
        &self.cohorts
    }

    /// The value for a cohort group; absent groups read as empty.
    pub fn cohort(&self, group: &str) -> String {
        self.cohorts.get(group).unwrap_or_default()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.borrow().is_empty()
    }

    pub fn to_data(&self) -> SampleData {
        SampleData {
            name: self.name(),
            cohorts: self.cohorts.to_map(),
        }
    }

    pub fn from_data(data: &SampleData) -> SampleRef {
        Self::from_parts(data.name.clone(), data.cohorts.clone())
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sample(name={}, cohorts={:?})", self.name(), self.cohorts)
    }
}

/// Serializable sample record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cohorts: BTreeMap<String, String>,
}

/// Events emitted by a [`Device`].
#[derive(Debug)]
pub struct DeviceEvents {
    pub name: EventEmitter<String>,
    pub payload_name: EventEmitter<String>,
    pub sample_name: EventEmitter<String>,
}

/// A delivery apparatus placed within a block, referencing one payload and
/// one sample by name.
pub struct Device {
    name: RefCell<String>,
    payload_name: RefCell<String>,
    sample_name: RefCell<String>,
    pub events: DeviceEvents,
}

/// Shared handle to a [`Device`].
pub type DeviceRef = Rc<Device>;

impl Device {
    pub fn new(name: impl Into<String>) -> DeviceRef {
        Self::from_parts(name.into(), String::new(), String::new())
    }

    fn from_parts(name: String, payload_name: String, sample_name: String) -> DeviceRef {
        Rc::new(Self {
            name: RefCell::new(name),
            payload_name: RefCell::new(payload_name),
            sample_name: RefCell::new(sample_name),
            events: DeviceEvents {
                name: EventEmitter::new(),
                payload_name: EventEmitter::new(),
                sample_name: EventEmitter::new(),
            },
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut name = self.name.borrow_mut();
            if *name == val {
                return;
            }
            *name = val.clone();
        }
        self.events.name.emit(&val);
    }

    pub fn payload_name(&self) -> String {
        self.payload_name.borrow().clone()
    }

    pub fn set_payload_name(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut payload_name = self.payload_name.borrow_mut();
            if *payload_name == val {
                return;
            }
            *payload_name = val.clone();
        }
        self.events.payload_name.emit(&val);
    }

    pub fn sample_name(&self) -> String {
        self.sample_name.borrow().clone()
    }

    pub fn set_sample_name(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut sample_name = self.sample_name.borrow_mut();
            if *sample_name == val {
                return;
            }
            *sample_name = val.clone();
        }
        self.events.sample_name.emit(&val);
    }

    pub fn is_valid(&self) -> bool {
        !self.name.borrow().is_empty()
            && !self.payload_name.borrow().is_empty()
            && !self.sample_name.borrow().is_empty()
    }

    pub fn to_data(&self) -> DeviceData {
        DeviceData {
            name: self.name(),
            payload_name: self.payload_name(),
            sample_name: self.sample_name(),
        }
    }

    pub fn from_data(data: &DeviceData) -> DeviceRef {
        Self::from_parts(
            data.name.clone(),
            data.payload_name.clone(),
            data.sample_name.clone(),
        )
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device(name={}, payload_name={}, sample_name={})",
            self.name(),
            self.payload_name(),
            self.sample_name()
        )
    }
}

/// Serializable device record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub payload_name: String,
    #[serde(default)]
    pub sample_name: String,
}

/// Events emitted by a [`Block`].
#[derive(Debug)]
pub struct BlockEvents {
    pub name: EventEmitter<NameChange>,
    pub notes: EventEmitter<String>,
}

/// A physical device/sample/tissue arrangement, validated as a unit.
pub struct Block {
    name: RefCell<String>,
    samples: EventedList<SampleRef>,
    devices: EventedList<DeviceRef>,
    vectors: EventedList<VectorRef>,
    notes: RefCell<String>,
    pub events: BlockEvents,
}

/// Shared handle to a [`Block`].
pub type BlockRef = Rc<Block>;

impl Block {
    pub fn new(name: impl Into<String>) -> BlockRef {
        Self::from_parts(
            name.into(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            String::new(),
        )
    }

    fn from_parts(
        name: String,
        samples: Vec<SampleRef>,
        devices: Vec<DeviceRef>,
        vectors: Vec<VectorRef>,
        notes: String,
    ) -> BlockRef {
        let block = Rc::new(Self {
            name: RefCell::new(name),
            samples: EventedList::from_vec(samples),
            devices: EventedList::from_vec(devices),
            vectors: EventedList::from_vec(vectors),
            notes: RefCell::new(notes),
            events: BlockEvents {
                name: EventEmitter::new(),
                notes: EventEmitter::new(),
            },
        });
        block.wire_sample_cascades();
        block
    }

    /// Keep device sample references resolvable across sample renames and
    /// deletions within this block.
    fn wire_sample_cascades(&self) {
        for sample in self.samples.items() {
            bind_sample_rename(&sample, &self.devices);
        }

        let devices = self.devices.clone();
        self.samples
            .events()
            .added
            .connect(move |add| bind_sample_rename(&add.item, &devices));

        let samples = self.samples.clone();
        let devices = self.devices.clone();
        self.samples
            .events()
            .deleted
            .connect(move |_| prune_sample_names(&samples, &devices));
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the block, notifying subscribers with both names so image tags
    /// can follow.
    pub fn set_name(&self, val: impl Into<String>) {
        let val = val.into();
        let old = {
            let mut name = self.name.borrow_mut();
            if *name == val {
                return;
            }
            std::mem::replace(&mut *name, val.clone())
        };
        self.events.name.emit(&NameChange { old, new: val });
    }

    pub fn samples(&self) -> &EventedList<SampleRef> {
        &self.samples
    }

    pub fn devices(&self) -> &EventedList<DeviceRef> {
        &self.devices
    }

    pub fn vectors(&self) -> &EventedList<VectorRef> {
        &self.vectors
    }

    pub fn notes(&self) -> String {
        self.notes.borrow().clone()
    }

    pub fn set_notes(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut notes = self.notes.borrow_mut();
            if *notes == val {
                return;
            }
            *notes = val.clone();
        }
        self.events.notes.emit(&val);
    }

    /// Append a sample with a default name.
    pub fn add_sample(&self) -> SampleRef {
        let n = self.samples.len();
        let sample = Sample::new(format!("New sample {}", n + 1));
        self.samples.push(sample.clone());
        sample
    }

    /// Remove the sample at `index`; devices referencing it are reset.
    pub fn delete_sample(&self, index: usize) -> SampleRef {
        self.samples.remove(index)
    }

    /// Append a device with a default name, paired with an unplaced vector
    /// to keep the two lists index-aligned.
    pub fn add_device(&self) -> DeviceRef {
        let n = self.devices.len();
        let device = Device::new(format!("Device {}", n + 1));
        self.devices.push(device.clone());
        self.vectors.push(Vector::with_pos(0, 0, 0.0));
        device
    }

    /// Remove the device at `index` along with its placement vector.
    pub fn delete_device(&self, index: usize) -> DeviceRef {
        let device = self.devices.remove(index);
        if index < self.vectors.len() {
            self.vectors.remove(index);
        }
        device
    }

    /// Sorted, deduplicated union of cohort group names across samples.
    pub fn cohort_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for sample in self.samples.items() {
            names.extend(sample.cohorts().keys());
        }
        names.into_iter().collect()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.borrow().is_empty()
            && self.samples.items().iter().all(|s| s.is_valid())
            && self.devices.items().iter().all(|d| d.is_valid())
    }

    pub fn to_data(&self) -> BlockData {
        BlockData {
            name: self.name(),
            samples: self.samples.items().iter().map(|s| s.to_data()).collect(),
            devices: self.devices.items().iter().map(|d| d.to_data()).collect(),
            vectors: self.vectors.items().iter().map(|v| v.to_data()).collect(),
            notes: self.notes(),
        }
    }

    pub fn from_data(data: &BlockData) -> BlockRef {
        Self::from_parts(
            data.name.clone(),
            data.samples.iter().map(Sample::from_data).collect(),
            data.devices.iter().map(Device::from_data).collect(),
            data.vectors.iter().map(Vector::from_data).collect(),
            data.notes.clone(),
        )
    }
}

fn bind_sample_rename(sample: &SampleRef, devices: &EventedList<DeviceRef>) {
    let devices = devices.clone();
    sample.events.name.connect(move |change| {
        for device in devices.items() {
            if device.sample_name() == change.old {
                device.set_sample_name(change.new.clone());
            }
        }
    });
}

fn prune_sample_names(samples: &EventedList<SampleRef>, devices: &EventedList<DeviceRef>) {
    let names: Vec<String> = samples.items().iter().map(|s| s.name()).collect();
    for device in devices.items() {
        if !names.contains(&device.sample_name()) {
            device.set_sample_name(String::new());
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name())
            .field("samples", &self.samples)
            .field("devices", &self.devices)
            .field("vectors", &self.vectors)
            .field("notes", &self.notes())
            .finish()
    }
}

/// Serializable block record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub samples: Vec<SampleData>,
    #[serde(default)]
    pub devices: Vec<DeviceData>,
    #[serde(default)]
    pub vectors: Vec<VectorData>,
    #[serde(default)]
    pub notes: String,
}
