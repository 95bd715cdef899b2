//! Panels: named sets of immunohistochemistry channels.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::NameChange;
use crate::events::{EventEmitter, EventedList};

/// Events emitted by a [`Channel`].
#[derive(Debug)]
pub struct ChannelEvents {
    pub biomarker: EventEmitter<String>,
    pub chromogen: EventEmitter<String>,
    pub notes: EventEmitter<String>,
}

/// One biomarker/chromogen pairing within a panel.
pub struct Channel {
    biomarker: RefCell<String>,
    chromogen: RefCell<String>,
    notes: RefCell<String>,
    pub events: ChannelEvents,
}

/// Shared handle to a [`Channel`].
pub type ChannelRef = Rc<Channel>;

impl Channel {
    pub fn new(biomarker: impl Into<String>) -> ChannelRef {
        Self::from_parts(biomarker.into(), String::new(), String::new())
    }

    fn from_parts(biomarker: String, chromogen: String, notes: String) -> ChannelRef {
        Rc::new(Self {
            biomarker: RefCell::new(biomarker),
            chromogen: RefCell::new(chromogen),
            notes: RefCell::new(notes),
            events: ChannelEvents {
                biomarker: EventEmitter::new(),
                chromogen: EventEmitter::new(),
                notes: EventEmitter::new(),
            },
        })
    }

    pub fn biomarker(&self) -> String {
        self.biomarker.borrow().clone()
    }

    pub fn set_biomarker(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut biomarker = self.biomarker.borrow_mut();
            if *biomarker == val {
                return;
            }
            *biomarker = val.clone();
        }
        self.events.biomarker.emit(&val);
    }

    pub fn chromogen(&self) -> String {
        self.chromogen.borrow().clone()
    }

    pub fn set_chromogen(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut chromogen = self.chromogen.borrow_mut();
            if *chromogen == val {
                return;
            }
            *chromogen = val.clone();
        }
        self.events.chromogen.emit(&val);
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

    pub fn is_valid(&self) -> bool {
        !self.biomarker.borrow().is_empty()
    }

    pub fn to_data(&self) -> ChannelData {
        ChannelData {
            biomarker: self.biomarker(),
            chromogen: self.chromogen(),
            notes: self.notes(),
        }
    }

    pub fn from_data(data: &ChannelData) -> ChannelRef {
        Self::from_parts(
            data.biomarker.clone(),
            data.chromogen.clone(),
            data.notes.clone(),
        )
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel(biomarker={}, chromogen={}, notes={})",
            self.biomarker(),
            self.chromogen(),
            self.notes()
        )
    }
}

/// Serializable channel record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    #[serde(default)]
    pub biomarker: String,
    #[serde(default)]
    pub chromogen: String,
    #[serde(default)]
    pub notes: String,
}

/// Events emitted by a [`Panel`].
#[derive(Debug)]
pub struct PanelEvents {
    pub name: EventEmitter<NameChange>,
}

/// A named set of immunohistochemistry channels applied to images.
///
/// Duplicate biomarkers are surfaced by the presentation layer rather than
/// rejected here.
pub struct Panel {
    name: RefCell<String>,
    channels: EventedList<ChannelRef>,
    pub events: PanelEvents,
}

/// Shared handle to a [`Panel`].
pub type PanelRef = Rc<Panel>;

impl Panel {
    pub fn new(name: impl Into<String>) -> PanelRef {
        Self::from_parts(name.into(), Vec::new())
    }

    fn from_parts(name: String, channels: Vec<ChannelRef>) -> PanelRef {
        Rc::new(Self {
            name: RefCell::new(name),
            channels: EventedList::from_vec(channels),
            events: PanelEvents {
                name: EventEmitter::new(),
            },
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the panel, notifying subscribers with both names so image tags
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

    pub fn channels(&self) -> &EventedList<ChannelRef> {
        &self.channels
    }

    /// Append a channel with a default biomarker.
    pub fn add_channel(&self) -> ChannelRef {
        let n = self.channels.len();
        let channel = Channel::new(format!("Biomarker {}", n + 1));
        self.channels.push(channel.clone());
        channel
    }

    /// Remove the channel at `index`.
    pub fn delete_channel(&self, index: usize) -> ChannelRef {
        self.channels.remove(index)
    }

    pub fn is_valid(&self) -> bool {
        !self.name.borrow().is_empty() && self.channels.items().iter().all(|c| c.is_valid())
    }

    pub fn to_data(&self) -> PanelData {
        PanelData {
            name: self.name(),
            channels: self.channels.items().iter().map(|c| c.to_data()).collect(),
        }
    }

    pub fn from_data(data: &PanelData) -> PanelRef {
        Self::from_parts(
            data.name.clone(),
            data.channels.iter().map(Channel::from_data).collect(),
        )
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("name", &self.name())
            .field("channels", &self.channels)
            .finish()
    }
}

/// Serializable panel record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelData>,
}
