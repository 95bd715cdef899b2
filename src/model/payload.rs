//! Payloads: named drug packages described by orientation conventions and a
//! set of angularly placed formulations.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{NameChange, angle_from_json};
use crate::events::{EventEmitter, EventedList};
use crate::geom::Angle;

/// Longitudinal orientation of the device on the page.
///
/// Serialized as a stable code; the legacy display label is accepted on read
/// so files written before the codes were introduced still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongOrient {
    #[serde(
        rename = "tip_into_page",
        alias = "tip into page/booster out of page"
    )]
    TipIntoPage,
    #[serde(
        rename = "tip_out_of_page",
        alias = "tip out of page/booster into page"
    )]
    TipOutOfPage,
}

impl LongOrient {
    /// Display label for choice widgets.
    pub fn label(&self) -> &'static str {
        match self {
            LongOrient::TipIntoPage => "tip into page/booster out of page",
            LongOrient::TipOutOfPage => "tip out of page/booster into page",
        }
    }

    /// All variants in display order.
    pub fn all() -> &'static [LongOrient] {
        &[LongOrient::TipIntoPage, LongOrient::TipOutOfPage]
    }
}

/// Direction in which formulation levels increase along the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongDir {
    #[serde(
        rename = "increasing_towards_tip",
        alias = "levels increasing towards tip"
    )]
    IncreasingTowardsTip,
    #[serde(
        rename = "increasing_towards_booster",
        alias = "levels increasing towards booster"
    )]
    IncreasingTowardsBooster,
}

impl LongDir {
    /// Display label for choice widgets.
    pub fn label(&self) -> &'static str {
        match self {
            LongDir::IncreasingTowardsTip => "levels increasing towards tip",
            LongDir::IncreasingTowardsBooster => "levels increasing towards booster",
        }
    }

    /// All variants in display order.
    pub fn all() -> &'static [LongDir] {
        &[LongDir::IncreasingTowardsTip, LongDir::IncreasingTowardsBooster]
    }
}

/// Sign convention for formulation angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngDir {
    #[serde(rename = "clockwise_positive", alias = "clockwise positive")]
    Clockwise,
    #[serde(
        rename = "counterclockwise_positive",
        alias = "counterclockwise positive"
    )]
    CounterClockwise,
}

impl AngDir {
    /// Display label for choice widgets.
    pub fn label(&self) -> &'static str {
        match self {
            AngDir::Clockwise => "clockwise positive",
            AngDir::CounterClockwise => "counterclockwise positive",
        }
    }

    /// All variants in display order.
    pub fn all() -> &'static [AngDir] {
        &[AngDir::Clockwise, AngDir::CounterClockwise]
    }
}

/// Events emitted by a [`Formulation`].
#[derive(Debug)]
pub struct FormulationEvents {
    pub level: EventEmitter<String>,
    pub name: EventEmitter<String>,
}

/// One angular/level placement of a drug mixture within a payload.
pub struct Formulation {
    level: RefCell<String>,
    angle: Angle,
    name: RefCell<String>,
    pub events: FormulationEvents,
}

/// Shared handle to a [`Formulation`].
pub type FormulationRef = Rc<Formulation>;

impl Formulation {
    pub fn new(level: impl Into<String>, angle_deg: f64, name: impl Into<String>) -> FormulationRef {
        Rc::new(Self {
            level: RefCell::new(level.into()),
            angle: Angle::from_deg(angle_deg),
            name: RefCell::new(name.into()),
            events: FormulationEvents {
                level: EventEmitter::new(),
                name: EventEmitter::new(),
            },
        })
    }

    pub fn level(&self) -> String {
        self.level.borrow().clone()
    }

    pub fn set_level(&self, val: impl Into<String>) {
        let val = val.into();
        {
            let mut level = self.level.borrow_mut();
            if *level == val {
                return;
            }
            *level = val.clone();
        }
        self.events.level.emit(&val);
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

    pub fn angle(&self) -> &Angle {
        &self.angle
    }

    pub fn is_valid(&self) -> bool {
        !self.level.borrow().is_empty() && !self.name.borrow().is_empty()
    }

    pub fn to_data(&self) -> FormulationData {
        FormulationData {
            level: self.level(),
            angle: self.angle.int_deg(),
            name: self.name(),
        }
    }

    pub fn from_data(data: &FormulationData) -> FormulationRef {
        Self::new(data.level.clone(), data.angle as f64, data.name.clone())
    }
}

impl fmt::Debug for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Formulation(level={}, angle={:?}, name={})",
            self.level(),
            self.angle,
            self.name()
        )
    }
}

/// Serializable formulation record; the angle travels as an integer degree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulationData {
    #[serde(default)]
    pub level: String,
    #[serde(default, deserialize_with = "angle_from_json")]
    pub angle: i64,
    #[serde(default)]
    pub name: String,
}

/// Events emitted by a [`Payload`].
#[derive(Debug)]
pub struct PayloadEvents {
    pub name: EventEmitter<NameChange>,
    pub long_orient: EventEmitter<LongOrient>,
    pub long_dir: EventEmitter<LongDir>,
    pub ang_dir: EventEmitter<AngDir>,
    pub notes: EventEmitter<String>,
}

/// A named drug/formulation package.
///
/// The three orientation choices start unset and must all be made before the
/// payload validates.
pub struct Payload {
    name: RefCell<String>,
    long_orient: Cell<Option<LongOrient>>,
    long_dir: Cell<Option<LongDir>>,
    ang_dir: Cell<Option<AngDir>>,
    formulations: EventedList<FormulationRef>,
    notes: RefCell<String>,
    pub events: PayloadEvents,
}

/// Shared handle to a [`Payload`].
pub type PayloadRef = Rc<Payload>;

impl Payload {
    pub fn new(name: impl Into<String>) -> PayloadRef {
        Self::from_parts(name.into(), None, None, None, Vec::new(), String::new())
    }

    fn from_parts(
        name: String,
        long_orient: Option<LongOrient>,
        long_dir: Option<LongDir>,
        ang_dir: Option<AngDir>,
        formulations: Vec<FormulationRef>,
        notes: String,
    ) -> PayloadRef {
        Rc::new(Self {
            name: RefCell::new(name),
            long_orient: Cell::new(long_orient),
            long_dir: Cell::new(long_dir),
            ang_dir: Cell::new(ang_dir),
            formulations: EventedList::from_vec(formulations),
            notes: RefCell::new(notes),
            events: PayloadEvents {
                name: EventEmitter::new(),
                long_orient: EventEmitter::new(),
                long_dir: EventEmitter::new(),
                ang_dir: EventEmitter::new(),
                notes: EventEmitter::new(),
            },
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the payload, notifying subscribers with both names so
    /// dependents referencing the old one can follow.
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

    pub fn long_orient(&self) -> Option<LongOrient> {
        self.long_orient.get()
    }

    pub fn set_long_orient(&self, val: LongOrient) {
        if self.long_orient.get() != Some(val) {
            self.long_orient.set(Some(val));
            self.events.long_orient.emit(&val);
        }
    }

    pub fn long_dir(&self) -> Option<LongDir> {
        self.long_dir.get()
    }

    pub fn set_long_dir(&self, val: LongDir) {
        if self.long_dir.get() != Some(val) {
            self.long_dir.set(Some(val));
            self.events.long_dir.emit(&val);
        }
    }

    pub fn ang_dir(&self) -> Option<AngDir> {
        self.ang_dir.get()
    }

    pub fn set_ang_dir(&self, val: AngDir) {
        if self.ang_dir.get() != Some(val) {
            self.ang_dir.set(Some(val));
            self.events.ang_dir.emit(&val);
        }
    }

    pub fn formulations(&self) -> &EventedList<FormulationRef> {
        &self.formulations
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

    /// Append a formulation with a default name.
    pub fn add_formulation(&self) -> FormulationRef {
        let n = self.formulations.len();
        let formulation = Formulation::new("", 0.0, format!("Formulation {}", n + 1));
        self.formulations.push(formulation.clone());
        formulation
    }

    /// Remove the formulation at `index`.
    pub fn delete_formulation(&self, index: usize) -> FormulationRef {
        self.formulations.remove(index)
    }

    /// Whether no two formulations share a `(level, angle)` placement.
    ///
    /// Angles compare at the integer-degree resolution they serialize at.
    pub fn is_formulations_unique(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.formulations
            .items()
            .iter()
            .all(|f| seen.insert((f.level(), f.angle().int_deg())))
    }

    pub fn is_valid(&self) -> bool {
        !self.name.borrow().is_empty()
            && self.long_orient.get().is_some()
            && self.long_dir.get().is_some()
            && self.ang_dir.get().is_some()
            && self.formulations.items().iter().all(|f| f.is_valid())
            && self.is_formulations_unique()
    }

    pub fn to_data(&self) -> PayloadData {
        PayloadData {
            name: self.name(),
            long_orient: self.long_orient.get(),
            long_dir: self.long_dir.get(),
            ang_dir: self.ang_dir.get(),
            formulations: self
                .formulations
                .items()
                .iter()
                .map(|f| f.to_data())
                .collect(),
            notes: self.notes(),
        }
    }

    pub fn from_data(data: &PayloadData) -> PayloadRef {
        Self::from_parts(
            data.name.clone(),
            data.long_orient,
            data.long_dir,
            data.ang_dir,
            data.formulations.iter().map(Formulation::from_data).collect(),
            data.notes.clone(),
        )
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("name", &self.name())
            .field("long_orient", &self.long_orient.get())
            .field("long_dir", &self.long_dir.get())
            .field("ang_dir", &self.ang_dir.get())
            .field("formulations", &self.formulations)
            .field("notes", &self.notes())
            .finish()
    }
}

/// Serializable payload record. The orientation fields are absent until the
/// corresponding choice has been made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadData {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        rename = "longitudinal_orientation",
        skip_serializing_if = "Option::is_none"
    )]
    pub long_orient: Option<LongOrient>,
    #[serde(
        default,
        rename = "longitudinal_direction",
        skip_serializing_if = "Option::is_none"
    )]
    pub long_dir: Option<LongDir>,
    #[serde(
        default,
        rename = "angular_direction",
        skip_serializing_if = "Option::is_none"
    )]
    pub ang_dir: Option<AngDir>,
    #[serde(default)]
    pub formulations: Vec<FormulationData>,
    #[serde(default)]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn complete_payload() -> PayloadRef {
        let payload = Payload::new("Drug1");
        payload.set_long_orient(LongOrient::TipIntoPage);
        payload.set_long_dir(LongDir::IncreasingTowardsTip);
        payload.set_ang_dir(AngDir::Clockwise);
        payload
    }

    #[test]
    fn test_payload_requires_all_orientations() {
        let payload = Payload::new("Drug1");
        assert!(!payload.is_valid());

        payload.set_long_orient(LongOrient::TipIntoPage);
        payload.set_long_dir(LongDir::IncreasingTowardsTip);
        assert!(!payload.is_valid());

        payload.set_ang_dir(AngDir::Clockwise);
        assert!(payload.is_valid());
    }

    #[test]
    fn test_payload_empty_name_is_invalid() {
        let payload = complete_payload();
        payload.set_name("");
        assert!(!payload.is_valid());
    }

    #[test]
    fn test_formulation_requires_level_and_name() {
        let formulation = Formulation::new("", 90.0, "mix");
        assert!(!formulation.is_valid());
        formulation.set_level("L1");
        assert!(formulation.is_valid());
    }

    #[test]
    fn test_duplicate_formulation_placement_invalidates_payload() {
        let payload = complete_payload();
        payload
            .formulations()
            .push(Formulation::new("L1", 90.0, "mix a"));
        payload
            .formulations()
            .push(Formulation::new("L1", 90.0, "mix b"));

        assert!(!payload.is_formulations_unique());
        assert!(!payload.is_valid());

        payload.formulations().get(1).unwrap().angle().set_deg(180.0);
        assert!(payload.is_formulations_unique());
        assert!(payload.is_valid());
    }

    #[test]
    fn test_rename_reports_old_and_new() {
        let payload = Payload::new("Drug1");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = Rc::clone(&seen);
        payload.events.name.connect(move |change| {
            s.borrow_mut().push((change.old.clone(), change.new.clone()));
        });

        payload.set_name("Drug2");
        payload.set_name("Drug2");
        assert_eq!(
            *seen.borrow(),
            vec![("Drug1".to_string(), "Drug2".to_string())]
        );
    }

    #[test]
    fn test_add_formulation_default_name() {
        let payload = Payload::new("Drug1");
        let first = payload.add_formulation();
        let second = payload.add_formulation();
        assert_eq!(first.name(), "Formulation 1");
        assert_eq!(second.name(), "Formulation 2");
        assert_eq!(payload.formulations().len(), 2);
    }

    #[test]
    fn test_data_roundtrip() {
        let payload = complete_payload();
        payload
            .formulations()
            .push(Formulation::new("L1", 90.0, "mix"));
        payload.set_notes("three-arm study");

        let data = payload.to_data();
        let restored = Payload::from_data(&data);
        assert_eq!(restored.to_data(), data);
    }

    #[test]
    fn test_orientation_wire_codes() {
        let json = serde_json::to_string(&LongOrient::TipIntoPage).unwrap();
        assert_eq!(json, "\"tip_into_page\"");

        let parsed: LongOrient = serde_json::from_str("\"tip_into_page\"").unwrap();
        assert_eq!(parsed, LongOrient::TipIntoPage);
    }

    #[test]
    fn test_orientation_accepts_legacy_labels() {
        let parsed: LongOrient =
            serde_json::from_str("\"tip into page/booster out of page\"").unwrap();
        assert_eq!(parsed, LongOrient::TipIntoPage);

        let parsed: LongDir =
            serde_json::from_str("\"levels increasing towards booster\"").unwrap();
        assert_eq!(parsed, LongDir::IncreasingTowardsBooster);

        let parsed: AngDir = serde_json::from_str("\"counterclockwise positive\"").unwrap();
        assert_eq!(parsed, AngDir::CounterClockwise);
    }

    #[test]
    fn test_fractional_wire_angle_rounds() {
        let data: FormulationData =
            serde_json::from_str(r#"{"level": "L1", "angle": 89.7, "name": "mix"}"#).unwrap();
        assert_eq!(data.angle, 90);
    }
}
