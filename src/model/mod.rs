//! Domain entities for the project model.
//!
//! Entities are identity-based and shared via `Rc`; every mutable field has
//! a validated setter that emits on actual change. Each entity pairs with a
//! plain serializable `*Data` record used for the `project.json` document.

mod block;
mod image;
mod panel;
mod payload;
mod task_graph;

pub use block::{
    Block, BlockData, BlockEvents, BlockRef, Device, DeviceData, DeviceEvents, DeviceRef, Sample,
    SampleData, SampleEvents, SampleRef, Vector, VectorData, VectorRef,
};
pub use image::{
    IMAGE_EXTENSIONS, IMAGES_DIR, Image, ImageData, ImageEvents, ImageRef, is_image_filename,
    scan_image_relpaths,
};
pub use panel::{
    Channel, ChannelData, ChannelEvents, ChannelRef, Panel, PanelData, PanelEvents, PanelRef,
};
pub use payload::{
    AngDir, Formulation, FormulationData, FormulationEvents, FormulationRef, LongDir, LongOrient,
    Payload, PayloadData, PayloadEvents, PayloadRef,
};
pub use task_graph::{TaskGraph, TaskGraphData};

/// Payload of a rename event: the previous and the new name.
///
/// Subscribers use `old` to find dependents that referenced the entity by
/// name and rewrite them to `new`.
#[derive(Debug, Clone)]
pub struct NameChange {
    pub old: String,
    pub new: String,
}

/// Deserialize a wire angle as a rounded integer degree.
///
/// Older files carry fractional degrees; they are rounded on read the same
/// way they would have been rounded on the next write.
pub(crate) fn angle_from_json<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i64)
}
