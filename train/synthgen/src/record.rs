use std::path::Path;

use dataset::{PartId, SampleParameters};
use serde::Serialize;

/// Render job handed to an external host, one per sample.
#[derive(Serialize, Debug)]
pub struct JobRecord<'a> {
    pub schema: &'static str,
    pub part: &'a PartId,
    /// Installed model file to import, e.g. `ldraw/parts/3001.dat`.
    pub model: &'a Path,
    pub output: &'a Path,
    pub engine: &'a str,
    pub resolution: [u32; 2],
    pub params: &'a SampleParameters,
}
