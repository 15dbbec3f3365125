//! Synthetic dataset generation for brick part images: part selection,
//! versioned output directories, randomized per-sample parameters and a
//! sequential driver over a pluggable [`Renderer`].

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod labels;
pub mod params;
pub mod renderer;
pub mod version;

pub use catalog::{ListFormat, PartCatalog, PartId};
pub use config::GenerationConfig;
pub use driver::{DatasetDriver, DriverState, PartReport, RunReport};
pub use error::{DatasetError, RenderError};
pub use params::{Light, Material, ParameterGenerator, SampleParameters};
pub use renderer::Renderer;
