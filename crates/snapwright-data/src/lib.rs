//! Data files for the builder: part prefab catalogs, builder settings and
//! saved assemblies, in RON, TOML or JSON.

pub mod loader;
pub mod persist;
pub mod schema;

pub use loader::{BuilderData, DataLoadError, load_builder_data, load_catalog, load_settings};
pub use persist::{SaveIoError, load_assembly, save_assembly};
