//! Stagehand Engine - staged updates to table metadata
//!
//! Concrete update kinds built on the stagehand-core protocol:
//! - [`UpdateProperties`]: set and remove metadata properties
//! - [`UpdateLocation`]: move the table's base location
//!
//! Both are created from a [`Table`] handle, which caches the last known
//! version of the metadata and commits through any `VersionedStore`.

pub mod metadata;
pub mod table;
pub mod update_location;
pub mod update_properties;

pub use metadata::{TableMetadata, FORMAT_VERSION_KEY, SUPPORTED_FORMAT_VERSION};
pub use table::Table;
pub use update_location::UpdateLocation;
pub use update_properties::UpdateProperties;
