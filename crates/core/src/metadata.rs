//! Projection of remote object descriptors onto blob metadata

use crate::error::{Error, Result};
use crate::traits::{BlobMetadata, RemoteObject};

/// Convert a remote descriptor into `BlobMetadata`, stripping `prefix_to_strip`
///
/// An empty or absent prefix leaves the name untouched. A descriptor without a
/// size, or whose name lies outside the prefix, is a contract violation by the
/// remote service.
pub fn project(object: &RemoteObject, prefix_to_strip: Option<&str>) -> Result<BlobMetadata> {
    let size = object.size.ok_or_else(|| {
        Error::Integrity(format!("object [{}] was listed without a size", object.name))
    })?;

    let name = match prefix_to_strip.filter(|p| !p.is_empty()) {
        Some(prefix) => object.name.strip_prefix(prefix).ok_or_else(|| {
            Error::Integrity(format!(
                "object [{}] is outside the listed path [{prefix}]",
                object.name
            ))
        })?,
        None => object.name.as_str(),
    };

    Ok(BlobMetadata::new(name, size))
}
