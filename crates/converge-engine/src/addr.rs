use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite key for addressing a remote resource.
///
/// `parent` is the collection path (`projects/p/global/networks`), so two
/// resources with the same name in different projects or locations have
/// distinct addresses.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceAddr {
    pub resource_type: String,
    pub parent: String,
    pub name: String,
}

impl fmt::Display for ResourceAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}/{}", self.resource_type, self.parent, self.name)
    }
}
