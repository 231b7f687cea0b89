//! Canonical Resource Names
//!
//! Every resource handled by the bridge is addressed by a slash-delimited
//! name rooted at the storage domain:
//!
//! ```text
//! //storage.opiproject.org/volumes/<id>
//! //storage.opiproject.org/subsystems/<subsys>
//! //storage.opiproject.org/subsystems/<subsys>/namespaces/<id>
//! //storage.opiproject.org/subsystems/<subsys>/controllers/<id>
//! ```
//!
//! The collection segment right before an identifier determines its type.
//! These formats are depended upon by other components and must stay stable.

/// Domain prefix shared by all resource names.
pub const DOMAIN: &str = "//storage.opiproject.org";

/// Collection segment for subsystems.
pub const SUBSYSTEMS: &str = "subsystems";

/// Name of a volume resource.
pub fn volume_name(resource_id: &str) -> String {
    format!("{}/volumes/{}", DOMAIN, resource_id)
}

/// Name of a subsystem resource.
pub fn subsystem_name(resource_id: &str) -> String {
    format!("{}/{}/{}", DOMAIN, SUBSYSTEMS, resource_id)
}

/// Name of a namespace nested under a subsystem.
pub fn namespace_name(subsys_id: &str, namespace_id: &str) -> String {
    format!(
        "{}/{}/{}/namespaces/{}",
        DOMAIN, SUBSYSTEMS, subsys_id, namespace_id
    )
}

/// Name of a controller nested under a subsystem.
pub fn controller_name(subsys_id: &str, ctrlr_id: &str) -> String {
    format!(
        "{}/{}/{}/controllers/{}",
        DOMAIN, SUBSYSTEMS, subsys_id, ctrlr_id
    )
}

/// Recover the owning subsystem id from an NVMe resource name.
///
/// Returns the segment following the first `subsystems` segment, or an empty
/// string when there is no such segment or it is the last one.
pub fn subsystem_id_from_name(name: &str) -> &str {
    let segments: Vec<&str> = name.split('/').collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == SUBSYSTEMS)
        .map(|pair| pair[1])
        .unwrap_or("")
}
