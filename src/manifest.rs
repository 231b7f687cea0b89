//! QoS Manifest
//!
//! YAML document listing the QoS volumes the daemon applies at startup:
//!
//! ```yaml
//! qosVolumes:
//!   - qosVolumeId: qos-1
//!     volumeId: Malloc0
//!     limitMax:
//!       rwIopsKiops: 2
//!       rwBandwidthMbs: 100
//! ```

use std::path::Path;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::middleend::QosVolumeManager;
use crate::resources::QosVolume;

/// QoS volumes to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub qos_volumes: Vec<QosVolume>,
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read manifest {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }
}

/// Outcome of applying a manifest.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Ids now registered (newly created or already present)
    pub applied: Vec<String>,
    /// Ids that failed, with the reason
    pub failed: Vec<(String, Error)>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create every QoS volume of `manifest`. Volumes are applied concurrently;
/// a failure does not stop the others.
pub async fn apply(manager: &QosVolumeManager, manifest: &Manifest) -> ApplyReport {
    let results = join_all(
        manifest
            .qos_volumes
            .iter()
            .map(|volume| manager.create_qos_volume(volume)),
    )
    .await;

    let mut report = ApplyReport::default();
    for (volume, result) in manifest.qos_volumes.iter().zip(results) {
        match result {
            Ok(_) => report.applied.push(volume.qos_volume_id.clone()),
            Err(e) => {
                warn!(qos_volume_id = %volume.qos_volume_id, error = %e, "Failed to apply QoS volume");
                report.failed.push((volume.qos_volume_id.clone(), e));
            }
        }
    }
    info!(
        applied = report.applied.len(),
        failed = report.failed.len(),
        "Applied QoS manifest"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleend::VolumeRegistry;
    use crate::spdk::MockEngine;
    use std::sync::Arc;

    const MANIFEST: &str = r#"
qosVolumes:
  - qosVolumeId: qos-1
    volumeId: Malloc0
    limitMax:
      rwIopsKiops: 2
  - qosVolumeId: qos-2
    volumeId: Malloc1
    limitMax:
      rdIopsKiops: 1
"#;

    #[test]
    fn test_parse() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        assert_eq!(manifest.qos_volumes.len(), 2);
        assert_eq!(manifest.qos_volumes[0].volume_id, "Malloc0");

        assert!(Manifest::from_yaml("qosVolumes: 3").is_err());
        assert_eq!(Manifest::from_yaml("{}").unwrap(), Manifest::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_apply_reports_each_volume() {
        let engine = Arc::new(MockEngine::new());
        let manager = QosVolumeManager::new(engine.clone(), Arc::new(VolumeRegistry::new()));
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();

        let report = apply(&manager, &manifest).await;

        assert!(!report.is_success());
        assert_eq!(report.applied, vec!["qos-1"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "qos-2");
        assert_eq!(engine.call_count(), 1);
    }
}
