//! vfio-user Transport
//!
//! Exposes controllers to virtual machines through a socket directory per
//! subsystem instead of a network endpoint. The directory is the rendezvous
//! point the hypervisor uses to attach the emulated device, so it has to live
//! under a base directory that exists before the bridge starts.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::ports::NvmeTransport;
use crate::error::{Error, Result};
use crate::naming;
use crate::resources::{NvmeController, NvmeSubsystem};
use crate::spdk::{ListenAddress, NvmfSubsystemAddListenerParams, TRTYPE_VFIOUSER};

/// Directory holding the vfio-user socket of a subsystem's controllers.
///
/// An empty `subsys_id` yields the base directory itself.
pub fn controller_dir_path(ctrlr_dir: &Path, subsys_id: &str) -> PathBuf {
    if subsys_id.is_empty() {
        return ctrlr_dir.to_path_buf();
    }
    ctrlr_dir.join(subsys_id)
}

/// Listener builder for the vfio-user transport.
#[derive(Debug, Clone)]
pub struct VfiouserTransport {
    ctrlr_dir: PathBuf,
}

impl VfiouserTransport {
    /// Create a transport rooted at `ctrlr_dir`.
    ///
    /// Fails with [`Error::Config`] unless `ctrlr_dir` names an existing
    /// directory.
    pub fn new(ctrlr_dir: impl AsRef<Path>) -> Result<Self> {
        let ctrlr_dir = ctrlr_dir.as_ref();
        if ctrlr_dir.as_os_str().is_empty() {
            return Err(Error::Config("ctrlr_dir cannot be empty".into()));
        }

        let meta = std::fs::metadata(ctrlr_dir).map_err(|e| {
            Error::Config(format!(
                "{} path cannot be evaluated: {}",
                ctrlr_dir.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(Error::Config(format!(
                "{} is not a directory",
                ctrlr_dir.display()
            )));
        }

        info!(ctrlr_dir = %ctrlr_dir.display(), "Using vfio-user controller directory");
        Ok(Self {
            ctrlr_dir: ctrlr_dir.to_path_buf(),
        })
    }

    /// Base directory of controller sockets.
    pub fn ctrlr_dir(&self) -> &Path {
        &self.ctrlr_dir
    }
}

impl NvmeTransport for VfiouserTransport {
    fn params(
        &self,
        ctrlr: &NvmeController,
        subsys: &NvmeSubsystem,
    ) -> Result<NvmfSubsystemAddListenerParams> {
        let pcie_id = ctrlr.pcie_id;
        if pcie_id.port_id != 0 {
            warn!(controller = %ctrlr.name, port_id = pcie_id.port_id, "Unsupported port");
            return Err(Error::invalid(format!(
                "only port 0 is supported for vfiouser, controller {} uses port {}",
                ctrlr.name, pcie_id.port_id
            )));
        }
        if pcie_id.virtual_function != 0 {
            warn!(controller = %ctrlr.name, vf = pcie_id.virtual_function, "Unsupported virtual function");
            return Err(Error::invalid(format!(
                "virtual functions are not supported for vfiouser, controller {} uses virtual function {}",
                ctrlr.name, pcie_id.virtual_function
            )));
        }
        if !subsys.hostnqn.is_empty() {
            warn!(subsystem = %subsys.name, "Unsupported hostnqn");
            return Err(Error::invalid(format!(
                "hostnqn for subsystem {} is not supported for vfiouser",
                subsys.name
            )));
        }

        let subsys_id = naming::subsystem_id_from_name(&ctrlr.name);
        let path = controller_dir_path(&self.ctrlr_dir, subsys_id);
        debug!(controller = %ctrlr.name, traddr = %path.display(), "Built vfio-user listener");

        Ok(NvmfSubsystemAddListenerParams {
            nqn: subsys.nqn.clone(),
            listen_address: ListenAddress {
                trtype: TRTYPE_VFIOUSER.to_string(),
                traddr: path.to_string_lossy().into_owned(),
                ..Default::default()
            },
        })
    }
}
