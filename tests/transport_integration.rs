//! Transport and Naming Integration Tests
//!
//! Builds vfio-user listener parameters from canonical resource names.

use std::path::Path;

use storage_bridge::domain::ports::NvmeTransport;
use storage_bridge::frontend::controller_dir_path;
use storage_bridge::naming;
use storage_bridge::spdk::{self, MockEngine, NVMF_SUBSYSTEM_ADD_LISTENER};
use storage_bridge::{ErrorCode, NvmeController, NvmeSubsystem, PcieId, VfiouserTransport};

fn subsystem(id: &str) -> NvmeSubsystem {
    NvmeSubsystem::new(
        naming::subsystem_name(id),
        format!("nqn.2022-09.io.spdk:{}", id),
    )
}

#[test]
fn test_listener_per_subsystem_directory() {
    let dir = tempfile::tempdir().unwrap();
    let transport = VfiouserTransport::new(dir.path()).unwrap();

    for (subsys_id, ctrlr_id) in [("subsys0", "ctrl0"), ("subsys1", "ctrl7")] {
        let ctrlr = NvmeController::new(
            naming::controller_name(subsys_id, ctrlr_id),
            PcieId::default(),
        );
        let params = transport.params(&ctrlr, &subsystem(subsys_id)).unwrap();

        assert_eq!(params.nqn, format!("nqn.2022-09.io.spdk:{}", subsys_id));
        assert_eq!(params.transport_type(), "vfiouser");
        assert_eq!(
            Path::new(params.address()),
            controller_dir_path(dir.path(), subsys_id)
        );
    }
}

#[test]
fn test_listener_through_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let transport: Box<dyn NvmeTransport> = Box::new(VfiouserTransport::new(dir.path()).unwrap());

    let ctrlr = NvmeController::new(
        "//storage.opiproject.org/subsystems/SX/controllers/CX",
        PcieId {
            physical_function: 3,
            virtual_function: 0,
            port_id: 0,
        },
    );
    let params = transport.params(&ctrlr, &subsystem("SX")).unwrap();
    assert!(params.address().ends_with("SX"));

    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["listen_address"]["trtype"], "vfiouser");
}

#[tokio::test]
async fn test_listener_params_sent_to_engine() {
    let dir = tempfile::tempdir().unwrap();
    let transport = VfiouserTransport::new(dir.path()).unwrap();
    assert_eq!(transport.ctrlr_dir(), dir.path());

    let ctrlr = NvmeController::new(naming::controller_name("s0", "c0"), PcieId::default());
    let params = transport.params(&ctrlr, &subsystem("s0")).unwrap();

    let engine = MockEngine::new();
    let added: bool = spdk::invoke(&engine, NVMF_SUBSYSTEM_ADD_LISTENER, "c0", &params)
        .await
        .unwrap();
    assert!(added);

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "nvmf_subsystem_add_listener");
    assert_eq!(calls[0].params, serde_json::to_value(&params).unwrap());
}

#[test]
fn test_validation_precedes_construction() {
    let dir = tempfile::tempdir().unwrap();
    let transport = VfiouserTransport::new(dir.path()).unwrap();
    let restricted = subsystem("s0").with_hostnqn("nqn.2014-08.org.nvmexpress:uuid:host");

    let cases = [
        (PcieId { port_id: 1, ..Default::default() }, subsystem("s0"), "port"),
        (PcieId { virtual_function: 2, ..Default::default() }, subsystem("s0"), "virtual functions"),
        (PcieId::default(), restricted, "hostnqn"),
    ];
    for (pcie_id, subsys, needle) in cases {
        let ctrlr = NvmeController::new(naming::controller_name("s0", "c0"), pcie_id);
        let err = transport.params(&ctrlr, &subsys).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(err.to_string().contains(needle), "{err}");
    }
}

#[test]
fn test_misconfigured_base_directory() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let err = VfiouserTransport::new(file.path()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::FatalConfiguration);
}

#[test]
fn test_subsystem_id_edge_cases() {
    assert_eq!(
        naming::subsystem_id_from_name("//storage.opiproject.org/subsystems/SX/controllers/CX"),
        "SX"
    );
    assert_eq!(
        naming::subsystem_id_from_name("//storage.opiproject.org/subsystems"),
        ""
    );
    assert_eq!(
        naming::subsystem_id_from_name(&naming::volume_name("v0")),
        ""
    );
}
