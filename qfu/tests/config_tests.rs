//! Tests for action selection and selection-mechanism exclusivity.

use camino::Utf8PathBuf;
use qfu::{
    ActionFlags, ActionRequest, BusDev, Config, DeviceFilter, Error, SelectionCriteria,
    UpdateParams, VidPid,
};

fn vid_pid() -> Option<VidPid> {
    Some(VidPid {
        vid: 0x1199,
        pid: None,
    })
}

fn bus_dev() -> Option<BusDev> {
    Some(BusDev {
        bus: Some(1),
        dev: 2,
    })
}

#[test]
fn test_no_actions() {
    let config = Config::default();
    assert!(matches!(config.action(), Err(Error::NoActions)));
}

#[test]
fn test_too_many_actions() {
    for actions in [
        ActionFlags {
            update: true,
            verify: true,
            ..Default::default()
        },
        ActionFlags {
            update: true,
            update_qdl: true,
            ..Default::default()
        },
        ActionFlags {
            update: true,
            update_qdl: true,
            verify: true,
        },
    ] {
        let config = Config {
            actions,
            ..Default::default()
        };
        assert!(matches!(config.action(), Err(Error::TooManyActions)));
    }
}

#[test]
fn test_update_action_carries_params() {
    let params = UpdateParams {
        firmware_version: Some("05.05.58.00".into()),
        config_version: Some("005.025_002".into()),
        carrier: Some("Generic".into()),
        use_proxy: true,
        use_mbim: false,
    };
    let config = Config {
        actions: ActionFlags {
            update: true,
            ..Default::default()
        },
        device: Some("/dev/cdc-wdm4".into()),
        serial: Some("/dev/ttyUSB0".into()),
        update: params.clone(),
        ..Default::default()
    };
    assert_eq!(
        config.action().unwrap(),
        ActionRequest::Update {
            device: Some(Utf8PathBuf::from("/dev/cdc-wdm4")),
            params,
        }
    );
}

#[test]
fn test_update_qdl_action_uses_serial_path() {
    let config = Config {
        actions: ActionFlags {
            update_qdl: true,
            ..Default::default()
        },
        device: Some("/dev/cdc-wdm4".into()),
        serial: Some("/dev/ttyUSB0".into()),
        ..Default::default()
    };
    assert_eq!(
        config.action().unwrap(),
        ActionRequest::UpdateQdl {
            serial: Some(Utf8PathBuf::from("/dev/ttyUSB0"))
        }
    );
}

#[test]
fn test_verify_action() {
    let config = Config {
        actions: ActionFlags {
            verify: true,
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(config.action().unwrap(), ActionRequest::Verify);
}

#[test]
fn test_single_mechanism_is_valid() {
    let manual = SelectionCriteria {
        manual_path: Some("/dev/cdc-wdm0".into()),
        ..Default::default()
    };
    assert!(manual.validate().is_ok());

    let lookup = SelectionCriteria {
        vid_pid: vid_pid(),
        ..Default::default()
    };
    assert!(lookup.validate().is_ok());

    assert!(SelectionCriteria::default().validate().is_ok());
}

#[test]
fn test_manual_path_with_vid_pid() {
    let criteria = SelectionCriteria {
        manual_path: Some("/dev/cdc-wdm0".into()),
        vid_pid: vid_pid(),
        bus_dev: None,
    };
    let err = criteria.validate().unwrap_err();
    assert!(matches!(err, Error::ManualPathWithVidPid));
    assert_eq!(
        err.to_string(),
        "cannot specify device path and vid:pid lookup"
    );
}

#[test]
fn test_manual_path_with_bus_dev() {
    let criteria = SelectionCriteria {
        manual_path: Some("/dev/cdc-wdm0".into()),
        vid_pid: None,
        bus_dev: bus_dev(),
    };
    assert!(matches!(
        criteria.validate(),
        Err(Error::ManualPathWithBusDev)
    ));
}

#[test]
fn test_vid_pid_with_bus_dev() {
    let criteria = SelectionCriteria {
        manual_path: None,
        vid_pid: vid_pid(),
        bus_dev: bus_dev(),
    };
    let err = criteria.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot specify busnum:devnum and vid:pid lookups"
    );
}

#[test]
fn test_first_conflict_wins() {
    let criteria = SelectionCriteria {
        manual_path: Some("/dev/cdc-wdm0".into()),
        vid_pid: vid_pid(),
        bus_dev: bus_dev(),
    };
    assert!(matches!(
        criteria.validate(),
        Err(Error::ManualPathWithVidPid)
    ));
}

#[test]
fn test_filter_leaves_unset_fields_open() {
    let criteria = SelectionCriteria {
        bus_dev: Some(BusDev { bus: None, dev: 9 }),
        ..Default::default()
    };
    assert_eq!(
        criteria.filter(),
        DeviceFilter {
            dev_number: Some(9),
            ..Default::default()
        }
    );

    let criteria = SelectionCriteria {
        vid_pid: Some(VidPid {
            vid: 0x1199,
            pid: Some(0x9071),
        }),
        ..Default::default()
    };
    assert_eq!(
        criteria.filter(),
        DeviceFilter {
            vendor_id: Some(0x1199),
            product_id: Some(0x9071),
            ..Default::default()
        }
    );
}

#[test]
fn test_criteria_binds_manual_path() {
    let config = Config {
        vid_pid: vid_pid(),
        ..Default::default()
    };
    let criteria = config.criteria(Some("/dev/ttyUSB2".into()));
    assert_eq!(criteria.manual_path, Some(Utf8PathBuf::from("/dev/ttyUSB2")));
    assert_eq!(criteria.vid_pid, vid_pid());
    assert_eq!(criteria.bus_dev, None);
}
