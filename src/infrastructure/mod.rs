pub mod device_bridge;

pub use device_bridge::{
    check_device, ensure_remote_dir, has_connected_device, launch_activity, shell_quote,
    AdbBridge, DeviceBridge,
};
