use pktfilter_core::Capability;

pub const PROTOCOL_NAME: &str = "git-filter";
pub const PROTOCOL_VERSION: u32 = 2;

/// Capabilities the driver must advertise for a session to start.
pub const REQUIRED_CAPABILITIES: &[&str] = &["clean", "smudge", "delay"];

pub fn client_identity() -> String {
    format!("{PROTOCOL_NAME}-client")
}

pub fn server_identity() -> String {
    format!("{PROTOCOL_NAME}-server")
}

pub fn version_line() -> String {
    format!("version={PROTOCOL_VERSION}")
}

pub fn required_capabilities() -> Vec<Capability> {
    REQUIRED_CAPABILITIES.iter().copied().map(Capability::from).collect()
}
