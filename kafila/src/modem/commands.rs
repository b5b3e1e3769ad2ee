//! Line commands and response sentinels of the AT radio modem

use crate::config::NetworkConfig;

/// Response when the modem is already in the requested state
pub const ALREADY_IN_STATE: &str = "ALREADY CONNECTED";
/// Generic failure sentinel
pub const ERROR: &str = "ERROR";
pub const OK: &str = "OK";
/// Printed by the modem once it has rebooted
pub const READY: &str = "ready";
/// Prompt requesting the datagram payload
pub const SEND_PROMPT: &str = ">";
pub const SEND_OK: &str = "SEND OK";

/// Command terminator
pub const LINE_END: &str = "\r\n";

/// Link id of the unicast data channel
pub const DATA_LINK: u8 = 0;
/// Link id of the broadcast channel
pub const BROADCAST_LINK: u8 = 1;

const MAC_TAG: &str = "+CIPSTAMAC:";
const MAC_LEN: usize = 17;

pub fn ping() -> String {
    "AT".to_string()
}

pub fn reset() -> String {
    "AT+RST".to_string()
}

pub fn query_station_mac() -> String {
    "AT+CIPSTAMAC?".to_string()
}

/// Station (client) mode
pub fn station_mode() -> String {
    "AT+CWMODE=1".to_string()
}

pub fn join_access_point(network: &NetworkConfig) -> String {
    format!("AT+CWJAP=\"{}\",\"{}\"", network.ssid, network.password)
}

/// Enable multiple simultaneous links
pub fn multiplex() -> String {
    "AT+CIPMUX=1".to_string()
}

pub fn open_data_channel(network: &NetworkConfig) -> String {
    format!(
        "AT+CIPSTART={},\"UDP\",\"{}\",{},{},0",
        DATA_LINK, network.server_ip, network.server_port, network.local_port
    )
}

pub fn open_broadcast_channel(network: &NetworkConfig) -> String {
    format!(
        "AT+CIPSTART={},\"UDP\",\"{}\",{},{},0",
        BROADCAST_LINK, network.broadcast_address, network.broadcast_port, network.broadcast_port
    )
}

/// Announce a datagram of `len` bytes on the data channel
pub fn send_datagram(len: usize) -> String {
    format!("AT+CIPSEND={},{}", DATA_LINK, len)
}

/// Extract the station MAC from a `+CIPSTAMAC:"xx:xx:xx:xx:xx:xx"` reply
pub fn parse_station_mac(response: &str) -> Option<&str> {
    let start = response.find(MAC_TAG)? + MAC_TAG.len();
    let rest = response[start..].trim_start().strip_prefix('"')?;
    let mac = rest.get(..MAC_LEN)?;
    let well_formed = mac.char_indices().all(|(i, c)| {
        if i % 3 == 2 {
            c == ':'
        } else {
            c.is_ascii_hexdigit()
        }
    });
    well_formed.then_some(mac)
}
