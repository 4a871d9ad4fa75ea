//! cfg80211 参数抽象
//!
//! 对应 Linux net/cfg80211.h 中 scan/connect/key/station 相关结构（按驱动需要简化）。

/// nl80211 认证类型（对应 enum nl80211_auth_type）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AuthType {
    #[default]
    OpenSystem = 0,
    SharedKey = 1,
    /// 由驱动决定（NL80211_AUTHTYPE_AUTOMATIC）
    Automatic = 8,
}

/// nl80211 WPA 版本位（NL80211_WPA_VERSION_*）
pub mod wpa_version {
    pub const WPA: u8 = 1 << 0;
    pub const WPA2: u8 = 1 << 1;
}

/// 扫描请求（对应 struct cfg80211_scan_request，简化）
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanRequest<'a> {
    /// 要扫描的 SSID（空表示通配扫描）
    pub ssids: &'a [&'a [u8]],
    /// 要扫描的信道号（空表示所有支持信道）
    pub channels: &'a [u8],
    /// 附加到 probe request 的 IE
    pub ie: &'a [u8],
}

/// 连接参数（对应 struct cfg80211_connect_params）
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectParams<'a> {
    pub ssid: &'a [u8],
    pub bssid: Option<&'a [u8; 6]>,
    /// 信道号（可选）
    pub channel: Option<u8>,
    pub auth_type: AuthType,
    /// NL80211_WPA_VERSION_* 位，0 表示不启用 WPA
    pub wpa_versions: u8,
    /// 第一个 pairwise cipher，0 表示无
    pub cipher_pairwise: u32,
    pub cipher_group: u32,
    /// 第一个 AKM suite（可选）
    pub akm_suite: Option<u32>,
    /// 上层（supplicant）附带的 IE
    pub ie: &'a [u8],
    /// WEP 密钥或 PSK
    pub key: Option<&'a [u8]>,
    pub key_idx: u8,
}

/// 密钥参数（对应 struct key_params，简化）
#[derive(Debug, Clone, Copy)]
pub struct KeyParams<'a> {
    pub cipher: u32,
    pub key: &'a [u8],
    pub seq: Option<&'a [u8]>,
}

/// BSS/扫描结果项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BssInfo {
    pub bssid: [u8; 6],
    pub channel: u8,
    pub freq: u32,
    pub rssi: i32,
    pub ssid: [u8; 32],
    pub ssid_len: u8,
}

impl BssInfo {
    pub fn ssid(&self) -> &[u8] {
        &self.ssid[..(self.ssid_len as usize).min(32)]
    }
}

/// station_info.filled 位（对应 NL80211_STA_INFO_*）
pub mod nl80211_sta_info {
    pub const RX_PACKETS: u64 = 1 << 9;
    pub const TX_PACKETS: u64 = 1 << 10;
    pub const TX_FAILED: u64 = 1 << 12;
    pub const SIGNAL: u64 = 1 << 7;
    pub const TX_BITRATE: u64 = 1 << 8;
}

/// 站信息（对应 struct station_info，get_station 返回）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationInfo {
    pub filled: u64,
    pub signal: i8,
    /// 100 kbps 单位
    pub tx_bitrate: u16,
    pub tx_packets: u32,
    pub rx_packets: u32,
    pub tx_failed: u32,
}
