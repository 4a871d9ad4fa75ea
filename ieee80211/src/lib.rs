//! # ieee80211：IEEE 802.11 / cfg80211 抽象
//!
//! 驱动各 crate 共用的 802.11 类型。
//!
//! | 模块      | Linux 位置                    | 说明 |
//! |-----------|-------------------------------|------|
//! | ieee80211 | include/linux/ieee80211.h     | 频段、信道、IE 遍历、cipher/AKM suite |
//! | cfg80211  | net/cfg80211.h                | scan/connect/key/station 参数 |

#![no_std]

pub mod cfg80211;
pub mod ieee80211;

pub use cfg80211::{
    nl80211_sta_info, wpa_version, AuthType, BssInfo, ConnectParams, KeyParams, ScanRequest,
    StationInfo,
};
pub use ieee80211::{
    band_of_channel, channel_to_freq, find_ie, find_vendor_ie, is_wapi_cipher, is_wep_cipher,
    wlan_akm_suite, wlan_cipher_suite, Band, IeIter, WlanEid, IEEE80211_MAX_SSID_LEN,
    WLAN_KEY_LEN_WEP104, WLAN_KEY_LEN_WEP40, WLAN_MAX_KEY_LEN, WLAN_OUI_MICROSOFT, WLAN_OUI_WPS,
};
