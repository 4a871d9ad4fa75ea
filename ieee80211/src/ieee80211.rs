//! IEEE 802.11 类型与常量
//!
//! 对应 Linux include/linux/ieee80211.h、include/uapi/linux/nl80211.h 中驱动用到的部分：
//! 频段/信道、信息元素 (IE) 遍历、cipher/AKM suite selector。

/// 频段（对应 NL80211_BAND_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Band {
    #[default]
    TwoGhz = 0,
    FiveGhz = 1,
}

/// 信道号 -> 中心频率 MHz（对应 ieee80211_channel_to_frequency）；非法信道返回 0
pub fn channel_to_freq(chan: u8, band: Band) -> u32 {
    match band {
        Band::TwoGhz => match chan {
            14 => 2484,
            1..=13 => 2407 + chan as u32 * 5,
            _ => 0,
        },
        Band::FiveGhz => match chan {
            182..=196 => 4000 + chan as u32 * 5,
            1..=181 => 5000 + chan as u32 * 5,
            _ => 0,
        },
    }
}

/// 按信道号推断频段（驱动只区分 2.4G/5G）
pub fn band_of_channel(chan: u8) -> Band {
    if chan <= 14 {
        Band::TwoGhz
    } else {
        Band::FiveGhz
    }
}

/// 802.11 信息元素 ID（WLAN_EID_*）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WlanEid {
    Ssid = 0,
    SupportedRates = 1,
    DsParams = 3,
    Rsn = 48,
    Wapi = 68,
    Vendor = 221,
}

impl WlanEid {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Microsoft OUI（WPA/WMM/WPS vendor IE）
pub const WLAN_OUI_MICROSOFT: [u8; 3] = [0x00, 0x50, 0xf2];
/// WPS vendor IE 的 OUI + type
pub const WLAN_OUI_WPS: [u8; 4] = [0x00, 0x50, 0xf2, 0x04];

/// IE 遍历器：逐个产出完整元素（含 id/len 两字节头）；遇到越界元素即停止
pub struct IeIter<'a> {
    ies: &'a [u8],
}

impl<'a> IeIter<'a> {
    pub fn new(ies: &'a [u8]) -> Self {
        Self { ies }
    }
}

impl<'a> Iterator for IeIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.ies.len() < 2 {
            return None;
        }
        let total = 2 + self.ies[1] as usize;
        if total > self.ies.len() {
            self.ies = &[];
            return None;
        }
        let (elem, rest) = self.ies.split_at(total);
        self.ies = rest;
        Some(elem)
    }
}

/// 查找第一个 id 匹配的元素（对应 cfg80211_find_ie）
pub fn find_ie(ies: &[u8], eid: u8) -> Option<&[u8]> {
    IeIter::new(ies).find(|e| e[0] == eid)
}

/// 查找 body 以 oui 开头的 vendor 元素（对应 cfg80211_find_vendor_ie，oui 可含 type 字节）
pub fn find_vendor_ie<'a>(ies: &'a [u8], oui: &[u8]) -> Option<&'a [u8]> {
    IeIter::new(ies).find(|e| e[0] == WlanEid::Vendor.as_u8() && e[2..].starts_with(oui))
}

// 对应 include/uapi/linux/nl80211.h WLAN_CIPHER_SUITE_*
pub mod wlan_cipher_suite {
    pub const WEP40: u32 = 0x000F_AC01;
    pub const TKIP: u32 = 0x000F_AC02;
    pub const CCMP: u32 = 0x000F_AC04;
    pub const WEP104: u32 = 0x000F_AC05;
    pub const AES_CMAC: u32 = 0x000F_AC06;
    pub const SMS4: u32 = 0x0014_7201;
}

// WLAN_AKM_SUITE_*
pub mod wlan_akm_suite {
    pub const IEEE8021X: u32 = 0x000F_AC01;
    pub const PSK: u32 = 0x000F_AC02;
    pub const WAPI_PSK: u32 = 0x000F_AC04;
    pub const WAPI_CERT: u32 = 0x000F_AC12;
}

/// 是否 WEP 族 cipher
pub fn is_wep_cipher(cipher: u32) -> bool {
    matches!(cipher, wlan_cipher_suite::WEP40 | wlan_cipher_suite::WEP104)
}

/// 是否 WAPI (SMS4) cipher
pub fn is_wapi_cipher(cipher: u32) -> bool {
    cipher == wlan_cipher_suite::SMS4
}

/// 密钥最大长度
pub const WLAN_MAX_KEY_LEN: usize = 32;
/// SSID 最大长度
pub const IEEE80211_MAX_SSID_LEN: usize = 32;
/// WEP40 / WEP104 密钥长度
pub const WLAN_KEY_LEN_WEP40: usize = 5;
pub const WLAN_KEY_LEN_WEP104: usize = 13;
