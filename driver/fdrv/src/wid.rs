//! WiFi 域命令构建与事件解析
//!
//! 命令 payload 与事件 payload 均为紧凑小端布局；构建函数参数越界返回 None，
//! 解析函数长度不足返回 None（由分发层丢弃）。

use alloc::vec::Vec;

use ieee80211::{
    band_of_channel, channel_to_freq, nl80211_sta_info, BssInfo, StationInfo,
    IEEE80211_MAX_SSID_LEN, WLAN_MAX_KEY_LEN,
};
use sipc::Level;

/// SIPC 中 WiFi 命令/事件所在 domain
pub const SIPC_DOMAIN_WIFI: u8 = 0x1;

/// 单次扫描最多携带的 SSID 数
pub const SCAN_SSID_MAX: usize = 9;
/// 单次扫描最多携带的信道数
pub const SCAN_CHANNEL_MAX: usize = 42;
/// PSK（passphrase 或 PMK）最大长度
pub const PSK_LEN_MAX: usize = 64;
/// 广播 BSSID
pub const MAC_BCST: [u8; 6] = [0xff; 6];

/// 固件侧 cipher 编码
pub mod cipher {
    use ieee80211::wlan_cipher_suite;

    pub const NONE: u8 = 0;
    pub const WEP40: u8 = 1;
    pub const WEP104: u8 = 2;
    pub const TKIP: u8 = 3;
    pub const CCMP: u8 = 4;
    pub const SMS4: u8 = 5;
    pub const AES_CMAC: u8 = 6;

    /// suite selector -> 固件编码；0 表示无 cipher
    pub fn from_suite(suite: u32) -> Option<u8> {
        Some(match suite {
            0 => NONE,
            wlan_cipher_suite::WEP40 => WEP40,
            wlan_cipher_suite::WEP104 => WEP104,
            wlan_cipher_suite::TKIP => TKIP,
            wlan_cipher_suite::CCMP => CCMP,
            wlan_cipher_suite::SMS4 => SMS4,
            wlan_cipher_suite::AES_CMAC => AES_CMAC,
            _ => return None,
        })
    }
}

/// 固件侧 AKM 编码
pub mod akm {
    use ieee80211::wlan_akm_suite;

    pub const IEEE8021X: u8 = 1;
    pub const PSK: u8 = 2;
    pub const WAPI_PSK: u8 = 3;
    pub const WAPI_CERT: u8 = 4;

    pub fn from_suite(suite: u32) -> Option<u8> {
        Some(match suite {
            wlan_akm_suite::IEEE8021X => IEEE8021X,
            wlan_akm_suite::PSK => PSK,
            wlan_akm_suite::WAPI_PSK => WAPI_PSK,
            wlan_akm_suite::WAPI_CERT => WAPI_CERT,
            _ => return None,
        })
    }
}

/// WiFi 命令 id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WifiCmd {
    Scan = 0x01,
    SetWpsIe = 0x02,
    SetWpaVersion = 0x03,
    SetAuthType = 0x04,
    SetPairwiseCipher = 0x05,
    SetGroupCipher = 0x06,
    SetKeyMgmt = 0x07,
    SetPsk = 0x08,
    SetPskIe = 0x09,
    KeyAdd = 0x0a,
    KeyDel = 0x0b,
    SetDefaultKey = 0x0c,
    SetChannel = 0x0d,
    SetBssid = 0x0e,
    SetEssid = 0x0f,
    Disconnect = 0x10,
    GetStationInfo = 0x11,
    SetCqmRssi = 0x12,
    StartAp = 0x13,
    StopAp = 0x14,
}

impl WifiCmd {
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        use WifiCmd::*;
        Some(match id {
            0x01 => Scan,
            0x02 => SetWpsIe,
            0x03 => SetWpaVersion,
            0x04 => SetAuthType,
            0x05 => SetPairwiseCipher,
            0x06 => SetGroupCipher,
            0x07 => SetKeyMgmt,
            0x08 => SetPsk,
            0x09 => SetPskIe,
            0x0a => KeyAdd,
            0x0b => KeyDel,
            0x0c => SetDefaultKey,
            0x0d => SetChannel,
            0x0e => SetBssid,
            0x0f => SetEssid,
            0x10 => Disconnect,
            0x11 => GetStationInfo,
            0x12 => SetCqmRssi,
            0x13 => StartAp,
            0x14 => StopAp,
            _ => return None,
        })
    }

    /// 断开走高优先级，其余普通
    pub const fn level(self) -> Level {
        match self {
            WifiCmd::Disconnect => Level::High,
            _ => Level::Normal,
        }
    }
}

/// WiFi 事件 id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum WifiEvent {
    Connect = 0x01,
    Disconnect = 0x02,
    ScanDone = 0x03,
    /// 固件内部 bss-info 结束扫描（视为中止）
    ScanAbort = 0x04,
    Ready = 0x05,
    TxBusy = 0x06,
    TxOk = 0x07,
    SoftApStaJoin = 0x08,
    SoftApStaLeave = 0x09,
    MicFailure = 0x0a,
    CqmRssi = 0x0b,
}

impl WifiEvent {
    pub fn from_id(id: u16) -> Option<Self> {
        use WifiEvent::*;
        Some(match id {
            0x01 => Connect,
            0x02 => Disconnect,
            0x03 => ScanDone,
            0x04 => ScanAbort,
            0x05 => Ready,
            0x06 => TxBusy,
            0x07 => TxOk,
            0x08 => SoftApStaJoin,
            0x09 => SoftApStaLeave,
            0x0a => MicFailure,
            0x0b => CqmRssi,
            _ => return None,
        })
    }

    pub const fn id(self) -> u16 {
        self as u16
    }
}

/// 待发送的一条 WiFi 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidMsg {
    pub cmd: WifiCmd,
    pub param: Vec<u8>,
}

impl WidMsg {
    pub fn new(cmd: WifiCmd) -> Self {
        Self {
            cmd,
            param: Vec::new(),
        }
    }

    fn with_param(cmd: WifiCmd, param: &[u8]) -> Self {
        Self {
            cmd,
            param: param.to_vec(),
        }
    }
}

// ========== 扫描 ==========

/// SCAN：chan_cnt(u8) chan[chan_cnt] ssid_cnt(u8) {len(u8) ssid[len]}*
pub fn build_scan_req(ssids: &[&[u8]], channels: &[u8]) -> Option<WidMsg> {
    if ssids.len() > SCAN_SSID_MAX || channels.len() > SCAN_CHANNEL_MAX {
        return None;
    }
    let mut msg = WidMsg::new(WifiCmd::Scan);
    let p = &mut msg.param;
    p.push(channels.len() as u8);
    p.extend_from_slice(channels);
    p.push(ssids.len() as u8);
    for ssid in ssids {
        if ssid.len() > IEEE80211_MAX_SSID_LEN {
            return None;
        }
        p.push(ssid.len() as u8);
        p.extend_from_slice(ssid);
    }
    Some(msg)
}

/// SET_WPS_IE：原样下发 WPS 元素
pub fn build_set_wps_ie(ie: &[u8]) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetWpsIe, ie)
}

// ========== 连接序列 ==========

pub fn build_set_wpa_version(version: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetWpaVersion, &[version])
}

pub fn build_set_auth_type(auth: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetAuthType, &[auth])
}

pub fn build_set_pairwise_cipher(cipher: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetPairwiseCipher, &[cipher])
}

pub fn build_set_group_cipher(cipher: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetGroupCipher, &[cipher])
}

pub fn build_set_key_mgmt(akm: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetKeyMgmt, &[akm])
}

/// SET_PSK：len(u8) psk[len]
pub fn build_set_psk(psk: &[u8]) -> Option<WidMsg> {
    if psk.is_empty() || psk.len() > PSK_LEN_MAX {
        return None;
    }
    let mut msg = WidMsg::new(WifiCmd::SetPsk);
    msg.param.push(psk.len() as u8);
    msg.param.extend_from_slice(psk);
    Some(msg)
}

/// SET_PSK_IE：原样下发 vendor 元素
pub fn build_set_psk_ie(ie: &[u8]) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetPskIe, ie)
}

pub fn build_set_channel(chan: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetChannel, &[chan])
}

pub fn build_set_bssid(bssid: &[u8; 6]) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetBssid, bssid)
}

/// SET_ESSID：len(u8) ssid[len]；固件以此触发关联
pub fn build_set_essid(ssid: &[u8]) -> Option<WidMsg> {
    if ssid.is_empty() || ssid.len() > IEEE80211_MAX_SSID_LEN {
        return None;
    }
    let mut msg = WidMsg::new(WifiCmd::SetEssid);
    msg.param.push(ssid.len() as u8);
    msg.param.extend_from_slice(ssid);
    Some(msg)
}

/// DISCONNECT：reason_code(u16)
pub fn build_disconnect(reason_code: u16) -> WidMsg {
    WidMsg::with_param(WifiCmd::Disconnect, &reason_code.to_le_bytes())
}

// ========== 密钥 ==========

/// KEY_ADD：key_index(u8) pairwise(u8) cipher(u8) key_len(u8) mac[6] seq[8] key[key_len]
pub fn build_key_add(
    key_index: u8,
    pairwise: bool,
    cipher: u8,
    key: &[u8],
    seq: Option<&[u8]>,
    mac: &[u8; 6],
) -> Option<WidMsg> {
    if key.is_empty() || key.len() > WLAN_MAX_KEY_LEN {
        return None;
    }
    let mut msg = WidMsg::new(WifiCmd::KeyAdd);
    let p = &mut msg.param;
    p.extend_from_slice(&[key_index, pairwise as u8, cipher, key.len() as u8]);
    p.extend_from_slice(mac);
    let mut seq_buf = [0u8; 8];
    if let Some(s) = seq {
        let n = s.len().min(8);
        seq_buf[..n].copy_from_slice(&s[..n]);
    }
    p.extend_from_slice(&seq_buf);
    p.extend_from_slice(key);
    Some(msg)
}

/// KEY_DEL：key_index(u8) pairwise(u8) mac[6]
pub fn build_key_del(key_index: u8, pairwise: bool, mac: &[u8; 6]) -> WidMsg {
    let mut msg = WidMsg::new(WifiCmd::KeyDel);
    msg.param.extend_from_slice(&[key_index, pairwise as u8]);
    msg.param.extend_from_slice(mac);
    msg
}

pub fn build_set_default_key(key_index: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetDefaultKey, &[key_index])
}

// ========== 站信息 / CQM ==========

pub fn build_get_station_info() -> WidMsg {
    WidMsg::new(WifiCmd::GetStationInfo)
}

/// GET_STATION_INFO 响应：signal(i8) tx_bitrate(u16) tx_packets(u32) rx_packets(u32) tx_failed(u32)
pub fn parse_station_info_rsp(param: &[u8]) -> Option<StationInfo> {
    if param.len() < 15 {
        return None;
    }
    Some(StationInfo {
        filled: nl80211_sta_info::SIGNAL
            | nl80211_sta_info::TX_BITRATE
            | nl80211_sta_info::TX_PACKETS
            | nl80211_sta_info::RX_PACKETS
            | nl80211_sta_info::TX_FAILED,
        signal: param[0] as i8,
        tx_bitrate: u16::from_le_bytes([param[1], param[2]]),
        tx_packets: read_u32(param, 3),
        rx_packets: read_u32(param, 7),
        tx_failed: read_u32(param, 11),
    })
}

/// SET_CQM_RSSI：threshold(i8) hysteresis(u8)
pub fn build_set_cqm_rssi(threshold: i8, hysteresis: u8) -> WidMsg {
    WidMsg::with_param(WifiCmd::SetCqmRssi, &[threshold as u8, hysteresis])
}

// ========== Soft AP ==========

/// START_AP：channel(u8) ssid_len(u8) ssid psk_len(u8) psk（psk_len 为 0 表示开放）
pub fn build_start_ap(ssid: &[u8], channel: u8, psk: &[u8]) -> Option<WidMsg> {
    if ssid.is_empty() || ssid.len() > IEEE80211_MAX_SSID_LEN || psk.len() > PSK_LEN_MAX {
        return None;
    }
    let mut msg = WidMsg::new(WifiCmd::StartAp);
    let p = &mut msg.param;
    p.push(channel);
    p.push(ssid.len() as u8);
    p.extend_from_slice(ssid);
    p.push(psk.len() as u8);
    p.extend_from_slice(psk);
    Some(msg)
}

pub fn build_stop_ap() -> WidMsg {
    WidMsg::new(WifiCmd::StopAp)
}

// ========== 事件解析 ==========

/// CONNECT 事件：status(u8) bssid[6] req_ie_len(u16) req_ie resp_ie_len(u16) resp_ie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectInd {
    pub status: u8,
    pub bssid: [u8; 6],
    pub req_ie: Vec<u8>,
    pub resp_ie: Vec<u8>,
}

pub fn parse_connect_ind(param: &[u8]) -> Option<ConnectInd> {
    if param.len() < 7 {
        return None;
    }
    let status = param[0];
    let mut bssid = [0u8; 6];
    bssid.copy_from_slice(&param[1..7]);
    let (req_ie, rest) = take_lv16(&param[7..])?;
    let (resp_ie, _) = take_lv16(rest)?;
    Some(ConnectInd {
        status,
        bssid,
        req_ie: req_ie.to_vec(),
        resp_ie: resp_ie.to_vec(),
    })
}

/// DISCONNECT 事件：reason_code(u16)
pub fn parse_disconnect_ind(param: &[u8]) -> Option<u16> {
    if param.len() < 2 {
        return None;
    }
    Some(u16::from_le_bytes([param[0], param[1]]))
}

/// SCAN_DONE 事件：bss_cnt(u8) {bssid[6] channel(u8) rssi(i8) ssid_len(u8) ssid[ssid_len]}*
/// 空 payload 视为 0 个 BSS
pub fn parse_scan_done_ind(param: &[u8]) -> Option<Vec<BssInfo>> {
    let mut bss = Vec::new();
    if param.is_empty() {
        return Some(bss);
    }
    let cnt = param[0] as usize;
    let mut off = 1;
    for _ in 0..cnt {
        if off + 9 > param.len() {
            return None;
        }
        let mut bssid = [0u8; 6];
        bssid.copy_from_slice(&param[off..off + 6]);
        let channel = param[off + 6];
        let rssi = param[off + 7] as i8;
        let ssid_len = param[off + 8] as usize;
        off += 9;
        if ssid_len > IEEE80211_MAX_SSID_LEN || off + ssid_len > param.len() {
            return None;
        }
        let mut ssid = [0u8; 32];
        ssid[..ssid_len].copy_from_slice(&param[off..off + ssid_len]);
        off += ssid_len;
        bss.push(BssInfo {
            bssid,
            channel,
            freq: channel_to_freq(channel, band_of_channel(channel)),
            rssi: rssi as i32,
            ssid,
            ssid_len: ssid_len as u8,
        });
    }
    Some(bss)
}

/// SOFTAP_STA_JOIN / LEAVE 事件：mac[6]
pub fn parse_sta_ind(param: &[u8]) -> Option<[u8; 6]> {
    if param.len() < 6 {
        return None;
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&param[..6]);
    Some(mac)
}

/// MIC_FAILURE 事件：key_id(u8) is_mcast(u8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicFailureInd {
    pub key_id: u8,
    pub is_mcast: bool,
}

pub fn parse_mic_failure_ind(param: &[u8]) -> Option<MicFailureInd> {
    if param.len() < 2 {
        return None;
    }
    Some(MicFailureInd {
        key_id: param[0],
        is_mcast: param[1] != 0,
    })
}

/// CQM_RSSI 事件：rssi(i8) low(u8)，low 非 0 表示跌破门限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CqmRssiInd {
    pub rssi: i8,
    pub low: bool,
}

pub fn parse_cqm_rssi_ind(param: &[u8]) -> Option<CqmRssiInd> {
    if param.len() < 2 {
        return None;
    }
    Some(CqmRssiInd {
        rssi: param[0] as i8,
        low: param[1] != 0,
    })
}

fn read_u32(p: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]])
}

/// 取 len(u16) + value，返回 (value, 剩余)
fn take_lv16(p: &[u8]) -> Option<(&[u8], &[u8])> {
    if p.len() < 2 {
        return None;
    }
    let len = u16::from_le_bytes([p[0], p[1]]) as usize;
    if p.len() < 2 + len {
        return None;
    }
    Some((&p[2..2 + len], &p[2 + len..]))
}
