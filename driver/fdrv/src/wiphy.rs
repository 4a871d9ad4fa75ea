//! 无线控制平面 - 对应 cfg80211_ops
//!
//! - **WiphyOps**：对上（cfg80211 风格）暴露的操作，错误为负 errno
//! - **WiphyEvents**：状态机向上报告异步结果（cfg80211_scan_done / cfg80211_connect_result 等）
//! - **ScanTimer** / **IeParser**：状态机依赖的外部协作者

use alloc::vec::Vec;
use core::result::Result;

pub use ieee80211::{BssInfo, ConnectParams, KeyParams, ScanRequest, StationInfo};

/// 关联失败时上报的 802.11 状态码（WLAN_STATUS_UNSPECIFIED_FAILURE）
pub const WLAN_STATUS_UNSPECIFIED_FAILURE: u16 = 1;

/// 连接结果（对应 cfg80211_connect_result 参数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResult {
    pub bssid: [u8; 6],
    /// 0 表示成功
    pub status: u16,
    pub req_ie: Vec<u8>,
    pub resp_ie: Vec<u8>,
}

impl ConnectResult {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// 状态机上报通道
///
/// 在通知上下文或调用方上下文中被调用，调用时不持有状态机的任何锁。
pub trait WiphyEvents: Send + Sync {
    /// 扫描结束；aborted 为 true 表示超时、固件中止或设备关闭
    fn scan_done(&self, cookie: u64, aborted: bool);
    fn bss_found(&self, _bss: &BssInfo) {}
    fn connect_result(&self, result: &ConnectResult);
    fn disconnected(&self, reason: u16, locally_generated: bool);
    fn ready(&self) {}
    /// 固件发送队列拥塞（true）/恢复（false）
    fn tx_flow(&self, _busy: bool) {}
    fn sta_joined(&self, _mac: &[u8; 6]) {}
    fn sta_left(&self, _mac: &[u8; 6]) {}
    fn mic_failure(&self, _key_id: u8, _is_mcast: bool) {}
    /// RSSI 越过门限；low 为 true 表示跌破
    fn cqm_rssi(&self, _rssi: i8, _low: bool) {}
}

/// 扫描超时定时器：到期后由平台调用 `Session::on_scan_timeout`
pub trait ScanTimer: Send + Sync {
    fn arm(&self, timeout_ms: u32);
    fn disarm(&self);
}

/// 从调用方附带的 IE 中提取 vendor IE
pub trait IeParser: Send + Sync {
    /// 返回完整元素（含 id/len 头）
    fn find_embedded_ie<'a>(&self, ies: &'a [u8], oui: &[u8]) -> Option<&'a [u8]>;
}

/// 默认 IE 解析：按 OUI（可含 type 字节）匹配 vendor 元素
#[derive(Debug, Default, Clone, Copy)]
pub struct VendorIeParser;

impl IeParser for VendorIeParser {
    fn find_embedded_ie<'a>(&self, ies: &'a [u8], oui: &[u8]) -> Option<&'a [u8]> {
        ieee80211::find_vendor_ie(ies, oui)
    }
}

/// 无线控制平面操作 - 对应 cfg80211_ops 子集
///
/// 立即返回错误，或返回成功表示已下发、结果经 [`WiphyEvents`] 异步上报。
pub trait WiphyOps {
    /// 返回扫描 cookie，scan_done 时原样带回
    fn scan(&self, req: &ScanRequest<'_>) -> Result<u64, i32>;
    fn connect(&self, params: &ConnectParams<'_>) -> Result<(), i32>;
    fn disconnect(&self, reason_code: u16) -> Result<(), i32>;
    fn add_key(
        &self,
        key_index: u8,
        pairwise: bool,
        mac: Option<&[u8; 6]>,
        params: &KeyParams<'_>,
    ) -> Result<(), i32>;
    fn del_key(&self, key_index: u8, pairwise: bool, mac: Option<&[u8; 6]>) -> Result<(), i32>;
    fn set_default_key(&self, key_index: u8) -> Result<(), i32>;
    fn get_station(&self, mac: &[u8; 6]) -> Result<StationInfo, i32>;
    fn start_ap(&self, ssid: &[u8], channel: u8, conf_path: Option<&str>) -> Result<(), i32>;
    fn stop_ap(&self) -> Result<(), i32>;
}
