//! WiFi 控制平面 (FDRV)
//!
//! 构建在 SIPC 传输之上：
//! - 命令/事件目录 (wid) - WiFi domain 命令构建与事件解析
//! - 连接序列 (key_seq) - 认证/cipher/密钥/essid 的下发顺序
//! - 密钥槽位 (key_slot) - (用途, 索引) 寻址的密钥表
//! - 状态机 (session) - scan/connect/disconnect/密钥/soft-AP，扫描超时
//! - 事件分发 (event_dispatch) - 事件 id -> Session::on_*
//! - cfg80211 接口 (wiphy / wiphy_impl) - WiphyOps、WiphyEvents 与 errno 转换
//! - hostapd 配置 (cfgfile) - soft-AP 凭据

#![no_std]

extern crate alloc;

mod cfgfile;
mod error;
mod event_dispatch;
mod key_seq;
mod key_slot;
mod session;
mod wid;
mod wiphy;
mod wiphy_impl;

#[cfg(test)]
mod test_util;

pub use cfgfile::{parse_hostap_conf, ConfFileLoader, HostapConf, HostapConfig};
pub use error::{StateError, WifiError, WifiResult};
pub use event_dispatch::{dispatch, on_notify};
pub use key_seq::{
    build_connect_sequence, run_sequence, ConnectSequence, ConnectStep, StepKind, WLAN_OUI_PSK_IE,
};
pub use key_slot::{KeySlot, KeySlotId, KeySlotTable, KeyUse, KEY_SLOTS_PER_USE};
pub use session::{
    ConnectionState, LinkState, ScanSession, Session, SessionConfig, BUSY_RETRIES,
    BUSY_RETRY_DELAY_MS, SCAN_TIMEOUT_MS,
};
pub use wid::{
    akm, cipher, ConnectInd, CqmRssiInd, MicFailureInd, WidMsg, WifiCmd, WifiEvent, MAC_BCST,
    SIPC_DOMAIN_WIFI,
};
pub use wiphy::{
    ConnectResult, IeParser, ScanTimer, VendorIeParser, WiphyEvents, WiphyOps,
    WLAN_STATUS_UNSPECIFIED_FAILURE,
};
