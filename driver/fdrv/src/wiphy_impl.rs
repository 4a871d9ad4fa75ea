//! WiphyOps 实现：Session 操作 + 错误转负 errno

use core::result::Result;

use ieee80211::{ConnectParams, KeyParams, ScanRequest, StationInfo};

use crate::error::WifiError;
use crate::key_slot::KeyUse;
use crate::session::Session;
use crate::wiphy::WiphyOps;

fn errno(op: &str, e: WifiError) -> i32 {
    log::debug!(target: "wireless::fdrv", "{} failed: {}", op, e);
    e.to_errno()
}

fn key_use(pairwise: bool) -> KeyUse {
    if pairwise {
        KeyUse::Pairwise
    } else {
        KeyUse::Group
    }
}

impl WiphyOps for Session {
    fn scan(&self, req: &ScanRequest<'_>) -> Result<u64, i32> {
        Session::scan(self, req).map_err(|e| errno("scan", e))
    }

    fn connect(&self, params: &ConnectParams<'_>) -> Result<(), i32> {
        Session::connect(self, params).map_err(|e| errno("connect", e))
    }

    fn disconnect(&self, reason_code: u16) -> Result<(), i32> {
        Session::disconnect(self, reason_code).map_err(|e| errno("disconnect", e))
    }

    fn add_key(
        &self,
        key_index: u8,
        pairwise: bool,
        mac: Option<&[u8; 6]>,
        params: &KeyParams<'_>,
    ) -> Result<(), i32> {
        Session::add_key(self, key_use(pairwise), key_index, mac, params)
            .map_err(|e| errno("add_key", e))
    }

    fn del_key(&self, key_index: u8, pairwise: bool, mac: Option<&[u8; 6]>) -> Result<(), i32> {
        Session::del_key(self, key_use(pairwise), key_index, mac).map_err(|e| errno("del_key", e))
    }

    fn set_default_key(&self, key_index: u8) -> Result<(), i32> {
        Session::set_default_key(self, key_index).map_err(|e| errno("set_default_key", e))
    }

    /// 只支持查询当前关联的 AP；未连接时为 -ENOTCONN
    fn get_station(&self, mac: &[u8; 6]) -> Result<StationInfo, i32> {
        if let Some(bssid) = self.connection().bssid {
            if bssid != *mac {
                return Err(-(axerrno::LinuxError::ENOENT as i32));
            }
        }
        self.get_station_info().map_err(|e| errno("get_station", e))
    }

    fn start_ap(&self, ssid: &[u8], channel: u8, conf_path: Option<&str>) -> Result<(), i32> {
        Session::start_ap(self, ssid, channel, conf_path).map_err(|e| errno("start_ap", e))
    }

    fn stop_ap(&self) -> Result<(), i32> {
        Session::stop_ap(self).map_err(|e| errno("stop_ap", e))
    }
}
