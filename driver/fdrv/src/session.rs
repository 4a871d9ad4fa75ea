//! 连接/扫描状态机
//!
//! 每个设备一个 [`Session`]，独占 TransportHandle、连接状态、扫描会话与密钥槽位。
//! 调用方上下文（scan/connect/disconnect/...）与通知上下文（on_* 事件处理）并发访问：
//! - `conn`、`scan` 各自一把 spin 锁，只在检查-修改期间持有，从不跨越阻塞的命令发送
//! - 上报 [`WiphyEvents`] 时不持有任何锁
//!
//! 连接状态：Disconnected → Connecting → Connected，扫描会话独立叠加。
//! Connected 只能由 connect 事件驱动；扫描只能由 scan-done/scan-abort 事件或超时结束。

use alloc::boxed::Box;
use alloc::vec::Vec;
use axerrno::{AxError, AxResult};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ieee80211::{BssInfo, ConnectParams, KeyParams, ScanRequest, StationInfo, WLAN_OUI_WPS};
use sipc::{
    delay_spin_ms, CodecError, ProtocolError, ReadySignal, SipcResult, TransportError,
    TransportHandle,
};

use crate::cfgfile::HostapConfig;
use crate::error::{StateError, WifiResult};
use crate::key_seq::{build_connect_sequence, run_sequence};
use crate::key_slot::{KeySlot, KeySlotId, KeySlotTable, KeyUse};
use crate::wid::{self, ConnectInd, CqmRssiInd, MicFailureInd, WidMsg, MAC_BCST, SIPC_DOMAIN_WIFI};
use crate::wiphy::{
    ConnectResult, IeParser, ScanTimer, VendorIeParser, WiphyEvents,
    WLAN_STATUS_UNSPECIFIED_FAILURE,
};

/// 扫描等待 scan-done 的窗口 (ms)
pub const SCAN_TIMEOUT_MS: u32 = 8000;
/// Busy 时的重试次数
pub const BUSY_RETRIES: u8 = 1;
/// Busy 重试前的等待 (ms)
pub const BUSY_RETRY_DELAY_MS: u32 = 10;

/// 状态机参数
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub scan_timeout_ms: u32,
    /// 仅对 TransportError::Busy 重试；0 关闭
    pub busy_retries: u8,
    pub busy_retry_delay_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: SCAN_TIMEOUT_MS,
            busy_retries: BUSY_RETRIES,
            busy_retry_delay_ms: BUSY_RETRY_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// 连接状态（仅由状态机修改）
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub link: LinkState,
    pub ssid: Vec<u8>,
    pub bssid: Option<[u8; 6]>,
    pub keys: KeySlotTable,
    /// soft-AP 已启动
    pub ap_active: bool,
}

impl ConnectionState {
    fn reset_link(&mut self) {
        self.link = LinkState::Disconnected;
        self.bssid = None;
        self.keys.clear_all();
    }
}

/// 一次未结束的扫描
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSession {
    /// 上报 scan_done 时带回
    pub cookie: u64,
    /// 扫描命令已被固件接受且定时器已启动
    pub is_active: bool,
    pub timeout_ms: u32,
}

pub struct Session {
    transport: TransportHandle,
    conn: spin::Mutex<ConnectionState>,
    scan: spin::Mutex<Option<ScanSession>>,
    next_cookie: AtomicU64,
    tx_busy: AtomicBool,
    ready: ReadySignal,
    events: Box<dyn WiphyEvents>,
    timer: Box<dyn ScanTimer>,
    ie_parser: Box<dyn IeParser>,
    hostap: Option<Box<dyn HostapConfig>>,
    config: SessionConfig,
}

impl Session {
    pub fn new(
        transport: TransportHandle,
        events: Box<dyn WiphyEvents>,
        timer: Box<dyn ScanTimer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            conn: spin::Mutex::new(ConnectionState::default()),
            scan: spin::Mutex::new(None),
            next_cookie: AtomicU64::new(1),
            tx_busy: AtomicBool::new(false),
            ready: ReadySignal::new(),
            events,
            timer,
            ie_parser: Box::new(VendorIeParser),
            hostap: None,
            config,
        }
    }

    pub fn with_ie_parser(mut self, parser: Box<dyn IeParser>) -> Self {
        self.ie_parser = parser;
        self
    }

    pub fn with_hostap_config(mut self, hostap: Box<dyn HostapConfig>) -> Self {
        self.hostap = Some(hostap);
        self
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn link_state(&self) -> LinkState {
        self.conn.lock().link
    }

    /// 连接状态快照
    pub fn connection(&self) -> ConnectionState {
        self.conn.lock().clone()
    }

    pub fn scan_session(&self) -> Option<ScanSession> {
        *self.scan.lock()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.lock().is_some()
    }

    /// 已收到固件 ready 事件
    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    pub fn tx_busy(&self) -> bool {
        self.tx_busy.load(Ordering::Acquire)
    }

    pub fn key_slot(&self, key_use: KeyUse, index: u8) -> Option<KeySlot> {
        let id = KeySlotId::new(key_use, index).ok()?;
        self.conn.lock().keys.get(id).copied()
    }

    /// 发送一条 WiFi 命令；仅 Busy 按 busy_retries 重试
    fn send(&self, msg: &WidMsg) -> SipcResult<Vec<u8>> {
        let mut retries = self.config.busy_retries;
        loop {
            match self
                .transport
                .send_and_wait(SIPC_DOMAIN_WIFI, msg.cmd.level(), msg.cmd.id(), &msg.param)
            {
                Err(TransportError::Busy) if retries > 0 => {
                    retries -= 1;
                    log::debug!(target: "wireless::fdrv", "{:?} busy, retry ({} left)", msg.cmd, retries);
                    delay_spin_ms(self.config.busy_retry_delay_ms);
                }
                res => return res,
            }
        }
    }

    // ========== 调用方上下文 ==========

    /// 发起扫描，返回 cookie；结果经 WiphyEvents::scan_done 异步上报
    pub fn scan(&self, req: &ScanRequest<'_>) -> WifiResult<u64> {
        let cookie = {
            let mut scan = self.scan.lock();
            if scan.is_some() {
                log::debug!(target: "wireless::fdrv", "scan rejected: already scanning");
                return Err(StateError::AlreadyScanning.into());
            }
            let cookie = self.next_cookie.fetch_add(1, Ordering::Relaxed);
            *scan = Some(ScanSession {
                cookie,
                is_active: false,
                timeout_ms: self.config.scan_timeout_ms,
            });
            cookie
        };

        if let Err(e) = self.issue_scan(req) {
            self.drop_pending_scan(cookie);
            return Err(e);
        }

        let timeout_ms = match self.scan.lock().as_mut() {
            Some(s) if s.cookie == cookie => {
                s.is_active = true;
                Some(s.timeout_ms)
            }
            _ => None,
        };
        // 定时器回调可能同步进入 on_scan_timeout，arm 时不能持有 scan 锁
        match timeout_ms {
            Some(ms) => {
                self.timer.arm(ms);
                log::info!(target: "wireless::fdrv", "scan {} started, timeout {}ms", cookie, ms);
            }
            // scan-done 先于命令响应到达，完成已上报
            None => log::debug!(target: "wireless::fdrv", "scan {} finished before arm", cookie),
        }
        Ok(cookie)
    }

    fn issue_scan(&self, req: &ScanRequest<'_>) -> WifiResult<()> {
        if let Some(wps) = self.ie_parser.find_embedded_ie(req.ie, &WLAN_OUI_WPS) {
            self.send(&wid::build_set_wps_ie(wps))?;
        }
        let msg = wid::build_scan_req(req.ssids, req.channels)
            .ok_or(StateError::InvalidParam("too many ssids or channels"))?;
        self.send(&msg)?;
        Ok(())
    }

    fn drop_pending_scan(&self, cookie: u64) {
        let mut scan = self.scan.lock();
        if matches!(*scan, Some(s) if s.cookie == cookie) {
            *scan = None;
        }
    }

    /// 下发连接序列；Connected 只由 connect 事件驱动
    pub fn connect(&self, params: &ConnectParams<'_>) -> WifiResult<()> {
        {
            let mut conn = self.conn.lock();
            if conn.link != LinkState::Disconnected || conn.ap_active {
                return Err(StateError::InvalidTransition("connect while not disconnected").into());
            }
            conn.link = LinkState::Connecting;
            conn.ssid = params.ssid.to_vec();
            conn.bssid = params.bssid.copied();
        }
        log::info!(target: "wireless::fdrv", "connecting to {:?}", core::str::from_utf8(params.ssid).unwrap_or("<non-utf8>"));

        let result: WifiResult<(usize, Option<(KeySlotId, KeySlot)>)> =
            build_connect_sequence(params, self.ie_parser.as_ref())
                .map_err(Into::into)
                .and_then(|seq| {
                    run_sequence(&seq, |msg| self.send(msg))
                        .map(|n| (n, seq.wep_key()))
                        .map_err(|(kind, e)| {
                            log::warn!(target: "wireless::fdrv", "connect step {:?} failed: {}", kind, e);
                            e.into()
                        })
                });

        let mut conn = self.conn.lock();
        match result {
            Ok((n, wep_key)) => {
                if let Some((id, slot)) = wep_key {
                    conn.keys.set(id, slot);
                }
                log::debug!(target: "wireless::fdrv", "connect sequence done, {} commands", n);
                Ok(())
            }
            Err(e) => {
                if conn.link == LinkState::Connecting {
                    conn.reset_link();
                }
                Err(e)
            }
        }
    }

    /// 无论当前状态都下发断开，同步转入 Disconnected
    pub fn disconnect(&self, reason_code: u16) -> WifiResult<()> {
        let res = self.send(&wid::build_disconnect(reason_code));
        let prev = {
            let mut conn = self.conn.lock();
            let prev = conn.link;
            conn.reset_link();
            prev
        };
        log::info!(target: "wireless::fdrv", "disconnect reason={} (was {:?})", reason_code, prev);
        if prev != LinkState::Disconnected {
            self.events.disconnected(reason_code, true);
        }
        res?;
        Ok(())
    }

    pub fn add_key(
        &self,
        key_use: KeyUse,
        index: u8,
        mac: Option<&[u8; 6]>,
        params: &KeyParams<'_>,
    ) -> WifiResult<()> {
        let id = KeySlotId::new(key_use, index)?;
        let slot = KeySlot::new(params.cipher, params.key)?;
        let msg = wid::build_key_add(
            index,
            key_use.is_pairwise(),
            slot.cipher,
            slot.material(),
            params.seq,
            mac.unwrap_or(&MAC_BCST),
        )
        .ok_or(StateError::InvalidParam("key length"))?;
        self.send(&msg)?;
        self.conn.lock().keys.set(id, slot);
        log::debug!(target: "wireless::fdrv", "key added {:?}[{}] cipher={}", key_use, index, slot.cipher);
        Ok(())
    }

    pub fn del_key(&self, key_use: KeyUse, index: u8, mac: Option<&[u8; 6]>) -> WifiResult<()> {
        let id = KeySlotId::new(key_use, index)?;
        self.send(&wid::build_key_del(index, key_use.is_pairwise(), mac.unwrap_or(&MAC_BCST)))?;
        self.conn.lock().keys.clear(id);
        Ok(())
    }

    pub fn set_default_key(&self, index: u8) -> WifiResult<()> {
        KeySlotId::new(KeyUse::Group, index)?;
        self.send(&wid::build_set_default_key(index))?;
        self.conn.lock().keys.set_default(index);
        Ok(())
    }

    pub fn get_station_info(&self) -> WifiResult<StationInfo> {
        if self.link_state() != LinkState::Connected {
            return Err(StateError::NotConnected.into());
        }
        let rsp = self.send(&wid::build_get_station_info())?;
        wid::parse_station_info_rsp(&rsp).ok_or_else(|| {
            log::warn!(target: "wireless::fdrv", "short station info response ({} bytes)", rsp.len());
            TransportError::Protocol(ProtocolError::Codec(CodecError::Truncated {
                len: rsp.len(),
            }))
            .into()
        })
    }

    /// 设置 RSSI 门限上报（cqm-rssi 事件）
    pub fn set_cqm_rssi_config(&self, threshold: i8, hysteresis: u8) -> WifiResult<()> {
        self.send(&wid::build_set_cqm_rssi(threshold, hysteresis))?;
        Ok(())
    }

    /// 启动 soft-AP；conf_path 为 None 时为开放网络
    pub fn start_ap(&self, ssid: &[u8], channel: u8, conf_path: Option<&str>) -> WifiResult<()> {
        {
            let conn = self.conn.lock();
            if conn.ap_active || conn.link != LinkState::Disconnected {
                return Err(StateError::InvalidTransition("start_ap while busy").into());
            }
        }
        let psk = match conf_path {
            Some(path) => {
                let hostap = self
                    .hostap
                    .as_ref()
                    .ok_or(StateError::InvalidParam("no hostapd config source"))?;
                hostap.load(path).map_err(|errno| {
                    log::warn!(target: "wireless::fdrv", "hostapd conf {} load failed: {}", path, errno);
                    StateError::InvalidParam("hostapd config")
                })?
            }
            None => Vec::new(),
        };
        let msg = wid::build_start_ap(ssid, channel, &psk)
            .ok_or(StateError::InvalidParam("ap ssid or psk"))?;
        self.send(&msg)?;
        self.conn.lock().ap_active = true;
        log::info!(target: "wireless::fdrv", "soft-AP started on channel {}", channel);
        Ok(())
    }

    pub fn stop_ap(&self) -> WifiResult<()> {
        if !self.conn.lock().ap_active {
            return Err(StateError::InvalidTransition("stop_ap without start_ap").into());
        }
        self.send(&wid::build_stop_ap())?;
        self.conn.lock().ap_active = false;
        log::info!(target: "wireless::fdrv", "soft-AP stopped");
        Ok(())
    }

    /// 等待固件 ready 事件
    pub fn wait_ready(&self, timeout_ms: u32) -> AxResult<()> {
        self.ready.wait_timeout_ms(timeout_ms).map_err(|_| {
            log::warn!(target: "wireless::fdrv", "firmware not ready after {}ms", timeout_ms);
            AxError::TimedOut
        })
    }

    /// 设备关闭：结束扫描会话、回到 Disconnected，不下发命令
    pub fn close(&self) {
        let pending = self.scan.lock().take();
        if let Some(s) = pending {
            if s.is_active {
                self.timer.disarm();
            }
            self.events.scan_done(s.cookie, true);
        }
        {
            let mut conn = self.conn.lock();
            conn.reset_link();
            conn.ap_active = false;
        }
        self.ready.reset();
        self.tx_busy.store(false, Ordering::Release);
        log::info!(target: "wireless::fdrv", "session closed");
    }

    /// 通知源：事件通道有数据
    pub fn on_notify(&self) -> bool {
        crate::event_dispatch::on_notify(self)
    }

    // ========== 通知上下文 ==========

    pub fn on_bss_found(&self, bss: &BssInfo) {
        log::trace!(target: "wireless::fdrv", "bss {:02x?} ch={} rssi={}", bss.bssid, bss.channel, bss.rssi);
        self.events.bss_found(bss);
    }

    /// scan-done / scan-abort：清除会话、撤销定时器并上报；无会话时忽略
    pub fn on_scan_done(&self, aborted: bool) {
        let Some(s) = self.scan.lock().take() else {
            log::debug!(target: "wireless::fdrv", "scan done without session, ignored");
            return;
        };
        if s.is_active {
            self.timer.disarm();
        }
        log::info!(target: "wireless::fdrv", "scan {} done aborted={}", s.cookie, aborted);
        self.events.scan_done(s.cookie, aborted);
    }

    /// 扫描定时器到期；会话已结束或定时器未启动时为空操作
    pub fn on_scan_timeout(&self) {
        let expired = {
            let mut scan = self.scan.lock();
            if matches!(*scan, Some(s) if s.is_active) {
                scan.take()
            } else {
                None
            }
        };
        if let Some(s) = expired {
            log::warn!(target: "wireless::fdrv", "scan {} timed out after {}ms", s.cookie, s.timeout_ms);
            self.events.scan_done(s.cookie, true);
        }
    }

    pub fn on_connect_result(&self, ind: &ConnectInd) {
        let result = {
            let mut conn = self.conn.lock();
            let connecting = conn.link == LinkState::Connecting;
            if connecting && ind.status == 0 {
                conn.link = LinkState::Connected;
                conn.bssid = Some(ind.bssid);
                log::info!(target: "wireless::fdrv", "connected to {:02x?}", ind.bssid);
            } else {
                log::warn!(target: "wireless::fdrv", "connect failed: status={} state={:?}", ind.status, conn.link);
                conn.reset_link();
            }
            let status = match ind.status {
                0 if connecting => 0,
                0 => WLAN_STATUS_UNSPECIFIED_FAILURE,
                s => s as u16,
            };
            ConnectResult {
                bssid: ind.bssid,
                status,
                req_ie: ind.req_ie.clone(),
                resp_ie: ind.resp_ie.clone(),
            }
        };
        self.events.connect_result(&result);
    }

    pub fn on_disconnect(&self, reason_code: u16) {
        let was_linked = {
            let mut conn = self.conn.lock();
            match conn.link {
                LinkState::Connecting | LinkState::Connected => {
                    conn.reset_link();
                    true
                }
                LinkState::Disconnected => false,
            }
        };
        if was_linked {
            log::info!(target: "wireless::fdrv", "disconnected by firmware, reason={}", reason_code);
            self.events.disconnected(reason_code, false);
        } else {
            log::debug!(target: "wireless::fdrv", "disconnect event while disconnected, ignored");
        }
    }

    pub fn on_ready(&self) {
        log::info!(target: "wireless::fdrv", "firmware ready");
        self.ready.signal();
        self.events.ready();
    }

    pub fn on_tx_flow(&self, busy: bool) {
        if self.tx_busy.swap(busy, Ordering::AcqRel) != busy {
            log::debug!(target: "wireless::fdrv", "tx flow busy={}", busy);
        }
        self.events.tx_flow(busy);
    }

    pub fn on_sta_join(&self, mac: &[u8; 6]) {
        if !self.conn.lock().ap_active {
            log::warn!(target: "wireless::fdrv", "sta join {:02x?} without soft-AP, ignored", mac);
            return;
        }
        self.events.sta_joined(mac);
    }

    pub fn on_sta_leave(&self, mac: &[u8; 6]) {
        if !self.conn.lock().ap_active {
            log::warn!(target: "wireless::fdrv", "sta leave {:02x?} without soft-AP, ignored", mac);
            return;
        }
        self.events.sta_left(mac);
    }

    pub fn on_mic_failure(&self, ind: &MicFailureInd) {
        log::warn!(target: "wireless::fdrv", "mic failure key={} mcast={}", ind.key_id, ind.is_mcast);
        self.events.mic_failure(ind.key_id, ind.is_mcast);
    }

    pub fn on_cqm_rssi(&self, ind: &CqmRssiInd) {
        self.events.cqm_rssi(ind.rssi, ind.low);
    }
}
