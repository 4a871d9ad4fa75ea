//! 测试桩：脚本化固件、记录型上报、手动定时器

use alloc::collections::{BTreeMap, VecDeque};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use ieee80211::BssInfo;
use sipc::{
    decode_command, encode_event, encode_response, CmdTag, EventFrame, EventTag, PowerRail,
    ResponseFrame, SipcChannel, SipcEventSource, SIPC_MAX_FRAME_SIZE,
};

use crate::wid::{ConnectInd, WifiCmd, WifiEvent, SIPC_DOMAIN_WIFI};
use crate::wiphy::{ConnectResult, ScanTimer, WiphyEvents};

#[derive(Default)]
struct FwState {
    status: BTreeMap<u8, u16>,
    response: BTreeMap<u8, Vec<u8>>,
    sent: Vec<(u8, Vec<u8>)>,
    pending: Option<Vec<u8>>,
    silent: bool,
    busy_rounds: usize,
    events: VecDeque<Vec<u8>>,
}

/// 按命令 id 应答的固件桩；同时充当同步通道、事件通道与电源门控
#[derive(Clone, Default)]
pub struct MockFirmware {
    state: Arc<spin::Mutex<FwState>>,
}

impl MockFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, cmd: WifiCmd, status: u16) {
        self.state.lock().status.insert(cmd.id(), status);
    }

    pub fn set_response(&self, cmd: WifiCmd, payload: Vec<u8>) {
        self.state.lock().response.insert(cmd.id(), payload);
    }

    /// 不再应答（读超时）
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    /// 接下来 n 次 is_ready 返回 false
    pub fn set_busy_rounds(&self, n: usize) {
        self.state.lock().busy_rounds = n;
    }

    pub fn sent_cmds(&self) -> Vec<WifiCmd> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|(id, _)| WifiCmd::from_id(*id))
            .collect()
    }

    pub fn sent_payload(&self, i: usize) -> Vec<u8> {
        self.state.lock().sent[i].1.clone()
    }

    pub fn push_event(&self, event: WifiEvent, payload: &[u8]) {
        self.push_event_id(SIPC_DOMAIN_WIFI, event.id(), payload);
    }

    pub fn push_event_id(&self, domain: u8, id: u16, payload: &[u8]) {
        let mut buf = vec![0u8; SIPC_MAX_FRAME_SIZE];
        let frame = EventFrame {
            tag: EventTag::new(domain, id),
            payload,
        };
        let n = encode_event(&frame, &mut buf, SIPC_MAX_FRAME_SIZE).unwrap();
        buf.truncate(n);
        self.state.lock().events.push_back(buf);
    }

    pub fn push_raw_event(&self, raw: &[u8]) {
        self.state.lock().events.push_back(raw.to_vec());
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().events.len()
    }
}

impl SipcChannel for MockFirmware {
    fn write(&mut self, frame: &[u8]) -> usize {
        let mut st = self.state.lock();
        let cmd = decode_command(frame).unwrap();
        st.sent.push((cmd.tag.id, cmd.payload.to_vec()));
        if st.silent {
            return frame.len();
        }
        let status = st.status.get(&cmd.tag.id).copied().unwrap_or(0);
        let payload = st.response.get(&cmd.tag.id).cloned().unwrap_or_default();
        let rsp = ResponseFrame {
            tag: CmdTag::response_to(&cmd.tag),
            status,
            payload: &payload,
        };
        let mut buf = vec![0u8; SIPC_MAX_FRAME_SIZE];
        let n = encode_response(&rsp, &mut buf, SIPC_MAX_FRAME_SIZE).unwrap();
        buf.truncate(n);
        st.pending = Some(buf);
        frame.len()
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Option<usize> {
        let rsp = self.state.lock().pending.take()?;
        buf[..rsp.len()].copy_from_slice(&rsp);
        Some(rsp.len())
    }

    fn try_read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}

impl SipcEventSource for MockFirmware {
    fn read_event(&mut self, buf: &mut [u8]) -> usize {
        match self.state.lock().events.pop_front() {
            Some(ev) => {
                buf[..ev.len()].copy_from_slice(&ev);
                ev.len()
            }
            None => 0,
        }
    }
}

impl PowerRail for MockFirmware {
    fn is_ready(&self) -> bool {
        let mut st = self.state.lock();
        if st.busy_rounds > 0 {
            st.busy_rounds -= 1;
            false
        } else {
            true
        }
    }
}

/// 记录下来的上报
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    ScanDone { cookie: u64, aborted: bool },
    Bss { bssid: [u8; 6], channel: u8 },
    Connect { status: u16, bssid: [u8; 6] },
    Disconnected { reason: u16, local: bool },
    Ready,
    TxFlow(bool),
    StaJoined([u8; 6]),
    StaLeft([u8; 6]),
    MicFailure { key_id: u8, mcast: bool },
    Cqm { rssi: i8, low: bool },
}

#[derive(Clone, Default)]
pub struct RecordingEvents {
    log: Arc<spin::Mutex<Vec<Recorded>>>,
}

impl RecordingEvents {
    pub fn take(&self) -> Vec<Recorded> {
        core::mem::take(&mut *self.log.lock())
    }

    fn push(&self, r: Recorded) {
        self.log.lock().push(r);
    }
}

impl WiphyEvents for RecordingEvents {
    fn scan_done(&self, cookie: u64, aborted: bool) {
        self.push(Recorded::ScanDone { cookie, aborted });
    }

    fn bss_found(&self, bss: &BssInfo) {
        self.push(Recorded::Bss {
            bssid: bss.bssid,
            channel: bss.channel,
        });
    }

    fn connect_result(&self, result: &ConnectResult) {
        self.push(Recorded::Connect {
            status: result.status,
            bssid: result.bssid,
        });
    }

    fn disconnected(&self, reason: u16, locally_generated: bool) {
        self.push(Recorded::Disconnected {
            reason,
            local: locally_generated,
        });
    }

    fn ready(&self) {
        self.push(Recorded::Ready);
    }

    fn tx_flow(&self, busy: bool) {
        self.push(Recorded::TxFlow(busy));
    }

    fn sta_joined(&self, mac: &[u8; 6]) {
        self.push(Recorded::StaJoined(*mac));
    }

    fn sta_left(&self, mac: &[u8; 6]) {
        self.push(Recorded::StaLeft(*mac));
    }

    fn mic_failure(&self, key_id: u8, is_mcast: bool) {
        self.push(Recorded::MicFailure {
            key_id,
            mcast: is_mcast,
        });
    }

    fn cqm_rssi(&self, rssi: i8, low: bool) {
        self.push(Recorded::Cqm { rssi, low });
    }
}

#[derive(Default)]
struct TimerState {
    armed: Option<u32>,
    disarms: usize,
}

/// 手动定时器：测试直接调用 on_scan_timeout 模拟到期
#[derive(Clone, Default)]
pub struct MockTimer {
    state: Arc<spin::Mutex<TimerState>>,
}

impl MockTimer {
    pub fn armed(&self) -> Option<u32> {
        self.state.lock().armed
    }

    pub fn disarm_count(&self) -> usize {
        self.state.lock().disarms
    }
}

impl ScanTimer for MockTimer {
    fn arm(&self, timeout_ms: u32) {
        self.state.lock().armed = Some(timeout_ms);
    }

    fn disarm(&self) {
        let mut st = self.state.lock();
        st.armed = None;
        st.disarms += 1;
    }
}

pub fn connect_ind(status: u8, bssid: [u8; 6]) -> ConnectInd {
    ConnectInd {
        status,
        bssid,
        req_ie: Vec::new(),
        resp_ie: Vec::new(),
    }
}
