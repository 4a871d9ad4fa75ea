//! 事件分发：通知源每次 on_notify 读一个事件缓冲，按事件 id 分发到 Session 的 on_* 处理
//!
//! 事件与命令响应走不同通道，此处任何失败都只记录并丢弃，不影响在途命令。
//! 通知源保证串行调用，分发自身不可重入。

use sipc::EventFrame;

use crate::session::Session;
use crate::wid::{
    parse_connect_ind, parse_cqm_rssi_ind, parse_disconnect_ind, parse_mic_failure_ind,
    parse_scan_done_ind, parse_sta_ind, WifiEvent, SIPC_DOMAIN_WIFI,
};

/// 读取并处理一个事件；事件通道为空返回 false
pub fn on_notify(session: &Session) -> bool {
    match session.transport().recv_event(|frame| dispatch(session, &frame)) {
        Ok(Some(())) => true,
        Ok(None) => false,
        // 已在传输层记录，缓冲已消费
        Err(_) => true,
    }
}

/// 按事件 id 分发一帧
pub fn dispatch(session: &Session, frame: &EventFrame<'_>) {
    if frame.tag.domain != SIPC_DOMAIN_WIFI {
        log::warn!(target: "wireless::fdrv", "event domain {} id={} dropped", frame.tag.domain, frame.tag.id);
        return;
    }
    let Some(event) = WifiEvent::from_id(frame.tag.id) else {
        log::warn!(target: "wireless::fdrv", "unknown event id={} len={} dropped", frame.tag.id, frame.payload.len());
        return;
    };
    log::debug!(target: "wireless::fdrv", "event {:?} len={}", event, frame.payload.len());
    let p = frame.payload;

    match event {
        WifiEvent::ScanDone => match parse_scan_done_ind(p) {
            Some(bss) => {
                for b in &bss {
                    session.on_bss_found(b);
                }
                session.on_scan_done(false);
            }
            None => malformed(event, p.len()),
        },
        WifiEvent::ScanAbort => session.on_scan_done(true),
        WifiEvent::Connect => match parse_connect_ind(p) {
            Some(ind) => session.on_connect_result(&ind),
            None => malformed(event, p.len()),
        },
        WifiEvent::Disconnect => match parse_disconnect_ind(p) {
            Some(reason) => session.on_disconnect(reason),
            None => malformed(event, p.len()),
        },
        WifiEvent::Ready => session.on_ready(),
        WifiEvent::TxBusy => session.on_tx_flow(true),
        WifiEvent::TxOk => session.on_tx_flow(false),
        WifiEvent::SoftApStaJoin => match parse_sta_ind(p) {
            Some(mac) => session.on_sta_join(&mac),
            None => malformed(event, p.len()),
        },
        WifiEvent::SoftApStaLeave => match parse_sta_ind(p) {
            Some(mac) => session.on_sta_leave(&mac),
            None => malformed(event, p.len()),
        },
        WifiEvent::MicFailure => match parse_mic_failure_ind(p) {
            Some(ind) => session.on_mic_failure(&ind),
            None => malformed(event, p.len()),
        },
        WifiEvent::CqmRssi => match parse_cqm_rssi_ind(p) {
            Some(ind) => session.on_cqm_rssi(&ind),
            None => malformed(event, p.len()),
        },
    }
}

fn malformed(event: WifiEvent, len: usize) {
    log::warn!(target: "wireless::fdrv", "malformed {:?} payload ({} bytes) dropped", event, len);
}
