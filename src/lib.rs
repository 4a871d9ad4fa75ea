//! sprdwl wireless crate
//!
//! 协处理器 WiFi 的 host 侧驱动核心：SIPC 传输 + 控制平面
//! - sipc: 帧编解码、单飞行命令通道、事件通道、电源门控
//! - fdrv: 连接/扫描状态机、连接序列、事件分发、WiphyOps
//! - ieee80211: 共用 802.11 / cfg80211 类型

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use axerrno::{AxError, AxResult};

pub use fdrv;
pub use ieee80211;
pub use sipc;

use fdrv::{ScanTimer, Session, SessionConfig, WiphyEvents, WiphyOps};
use sipc::{delay_spin_ms, TransportHandle};

/// bring-up 等待固件 ready 的默认时间 (ms)
pub const READY_TIMEOUT_MS: u32 = 2000;

/// 无线驱动上下文：每个设备一个，持有 Session
///
/// 平台把事件通道的"有数据"通知接到 [`WirelessDriver::on_notify`]，
/// 把扫描定时器到期接到 [`WirelessDriver::on_scan_timer`]。
pub struct WirelessDriver {
    session: Session,
}

impl WirelessDriver {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// 创建 Session 并等待固件 ready 事件（期间轮询事件通道）
    pub fn bring_up(
        transport: TransportHandle,
        events: Box<dyn WiphyEvents>,
        timer: Box<dyn ScanTimer>,
        config: SessionConfig,
        ready_timeout_ms: u32,
    ) -> AxResult<Self> {
        let driver = Self::new(Session::new(transport, events, timer, config));
        for _ in 0..=ready_timeout_ms {
            while driver.on_notify() {}
            if driver.session.is_ready() {
                log::info!(target: "wireless", "wireless: firmware ready");
                return Ok(driver);
            }
            delay_spin_ms(1);
        }
        log::warn!(target: "wireless", "wireless: no ready event within {}ms", ready_timeout_ms);
        Err(AxError::TimedOut)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// cfg80211 风格接口
    pub fn wiphy(&self) -> &dyn WiphyOps {
        &self.session
    }

    /// 事件通道通知入口：处理一个事件，通道为空返回 false
    pub fn on_notify(&self) -> bool {
        self.session.on_notify()
    }

    /// 扫描定时器到期入口
    pub fn on_scan_timer(&self) {
        self.session.on_scan_timeout();
    }

    pub fn shutdown(self) {
        self.session.close();
    }
}
