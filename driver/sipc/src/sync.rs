//! SIPC 同步原语
//!
//! - **PowerGate**（spin::Mutex）：电源管理门控。休眠/唤醒路径用 `enter()` 阻塞持有；
//!   命令路径只用 `try_enter()`，取不到即说明电源状态正在切换
//! - **ReadySignal**（AtomicBool + 超时轮询）：固件 ready 事件到达后置位，bring-up 路径等待

use core::sync::atomic::{AtomicBool, Ordering};

/// 忙等延时的每毫秒循环数（无精确时钟时的启发式近似）
pub const LOOPS_PER_MS: u32 = 1000;

/// 忙等约 ms 毫秒
#[inline]
pub fn delay_spin_ms(ms: u32) {
    let limit = ms.saturating_mul(LOOPS_PER_MS);
    for _ in 0..limit {
        core::hint::spin_loop();
    }
}

/// 电源管理门控
pub struct PowerGate {
    lock: spin::Mutex<()>,
}

impl Default for PowerGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerGate {
    pub const fn new() -> Self {
        Self {
            lock: spin::Mutex::new(()),
        }
    }

    /// 电源状态切换期间持有，析构时释放
    #[inline]
    pub fn enter(&self) -> spin::MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// 命令路径非阻塞获取
    #[inline]
    pub fn try_enter(&self) -> Option<spin::MutexGuard<'_, ()>> {
        self.lock.try_lock()
    }

    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }
}

/// 固件 ready 信号
#[derive(Default)]
pub struct ReadySignal {
    flag: AtomicBool,
}

impl ReadySignal {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 等待置位，最多约 timeout_ms 毫秒；忙等时长与 CPU 频率相关
    pub fn wait_timeout_ms(&self, timeout_ms: u32) -> Result<(), ()> {
        let limit = timeout_ms.saturating_mul(LOOPS_PER_MS);
        for _ in 0..limit {
            if self.is_set() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        if self.is_set() {
            Ok(())
        } else {
            Err(())
        }
    }
}
