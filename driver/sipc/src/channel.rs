//! SIPC 通道抽象
//!
//! 共享内存环形通道由平台实现；本 crate 只通过以下接口收发字节。

/// 同步请求/响应通道
pub trait SipcChannel: Send {
    /// 写入一整帧，返回实际接受的字节数（小于帧长即短写）
    fn write(&mut self, frame: &[u8]) -> usize;
    /// 阻塞读一帧，最多等待 timeout_ms；超时返回 None
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Option<usize>;
    /// 非阻塞读，无数据返回 0
    fn try_read(&mut self, buf: &mut [u8]) -> usize;
}

/// 异步事件通道：每次通知只读一个事件缓冲
pub trait SipcEventSource: Send {
    /// 读一个事件帧，无数据返回 0
    fn read_event(&mut self, buf: &mut [u8]) -> usize;
}

/// 外部电源就绪门控
pub trait PowerRail: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// 无独立电源轨时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReady;

impl PowerRail for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}
