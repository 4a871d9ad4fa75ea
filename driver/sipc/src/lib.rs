//! SIPC (Shared-memory Inter-Processor Communication) 传输
//!
//! Host 驱动与协处理器固件之间的命令/事件通道：
//! - 帧编解码 (codec)：hdr/tag/status 打包，无状态
//! - 传输核心 (transport)：同步通道上的单飞行请求-响应、事件通道解码
//! - 同步原语 (sync)：电源管理门控、固件 ready 信号
//!
//! 共享内存环形通道本身由平台实现，经 [`SipcChannel`] / [`SipcEventSource`] 接入。

#![no_std]

extern crate alloc;

pub mod codec;

mod channel;
mod error;
mod sync;
mod transport;

pub use channel::{AlwaysReady, PowerRail, SipcChannel, SipcEventSource};
pub use codec::{
    decode_command, decode_event, decode_response, encode_command, encode_event, encode_response,
    frame_len, CmdTag, CodecError, CommandFrame, Direction, EventFrame, EventTag, Level, MsgType,
    ResponseFrame, DOMAIN_MAX, SIPC_HDR_LEN, SIPC_MAX_FRAME_SIZE, SIPC_STATUS_LEN, SIPC_TAG_LEN,
};
pub use error::{ProtocolError, SipcResult, TransportError};
pub use sync::{delay_spin_ms, PowerGate, ReadySignal, LOOPS_PER_MS};
pub use transport::{TransportConfig, TransportHandle, SIPC_CMD_TIMEOUT_MS};
