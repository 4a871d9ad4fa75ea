//! SIPC 传输层错误

use axerrno::LinuxError;
use core::fmt;

use crate::codec::CodecError;

/// 响应帧不合法的具体原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧本身解码失败（类型、长度、tag）
    Codec(CodecError),
    /// 响应 tag 方向不是 device→host
    UnexpectedDirection,
    /// 回显 id 与请求 id 不一致
    TagMismatch { expected: u8, found: u8 },
    /// 回显 domain 与请求 domain 不一致
    DomainMismatch { expected: u8, found: u8 },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "{}", e),
            Self::UnexpectedDirection => write!(f, "response tag has host->device direction"),
            Self::TagMismatch { expected, found } => {
                write!(f, "response id {} does not match request id {}", found, expected)
            }
            Self::DomainMismatch { expected, found } => {
                write!(f, "response domain {} does not match request domain {}", found, expected)
            }
        }
    }
}

impl From<CodecError> for ProtocolError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// send_and_wait 的失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// payload 超过协商帧长，未发送
    InvalidLength { len: usize, max: usize },
    /// 同步通道短写
    Incomplete { written: usize, expected: usize },
    /// 等待窗口内无响应
    Timeout,
    /// 响应帧不合法
    Protocol(ProtocolError),
    /// 电源门控不可用，未触碰通道
    Busy,
    /// 固件返回非 0 状态码
    Rejected(u16),
}

impl TransportError {
    /// 调用方可稍后重试且状态未改变
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// cfg80211 边界使用的 errno
    pub fn to_linux_error(&self) -> LinuxError {
        match self {
            Self::InvalidLength { .. } => LinuxError::EINVAL,
            Self::Incomplete { .. } => LinuxError::EIO,
            Self::Timeout => LinuxError::ETIMEDOUT,
            Self::Protocol(_) => LinuxError::EPROTO,
            Self::Busy => LinuxError::EBUSY,
            Self::Rejected(_) => LinuxError::EIO,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { len, max } => write!(f, "frame length {} exceeds {}", len, max),
            Self::Incomplete { written, expected } => {
                write!(f, "short write: {} of {} bytes", written, expected)
            }
            Self::Timeout => write!(f, "timed out waiting for response"),
            Self::Protocol(e) => write!(f, "protocol error: {}", e),
            Self::Busy => write!(f, "power management transition in progress"),
            Self::Rejected(code) => write!(f, "rejected by firmware, status {}", code),
        }
    }
}

impl From<ProtocolError> for TransportError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<CodecError> for TransportError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::FrameTooLarge { len, max } => Self::InvalidLength { len, max },
            other => Self::Protocol(ProtocolError::Codec(other)),
        }
    }
}

pub type SipcResult<T> = Result<T, TransportError>;
