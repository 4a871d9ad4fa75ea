//! 控制平面错误：状态机误用 + 下层传输错误

use axerrno::LinuxError;
use core::fmt;

use sipc::TransportError;

/// 状态机层面的误用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// 已有扫描在进行
    AlreadyScanning,
    /// 当前状态不允许该操作
    InvalidTransition(&'static str),
    /// 参数在 API 边界校验失败
    InvalidParam(&'static str),
    /// 需要已连接
    NotConnected,
}

impl StateError {
    pub fn to_linux_error(&self) -> LinuxError {
        match self {
            Self::AlreadyScanning => LinuxError::EBUSY,
            Self::InvalidTransition(_) => LinuxError::EALREADY,
            Self::InvalidParam(_) => LinuxError::EINVAL,
            Self::NotConnected => LinuxError::ENOTCONN,
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyScanning => write!(f, "scan already in progress"),
            Self::InvalidTransition(what) => write!(f, "invalid transition: {}", what),
            Self::InvalidParam(what) => write!(f, "invalid parameter: {}", what),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

/// Session 操作的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    Transport(TransportError),
    State(StateError),
}

impl WifiError {
    /// cfg80211 边界使用的 errno
    pub fn to_linux_error(&self) -> LinuxError {
        match self {
            Self::Transport(e) => e.to_linux_error(),
            Self::State(e) => e.to_linux_error(),
        }
    }

    /// 负 errno（WiphyOps 返回值）
    pub fn to_errno(&self) -> i32 {
        -(self.to_linux_error() as i32)
    }
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::State(e) => write!(f, "{}", e),
        }
    }
}

impl From<TransportError> for WifiError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<StateError> for WifiError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

pub type WifiResult<T> = Result<T, WifiError>;
