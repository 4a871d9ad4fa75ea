//! SIPC 帧编解码（无状态）
//!
//! 帧布局（全部小端）：
//!
//! ```text
//! ┌──────────────────────────┬─────────┬──────────────────────┬─────────┐
//! │ hdr u32                  │ tag u16 │ status u16           │ payload │
//! │ bit0-1 类型, bit2-31 长度 │         │ 仅 Response 帧携带    │         │
//! └──────────────────────────┴─────────┴──────────────────────┴─────────┘
//! ```
//!
//! hdr 中的长度为 hdr 之后的全部字节数（tag + status + payload）。
//! 解码要求声明长度与实际可用字节数严格相等，不做部分帧解析。

use core::fmt;

/// hdr 长度
pub const SIPC_HDR_LEN: usize = 4;
/// tag 长度
pub const SIPC_TAG_LEN: usize = 2;
/// Response 状态码长度
pub const SIPC_STATUS_LEN: usize = 2;
/// 默认协商的最大帧长（含 hdr）
pub const SIPC_MAX_FRAME_SIZE: usize = 1600;

/// hdr 长度字段最大值（30 bit）
const SIPC_LEN_MAX: usize = (1 << 30) - 1;
const TYPE_MASK: u32 = 0x3;
const TAG_DOMAIN_MASK: u16 = 0x000f;
/// tag 中 domain 占低 4 bit
pub const DOMAIN_MAX: u8 = TAG_DOMAIN_MASK as u8;
const TAG_DIR_BIT: u16 = 1 << 4;
const TAG_LEVEL_BIT: u16 = 1 << 5;
const TAG_RESERVED_MASK: u16 = 0x00c0;
/// 事件 id 占 tag 的高 12 bit
pub const EVENT_ID_MAX: u16 = 0x0fff;

/// 消息类型（hdr 低 2 bit）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Command = 0,
    Response = 1,
    Event = 2,
}

impl MsgType {
    fn from_bits(v: u32) -> Option<Self> {
        match v & TYPE_MASK {
            0 => Some(Self::Command),
            1 => Some(Self::Response),
            2 => Some(Self::Event),
            _ => None,
        }
    }
}

/// 命令方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    HostToDevice = 0,
    DeviceToHost = 1,
}

/// 命令优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Level {
    #[default]
    Normal = 0,
    High = 1,
}

/// 命令/响应 tag：domain(4) | direction(1) | level(1) | reserved(2) | id(8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdTag {
    pub domain: u8,
    pub direction: Direction,
    pub level: Level,
    pub id: u8,
}

impl CmdTag {
    /// Host 发往固件的命令 tag
    pub const fn request(domain: u8, level: Level, id: u8) -> Self {
        Self {
            domain,
            direction: Direction::HostToDevice,
            level,
            id,
        }
    }

    /// 固件回给 Host 的响应 tag（回显 id）
    pub const fn response_to(req: &CmdTag) -> Self {
        Self {
            domain: req.domain,
            direction: Direction::DeviceToHost,
            level: req.level,
            id: req.id,
        }
    }

    pub fn to_bits(self) -> Result<u16, CodecError> {
        if self.domain > DOMAIN_MAX {
            return Err(CodecError::BadTag(self.domain as u16 | ((self.id as u16) << 8)));
        }
        let mut v = self.domain as u16;
        if self.direction == Direction::DeviceToHost {
            v |= TAG_DIR_BIT;
        }
        if self.level == Level::High {
            v |= TAG_LEVEL_BIT;
        }
        Ok(v | ((self.id as u16) << 8))
    }

    pub fn from_bits(v: u16) -> Result<Self, CodecError> {
        if v & TAG_RESERVED_MASK != 0 {
            return Err(CodecError::BadTag(v));
        }
        Ok(Self {
            domain: (v & TAG_DOMAIN_MASK) as u8,
            direction: if v & TAG_DIR_BIT != 0 {
                Direction::DeviceToHost
            } else {
                Direction::HostToDevice
            },
            level: if v & TAG_LEVEL_BIT != 0 {
                Level::High
            } else {
                Level::Normal
            },
            id: (v >> 8) as u8,
        })
    }
}

/// 事件 tag：domain(4) | id(12)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTag {
    pub domain: u8,
    pub id: u16,
}

impl EventTag {
    pub const fn new(domain: u8, id: u16) -> Self {
        Self { domain, id }
    }

    pub fn to_bits(self) -> Result<u16, CodecError> {
        if self.domain as u16 > TAG_DOMAIN_MASK || self.id > EVENT_ID_MAX {
            return Err(CodecError::BadTag(self.id));
        }
        Ok((self.domain as u16) | (self.id << 4))
    }

    pub fn from_bits(v: u16) -> Self {
        Self {
            domain: (v & TAG_DOMAIN_MASK) as u8,
            id: v >> 4,
        }
    }
}

/// Host → 固件命令帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub tag: CmdTag,
    pub payload: &'a [u8],
}

/// 固件 → Host 响应帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    pub tag: CmdTag,
    pub status: u16,
    pub payload: &'a [u8],
}

/// 固件 → Host 异步事件帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFrame<'a> {
    pub tag: EventTag,
    pub payload: &'a [u8],
}

/// 编解码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// 字节数不足以容纳 hdr/tag/status
    Truncated { len: usize },
    /// hdr 声明长度与实际字节数不符
    LengthMismatch { declared: usize, actual: usize },
    /// 类型不符（found 为 hdr 低 2 bit 原值）
    UnexpectedType { expected: MsgType, found: u8 },
    /// 编码后超过协商帧长或输出缓冲
    FrameTooLarge { len: usize, max: usize },
    /// tag 保留位非 0 或字段越界
    BadTag(u16),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { len } => write!(f, "truncated frame ({} bytes)", len),
            Self::LengthMismatch { declared, actual } => {
                write!(f, "length mismatch: declared {} actual {}", declared, actual)
            }
            Self::UnexpectedType { expected, found } => {
                write!(f, "unexpected message type {} (expected {:?})", found, expected)
            }
            Self::FrameTooLarge { len, max } => write!(f, "frame too large: {} > {}", len, max),
            Self::BadTag(v) => write!(f, "bad tag 0x{:04x}", v),
        }
    }
}

/// 指定类型、payload 长度时的整帧长度
pub const fn frame_len(ty: MsgType, payload_len: usize) -> usize {
    let status = match ty {
        MsgType::Response => SIPC_STATUS_LEN,
        _ => 0,
    };
    SIPC_HDR_LEN + SIPC_TAG_LEN + status + payload_len
}

fn check_room(total: usize, out: &[u8], max_frame: usize) -> Result<(), CodecError> {
    let max = max_frame.min(out.len());
    if total > max || total - SIPC_HDR_LEN > SIPC_LEN_MAX {
        return Err(CodecError::FrameTooLarge { len: total, max });
    }
    Ok(())
}

fn put_hdr(out: &mut [u8], ty: MsgType, total: usize) {
    let word = (((total - SIPC_HDR_LEN) as u32) << 2) | ty as u32;
    out[0..4].copy_from_slice(&word.to_le_bytes());
}

/// 校验 hdr 并返回 hdr 之后的 body
fn take_body(buf: &[u8], expected: MsgType) -> Result<&[u8], CodecError> {
    if buf.len() < SIPC_HDR_LEN {
        return Err(CodecError::Truncated { len: buf.len() });
    }
    let word = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    match MsgType::from_bits(word) {
        Some(ty) if ty == expected => {}
        _ => {
            return Err(CodecError::UnexpectedType {
                expected,
                found: (word & TYPE_MASK) as u8,
            })
        }
    }
    let declared = (word >> 2) as usize;
    let body = &buf[SIPC_HDR_LEN..];
    if declared != body.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    let min = match expected {
        MsgType::Response => SIPC_TAG_LEN + SIPC_STATUS_LEN,
        _ => SIPC_TAG_LEN,
    };
    if body.len() < min {
        return Err(CodecError::Truncated { len: buf.len() });
    }
    Ok(body)
}

/// 编码命令帧到 out，返回写入长度
pub fn encode_command(
    frame: &CommandFrame<'_>,
    out: &mut [u8],
    max_frame: usize,
) -> Result<usize, CodecError> {
    let total = frame_len(MsgType::Command, frame.payload.len());
    check_room(total, out, max_frame)?;
    let tag = frame.tag.to_bits()?;
    put_hdr(out, MsgType::Command, total);
    out[4..6].copy_from_slice(&tag.to_le_bytes());
    out[6..total].copy_from_slice(frame.payload);
    Ok(total)
}

/// 编码响应帧（固件侧语义，用于测试桩与回环调试）
pub fn encode_response(
    frame: &ResponseFrame<'_>,
    out: &mut [u8],
    max_frame: usize,
) -> Result<usize, CodecError> {
    let total = frame_len(MsgType::Response, frame.payload.len());
    check_room(total, out, max_frame)?;
    let tag = frame.tag.to_bits()?;
    put_hdr(out, MsgType::Response, total);
    out[4..6].copy_from_slice(&tag.to_le_bytes());
    out[6..8].copy_from_slice(&frame.status.to_le_bytes());
    out[8..total].copy_from_slice(frame.payload);
    Ok(total)
}

/// 编码事件帧
pub fn encode_event(
    frame: &EventFrame<'_>,
    out: &mut [u8],
    max_frame: usize,
) -> Result<usize, CodecError> {
    let total = frame_len(MsgType::Event, frame.payload.len());
    check_room(total, out, max_frame)?;
    let tag = frame.tag.to_bits()?;
    put_hdr(out, MsgType::Event, total);
    out[4..6].copy_from_slice(&tag.to_le_bytes());
    out[6..total].copy_from_slice(frame.payload);
    Ok(total)
}

pub fn decode_command(buf: &[u8]) -> Result<CommandFrame<'_>, CodecError> {
    let body = take_body(buf, MsgType::Command)?;
    let tag = CmdTag::from_bits(u16::from_le_bytes([body[0], body[1]]))?;
    Ok(CommandFrame {
        tag,
        payload: &body[SIPC_TAG_LEN..],
    })
}

pub fn decode_response(buf: &[u8]) -> Result<ResponseFrame<'_>, CodecError> {
    let body = take_body(buf, MsgType::Response)?;
    let tag = CmdTag::from_bits(u16::from_le_bytes([body[0], body[1]]))?;
    let status = u16::from_le_bytes([body[2], body[3]]);
    Ok(ResponseFrame {
        tag,
        status,
        payload: &body[SIPC_TAG_LEN + SIPC_STATUS_LEN..],
    })
}

pub fn decode_event(buf: &[u8]) -> Result<EventFrame<'_>, CodecError> {
    let body = take_body(buf, MsgType::Event)?;
    Ok(EventFrame {
        tag: EventTag::from_bits(u16::from_le_bytes([body[0], body[1]])),
        payload: &body[SIPC_TAG_LEN..],
    })
}
