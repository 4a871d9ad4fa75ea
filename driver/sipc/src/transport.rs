//! SIPC 传输核心
//!
//! 同步通道上实现单飞行（single-flight）请求-响应：命令锁串行化所有发送方，
//! 同一 handle 任意时刻最多一条命令在途；事件通道独立，不取命令锁。
//!
//! send_and_wait 流程：
//! 1. payload 超过协商帧长直接返回 InvalidLength（不取锁）
//! 2. 阻塞获取命令锁
//! 3. 非阻塞获取电源门控，失败返回 Busy，不触碰通道
//! 4. 排空同步通道上上次残留的字节
//! 5. 发送命令帧，短写返回 Incomplete
//! 6. 在固定等待窗口内读响应，超时返回 Timeout
//! 7. 校验类型/长度/方向/domain/id，任一不符返回 Protocol
//! 8. 状态码非 0 返回 Rejected(status)
//!
//! 所有退出路径都由 guard 析构释放命令锁与电源门控。

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::channel::{AlwaysReady, PowerRail, SipcChannel, SipcEventSource};
use crate::codec::{
    self, frame_len, CmdTag, CommandFrame, Direction, EventFrame, Level, MsgType,
    SIPC_MAX_FRAME_SIZE,
};
use crate::error::{ProtocolError, SipcResult, TransportError};
use crate::sync::PowerGate;

/// 命令等待响应的最长时间 (ms)
pub const SIPC_CMD_TIMEOUT_MS: u32 = 3000;

/// 排空残留字节的最大轮数
const STALE_DRAIN_MAX_ROUNDS: usize = 8;

/// 传输层参数
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// 协商的最大帧长（含 hdr）
    pub max_frame_size: usize,
    /// 等待响应窗口 (ms)
    pub cmd_timeout_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: SIPC_MAX_FRAME_SIZE,
            cmd_timeout_ms: SIPC_CMD_TIMEOUT_MS,
        }
    }
}

/// 命令路径：同步通道 + 发送/接收缓冲，整体受命令锁保护
struct CmdPath {
    chan: Box<dyn SipcChannel>,
    send_buf: Vec<u8>,
    recv_buf: Vec<u8>,
}

/// 事件路径：事件通道 + 事件缓冲
struct EventPath {
    source: Box<dyn SipcEventSource>,
    buf: Vec<u8>,
}

/// 每个设备会话一个；bring-up 时创建，teardown 时销毁
pub struct TransportHandle {
    cmd: spin::Mutex<CmdPath>,
    event: spin::Mutex<EventPath>,
    pm_gate: PowerGate,
    power_rail: Box<dyn PowerRail>,
    max_frame: usize,
    cmd_timeout_ms: u32,
}

impl TransportHandle {
    pub fn new(
        chan: Box<dyn SipcChannel>,
        events: Box<dyn SipcEventSource>,
        config: TransportConfig,
    ) -> Self {
        let max_frame = config.max_frame_size;
        log::info!(target: "wireless::sipc", "transport up: max_frame={} cmd_timeout={}ms", max_frame, config.cmd_timeout_ms);
        Self {
            cmd: spin::Mutex::new(CmdPath {
                chan,
                send_buf: vec![0u8; max_frame],
                recv_buf: vec![0u8; max_frame],
            }),
            event: spin::Mutex::new(EventPath {
                source: events,
                buf: vec![0u8; max_frame],
            }),
            pm_gate: PowerGate::new(),
            power_rail: Box::new(AlwaysReady),
            max_frame,
            cmd_timeout_ms: config.cmd_timeout_ms,
        }
    }

    /// 替换外部电源就绪门控
    pub fn with_power_rail(mut self, rail: Box<dyn PowerRail>) -> Self {
        self.power_rail = rail;
        self
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame
    }

    /// 单条命令可携带的最大 payload
    pub fn max_payload_len(&self) -> usize {
        self.max_frame - frame_len(MsgType::Command, 0)
    }

    /// 电源管理路径在切换期间 `enter()` 持有
    pub fn power_gate(&self) -> &PowerGate {
        &self.pm_gate
    }

    /// 同步发送一条命令并等待其响应，返回响应 payload（不含状态码）
    pub fn send_and_wait(
        &self,
        domain: u8,
        level: Level,
        id: u8,
        payload: &[u8],
    ) -> SipcResult<Vec<u8>> {
        let total = frame_len(MsgType::Command, payload.len());
        if total > self.max_frame {
            log::warn!(target: "wireless::sipc", "cmd id={} payload {} exceeds frame size {}", id, payload.len(), self.max_frame);
            return Err(TransportError::InvalidLength {
                len: total,
                max: self.max_frame,
            });
        }

        let tag = CmdTag::request(domain, level, id);
        if let Err(e) = tag.to_bits() {
            log::warn!(target: "wireless::sipc", "cmd id={} domain {} out of range", id, domain);
            return Err(e.into());
        }

        let mut path = self.cmd.lock();
        let _pm = match self.pm_gate.try_enter() {
            Some(guard) if self.power_rail.is_ready() => guard,
            _ => {
                log::debug!(target: "wireless::sipc", "cmd id={} busy: power transition in progress", id);
                return Err(TransportError::Busy);
            }
        };
        let CmdPath {
            chan,
            send_buf,
            recv_buf,
        } = &mut *path;

        let stale = drain_stale(chan.as_mut(), recv_buf);
        if stale > 0 {
            log::warn!(target: "wireless::sipc", "drained {} stale bytes before cmd id={}", stale, id);
        }

        let len = codec::encode_command(&CommandFrame { tag, payload }, send_buf, self.max_frame)?;
        let written = chan.write(&send_buf[..len]);
        if written != len {
            log::warn!(target: "wireless::sipc", "cmd id={} short write {}/{}", id, written, len);
            return Err(TransportError::Incomplete {
                written,
                expected: len,
            });
        }
        log::debug!(target: "wireless::sipc", "cmd domain={} id={} sent len={}", domain, id, len);

        let n = match chan.read_timeout(recv_buf, self.cmd_timeout_ms) {
            Some(n) => n.min(recv_buf.len()),
            None => {
                log::warn!(target: "wireless::sipc", "cmd id={} timeout {}ms", id, self.cmd_timeout_ms);
                return Err(TransportError::Timeout);
            }
        };
        let rsp = codec::decode_response(&recv_buf[..n]).map_err(|e| {
            log::warn!(target: "wireless::sipc", "cmd id={} bad response: {}", id, e);
            TransportError::Protocol(ProtocolError::Codec(e))
        })?;
        check_echo(&tag, &rsp.tag).map_err(|e| {
            log::warn!(target: "wireless::sipc", "cmd id={} {}", id, e);
            TransportError::Protocol(e)
        })?;
        if rsp.status != 0 {
            log::debug!(target: "wireless::sipc", "cmd id={} rejected status={}", id, rsp.status);
            return Err(TransportError::Rejected(rsp.status));
        }
        log::trace!(target: "wireless::sipc", "cmd id={} ok rsp_len={}", id, rsp.payload.len());
        Ok(rsp.payload.to_vec())
    }

    /// 纯解码：通知源拿到原始事件字节后调用，不取命令锁
    pub fn deliver_event(raw: &[u8]) -> SipcResult<EventFrame<'_>> {
        codec::decode_event(raw).map_err(|e| TransportError::Protocol(ProtocolError::Codec(e)))
    }

    /// 从事件通道读一个事件缓冲并解码后交给 handler；无数据返回 Ok(None)
    ///
    /// handler 在事件锁内执行，不得再次进入本函数。
    pub fn recv_event<R>(
        &self,
        handler: impl FnOnce(EventFrame<'_>) -> R,
    ) -> SipcResult<Option<R>> {
        let mut path = self.event.lock();
        let EventPath { source, buf } = &mut *path;
        let n = source.read_event(buf).min(buf.len());
        if n == 0 {
            return Ok(None);
        }
        let frame = Self::deliver_event(&buf[..n]).map_err(|e| {
            log::warn!(target: "wireless::sipc", "dropping malformed event ({} bytes): {}", n, e);
            e
        })?;
        Ok(Some(handler(frame)))
    }
}

fn drain_stale(chan: &mut dyn SipcChannel, buf: &mut [u8]) -> usize {
    let mut total = 0;
    for _ in 0..STALE_DRAIN_MAX_ROUNDS {
        let n = chan.try_read(buf);
        if n == 0 {
            break;
        }
        total += n;
    }
    total
}

fn check_echo(req: &CmdTag, rsp: &CmdTag) -> Result<(), ProtocolError> {
    if rsp.direction != Direction::DeviceToHost {
        return Err(ProtocolError::UnexpectedDirection);
    }
    if rsp.domain != req.domain {
        return Err(ProtocolError::DomainMismatch {
            expected: req.domain,
            found: rsp.domain,
        });
    }
    if rsp.id != req.id {
        return Err(ProtocolError::TagMismatch {
            expected: req.id,
            found: rsp.id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::codec::{encode_event, encode_response, CodecError, EventTag, ResponseFrame};
    use alloc::collections::VecDeque;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 固件应答方式
    #[derive(Clone, Copy)]
    enum Reply {
        Echo { status: u16 },
        WrongId,
        WrongDirection,
        BadLength,
        Silent,
        ShortWrite,
    }

    #[derive(Default)]
    struct Wire {
        stale: VecDeque<Vec<u8>>,
        pending: Option<Vec<u8>>,
        sent: Vec<(u8, Vec<u8>)>,
        drained: usize,
    }

    struct ScriptedChannel {
        reply: Reply,
        wire: Arc<spin::Mutex<Wire>>,
        on_wire: Arc<AtomicUsize>,
        max_on_wire: Arc<AtomicUsize>,
        hold: Duration,
    }

    impl ScriptedChannel {
        fn new(reply: Reply) -> (Self, Arc<spin::Mutex<Wire>>) {
            let wire = Arc::new(spin::Mutex::new(Wire::default()));
            (
                Self {
                    reply,
                    wire: wire.clone(),
                    on_wire: Arc::new(AtomicUsize::new(0)),
                    max_on_wire: Arc::new(AtomicUsize::new(0)),
                    hold: Duration::from_millis(0),
                },
                wire,
            )
        }
    }

    impl SipcChannel for ScriptedChannel {
        fn write(&mut self, frame: &[u8]) -> usize {
            if let Reply::ShortWrite = self.reply {
                return frame.len() - 1;
            }
            let now = self.on_wire.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_on_wire.fetch_max(now, Ordering::SeqCst);
            let cmd = codec::decode_command(frame).unwrap();
            let mut out = vec![0u8; 64];
            let mut tag = CmdTag::response_to(&cmd.tag);
            let status = match self.reply {
                Reply::Echo { status } => status,
                _ => 0,
            };
            match self.reply {
                Reply::WrongId => tag.id = tag.id.wrapping_add(1),
                Reply::WrongDirection => tag.direction = Direction::HostToDevice,
                _ => {}
            }
            let n = encode_response(
                &ResponseFrame {
                    tag,
                    status,
                    payload: cmd.payload,
                },
                &mut out,
                64,
            )
            .unwrap();
            out.truncate(n);
            if let Reply::BadLength = self.reply {
                // 多出 2 字节，声明长度与实际不符
                out.extend_from_slice(&[0, 0]);
            }
            let mut wire = self.wire.lock();
            wire.sent.push((cmd.tag.id, cmd.payload.to_vec()));
            if !matches!(self.reply, Reply::Silent) {
                wire.pending = Some(out);
            }
            frame.len()
        }

        fn read_timeout(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Option<usize> {
            if !self.hold.is_zero() {
                std::thread::sleep(self.hold);
            }
            let rsp = self.wire.lock().pending.take();
            self.on_wire.fetch_sub(1, Ordering::SeqCst);
            let rsp = rsp?;
            buf[..rsp.len()].copy_from_slice(&rsp);
            Some(rsp.len())
        }

        fn try_read(&mut self, buf: &mut [u8]) -> usize {
            let mut wire = self.wire.lock();
            match wire.stale.pop_front() {
                Some(b) => {
                    buf[..b.len()].copy_from_slice(&b);
                    wire.drained += b.len();
                    b.len()
                }
                None => 0,
            }
        }
    }

    struct QueueEvents(Arc<spin::Mutex<VecDeque<Vec<u8>>>>);

    impl SipcEventSource for QueueEvents {
        fn read_event(&mut self, buf: &mut [u8]) -> usize {
            match self.0.lock().pop_front() {
                Some(e) => {
                    buf[..e.len()].copy_from_slice(&e);
                    e.len()
                }
                None => 0,
            }
        }
    }

    fn no_events() -> Box<dyn SipcEventSource> {
        Box::new(QueueEvents(Arc::new(spin::Mutex::new(VecDeque::new()))))
    }

    fn handle(chan: ScriptedChannel) -> TransportHandle {
        TransportHandle::new(Box::new(chan), no_events(), TransportConfig::default())
    }

    #[test]
    fn echo_returns_response_payload() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = handle(chan);
        let rsp = t.send_and_wait(1, Level::Normal, 0x10, &[1, 2, 3]).unwrap();
        assert_eq!(rsp, vec![1, 2, 3]);
        assert_eq!(wire.lock().sent, vec![(0x10, vec![1, 2, 3])]);
    }

    #[test]
    fn nonzero_status_is_rejected() {
        let (chan, _) = ScriptedChannel::new(Reply::Echo { status: 5 });
        let t = handle(chan);
        assert_eq!(t.send_and_wait(1, Level::Normal, 1, &[]), Err(TransportError::Rejected(5)));
    }

    #[test]
    fn mismatched_id_is_protocol_error() {
        let (chan, _) = ScriptedChannel::new(Reply::WrongId);
        let t = handle(chan);
        assert_eq!(
            t.send_and_wait(1, Level::Normal, 7, &[]),
            Err(TransportError::Protocol(ProtocolError::TagMismatch { expected: 7, found: 8 }))
        );
    }

    #[test]
    fn response_with_host_direction_is_protocol_error() {
        let (chan, _) = ScriptedChannel::new(Reply::WrongDirection);
        let t = handle(chan);
        assert_eq!(
            t.send_and_wait(1, Level::Normal, 7, &[]),
            Err(TransportError::Protocol(ProtocolError::UnexpectedDirection))
        );
    }

    #[test]
    fn length_mismatch_is_protocol_error_and_releases_lock() {
        let (chan, _) = ScriptedChannel::new(Reply::BadLength);
        let t = handle(chan);
        let err = t.send_and_wait(1, Level::Normal, 3, &[0xAA]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::Codec(codec::CodecError::LengthMismatch { .. }))
        ));
        assert!(!t.cmd.is_locked());
        assert!(!t.pm_gate.is_held());
        // handle 仍可用
        assert!(t.send_and_wait(1, Level::Normal, 4, &[]).is_err());
        assert!(!t.cmd.is_locked());
    }

    #[test]
    fn silent_firmware_times_out() {
        let (chan, _) = ScriptedChannel::new(Reply::Silent);
        let t = handle(chan);
        assert_eq!(t.send_and_wait(1, Level::Normal, 1, &[]), Err(TransportError::Timeout));
        assert!(!t.cmd.is_locked());
    }

    #[test]
    fn short_write_is_incomplete() {
        let (chan, _) = ScriptedChannel::new(Reply::ShortWrite);
        let t = handle(chan);
        assert_eq!(
            t.send_and_wait(1, Level::Normal, 1, &[1, 2]),
            Err(TransportError::Incomplete { written: 7, expected: 8 })
        );
    }

    #[test]
    fn oversized_payload_fails_fast() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = TransportHandle::new(
            Box::new(chan),
            no_events(),
            TransportConfig {
                max_frame_size: 32,
                cmd_timeout_ms: 10,
            },
        );
        assert_eq!(t.max_payload_len(), 26);
        let payload = [0u8; 27];
        assert_eq!(
            t.send_and_wait(1, Level::Normal, 1, &payload),
            Err(TransportError::InvalidLength { len: 33, max: 32 })
        );
        assert!(wire.lock().sent.is_empty());
    }

    #[test]
    fn out_of_range_domain_fails_before_sending() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = handle(chan);
        assert_eq!(
            t.send_and_wait(0x11, Level::Normal, 3, &[]),
            Err(TransportError::Protocol(ProtocolError::Codec(CodecError::BadTag(0x0311))))
        );
        assert!(wire.lock().sent.is_empty());
        // 命令锁已释放
        assert_eq!(t.send_and_wait(0x1, Level::Normal, 3, &[]), Ok(Vec::new()));
        assert_eq!(wire.lock().sent, vec![(3, Vec::new())]);
    }

    #[test]
    fn held_power_gate_reports_busy_without_touching_channel() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = handle(chan);
        {
            let _suspend = t.power_gate().enter();
            assert_eq!(t.send_and_wait(1, Level::Normal, 1, &[]), Err(TransportError::Busy));
        }
        assert!(wire.lock().sent.is_empty());
        assert!(t.send_and_wait(1, Level::Normal, 1, &[]).is_ok());
    }

    struct RailDown;

    impl PowerRail for RailDown {
        fn is_ready(&self) -> bool {
            false
        }
    }

    #[test]
    fn rail_not_ready_reports_busy() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = handle(chan).with_power_rail(Box::new(RailDown));
        assert_eq!(t.send_and_wait(1, Level::Normal, 1, &[]), Err(TransportError::Busy));
        assert!(wire.lock().sent.is_empty());
    }

    #[test]
    fn stale_bytes_are_drained_before_send() {
        let (chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        wire.lock().stale.push_back(vec![0xde, 0xad, 0xbe, 0xef, 0x01]);
        let t = handle(chan);
        assert_eq!(t.send_and_wait(1, Level::Normal, 2, &[7]).unwrap(), vec![7]);
        assert_eq!(wire.lock().drained, 5);
    }

    #[test]
    fn concurrent_callers_never_overlap_on_the_wire() {
        let (mut chan, wire) = ScriptedChannel::new(Reply::Echo { status: 0 });
        chan.hold = Duration::from_millis(5);
        let max_on_wire = chan.max_on_wire.clone();
        let t = handle(chan);
        std::thread::scope(|s| {
            for worker in 0..4u8 {
                let t = &t;
                s.spawn(move || {
                    for i in 0..5u8 {
                        let id = worker * 10 + i;
                        assert_eq!(t.send_and_wait(1, Level::Normal, id, &[id]).unwrap(), vec![id]);
                    }
                });
            }
        });
        assert_eq!(max_on_wire.load(Ordering::SeqCst), 1);
        assert_eq!(wire.lock().sent.len(), 20);
    }

    #[test]
    fn recv_event_decodes_one_buffer() {
        let queue = Arc::new(spin::Mutex::new(VecDeque::new()));
        let mut raw = vec![0u8; 16];
        let n = encode_event(
            &EventFrame {
                tag: EventTag::new(1, 9),
                payload: &[4, 2],
            },
            &mut raw,
            16,
        )
        .unwrap();
        raw.truncate(n);
        queue.lock().push_back(raw);
        queue.lock().push_back(vec![0xff, 0xff]);
        let (chan, _) = ScriptedChannel::new(Reply::Echo { status: 0 });
        let t = TransportHandle::new(
            Box::new(chan),
            Box::new(QueueEvents(queue.clone())),
            TransportConfig::default(),
        );
        let got = t.recv_event(|ev| (ev.tag.id, ev.payload.to_vec())).unwrap();
        assert_eq!(got, Some((9, vec![4, 2])));
        assert_eq!(queue.lock().len(), 1);
        assert!(t.recv_event(|_| ()).is_err());
        assert_eq!(t.recv_event(|_| ()).unwrap(), None);
    }
}
