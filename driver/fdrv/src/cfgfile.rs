//! hostapd 配置文件解析
//!
//! 解析 soft-AP 所需的 ssid= / channel= / wpa_psk= / wpa_passphrase= 等 tag。
//! 文件读取由平台提供（[`ConfFileLoader`] 的闭包），本模块只做解析。

use alloc::vec::Vec;
use axerrno::LinuxError;
use core::result::Result;

use ieee80211::IEEE80211_MAX_SSID_LEN;

const EINVAL: i32 = -(LinuxError::EINVAL as i32);
const ENOENT: i32 = -(LinuxError::ENOENT as i32);

/// wpa_passphrase 长度范围（IEEE 802.11i）
const PASSPHRASE_MIN: usize = 8;
const PASSPHRASE_MAX: usize = 63;
/// wpa_psk 为 64 个十六进制字符
const PMK_HEX_LEN: usize = 64;

/// soft-AP 凭据来源：load(path) -> psk
pub trait HostapConfig: Send + Sync {
    fn load(&self, path: &str) -> Result<Vec<u8>, i32>;
}

/// 解析后的 hostapd 配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostapConf {
    pub ssid: Vec<u8>,
    pub channel: Option<u8>,
    /// wpa_psk 解码后的 32 字节 PMK，或 wpa_passphrase 原文；空表示开放网络
    pub psk: Vec<u8>,
}

/// 在 file_data 中查找 tag_name 开头的行，返回其后的值（不含换行）
fn find_tag<'a>(file_data: &'a [u8], tag_name: &str) -> Option<&'a [u8]> {
    let tag = tag_name.as_bytes();
    let mut line_start = 0;
    while line_start < file_data.len() {
        let mut curr = line_start;
        while curr < file_data.len() && file_data[curr] != b'\n' {
            curr += 1;
        }
        let line = &file_data[line_start..curr];
        if line.starts_with(tag) {
            let value = &line[tag.len()..];
            return Some(value.strip_suffix(b"\r").unwrap_or(value));
        }
        line_start = curr + 1;
    }
    None
}

fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn parse_pmk_hex(s: &[u8]) -> Option<Vec<u8>> {
    if s.len() != PMK_HEX_LEN {
        return None;
    }
    s.chunks(2)
        .map(|pair| Some((hex_nibble(pair[0])? << 4) | hex_nibble(pair[1])?))
        .collect()
}

fn parse_dec_u8(s: &[u8]) -> Option<u8> {
    if s.is_empty() {
        return None;
    }
    let mut v: u16 = 0;
    for &b in s {
        if !b.is_ascii_digit() {
            return None;
        }
        v = v * 10 + (b - b'0') as u16;
        if v > u8::MAX as u16 {
            return None;
        }
    }
    Some(v as u8)
}

/// 解析 hostapd 风格配置；wpa_psk 优先于 wpa_passphrase
pub fn parse_hostap_conf(file_data: &[u8]) -> Result<HostapConf, i32> {
    let mut conf = HostapConf::default();
    if let Some(ssid) = find_tag(file_data, "ssid=") {
        if ssid.is_empty() || ssid.len() > IEEE80211_MAX_SSID_LEN {
            return Err(EINVAL);
        }
        conf.ssid = ssid.to_vec();
    }
    if let Some(v) = find_tag(file_data, "channel=") {
        conf.channel = Some(parse_dec_u8(v).ok_or(EINVAL)?);
    }
    if let Some(v) = find_tag(file_data, "wpa_psk=") {
        conf.psk = parse_pmk_hex(v).ok_or(EINVAL)?;
    } else if let Some(v) = find_tag(file_data, "wpa_passphrase=") {
        if !(PASSPHRASE_MIN..=PASSPHRASE_MAX).contains(&v.len()) {
            return Err(EINVAL);
        }
        conf.psk = v.to_vec();
    }
    Ok(conf)
}

/// 由平台读取函数 + 本模块解析组成的 HostapConfig
pub struct ConfFileLoader<F> {
    read_file: F,
}

impl<F> ConfFileLoader<F>
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    pub fn new(read_file: F) -> Self {
        Self { read_file }
    }
}

impl<F> HostapConfig for ConfFileLoader<F>
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    fn load(&self, path: &str) -> Result<Vec<u8>, i32> {
        let data = (self.read_file)(path).ok_or_else(|| {
            log::warn!(target: "wireless::fdrv", "hostapd conf {} not found", path);
            ENOENT
        })?;
        let conf = parse_hostap_conf(&data)?;
        log::debug!(target: "wireless::fdrv", "hostapd conf {}: psk_len={}", path, conf.psk.len());
        Ok(conf.psk)
    }
}
