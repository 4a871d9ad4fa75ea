//! 连接命令序列
//!
//! 固件对连接参数的下发顺序有要求：
//! psk-ie → wpa 版本 → 认证类型 → pairwise → group → 再次认证类型 → akm → 密钥
//! → 信道 → bssid → essid（essid 触发关联，必须最后）。
//! WAPI 的 cipher 不经本通道协商，跳过 pairwise/group 两步。
//! 任一步失败即中止，不回滚。

use alloc::vec::Vec;

use ieee80211::{
    is_wapi_cipher, is_wep_cipher, AuthType, ConnectParams, WLAN_KEY_LEN_WEP104,
    WLAN_KEY_LEN_WEP40,
};

use crate::error::StateError;
use crate::key_slot::{KeySlot, KeySlotId, KeyUse};
use crate::wid::{self, cipher, WidMsg, MAC_BCST};
use crate::wiphy::IeParser;

/// 内嵌 PSK vendor IE 的 OUI
pub const WLAN_OUI_PSK_IE: [u8; 3] = [0x40, 0x45, 0xda];

/// 固件认证类型编码
const FW_AUTH_OPEN: u8 = 0;
const FW_AUTH_SHARED: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    PskIe,
    WpaVersion,
    AuthType,
    PairwiseCipher,
    GroupCipher,
    /// 第二次设置认证类型（固件在 cipher 协商后会重置认证类型）
    ReassertAuthType,
    KeyMgmt,
    Psk,
    WepKey,
    Channel,
    Bssid,
    Essid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectStep {
    pub kind: StepKind,
    pub msg: WidMsg,
}

/// 按序下发的命令 + 需写入槽位表的 WEP 密钥
#[derive(Debug, Clone)]
pub struct ConnectSequence {
    steps: Vec<ConnectStep>,
    wep_key: Option<(KeySlotId, KeySlot)>,
}

impl ConnectSequence {
    pub fn steps(&self) -> &[ConnectStep] {
        &self.steps
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    pub fn wep_key(&self) -> Option<(KeySlotId, KeySlot)> {
        self.wep_key
    }

    fn push(&mut self, kind: StepKind, msg: WidMsg) {
        self.steps.push(ConnectStep { kind, msg });
    }
}

/// 按请求的认证类型与是否使用 WEP 计算固件认证类型
fn fw_auth_type(auth: AuthType, wep: bool) -> u8 {
    match auth {
        AuthType::SharedKey => FW_AUTH_SHARED,
        AuthType::Automatic if wep => FW_AUTH_SHARED,
        _ => FW_AUTH_OPEN,
    }
}

pub fn build_connect_sequence(
    params: &ConnectParams<'_>,
    ie_parser: &dyn IeParser,
) -> Result<ConnectSequence, StateError> {
    let mut seq = ConnectSequence {
        steps: Vec::new(),
        wep_key: None,
    };
    let wep = is_wep_cipher(params.cipher_pairwise) || is_wep_cipher(params.cipher_group);
    let wapi = is_wapi_cipher(params.cipher_pairwise) || is_wapi_cipher(params.cipher_group);

    if let Some(ie) = ie_parser.find_embedded_ie(params.ie, &WLAN_OUI_PSK_IE) {
        seq.push(StepKind::PskIe, wid::build_set_psk_ie(ie));
    }
    if params.wpa_versions != 0 {
        seq.push(StepKind::WpaVersion, wid::build_set_wpa_version(params.wpa_versions));
    }

    let auth = fw_auth_type(params.auth_type, wep);
    seq.push(StepKind::AuthType, wid::build_set_auth_type(auth));

    if !wapi {
        let pairwise = cipher::from_suite(params.cipher_pairwise)
            .ok_or(StateError::InvalidParam("unsupported pairwise cipher"))?;
        let group = cipher::from_suite(params.cipher_group)
            .ok_or(StateError::InvalidParam("unsupported group cipher"))?;
        seq.push(StepKind::PairwiseCipher, wid::build_set_pairwise_cipher(pairwise));
        seq.push(StepKind::GroupCipher, wid::build_set_group_cipher(group));
    }

    seq.push(StepKind::ReassertAuthType, wid::build_set_auth_type(auth));

    if let Some(suite) = params.akm_suite {
        let akm = wid::akm::from_suite(suite)
            .ok_or(StateError::InvalidParam("unsupported akm suite"))?;
        seq.push(StepKind::KeyMgmt, wid::build_set_key_mgmt(akm));
    }

    if let Some(key) = params.key {
        if wep {
            let suite = match key.len() {
                WLAN_KEY_LEN_WEP40 => ieee80211::wlan_cipher_suite::WEP40,
                WLAN_KEY_LEN_WEP104 => ieee80211::wlan_cipher_suite::WEP104,
                _ => return Err(StateError::InvalidParam("wep key length")),
            };
            let id = KeySlotId::new(KeyUse::Group, params.key_idx)?;
            let slot = KeySlot::new(suite, key)?;
            let msg = wid::build_key_add(id.index(), false, slot.cipher, key, None, &MAC_BCST)
                .ok_or(StateError::InvalidParam("wep key"))?;
            seq.push(StepKind::WepKey, msg);
            seq.wep_key = Some((id, slot));
        } else {
            let msg = wid::build_set_psk(key).ok_or(StateError::InvalidParam("psk length"))?;
            seq.push(StepKind::Psk, msg);
        }
    }

    if let Some(chan) = params.channel {
        seq.push(StepKind::Channel, wid::build_set_channel(chan));
    }
    if let Some(bssid) = params.bssid {
        seq.push(StepKind::Bssid, wid::build_set_bssid(bssid));
    }
    let essid = wid::build_set_essid(params.ssid).ok_or(StateError::InvalidParam("ssid length"))?;
    seq.push(StepKind::Essid, essid);
    Ok(seq)
}

/// 依次下发，返回第一个失败；成功返回下发条数
pub fn run_sequence<T, E>(
    seq: &ConnectSequence,
    mut send: impl FnMut(&WidMsg) -> Result<T, E>,
) -> Result<usize, (StepKind, E)> {
    for step in &seq.steps {
        send(&step.msg).map_err(|e| (step.kind, e))?;
    }
    Ok(seq.steps.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wid::WifiCmd;
    use crate::wiphy::VendorIeParser;
    use ieee80211::{wlan_akm_suite, wlan_cipher_suite, wpa_version};

    fn open_ccmp() -> ConnectParams<'static> {
        ConnectParams {
            ssid: b"net1",
            auth_type: AuthType::OpenSystem,
            wpa_versions: wpa_version::WPA2,
            cipher_pairwise: wlan_cipher_suite::CCMP,
            cipher_group: wlan_cipher_suite::CCMP,
            ..Default::default()
        }
    }

    #[test]
    fn open_ccmp_issues_six_commands() {
        let seq = build_connect_sequence(&open_ccmp(), &VendorIeParser).unwrap();
        assert_eq!(
            seq.kinds(),
            [
                StepKind::WpaVersion,
                StepKind::AuthType,
                StepKind::PairwiseCipher,
                StepKind::GroupCipher,
                StepKind::ReassertAuthType,
                StepKind::Essid,
            ]
        );
        let steps = seq.steps();
        assert_eq!(steps[1].msg, steps[4].msg);
        assert_eq!(steps[2].msg.param, [cipher::CCMP]);
        assert_eq!(steps[5].msg.cmd, WifiCmd::SetEssid);
    }

    #[test]
    fn wapi_skips_cipher_steps_but_sends_psk() {
        let params = ConnectParams {
            ssid: b"wapi-net",
            cipher_pairwise: wlan_cipher_suite::SMS4,
            cipher_group: wlan_cipher_suite::SMS4,
            akm_suite: Some(wlan_akm_suite::WAPI_PSK),
            key: Some(b"12345678".as_slice()),
            ..Default::default()
        };
        let seq = build_connect_sequence(&params, &VendorIeParser).unwrap();
        let kinds = seq.kinds();
        assert!(!kinds.contains(&StepKind::PairwiseCipher));
        assert!(!kinds.contains(&StepKind::GroupCipher));
        assert!(kinds.contains(&StepKind::Psk));
        assert_eq!(kinds.last(), Some(&StepKind::Essid));
    }

    #[test]
    fn wep_shared_key_sequence() {
        let key = [0x11u8; 13];
        let params = ConnectParams {
            ssid: b"old",
            bssid: Some(&[1, 2, 3, 4, 5, 6]),
            channel: Some(6),
            auth_type: AuthType::Automatic,
            cipher_pairwise: wlan_cipher_suite::WEP104,
            cipher_group: wlan_cipher_suite::WEP104,
            key: Some(&key[..]),
            key_idx: 2,
            ..Default::default()
        };
        let seq = build_connect_sequence(&params, &VendorIeParser).unwrap();
        assert_eq!(
            seq.kinds(),
            [
                StepKind::AuthType,
                StepKind::PairwiseCipher,
                StepKind::GroupCipher,
                StepKind::ReassertAuthType,
                StepKind::WepKey,
                StepKind::Channel,
                StepKind::Bssid,
                StepKind::Essid,
            ]
        );
        assert_eq!(seq.steps()[0].msg.param, [FW_AUTH_SHARED]);
        let (id, slot) = seq.wep_key().unwrap();
        assert_eq!(id.index(), 2);
        assert_eq!(slot.cipher, cipher::WEP104);
    }

    #[test]
    fn bad_wep_length_rejected() {
        let key = [0u8; 7];
        let params = ConnectParams {
            ssid: b"old",
            cipher_pairwise: wlan_cipher_suite::WEP40,
            key: Some(&key[..]),
            ..Default::default()
        };
        assert_eq!(
            build_connect_sequence(&params, &VendorIeParser).err(),
            Some(StateError::InvalidParam("wep key length"))
        );
    }

    #[test]
    fn embedded_psk_ie_goes_first() {
        let ie = [0xdd, 0x04, 0x40, 0x45, 0xda, 0x07];
        let params = ConnectParams {
            ie: &ie,
            ..open_ccmp()
        };
        let seq = build_connect_sequence(&params, &VendorIeParser).unwrap();
        assert_eq!(seq.steps()[0].kind, StepKind::PskIe);
        assert_eq!(seq.steps()[0].msg.param, ie);
    }

    #[test]
    fn run_stops_at_first_failure() {
        let seq = build_connect_sequence(&open_ccmp(), &VendorIeParser).unwrap();
        let mut sent = 0;
        let res = run_sequence(&seq, |msg| {
            sent += 1;
            if msg.cmd == WifiCmd::SetPairwiseCipher {
                Err(7)
            } else {
                Ok(())
            }
        });
        assert_eq!(res, Err((StepKind::PairwiseCipher, 7)));
        assert_eq!(sent, 3);
    }
}
