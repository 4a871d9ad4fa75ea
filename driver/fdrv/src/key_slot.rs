//! 密钥槽位表：按 (用途, 索引) 寻址
//!
//! 索引只在 [`KeySlotId::new`] 处校验一次，表内访问不再检查边界。

use ieee80211::{wlan_cipher_suite, WLAN_KEY_LEN_WEP104, WLAN_KEY_LEN_WEP40, WLAN_MAX_KEY_LEN};

use crate::error::StateError;
use crate::wid::cipher;

/// 每种用途的槽位数
pub const KEY_SLOTS_PER_USE: usize = 4;

/// 密钥用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyUse {
    Group = 0,
    Pairwise = 1,
}

impl KeyUse {
    pub fn is_pairwise(self) -> bool {
        self == KeyUse::Pairwise
    }
}

/// 已校验的槽位地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlotId {
    key_use: KeyUse,
    index: u8,
}

impl KeySlotId {
    pub fn new(key_use: KeyUse, index: u8) -> Result<Self, StateError> {
        if index as usize >= KEY_SLOTS_PER_USE {
            return Err(StateError::InvalidParam("key index out of range"));
        }
        Ok(Self { key_use, index })
    }

    pub fn key_use(&self) -> KeyUse {
        self.key_use
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    fn offset(&self) -> usize {
        self.key_use as usize * KEY_SLOTS_PER_USE + self.index as usize
    }
}

/// 单个槽位内容；cipher 为固件编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlot {
    pub cipher: u8,
    pub len: u8,
    pub key: [u8; WLAN_MAX_KEY_LEN],
}

impl KeySlot {
    /// 校验长度与 cipher 后构造
    pub fn new(suite: u32, material: &[u8]) -> Result<Self, StateError> {
        if material.is_empty() || material.len() > WLAN_MAX_KEY_LEN {
            return Err(StateError::InvalidParam("key length"));
        }
        let fw_cipher =
            cipher::from_suite(suite).ok_or(StateError::InvalidParam("unsupported cipher"))?;
        if (suite == wlan_cipher_suite::WEP40 && material.len() != WLAN_KEY_LEN_WEP40)
            || (suite == wlan_cipher_suite::WEP104 && material.len() != WLAN_KEY_LEN_WEP104)
        {
            return Err(StateError::InvalidParam("wep key length"));
        }
        let mut key = [0u8; WLAN_MAX_KEY_LEN];
        key[..material.len()].copy_from_slice(material);
        Ok(Self {
            cipher: fw_cipher,
            len: material.len() as u8,
            key,
        })
    }

    pub fn material(&self) -> &[u8] {
        &self.key[..self.len as usize]
    }
}

/// 组播/单播各 KEY_SLOTS_PER_USE 个槽位 + 默认密钥索引
#[derive(Debug, Clone, Default)]
pub struct KeySlotTable {
    slots: [Option<KeySlot>; 2 * KEY_SLOTS_PER_USE],
    default_index: Option<u8>,
}

impl KeySlotTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; 2 * KEY_SLOTS_PER_USE],
            default_index: None,
        }
    }

    pub fn set(&mut self, id: KeySlotId, slot: KeySlot) {
        self.slots[id.offset()] = Some(slot);
    }

    pub fn get(&self, id: KeySlotId) -> Option<&KeySlot> {
        self.slots[id.offset()].as_ref()
    }

    pub fn clear(&mut self, id: KeySlotId) {
        self.slots[id.offset()] = None;
        if id.key_use == KeyUse::Group && self.default_index == Some(id.index) {
            self.default_index = None;
        }
    }

    pub fn clear_all(&mut self) {
        self.slots = [None; 2 * KEY_SLOTS_PER_USE];
        self.default_index = None;
    }

    pub fn set_default(&mut self, index: u8) {
        self.default_index = Some(index);
    }

    pub fn default_index(&self) -> Option<u8> {
        self.default_index
    }

    /// 已占用槽位数
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_validated_at_boundary() {
        assert!(KeySlotId::new(KeyUse::Group, 3).is_ok());
        assert_eq!(
            KeySlotId::new(KeyUse::Pairwise, 4),
            Err(StateError::InvalidParam("key index out of range"))
        );
    }

    #[test]
    fn group_and_pairwise_do_not_alias() {
        let mut table = KeySlotTable::new();
        let g0 = KeySlotId::new(KeyUse::Group, 0).unwrap();
        let p0 = KeySlotId::new(KeyUse::Pairwise, 0).unwrap();
        table.set(g0, KeySlot::new(wlan_cipher_suite::CCMP, &[1; 16]).unwrap());
        assert!(table.get(p0).is_none());
        assert_eq!(table.get(g0).unwrap().material(), &[1; 16]);
        table.set_default(0);
        table.clear(g0);
        assert_eq!(table.default_index(), None);
        assert_eq!(table.occupied(), 0);
    }

    #[test]
    fn wep_length_checked() {
        assert!(KeySlot::new(wlan_cipher_suite::WEP40, &[0; 5]).is_ok());
        assert!(KeySlot::new(wlan_cipher_suite::WEP40, &[0; 13]).is_err());
        assert!(KeySlot::new(0x1234_5678, &[0; 16]).is_err());
        assert!(KeySlot::new(wlan_cipher_suite::TKIP, &[0; 33]).is_err());
    }
}
