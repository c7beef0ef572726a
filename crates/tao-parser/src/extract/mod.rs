//! 访问单元提取.
//!
//! 把一个完整缓冲的数据包切分为连续的访问单元:
//! - [`obu`]: AV1 OBU 序列
//! - [`nal`]: H.264 / HEVC NAL 序列 (Annex B 或长度前缀), 含去转义
//!
//! 数据包是自定界的, 任何头部错误都会中止整次切分.

pub mod nal;
pub mod obu;
pub mod rbsp;

use std::ops::Deref;

use tao_core::{TaoError, TaoResult};

use crate::detectors::av1::ObuHeader;
use crate::detectors::h2645::{H264NalHeader, HevcNalHeader};

pub use nal::{extract_nal, split_nals};
pub use obu::{extract_obu, split_obus};
pub use rbsp::Rbsp;

/// 单元头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitHeader {
    /// AV1 OBU
    Obu(ObuHeader),
    /// H.264 NAL
    H264(H264NalHeader),
    /// HEVC NAL
    Hevc(HevcNalHeader),
}

impl UnitHeader {
    /// 类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Obu(h) => h.obu_type.type_id(),
            Self::H264(h) => h.nal_type.type_id(),
            Self::Hevc(h) => h.nal_type.type_id(),
        }
    }

    /// 类型名称
    pub fn type_name(&self) -> String {
        match self {
            Self::Obu(h) => h.obu_type.to_string(),
            Self::H264(h) => h.nal_type.to_string(),
            Self::Hevc(h) => h.nal_type.to_string(),
        }
    }

    /// temporal_id, 码流未携带时为 None
    pub fn temporal_id(&self) -> Option<u8> {
        match self {
            Self::Obu(h) => h.has_extension.then_some(h.temporal_id),
            Self::H264(_) => None,
            Self::Hevc(h) => Some(h.temporal_id),
        }
    }

    /// spatial_id (仅 AV1 扩展头部携带)
    pub fn spatial_id(&self) -> Option<u8> {
        match self {
            Self::Obu(h) => h.has_extension.then_some(h.spatial_id),
            _ => None,
        }
    }
}

/// 单元负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// 直接借用输入缓冲区
    Borrowed(&'a [u8]),
    /// 去转义后的独立副本, 随单元一起释放
    Unescaped(Rbsp),
}

impl Payload<'_> {
    /// 负载字节
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Borrowed(data) => data,
            Self::Unescaped(rbsp) => rbsp.data(),
        }
    }
}

/// 一个访问单元 (OBU 或 NAL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit<'a> {
    /// 单元头部
    pub header: UnitHeader,
    /// `raw` 在输入缓冲区中的偏移
    pub offset: usize,
    /// 原始字节, 含单元头部 (NAL 不含起始码与长度前缀)
    pub raw: &'a [u8],
    /// 交给解码器的数据: OBU 为负载, NAL 为去转义后的完整 NAL
    pub payload: Payload<'a>,
    /// 有效负载位数 (已去掉 trailing_bits)
    pub bit_length: usize,
}

impl AccessUnit<'_> {
    /// 交给解码器的数据
    pub fn data(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// 去转义信息 (仅 NAL)
    pub fn rbsp(&self) -> Option<&Rbsp> {
        match &self.payload {
            Payload::Unescaped(rbsp) => Some(rbsp),
            Payload::Borrowed(_) => None,
        }
    }
}

/// 按出现顺序排列的访问单元列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessUnitList<'a> {
    units: Vec<AccessUnit<'a>>,
}

impl<'a> AccessUnitList<'a> {
    /// 创建空列表
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// 追加一个单元, 扩容失败返回 `OutOfMemory`
    pub fn push(&mut self, unit: AccessUnit<'a>) -> TaoResult<()> {
        self.units
            .try_reserve(1)
            .map_err(|err| TaoError::OutOfMemory(format!("单元列表扩容失败: {err}")))?;
        self.units.push(unit);
        Ok(())
    }

    /// 取出内部 Vec
    pub fn into_vec(self) -> Vec<AccessUnit<'a>> {
        self.units
    }
}

impl<'a> Deref for AccessUnitList<'a> {
    type Target = [AccessUnit<'a>];

    fn deref(&self) -> &Self::Target {
        &self.units
    }
}

impl<'a> IntoIterator for AccessUnitList<'a> {
    type Item = AccessUnit<'a>;
    type IntoIter = std::vec::IntoIter<AccessUnit<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.into_iter()
    }
}

impl<'l, 'a> IntoIterator for &'l AccessUnitList<'a> {
    type Item = &'l AccessUnit<'a>;
    type IntoIter = std::slice::Iter<'l, AccessUnit<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

/// 位计数上限, 保证 `bits` 可用 i32 表示
const MAX_BIT_LENGTH: usize = i32::MAX as usize;

/// 计算负载的有效位数
///
/// `trailing_bits` 为 true 时去掉末尾的 0 字节以及最后一个非零字节中的
/// 停止位 (最低的 1) 和其后的 0 位; 否则为 `len * 8`.
pub fn payload_bit_length(data: &[u8], trailing_bits: bool) -> TaoResult<usize> {
    let size = if trailing_bits {
        match data.iter().rposition(|&b| b != 0) {
            Some(last) => last + 1,
            None => return Ok(0),
        }
    } else {
        data.len()
    };
    if size > MAX_BIT_LENGTH / 8 {
        return Err(TaoError::RangeOverflow(format!(
            "负载过大, 位数超出 i32 范围, size={}",
            size
        )));
    }
    let bits = size * 8;
    if trailing_bits {
        let last = data[size - 1];
        Ok(bits - (last.trailing_zeros() as usize + 1))
    } else {
        Ok(bits)
    }
}
