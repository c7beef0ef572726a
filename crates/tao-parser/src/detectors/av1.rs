//! AV1 OBU (Open Bitstream Unit) 头部检测.
//!
//! # OBU 头部
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ forbidden(1) | type(4) | extension_flag(1) | has_size(1) | rsv(1) │
//! └──────────────────────────────────────────────────────────────────┘
//! [extension: temporal_id(3) | spatial_id(2) | reserved(3)]
//! [obu_size: leb128, 仅当 has_size=1]
//! ```
//!
//! 没有 size 字段时, OBU 延伸到缓冲区末尾.

use std::fmt;

use tao_core::{BitReader, TaoError, TaoResult};

/// 解析头部最多需要的字节数: 2 字节头 + 8 字节 leb128
pub const OBU_HEADER_PROBE_SIZE: usize = 2 + 8;

/// 允许的最大 OBU 负载字节数, 保证 `size * 8` 不溢出 i32 位计数
pub const MAX_OBU_PAYLOAD_SIZE: u64 = (i32::MAX / 8) as u64;

/// leb128 可表示的最大值 (8 组, 每组 7 位)
pub const LEB128_MAX_VALUE: u64 = (1 << 56) - 1;

/// OBU 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ObuType {
    /// 序列头
    SequenceHeader,
    /// 时间分隔符
    TemporalDelimiter,
    /// 帧头
    FrameHeader,
    /// Tile 组
    TileGroup,
    /// 元数据
    Metadata,
    /// 帧 (帧头 + Tile 组)
    Frame,
    /// 冗余帧头
    RedundantFrameHeader,
    /// Tile 列表
    TileList,
    /// 填充
    Padding,
    /// 保留类型
    Reserved(u8),
}

impl ObuType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            1 => Self::SequenceHeader,
            2 => Self::TemporalDelimiter,
            3 => Self::FrameHeader,
            4 => Self::TileGroup,
            5 => Self::Metadata,
            6 => Self::Frame,
            7 => Self::RedundantFrameHeader,
            8 => Self::TileList,
            15 => Self::Padding,
            _ => Self::Reserved(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::SequenceHeader => 1,
            Self::TemporalDelimiter => 2,
            Self::FrameHeader => 3,
            Self::TileGroup => 4,
            Self::Metadata => 5,
            Self::Frame => 6,
            Self::RedundantFrameHeader => 7,
            Self::TileList => 8,
            Self::Padding => 15,
            Self::Reserved(id) => *id,
        }
    }

    /// 负载末尾是否带 trailing_bits
    ///
    /// Tile 组 / Tile 列表 / 帧的负载以 tile 数据结束, 没有尾随位.
    pub fn has_trailing_bits(&self) -> bool {
        !matches!(self, Self::TileGroup | Self::TileList | Self::Frame)
    }

    /// 负载为空是否合法
    pub fn allows_empty_payload(&self) -> bool {
        matches!(self, Self::TemporalDelimiter | Self::Padding)
    }
}

impl fmt::Display for ObuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceHeader => write!(f, "SequenceHeader"),
            Self::TemporalDelimiter => write!(f, "TD"),
            Self::FrameHeader => write!(f, "FrameHeader"),
            Self::TileGroup => write!(f, "TileGroup"),
            Self::Metadata => write!(f, "Metadata"),
            Self::Frame => write!(f, "Frame"),
            Self::RedundantFrameHeader => write!(f, "RedundantFrameHeader"),
            Self::TileList => write!(f, "TileList"),
            Self::Padding => write!(f, "Padding"),
            Self::Reserved(id) => write!(f, "Reserved({id})"),
        }
    }
}

/// 解析后的 OBU 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObuHeader {
    /// OBU 类型
    pub obu_type: ObuType,
    /// 是否带扩展字节
    pub has_extension: bool,
    /// 是否带 size 字段
    pub has_size_field: bool,
    /// temporal_id (无扩展时为 0)
    pub temporal_id: u8,
    /// spatial_id (无扩展时为 0)
    pub spatial_id: u8,
    /// 头部字节数, 含扩展字节与 leb128 size 字段
    pub header_size: usize,
    /// 负载字节数
    pub payload_size: usize,
}

impl ObuHeader {
    /// OBU 总字节数 (头部 + 负载)
    pub fn total_size(&self) -> usize {
        self.header_size + self.payload_size
    }
}

/// 解析缓冲区开头的 OBU 头部
///
/// 负载大小超过 [`MAX_OBU_PAYLOAD_SIZE`] 时返回 `RangeOverflow`,
/// 声明的总长度超出缓冲区时返回 `MalformedHeader`.
pub fn parse_obu_header(buf: &[u8]) -> TaoResult<ObuHeader> {
    let probe = &buf[..buf.len().min(OBU_HEADER_PROBE_SIZE)];
    let mut br = BitReader::new(probe);
    parse_header_fields(&mut br, buf.len()).map_err(|err| match err {
        TaoError::Eof => TaoError::MalformedHeader(format!(
            "AV1: OBU 头部截断, buf_len={}",
            buf.len()
        )),
        other => other,
    })
}

fn parse_header_fields(br: &mut BitReader<'_>, buf_len: usize) -> TaoResult<ObuHeader> {
    if br.read_flag()? {
        return Err(TaoError::MalformedHeader(
            "AV1: obu_forbidden_bit 非法".into(),
        ));
    }
    let obu_type = ObuType::from_type_id(br.read_bits(4)? as u8);
    let has_extension = br.read_flag()?;
    let has_size_field = br.read_flag()?;
    br.skip_bits(1)?; // obu_reserved_1bit

    let (temporal_id, spatial_id) = if has_extension {
        let tid = br.read_bits(3)? as u8;
        let sid = br.read_bits(2)? as u8;
        br.skip_bits(3)?; // extension_header_reserved_3bits
        (tid, sid)
    } else {
        (0, 0)
    };

    let payload_size = if has_size_field {
        br.read_leb128()?
    } else {
        (buf_len - 1 - usize::from(has_extension)) as u64
    };
    if payload_size > MAX_OBU_PAYLOAD_SIZE {
        return Err(TaoError::RangeOverflow(format!(
            "AV1: obu_size={} 超过上限 {}",
            payload_size, MAX_OBU_PAYLOAD_SIZE
        )));
    }

    let header_size = br.bits_read() / 8;
    let payload_size = payload_size as usize;
    if header_size + payload_size > buf_len {
        return Err(TaoError::MalformedHeader(format!(
            "AV1: OBU 长度超出缓冲区, header={}, payload={}, buf_len={}",
            header_size, payload_size, buf_len
        )));
    }

    Ok(ObuHeader {
        obu_type,
        has_extension,
        has_size_field,
        temporal_id,
        spatial_id,
        header_size,
        payload_size,
    })
}

/// 解码缓冲区开头的 leb128, 返回 (值, 占用字节数)
pub fn decode_leb128(data: &[u8]) -> TaoResult<(u64, usize)> {
    let probe = &data[..data.len().min(8)];
    let mut br = BitReader::new(probe);
    let value = br.read_leb128().map_err(|_| {
        TaoError::MalformedHeader(format!("leb128 截断, len={}", data.len()))
    })?;
    Ok((value, br.byte_position()))
}

/// leb128 编码后的字节数
pub fn leb128_size(mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        value >>= 7;
        n += 1;
    }
    n
}

/// 追加 leb128 编码, 返回写入字节数
pub fn encode_leb128(mut value: u64, out: &mut Vec<u8>) -> TaoResult<usize> {
    if value > LEB128_MAX_VALUE {
        return Err(TaoError::RangeOverflow(format!(
            "leb128: value={} 超过 8 组可表示范围",
            value
        )));
    }
    let start = out.len();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    Ok(out.len() - start)
}
