//! 嵌套 box 封装的视频帧.
//!
//! 每个数据包恰好是一帧, 字段位于固定偏移 (大端):
//! ```text
//! 0   outer size (u32)    4  'pack'
//! 8   sinf size = 20      12 'sinf'
//! 16  width (u32)         20 height (u32)      24 pixel format (fourcc)
//! 28  [cmpn size (u32)    32 'cmpn']           可选, 存在时后续偏移 +8
//! 28  sdat size (u32)     32 'sdat'            36 payload (sdat size - 8 字节)
//! ```
//!
//! 解析不保留任何状态, 任何不一致都拒绝整个数据包.

use byteorder::BigEndian;
use tao_core::{ByteCursor, FourCc, TaoError, TaoResult};

/// 外层 box 标签
pub const TAG_PACK: FourCc = FourCc::new(*b"pack");
/// 信号信息 box 标签
pub const TAG_SINF: FourCc = FourCc::new(*b"sinf");
/// 可选分量包装 box 标签
pub const TAG_CMPN: FourCc = FourCc::new(*b"cmpn");
/// 信号数据 box 标签
pub const TAG_SDAT: FourCc = FourCc::new(*b"sdat");

/// box 头部字节数 (size + tag)
pub const BOX_HEADER_SIZE: usize = 8;
/// 信号信息 box 的固定大小
pub const SINF_BOX_SIZE: u32 = 20;
/// 不含分量包装时的固定头部长度
pub const NESTED_BOX_MIN_HEADER: usize = 36;

/// box 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedBoxHeader {
    /// 标签
    pub tag: FourCc,
    /// 声明长度 (含 8 字节头部)
    pub declared_length: u32,
}

/// 解析后的嵌套 box 帧, 负载借用输入数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedBoxFrame<'a> {
    /// 信号数据
    pub payload: &'a [u8],
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
    /// 像素格式
    pub pixel_format: FourCc,
    /// 是否带 `cmpn` 分量包装
    pub has_component_wrapper: bool,
}

/// 读取 box 头部并校验标签
fn read_box_header(cur: &mut ByteCursor<'_>, expected: FourCc) -> TaoResult<NestedBoxHeader> {
    let declared_length = cur.read_u32::<BigEndian>().map_err(truncated)?;
    let tag = cur.read_fourcc().map_err(truncated)?;
    if tag != expected {
        return Err(TaoError::Format(format!(
            "嵌套 box: 标签不匹配, 期望 {}, 实际 {}, offset={}",
            expected,
            tag,
            cur.position() - 4
        )));
    }
    if (declared_length as usize) < BOX_HEADER_SIZE {
        return Err(TaoError::Format(format!(
            "嵌套 box: {} 声明长度过小, size={}",
            tag, declared_length
        )));
    }
    Ok(NestedBoxHeader {
        tag,
        declared_length,
    })
}

fn truncated(_: TaoError) -> TaoError {
    TaoError::Format("嵌套 box: 数据包截断".into())
}

/// 解析一个嵌套 box 数据包
pub fn parse_nested_box(packet: &[u8]) -> TaoResult<NestedBoxFrame<'_>> {
    if packet.len() < NESTED_BOX_MIN_HEADER {
        return Err(TaoError::Format(format!(
            "嵌套 box: 数据包不足 {} 字节, len={}",
            NESTED_BOX_MIN_HEADER,
            packet.len()
        )));
    }

    let mut cur = ByteCursor::new(packet);
    let outer = read_box_header(&mut cur, TAG_PACK)?;
    let outer_len = outer.declared_length as usize;
    if outer_len < NESTED_BOX_MIN_HEADER || outer_len > packet.len() {
        return Err(TaoError::Format(format!(
            "嵌套 box: 外层长度与数据包不一致, size={}, len={}",
            outer_len,
            packet.len()
        )));
    }
    // 之后的读取不得越过外层 box
    let mut cur = ByteCursor::new(&packet[..outer_len]);
    cur.seek(BOX_HEADER_SIZE)?;

    let sinf = read_box_header(&mut cur, TAG_SINF)?;
    if sinf.declared_length != SINF_BOX_SIZE {
        return Err(TaoError::Format(format!(
            "嵌套 box: sinf 长度必须为 {}, size={}",
            SINF_BOX_SIZE, sinf.declared_length
        )));
    }
    let width = cur.read_u32::<BigEndian>().map_err(truncated)?;
    let height = cur.read_u32::<BigEndian>().map_err(truncated)?;
    let pixel_format = cur.read_fourcc().map_err(truncated)?;

    // 分量包装的标签位于 size 字段之后
    let mut limit = outer_len;
    let has_component_wrapper = {
        let mut probe = cur.clone();
        probe.skip(4).is_ok() && probe.peek_fourcc().ok() == Some(TAG_CMPN)
    };
    if has_component_wrapper {
        let wrapper_start = cur.position();
        let cmpn = read_box_header(&mut cur, TAG_CMPN)?;
        let wrapper_end = wrapper_start + cmpn.declared_length as usize;
        if wrapper_end > outer_len || (cmpn.declared_length as usize) < 2 * BOX_HEADER_SIZE {
            return Err(TaoError::Format(format!(
                "嵌套 box: cmpn 长度非法, size={}, outer={}",
                cmpn.declared_length, outer_len
            )));
        }
        limit = wrapper_end;
    }

    let sdat_start = cur.position();
    let sdat = read_box_header(&mut cur, TAG_SDAT)?;
    let sdat_end = sdat_start + sdat.declared_length as usize;
    if sdat_end > limit {
        return Err(TaoError::Format(format!(
            "嵌套 box: sdat 长度超出包含它的 box, size={}, available={}",
            sdat.declared_length,
            limit - sdat_start
        )));
    }
    let payload = cur
        .read_bytes(sdat.declared_length as usize - BOX_HEADER_SIZE)
        .map_err(truncated)?;

    Ok(NestedBoxFrame {
        payload,
        width,
        height,
        pixel_format,
        has_component_wrapper,
    })
}
