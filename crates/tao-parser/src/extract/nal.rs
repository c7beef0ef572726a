//! H.264 / HEVC NAL 切分.
//!
//! 支持两种封装:
//! - Annex B: 起始码分隔, 数据包必须以起始码开头
//! - 长度前缀 (AVCC / HVCC): 每个 NAL 前有 1-4 字节大端长度

use log::trace;
use tao_core::{ByteCursor, TaoError, TaoResult};

use super::{AccessUnit, AccessUnitList, Payload, Rbsp, UnitHeader, payload_bit_length};
use crate::codec_id::CodecId;
use crate::detectors::h2645::{
    START_CODE_LEN, find_start_code, leading_start_code, parse_h264_nal_header,
    parse_hevc_nal_header,
};

fn check_codec(codec: CodecId) -> TaoResult<()> {
    match codec {
        CodecId::H264 | CodecId::H265 => Ok(()),
        other => Err(TaoError::Unsupported(format!(
            "NAL 切分不支持编解码器 {}",
            other
        ))),
    }
}

/// 由一个完整 NAL (不含起始码) 构造访问单元
fn build_nal_unit(codec: CodecId, nal: &[u8], offset: usize) -> TaoResult<AccessUnit<'_>> {
    let rbsp = Rbsp::unescape(nal)?;
    let header = match codec {
        CodecId::H265 => UnitHeader::Hevc(parse_hevc_nal_header(rbsp.data())?),
        _ => UnitHeader::H264(parse_h264_nal_header(rbsp.data())?),
    };
    let bit_length = payload_bit_length(rbsp.data(), true)?;
    trace!(
        "{}: NAL type={}, offset={}, size={}, escapes={}",
        codec,
        header.type_name(),
        offset,
        nal.len(),
        rbsp.skipped().len()
    );
    Ok(AccessUnit {
        header,
        offset,
        raw: nal,
        payload: Payload::Unescaped(rbsp),
        bit_length,
    })
}

/// 把数据包切分为 NAL 序列
///
/// `nal_length_size` 为 None 时按 Annex B 处理, 否则为长度前缀字节数 (1-4).
/// 空数据包返回空列表.
pub fn split_nals(
    codec: CodecId,
    buf: &[u8],
    nal_length_size: Option<u8>,
) -> TaoResult<AccessUnitList<'_>> {
    check_codec(codec)?;
    if buf.is_empty() {
        return Ok(AccessUnitList::new());
    }
    match nal_length_size {
        None => split_annex_b(codec, buf),
        Some(size) => split_length_prefixed(codec, buf, size),
    }
}

fn split_annex_b(codec: CodecId, buf: &[u8]) -> TaoResult<AccessUnitList<'_>> {
    let mut units = AccessUnitList::new();
    let mut start = leading_start_code(buf)?;

    loop {
        let next = find_start_code(buf, start);
        let mut end = next.unwrap_or(buf.len());
        // 去除尾随 0 字节 (含 4 字节起始码多出的 0)
        while end > start && buf[end - 1] == 0x00 {
            end -= 1;
        }
        if end > start {
            units.push(build_nal_unit(codec, &buf[start..end], start)?)?;
        }
        match next {
            Some(pos) => start = pos + START_CODE_LEN,
            None => break,
        }
    }

    Ok(units)
}

fn split_length_prefixed(codec: CodecId, buf: &[u8], size: u8) -> TaoResult<AccessUnitList<'_>> {
    if !(1..=4).contains(&size) {
        return Err(TaoError::InvalidArgument(format!(
            "NAL 长度前缀必须为 1-4 字节, size={}",
            size
        )));
    }

    let mut units = AccessUnitList::new();
    let mut cur = ByteCursor::new(buf);
    while !cur.is_empty() {
        let len = cur.read_uint_be(usize::from(size)).map_err(|_| {
            TaoError::MalformedHeader(format!(
                "{}: NAL 长度字段截断, offset={}",
                codec,
                cur.position()
            ))
        })? as usize;
        if len > cur.remaining() {
            return Err(TaoError::MalformedHeader(format!(
                "{}: NAL 长度超出数据包, len={}, remaining={}",
                codec,
                len,
                cur.remaining()
            )));
        }
        let offset = cur.position();
        let nal = cur.read_bytes(len)?;
        if !nal.is_empty() {
            units.push(build_nal_unit(codec, nal, offset)?)?;
        }
    }

    Ok(units)
}

/// 把整个缓冲区作为一个 NAL (不含起始码) 解析
pub fn extract_nal(codec: CodecId, buf: &[u8]) -> TaoResult<AccessUnit<'_>> {
    check_codec(codec)?;
    build_nal_unit(codec, buf, 0)
}
