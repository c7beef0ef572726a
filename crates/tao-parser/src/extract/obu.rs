//! AV1 OBU 切分.

use log::{trace, warn};
use tao_core::TaoResult;

use super::{AccessUnit, AccessUnitList, Payload, UnitHeader, payload_bit_length};
use crate::detectors::av1::{ObuHeader, parse_obu_header};

/// 解析 `buf[offset..]` 开头的一个 OBU
fn read_obu(buf: &[u8], offset: usize) -> TaoResult<(ObuHeader, AccessUnit<'_>)> {
    let rest = &buf[offset..];
    let hdr = parse_obu_header(rest)?;
    let raw = &rest[..hdr.total_size()];
    let payload = &raw[hdr.header_size..];
    let bit_length = payload_bit_length(payload, hdr.obu_type.has_trailing_bits())?;
    let unit = AccessUnit {
        header: UnitHeader::Obu(hdr),
        offset,
        raw,
        payload: Payload::Borrowed(payload),
        bit_length,
    };
    Ok((hdr, unit))
}

/// 把数据包切分为 OBU 序列
///
/// `skip_invalid` 为 true 时, 有效位数为 0 且类型不是 TD / Padding 的 OBU 被跳过.
pub fn split_obus(buf: &[u8], skip_invalid: bool) -> TaoResult<AccessUnitList<'_>> {
    let mut units = AccessUnitList::new();
    let mut offset = 0;

    while offset < buf.len() {
        let (hdr, unit) = read_obu(buf, offset)?;
        offset += unit.raw.len();

        if skip_invalid && unit.bit_length == 0 && !hdr.obu_type.allows_empty_payload() {
            warn!(
                "AV1: 跳过无效 OBU, type={}, offset={}, size={}",
                hdr.obu_type,
                unit.offset,
                unit.raw.len()
            );
            continue;
        }
        trace!(
            "AV1: OBU type={}, offset={}, header={}, payload={}, bits={}",
            hdr.obu_type, unit.offset, hdr.header_size, hdr.payload_size, unit.bit_length
        );
        units.push(unit)?;
    }

    Ok(units)
}

/// 解析缓冲区开头的单个 OBU, 返回其原始字节范围
pub fn extract_obu(buf: &[u8]) -> TaoResult<AccessUnit<'_>> {
    read_obu(buf, 0).map(|(_, unit)| unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::av1::tests::build_obu;
    use tao_core::TaoError;

    #[test]
    fn test_split_temporal_unit() {
        let mut tu = build_obu(2, None, &[]);
        tu.extend(build_obu(1, None, &[0x00, 0x00, 0x00, 0x80]));
        tu.extend(build_obu(6, Some((1, 0)), &[0x12, 0x34, 0x00]));

        let units = split_obus(&tu, true).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].header.type_id(), 2);
        assert_eq!(units[0].bit_length, 0);
        assert_eq!(units[1].data(), &[0x00, 0x00, 0x00, 0x80]);
        assert_eq!(units[1].bit_length, 24);
        assert_eq!(units[2].header.temporal_id(), Some(1));
        assert_eq!(units[2].header.spatial_id(), Some(0));
        assert_eq!(units[2].bit_length, 24, "帧 OBU 不去除尾随位");
        assert_eq!(units[2].offset, 2 + 6);
        assert_eq!(units[2].raw, &tu[8..]);
    }

    #[test]
    fn test_skip_empty_metadata() {
        let mut buf = build_obu(5, None, &[0x00]);
        buf.extend(build_obu(15, None, &[]));
        let units = split_obus(&buf, true).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].header.type_id(), 15);

        let units = split_obus(&buf, false).unwrap();
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_header_failure_aborts_split() {
        let mut buf = build_obu(2, None, &[]);
        buf.push(0x80); // forbidden 位
        assert!(matches!(
            split_obus(&buf, true),
            Err(TaoError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_extract_single_reports_raw_span() {
        let mut buf = build_obu(1, None, &[0x0A, 0x0B, 0x80]);
        let first_len = buf.len();
        buf.extend(build_obu(2, None, &[]));
        let unit = extract_obu(&buf).unwrap();
        assert_eq!(unit.raw.len(), first_len);
        assert_eq!(unit.data(), &[0x0A, 0x0B, 0x80]);
        assert_eq!(unit.bit_length, 16);
    }
}
