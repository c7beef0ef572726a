//! H.264 / HEVC 起始码与 NAL 头部检测.
//!
//! # Annex B 起始码
//! - 3 字节: `00 00 01`
//! - 4 字节: `00 00 00 01` (多出的 0 字节视为前一个 NAL 的尾随零)
//!
//! # NAL 头部
//! ```text
//! H.264 (1 字节): forbidden(1) | ref_idc(2) | type(5)
//! HEVC  (2 字节): forbidden(1) | type(6) | layer_id(6) | temporal_id_plus1(3)
//! ```

use std::fmt;

use tao_core::{TaoError, TaoResult};

/// 起始码 `00 00 01` 的长度
pub const START_CODE_LEN: usize = 3;

/// 从 `from` 开始查找下一个 `00 00 01`, 返回其首字节位置
pub fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 2 < data.len() {
        if data[i + 2] > 1 {
            i += 3;
        } else if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            return Some(i);
        } else {
            i += 1;
        }
    }
    None
}

/// 校验缓冲区以起始码开头 (允许前导 0 字节), 返回第一个 NAL 的起始位置
pub fn leading_start_code(data: &[u8]) -> TaoResult<usize> {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    if zeros >= 2 && data.get(zeros) == Some(&1) {
        Ok(zeros + 1)
    } else {
        Err(TaoError::MalformedHeader(format!(
            "Annex B: 缓冲区未以起始码开头, leading_zeros={}, len={}",
            zeros,
            data.len()
        )))
    }
}

// ============================================================
// H.264
// ============================================================

/// H.264 NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NalUnitType {
    /// 非 IDR 图像切片 (P/B slice)
    Slice,
    /// 数据分区 A (DPA)
    SliceDpa,
    /// 数据分区 B (DPB)
    SliceDpb,
    /// 数据分区 C (DPC)
    SliceDpc,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// SPS 扩展
    SpsExtension,
    /// 未知类型
    Unknown(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            _ => Self::Unknown(type_id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
        }
    }
}

/// H.264 NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H264NalHeader {
    /// NAL 类型
    pub nal_type: NalUnitType,
    /// nal_ref_idc (0-3)
    pub ref_idc: u8,
}

/// 解析 H.264 NAL 头部 (1 字节)
pub fn parse_h264_nal_header(data: &[u8]) -> TaoResult<H264NalHeader> {
    let Some(&header) = data.first() else {
        return Err(TaoError::MalformedHeader("H.264: NAL 单元为空".into()));
    };
    if header & 0x80 != 0 {
        return Err(TaoError::MalformedHeader(format!(
            "H.264: forbidden_zero_bit 非法, header=0x{:02X}",
            header
        )));
    }
    Ok(H264NalHeader {
        nal_type: NalUnitType::from_type_id(header & 0x1F),
        ref_idc: (header >> 5) & 0x03,
    })
}

// ============================================================
// HEVC
// ============================================================

/// HEVC NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HevcNalUnitType {
    /// TRAIL_N
    TrailN,
    /// TRAIL_R
    TrailR,
    /// TSA_N
    TsaN,
    /// TSA_R
    TsaR,
    /// STSA_N
    StsaN,
    /// STSA_R
    StsaR,
    /// RADL_N
    RadlN,
    /// RADL_R
    RadlR,
    /// RASL_N
    RaslN,
    /// RASL_R
    RaslR,
    /// BLA_W_LP
    BlaWLp,
    /// BLA_W_RADL
    BlaWRadl,
    /// BLA_N_LP
    BlaNLp,
    /// IDR_W_RADL
    IdrWRadl,
    /// IDR_N_LP
    IdrNLp,
    /// CRA_NUT
    Cra,
    /// VPS
    Vps,
    /// SPS
    Sps,
    /// PPS
    Pps,
    /// AUD
    Aud,
    /// EOS
    Eos,
    /// EOB
    Eob,
    /// FD
    FillerData,
    /// PREFIX_SEI
    PrefixSei,
    /// SUFFIX_SEI
    SuffixSei,
    /// 未知类型
    Unknown(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0 => Self::TrailN,
            1 => Self::TrailR,
            2 => Self::TsaN,
            3 => Self::TsaR,
            4 => Self::StsaN,
            5 => Self::StsaR,
            6 => Self::RadlN,
            7 => Self::RadlR,
            8 => Self::RaslN,
            9 => Self::RaslR,
            16 => Self::BlaWLp,
            17 => Self::BlaWRadl,
            18 => Self::BlaNLp,
            19 => Self::IdrWRadl,
            20 => Self::IdrNLp,
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            36 => Self::Eos,
            37 => Self::Eob,
            38 => Self::FillerData,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            _ => Self::Unknown(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::TrailN => 0,
            Self::TrailR => 1,
            Self::TsaN => 2,
            Self::TsaR => 3,
            Self::StsaN => 4,
            Self::StsaR => 5,
            Self::RadlN => 6,
            Self::RadlR => 7,
            Self::RaslN => 8,
            Self::RaslR => 9,
            Self::BlaWLp => 16,
            Self::BlaWRadl => 17,
            Self::BlaNLp => 18,
            Self::IdrWRadl => 19,
            Self::IdrNLp => 20,
            Self::Cra => 21,
            Self::Vps => 32,
            Self::Sps => 33,
            Self::Pps => 34,
            Self::Aud => 35,
            Self::Eos => 36,
            Self::Eob => 37,
            Self::FillerData => 38,
            Self::PrefixSei => 39,
            Self::SuffixSei => 40,
            Self::Unknown(id) => *id,
        }
    }

    /// 是否为 VCL NAL
    pub fn is_vcl(&self) -> bool {
        self.type_id() < 32
    }

    /// 是否为 IRAP NAL
    pub fn is_irap(&self) -> bool {
        matches!(self.type_id(), 16..=23)
    }
}

impl fmt::Display for HevcNalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vps => write!(f, "VPS"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::PrefixSei => write!(f, "PREFIX_SEI"),
            Self::SuffixSei => write!(f, "SUFFIX_SEI"),
            Self::IdrWRadl | Self::IdrNLp => write!(f, "IDR"),
            Self::Cra => write!(f, "CRA"),
            Self::Unknown(id) => write!(f, "Unknown({id})"),
            other => write!(f, "NAL({})", other.type_id()),
        }
    }
}

/// HEVC NAL 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HevcNalHeader {
    /// NAL 类型
    pub nal_type: HevcNalUnitType,
    /// nuh_layer_id
    pub layer_id: u8,
    /// TemporalId (= nuh_temporal_id_plus1 - 1)
    pub temporal_id: u8,
}

/// 解析 HEVC NAL 头部 (2 字节)
pub fn parse_hevc_nal_header(data: &[u8]) -> TaoResult<HevcNalHeader> {
    if data.len() < 2 {
        return Err(TaoError::MalformedHeader(format!(
            "HEVC: NAL 头部不足 2 字节, len={}",
            data.len()
        )));
    }
    if data[0] & 0x80 != 0 {
        return Err(TaoError::MalformedHeader(format!(
            "HEVC: forbidden_zero_bit 非法, header=0x{:02X}{:02X}",
            data[0], data[1]
        )));
    }
    let temporal_id_plus1 = data[1] & 0x07;
    if temporal_id_plus1 == 0 {
        return Err(TaoError::MalformedHeader(
            "HEVC: nuh_temporal_id_plus1 为 0".into(),
        ));
    }
    Ok(HevcNalHeader {
        nal_type: HevcNalUnitType::from_type_id((data[0] >> 1) & 0x3F),
        layer_id: ((data[0] & 1) << 5) | (data[1] >> 3),
        temporal_id: temporal_id_plus1 - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_start_code() {
        let data = [0xAB, 0x00, 0x00, 0x01, 0x65, 0x00, 0x00, 0x00, 0x01, 0x41];
        assert_eq!(find_start_code(&data, 0), Some(1));
        assert_eq!(find_start_code(&data, 4), Some(6));
        assert_eq!(find_start_code(&data, 7), None);
        assert_eq!(find_start_code(&[0x00, 0x00], 0), None);
    }

    #[test]
    fn test_leading_start_code() {
        assert_eq!(leading_start_code(&[0, 0, 1, 0x67]).unwrap(), 3);
        assert_eq!(leading_start_code(&[0, 0, 0, 1, 0x67]).unwrap(), 4);
        assert!(matches!(
            leading_start_code(&[0x67, 0, 0, 1]),
            Err(TaoError::MalformedHeader(_))
        ));
        assert!(leading_start_code(&[0, 1, 0x67]).is_err());
        assert!(leading_start_code(&[]).is_err());
    }

    #[test]
    fn test_h264_nal_header() {
        let hdr = parse_h264_nal_header(&[0x67]).unwrap();
        assert_eq!(hdr.nal_type, NalUnitType::Sps);
        assert_eq!(hdr.ref_idc, 3);
        assert_eq!(
            parse_h264_nal_header(&[0x65]).unwrap().nal_type,
            NalUnitType::SliceIdr
        );
        assert!(parse_h264_nal_header(&[0xE7]).is_err());
        assert!(parse_h264_nal_header(&[]).is_err());
    }

    #[test]
    fn test_hevc_nal_header() {
        // VPS: type=32, layer=0, tid_plus1=1
        let hdr = parse_hevc_nal_header(&[0x40, 0x01]).unwrap();
        assert_eq!(hdr.nal_type, HevcNalUnitType::Vps);
        assert_eq!(hdr.layer_id, 0);
        assert_eq!(hdr.temporal_id, 0);

        // TRAIL_R, layer=1, tid_plus1=3
        let hdr = parse_hevc_nal_header(&[0x02, 0x0B]).unwrap();
        assert_eq!(hdr.nal_type, HevcNalUnitType::TrailR);
        assert_eq!(hdr.layer_id, 1);
        assert_eq!(hdr.temporal_id, 2);
    }

    #[test]
    fn test_hevc_rejects_zero_temporal_id_plus1() {
        let err = parse_hevc_nal_header(&[0x40, 0x00]).unwrap_err();
        assert!(format!("{err}").contains("temporal_id_plus1"));
        assert!(parse_hevc_nal_header(&[0xC0, 0x01]).is_err());
        assert!(parse_hevc_nal_header(&[0x40]).is_err());
    }

    #[test]
    fn test_nal_type_mapping() {
        for id in 0..32u8 {
            assert_eq!(NalUnitType::from_type_id(id).type_id(), id);
        }
        for id in 0..64u8 {
            assert_eq!(HevcNalUnitType::from_type_id(id).type_id(), id);
        }
        assert!(HevcNalUnitType::Cra.is_irap());
        assert!(!HevcNalUnitType::Sps.is_vcl());
        assert!(NalUnitType::SliceIdr.is_vcl());
    }
}
