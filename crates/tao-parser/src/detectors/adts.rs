//! AAC ADTS 帧头检测.
//!
//! # ADTS 帧结构 (7 或 9 字节头部)
//! ```text
//! 固定头部 (28 bits):
//!   sync word (12 bits = 0xFFF)
//!   ID (1 bit): 0=MPEG-4, 1=MPEG-2
//!   layer (2 bits): always 0
//!   protection_absent (1 bit): 1=no CRC, 0=CRC present
//!   profile (2 bits): 0=Main, 1=LC, 2=SSR, 3=LTP
//!   sampling_frequency_index (4 bits)
//!   private_bit (1 bit)
//!   channel_configuration (3 bits)
//!   original_copy (1 bit), home (1 bit)
//! 可变头部 (28 bits):
//!   copyright_id_bit (1 bit), copyright_id_start (1 bit)
//!   frame_length (13 bits): 含头部的完整帧大小
//!   adts_buffer_fullness (11 bits)
//!   number_of_raw_data_blocks (2 bits)
//! [CRC (16 bits)] 仅当 protection_absent=0
//! ```

use tao_core::{BitReader, TaoError, TaoResult};

/// ADTS 固定检测窗口大小
pub const ADTS_HEADER_SIZE: usize = 7;

/// AAC 采样率索引表 (ISO 14496-3)
const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// 声道配置对应的声道数
const AAC_CHANNELS: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 8];

/// ADTS 帧头部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdtsHeader {
    /// 是否为 MPEG-2 (ID 位)
    pub mpeg2: bool,
    /// AAC Profile (0=Main, 1=LC, 2=SSR, 3=LTP)
    pub profile: u8,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道配置 (0 表示由 PCE 指定)
    pub channel_configuration: u8,
    /// 声道数
    pub channels: u8,
    /// 帧总大小 (含头部)
    pub frame_length: usize,
    /// 是否带 CRC
    pub has_crc: bool,
    /// 帧内原始数据块数
    pub raw_data_blocks: u8,
}

impl AdtsHeader {
    /// 头部字节数 (7 或 9)
    pub fn header_size(&self) -> usize {
        if self.has_crc { 9 } else { 7 }
    }

    /// 帧内采样数
    pub fn samples(&self) -> u32 {
        (u32::from(self.raw_data_blocks) + 1) * 1024
    }

    /// 码率 (bit/s), 按帧长与采样数估算
    pub fn bit_rate(&self) -> u32 {
        let bits = self.frame_length as u64 * 8 * u64::from(self.sample_rate);
        (bits / u64::from(self.samples())) as u32
    }
}

/// 从至少 7 字节的窗口解析 ADTS 头部
pub fn parse_adts_header(data: &[u8]) -> TaoResult<AdtsHeader> {
    if data.len() < ADTS_HEADER_SIZE {
        return Err(TaoError::MalformedHeader(format!(
            "ADTS: 头部不足 {} 字节, len={}",
            ADTS_HEADER_SIZE,
            data.len()
        )));
    }

    let mut br = BitReader::new(&data[..ADTS_HEADER_SIZE]);
    let sync = br.read_bits(12)?;
    if sync != 0xFFF {
        return Err(TaoError::MalformedHeader(format!(
            "ADTS: 同步字不匹配, sync=0x{:03X}",
            sync
        )));
    }
    let mpeg2 = br.read_flag()?;
    let layer = br.read_bits(2)?;
    if layer != 0 {
        return Err(TaoError::MalformedHeader(format!(
            "ADTS: layer 必须为 0, layer={}",
            layer
        )));
    }
    let protection_absent = br.read_flag()?;
    let profile = br.read_bits(2)? as u8;
    let sr_index = br.read_bits(4)? as usize;
    if sr_index >= AAC_SAMPLE_RATES.len() {
        return Err(TaoError::MalformedHeader(format!(
            "ADTS: 采样率索引非法, index={}",
            sr_index
        )));
    }
    br.skip_bits(1)?; // private_bit
    let channel_configuration = br.read_bits(3)? as u8;
    br.skip_bits(4)?; // original_copy, home, copyright_id_bit, copyright_id_start

    let frame_length = br.read_bits(13)? as usize;
    if frame_length < ADTS_HEADER_SIZE {
        return Err(TaoError::MalformedHeader(format!(
            "ADTS: 帧长度小于头部, frame_length={}",
            frame_length
        )));
    }
    br.skip_bits(11)?; // adts_buffer_fullness
    let raw_data_blocks = br.read_bits(2)? as u8;

    Ok(AdtsHeader {
        mpeg2,
        profile,
        sample_rate: AAC_SAMPLE_RATES[sr_index],
        channel_configuration,
        channels: AAC_CHANNELS[channel_configuration as usize],
        frame_length,
        has_crc: !protection_absent,
        raw_data_blocks,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 构造一个 ADTS 帧: AAC-LC, 44100Hz, 双声道, 无 CRC
    pub(crate) fn build_adts_frame(payload_len: usize, fill: u8) -> Vec<u8> {
        let frame_length = ADTS_HEADER_SIZE + payload_len;
        let mut frame = vec![
            0xFF,
            0xF1,                                           // MPEG-4, layer 0, 无 CRC
            (1 << 6) | (4 << 2),                            // LC, 44100Hz, private=0, ch 高位=0
            (2 << 6) | ((frame_length >> 11) as u8 & 0x03), // ch=2
            (frame_length >> 3) as u8,
            ((frame_length as u8 & 0x07) << 5) | 0x1F, // fullness 高 5 位
            0xFC,                                      // fullness 低 6 位, 1 个数据块
        ];
        frame.resize(frame_length, fill);
        frame
    }

    #[test]
    fn test_parse_lc_stereo() {
        let frame = build_adts_frame(100, 0x21);
        let hdr = parse_adts_header(&frame).unwrap();
        assert!(!hdr.mpeg2);
        assert_eq!(hdr.profile, 1);
        assert_eq!(hdr.sample_rate, 44100);
        assert_eq!(hdr.channels, 2);
        assert_eq!(hdr.frame_length, 107);
        assert_eq!(hdr.header_size(), 7);
        assert_eq!(hdr.raw_data_blocks, 0);
        assert_eq!(hdr.samples(), 1024);
    }

    #[test]
    fn test_reject_bad_sync() {
        let mut frame = build_adts_frame(10, 0);
        frame[1] = 0xE1;
        let err = parse_adts_header(&frame).unwrap_err();
        assert!(matches!(err, TaoError::MalformedHeader(_)));
    }

    #[test]
    fn test_reject_reserved_sample_rate() {
        let mut frame = build_adts_frame(10, 0);
        frame[2] = (1 << 6) | (13 << 2);
        assert!(parse_adts_header(&frame).is_err());
    }

    #[test]
    fn test_reject_short_frame_length() {
        let mut frame = build_adts_frame(10, 0);
        // frame_length = 6
        frame[3] &= 0xFC;
        frame[4] = 0;
        frame[5] = (6 << 5) | 0x1F;
        let err = parse_adts_header(&frame).unwrap_err();
        assert!(format!("{err}").contains("帧长度小于头部"));
    }

    #[test]
    fn test_reject_short_window() {
        assert!(parse_adts_header(&[0xFF, 0xF1, 0x50]).is_err());
    }
}
