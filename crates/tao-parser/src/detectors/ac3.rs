//! AC-3 / E-AC-3 同步帧头检测.
//!
//! 两者共用同步字 `0x0B77`, 由第 29 位起的 5 位 `bsid` 区分:
//! `bsid <= 10` 为 AC-3, `11..=16` 为 E-AC-3, 更大值保留.
//!
//! ```text
//! AC-3:   syncword(16) crc1(16) fscod(2) frmsizecod(6) bsid(5) bsmod(3) acmod(3) ...
//! E-AC-3: syncword(16) strmtyp(2) substreamid(3) frmsiz(11) fscod(2) fscod2/numblkscod(2)
//!         acmod(3) lfeon(1) bsid(5) ...
//! ```

use tao_core::{BitReader, TaoError, TaoResult};

/// AC-3 检测窗口大小
pub const AC3_HEADER_SIZE: usize = 7;

/// 采样率表 (fscod 0..=2)
const AC3_SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];

/// 码率表 (kbit/s), 以 frmsizecod >> 1 索引
const AC3_BIT_RATES: [u32; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

/// acmod 对应的全带宽声道数
const AC3_CHANNELS: [u8; 8] = [2, 1, 2, 3, 3, 4, 4, 5];

/// 帧大小表 (16 位字), 行: frmsizecod, 列: fscod
const AC3_FRAME_SIZES: [[u16; 3]; 38] = [
    [64, 69, 96],
    [64, 70, 96],
    [80, 87, 120],
    [80, 88, 120],
    [96, 104, 144],
    [96, 105, 144],
    [112, 121, 168],
    [112, 122, 168],
    [128, 139, 192],
    [128, 140, 192],
    [160, 174, 240],
    [160, 175, 240],
    [192, 208, 288],
    [192, 209, 288],
    [224, 243, 336],
    [224, 244, 336],
    [256, 278, 384],
    [256, 279, 384],
    [320, 348, 480],
    [320, 349, 480],
    [384, 417, 576],
    [384, 418, 576],
    [448, 487, 672],
    [448, 488, 672],
    [512, 557, 768],
    [512, 558, 768],
    [640, 696, 960],
    [640, 697, 960],
    [768, 835, 1152],
    [768, 836, 1152],
    [896, 975, 1344],
    [896, 976, 1344],
    [1024, 1114, 1536],
    [1024, 1115, 1536],
    [1152, 1253, 1728],
    [1152, 1254, 1728],
    [1280, 1393, 1920],
    [1280, 1394, 1920],
];

/// E-AC-3 每帧音频块数 (numblkscod)
const EAC3_BLOCKS: [u16; 4] = [1, 2, 3, 6];

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ac3FrameType {
    /// E-AC-3 独立子流
    Independent,
    /// E-AC-3 依赖子流, 需要附着在前一个独立帧之后
    Dependent,
    /// 普通 AC-3 帧 (E-AC-3 语义下的 "AC-3 转换" 类型)
    Ac3Convert,
}

/// AC-3 / E-AC-3 帧头部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ac3Header {
    /// 比特流标识
    pub bsid: u8,
    /// 帧类型
    pub frame_type: Ac3FrameType,
    /// 子流编号 (仅 E-AC-3)
    pub substream_id: u8,
    /// 帧大小 (字节, 含同步字)
    pub frame_size: usize,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 码率 (bit/s)
    pub bit_rate: u32,
    /// 声道模式 (acmod)
    pub channel_mode: u8,
    /// 是否含 LFE 声道
    pub lfe_on: bool,
    /// 声道总数 (含 LFE)
    pub channels: u8,
    /// 每帧采样数
    pub samples: u32,
}

/// 从至少 7 字节的窗口解析 AC-3 / E-AC-3 头部
pub fn parse_ac3_header(data: &[u8]) -> TaoResult<Ac3Header> {
    if data.len() < AC3_HEADER_SIZE {
        return Err(TaoError::MalformedHeader(format!(
            "AC-3: 头部不足 {} 字节, len={}",
            AC3_HEADER_SIZE,
            data.len()
        )));
    }

    let mut br = BitReader::new(&data[..AC3_HEADER_SIZE]);
    let sync = br.read_bits(16)?;
    if sync != 0x0B77 {
        return Err(TaoError::MalformedHeader(format!(
            "AC-3: 同步字不匹配, sync=0x{:04X}",
            sync
        )));
    }

    // bsid 位于同步字之后第 24 位处 (29 位窥视取低 5 位)
    let bsid = (br.peek_bits(29)? & 0x1F) as u8;
    if bsid > 16 {
        return Err(TaoError::MalformedHeader(format!(
            "AC-3: bsid 超出范围, bsid={}",
            bsid
        )));
    }

    if bsid <= 10 {
        parse_ac3_core(&mut br, bsid)
    } else {
        parse_eac3(&mut br, bsid)
    }
}

fn parse_ac3_core(br: &mut BitReader<'_>, bsid: u8) -> TaoResult<Ac3Header> {
    br.skip_bits(16)?; // crc1
    let sr_code = br.read_bits(2)? as usize;
    if sr_code == 3 {
        return Err(TaoError::MalformedHeader("AC-3: fscod 保留值 3".into()));
    }
    let frame_size_code = br.read_bits(6)? as usize;
    if frame_size_code > 37 {
        return Err(TaoError::MalformedHeader(format!(
            "AC-3: frmsizecod 超出范围, frmsizecod={}",
            frame_size_code
        )));
    }
    br.skip_bits(5)?; // bsid
    br.skip_bits(3)?; // bsmod
    let channel_mode = br.read_bits(3)? as u8;
    if channel_mode & 1 != 0 && channel_mode != 1 {
        br.skip_bits(2)?; // cmixlev
    }
    if channel_mode & 4 != 0 {
        br.skip_bits(2)?; // surmixlev
    }
    if channel_mode == 2 {
        br.skip_bits(2)?; // dsurmod
    }
    let lfe_on = br.read_flag()?;

    // bsid 9/10 为半速率/四分之一速率
    let sr_shift = u32::from(bsid.max(8) - 8);
    let frame_size = usize::from(AC3_FRAME_SIZES[frame_size_code][sr_code]) * 2;

    Ok(Ac3Header {
        bsid,
        frame_type: Ac3FrameType::Ac3Convert,
        substream_id: 0,
        frame_size,
        sample_rate: AC3_SAMPLE_RATES[sr_code] >> sr_shift,
        bit_rate: (AC3_BIT_RATES[frame_size_code >> 1] * 1000) >> sr_shift,
        channel_mode,
        lfe_on,
        channels: AC3_CHANNELS[channel_mode as usize] + u8::from(lfe_on),
        samples: 1536,
    })
}

fn parse_eac3(br: &mut BitReader<'_>, bsid: u8) -> TaoResult<Ac3Header> {
    let frame_type = match br.read_bits(2)? {
        0 => Ac3FrameType::Independent,
        1 => Ac3FrameType::Dependent,
        2 => Ac3FrameType::Ac3Convert,
        _ => {
            return Err(TaoError::MalformedHeader(
                "E-AC-3: strmtyp 保留值 3".into(),
            ));
        }
    };
    let substream_id = br.read_bits(3)? as u8;
    let frame_size = ((br.read_bits(11)? as usize) + 1) << 1;
    if frame_size < AC3_HEADER_SIZE {
        return Err(TaoError::MalformedHeader(format!(
            "E-AC-3: 帧大小小于头部, frame_size={}",
            frame_size
        )));
    }

    let sr_code = br.read_bits(2)? as usize;
    let (sample_rate, blocks) = if sr_code == 3 {
        let sr_code2 = br.read_bits(2)? as usize;
        if sr_code2 == 3 {
            return Err(TaoError::MalformedHeader("E-AC-3: fscod2 保留值 3".into()));
        }
        (AC3_SAMPLE_RATES[sr_code2] / 2, 6u16)
    } else {
        let blocks = EAC3_BLOCKS[br.read_bits(2)? as usize];
        (AC3_SAMPLE_RATES[sr_code], blocks)
    };
    let channel_mode = br.read_bits(3)? as u8;
    let lfe_on = br.read_flag()?;

    let samples = u32::from(blocks) * 256;
    let bit_rate = (frame_size as u64 * 8 * u64::from(sample_rate) / u64::from(samples)) as u32;

    Ok(Ac3Header {
        bsid,
        frame_type,
        substream_id,
        frame_size,
        sample_rate,
        bit_rate,
        channel_mode,
        lfe_on,
        channels: AC3_CHANNELS[channel_mode as usize] + u8::from(lfe_on),
        samples,
    })
}
