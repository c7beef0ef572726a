//! 比特流读取器.
//!
//! 从字节缓冲区中按位读取头部字段, 是 ADTS / AC-3 / AV1 等同步头检测的基础设施.
//!
//! 按大端位序读取 (MSB first), 这是多媒体码流中最常用的位序.

use crate::{TaoError, TaoResult};

/// leb128 最多包含的 7 位分组数
pub const LEB128_MAX_GROUPS: usize = 8;

/// 比特流读取器
///
/// # 示例
/// ```
/// use tao_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b01010101);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 读取 1 个位并返回布尔值
    pub fn read_flag(&mut self) -> TaoResult<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(TaoError::Eof);
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos >= 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit != 0)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 按大端位序读取, 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if (n as usize) > self.bits_left() {
            return Err(TaoError::Eof);
        }

        let mut result: u32 = 0;
        let mut remaining = n;

        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let to_read = remaining.min(available);

            let shift = available - to_read;
            let mask = ((1u32 << to_read) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << to_read) | u32::from(bits);

            self.bit_pos += to_read as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= to_read;
        }

        Ok(result)
    }

    /// 窥视 N 个位 (不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> TaoResult<u32> {
        let saved_byte = self.byte_pos;
        let saved_bit = self.bit_pos;
        let result = self.read_bits(n);
        self.byte_pos = saved_byte;
        self.bit_pos = saved_bit;
        result
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: u32) -> TaoResult<()> {
        if (n as usize) > self.bits_left() {
            return Err(TaoError::Eof);
        }

        let total_bits = self.bit_pos as u32 + n;
        self.byte_pos += (total_bits / 8) as usize;
        self.bit_pos = (total_bits % 8) as u8;

        Ok(())
    }

    /// 读取 leb128 变长整数
    ///
    /// 每字节低 7 位为数据 (低位组在前), 最高位为延续标志, 最多 8 组.
    /// 第 8 组之后即使延续标志仍为 1 也停止读取.
    pub fn read_leb128(&mut self) -> TaoResult<u64> {
        let mut value = 0u64;
        for i in 0..LEB128_MAX_GROUPS {
            let byte = self.read_bits(8)?;
            value |= u64::from(byte & 0x7F) << (i * 7);
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }

    /// 获取当前字节位置 (向下取整)
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }
}
