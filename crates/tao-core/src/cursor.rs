//! 字节游标.
//!
//! 在调用方持有的缓冲区上做带边界检查的顺序读取, 不拥有数据,
//! 生命周期限定在一次解析调用之内.

use byteorder::ByteOrder;

use crate::fourcc::FourCc;
use crate::{TaoError, TaoResult};

/// 带边界检查的字节游标
///
/// # 示例
/// ```
/// use byteorder::BigEndian;
/// use tao_core::cursor::ByteCursor;
///
/// let data = [0x00, 0x00, 0x00, 0x10, b'p', b'a', b'c', b'k'];
/// let mut cur = ByteCursor::new(&data);
/// assert_eq!(cur.read_u32::<BigEndian>().unwrap(), 16);
/// assert_eq!(cur.read_fourcc().unwrap().as_bytes(), b"pack");
/// assert_eq!(cur.remaining(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// 创建游标, 初始位置为 0
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 当前绝对位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余可读字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// 是否已读完
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// 底层缓冲区
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// 从当前位置开始的剩余数据
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// 定位到绝对位置 (允许等于缓冲区长度)
    pub fn seek(&mut self, pos: usize) -> TaoResult<()> {
        if pos > self.data.len() {
            return Err(TaoError::Eof);
        }
        self.pos = pos;
        Ok(())
    }

    /// 相对当前位置前进 n 字节
    pub fn skip(&mut self, n: usize) -> TaoResult<()> {
        self.take(n).map(|_| ())
    }

    /// 读取 n 字节切片 (零拷贝)
    pub fn read_bytes(&mut self, n: usize) -> TaoResult<&'a [u8]> {
        self.take(n)
    }

    /// 读取 1 字节
    pub fn read_u8(&mut self) -> TaoResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// 读取 16 位整数
    pub fn read_u16<B: ByteOrder>(&mut self) -> TaoResult<u16> {
        self.take(2).map(B::read_u16)
    }

    /// 读取 24 位整数
    pub fn read_u24<B: ByteOrder>(&mut self) -> TaoResult<u32> {
        self.take(3).map(B::read_u24)
    }

    /// 读取 32 位整数
    pub fn read_u32<B: ByteOrder>(&mut self) -> TaoResult<u32> {
        self.take(4).map(B::read_u32)
    }

    /// 读取 64 位整数
    pub fn read_u64<B: ByteOrder>(&mut self) -> TaoResult<u64> {
        self.take(8).map(B::read_u64)
    }

    /// 读取大端 N 字节无符号整数 (N 为 1..=4), 用于长度前缀字段
    pub fn read_uint_be(&mut self, n: usize) -> TaoResult<u32> {
        if !(1..=4).contains(&n) {
            return Err(TaoError::InvalidArgument(format!(
                "read_uint_be: n={} 超出 1..=4",
                n
            )));
        }
        Ok(self
            .take(n)?
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// 读取 4 字节标签
    pub fn read_fourcc(&mut self) -> TaoResult<FourCc> {
        let bytes = self.take(4)?;
        Ok(FourCc::new([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// 窥视当前位置的 4 字节标签 (不移动位置)
    pub fn peek_fourcc(&self) -> TaoResult<FourCc> {
        self.clone().read_fourcc()
    }

    fn take(&mut self, n: usize) -> TaoResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(TaoError::Eof)?;
        if end > self.data.len() {
            return Err(TaoError::Eof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn test_typed_reads_both_endians() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cur = ByteCursor::new(&data);
        assert_eq!(cur.read_u16::<BigEndian>().unwrap(), 0x0102);
        assert_eq!(cur.read_u16::<LittleEndian>().unwrap(), 0x0403);
        assert_eq!(cur.read_u24::<BigEndian>().unwrap(), 0x050607);
        assert!(cur.is_empty());
    }

    #[test]
    fn test_read_past_end_keeps_position() {
        let data = [0xAA, 0xBB];
        let mut cur = ByteCursor::new(&data);
        cur.skip(1).unwrap();
        assert!(matches!(cur.read_u32::<BigEndian>(), Err(TaoError::Eof)));
        assert_eq!(cur.position(), 1);
        assert_eq!(cur.remaining(), 1);
    }

    #[test]
    fn test_read_uint_be_widths() {
        let data = [0x00, 0x00, 0x01, 0x02, 0x03];
        let mut cur = ByteCursor::new(&data);
        assert_eq!(cur.read_uint_be(3).unwrap(), 1);
        assert_eq!(cur.read_uint_be(2).unwrap(), 0x0203);
        assert!(cur.read_uint_be(0).is_err());
        assert!(cur.read_uint_be(5).is_err());
    }

    #[test]
    fn test_seek_and_rest() {
        let data = b"sinfsdat";
        let mut cur = ByteCursor::new(data);
        cur.seek(4).unwrap();
        assert_eq!(cur.peek_fourcc().unwrap().as_bytes(), b"sdat");
        assert_eq!(cur.rest(), b"sdat");
        assert!(cur.seek(9).is_err());
    }
}
