//! 防竞争字节 (emulation prevention) 移除.
//!
//! NAL 中凡出现 `00 00 03`, 其中的 `03` 都是编码器插入的转义字节.
//! 移除后得到 RBSP, 同时记录每个被移除字节在原始 NAL 中的偏移,
//! 以便把 RBSP 中的位置映射回转义缓冲区.

use tao_core::{TaoError, TaoResult};

/// 去转义后的 NAL 数据
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rbsp {
    data: Vec<u8>,
    /// 被移除的 `03` 在原始 NAL 中的偏移, 升序
    skipped: Vec<usize>,
}

impl Rbsp {
    /// 移除 `nal` 中的全部防竞争字节, 总是生成独立副本
    pub fn unescape(nal: &[u8]) -> TaoResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(nal.len())
            .map_err(|err| TaoError::OutOfMemory(format!("RBSP 缓冲区分配失败: {err}")))?;
        let mut skipped = Vec::new();

        let mut i = 0;
        while i < nal.len() {
            if i + 2 < nal.len() && nal[i] == 0x00 && nal[i + 1] == 0x00 && nal[i + 2] == 0x03 {
                data.extend_from_slice(&[0x00, 0x00]);
                skipped.push(i + 2);
                i += 3;
            } else {
                data.push(nal[i]);
                i += 1;
            }
        }

        Ok(Self { data, skipped })
    }

    /// 去转义后的字节
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 被移除字节的原始偏移
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// 去转义后的长度
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 把 RBSP 中的字节位置映射回原始 NAL 中的偏移
    ///
    /// 第 k 个被移除字节 (原始偏移 o_k) 之后的 RBSP 位置都要补回 k+1 个字节,
    /// 即结果为 `pos + #{k : o_k - k <= pos}`.
    pub fn escaped_offset(&self, pos: usize) -> usize {
        let shift = self
            .skipped
            .iter()
            .enumerate()
            .take_while(|&(k, &o)| o - k <= pos)
            .count();
        pos + shift
    }

    /// 取出去转义后的字节
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for Rbsp {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_without_escapes() {
        let nal = [0x67, 0x42, 0x00, 0x1E, 0x00, 0x00, 0x01];
        let rbsp = Rbsp::unescape(&nal).unwrap();
        assert_eq!(rbsp.data(), &nal);
        assert!(rbsp.skipped().is_empty());
        assert_ne!(rbsp.data().as_ptr(), nal.as_ptr());
    }

    #[test]
    fn test_remove_escapes_and_record_offsets() {
        let nal = [
            0x65, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03,
        ];
        let rbsp = Rbsp::unescape(&nal).unwrap();
        assert_eq!(rbsp.data(), &[0x65, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(rbsp.skipped(), &[3, 7, 10]);
        assert_eq!(rbsp.len(), nal.len() - 3);
    }

    #[test]
    fn test_escape_at_tail_is_removed() {
        let rbsp = Rbsp::unescape(&[0x41, 0x00, 0x00, 0x03]).unwrap();
        assert_eq!(rbsp.data(), &[0x41, 0x00, 0x00]);
        assert_eq!(rbsp.skipped(), &[3]);
    }

    #[test]
    fn test_escaped_offset_mapping() {
        let nal = [
            0x65, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03,
        ];
        let rbsp = Rbsp::unescape(&nal).unwrap();
        // 每个 RBSP 字节都应映射到原始 NAL 中相同值的字节
        for (pos, &b) in rbsp.data().iter().enumerate() {
            let orig = rbsp.escaped_offset(pos);
            assert_eq!(nal[orig], b, "pos={pos}");
            assert!(!rbsp.skipped().contains(&orig));
        }
        assert_eq!(rbsp.escaped_offset(0), 0);
        assert_eq!(rbsp.escaped_offset(3), 4);
        assert_eq!(rbsp.escaped_offset(6), 8);
    }
}
