//! 跨调用帧拼接器.
//!
//! 同步扫描确定 "本次调用对当前单元的贡献" 后, 由拼接器把它与之前调用
//! 遗留的字节合并为一段连续数据; 若本次调用未找到单元边界, 则保留全部输入等待后续数据.
//!
//! 边界 `next` 的含义:
//! - `None`: 本次输入中没有边界, 全部追加到遗留缓冲区
//! - `Some(n)`, `n >= 0`: 当前单元 = 遗留字节 + `input[..n]`
//! - `Some(n)`, `n < 0`: 下一单元的头部始于遗留缓冲区末尾 `-n` 字节处,
//!   当前单元 = 遗留缓冲区去掉末尾 `-n` 字节, 这 `-n` 字节保留为下一单元的开头

use log::{debug, warn};
use tao_core::{TaoError, TaoResult};

/// 跨调用帧拼接器
#[derive(Debug)]
pub struct FrameCombiner {
    /// 遗留字节 (以及上一次输出的单元)
    buffer: Vec<u8>,
    /// 上一次输出的单元占用 `buffer` 的前缀长度, 下次调用开始时回收
    emitted: usize,
    /// 遗留缓冲区上限
    max_size: usize,
}

impl FrameCombiner {
    /// 创建拼接器, `max_size` 为遗留缓冲区上限
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            emitted: 0,
            max_size,
        }
    }

    /// 回收上一次输出的单元, 使 `buffer` 只剩遗留字节
    ///
    /// 每次调用开始时执行一次; 输出的单元视图在此之前必然已被调用方释放.
    pub fn reclaim(&mut self) {
        if self.emitted > 0 {
            self.buffer.drain(..self.emitted);
            self.emitted = 0;
        }
    }

    /// 当前遗留字节数 (调用 [`reclaim`](Self::reclaim) 之后有效)
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.emitted
    }

    /// 丢弃全部遗留字节
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.emitted = 0;
    }

    /// 合并本次调用的贡献
    ///
    /// 返回 `Ok(None)` 表示需要更多输入; 输入为空且没有边界时视为流结束,
    /// 把遗留字节整体作为最后一个单元输出.
    /// 分配失败时清空遗留缓冲区并返回 `OutOfMemory`.
    pub fn combine<'a>(
        &'a mut self,
        next: Option<isize>,
        input: &'a [u8],
    ) -> TaoResult<Option<&'a [u8]>> {
        self.reclaim();

        let next = match next {
            Some(n) => n,
            None if input.is_empty() => 0,
            None => {
                self.append(input)?;
                return Ok(None);
            }
        };

        if next > input.len() as isize {
            return Err(TaoError::InvalidArgument(format!(
                "帧边界越界: next={}, input_len={}",
                next,
                input.len()
            )));
        }

        if self.buffer.is_empty() {
            // 没有遗留数据, 直接借用调用方缓冲区
            let end = next.max(0) as usize;
            return Ok(Some(&input[..end]));
        }

        if next >= 0 {
            self.append(&input[..next as usize])?;
            self.emitted = self.buffer.len();
        } else {
            let overread = next.unsigned_abs();
            if overread >= self.buffer.len() {
                return Err(TaoError::InvalidArgument(format!(
                    "帧边界回退超出遗留数据: next={}, pending={}",
                    next,
                    self.buffer.len()
                )));
            }
            self.emitted = self.buffer.len() - overread;
            debug!("下一帧头部始于遗留数据内, 回退 {} 字节", overread);
        }

        Ok(Some(&self.buffer[..self.emitted]))
    }

    fn append(&mut self, data: &[u8]) -> TaoResult<()> {
        let wanted = self.buffer.len().saturating_add(data.len());
        if wanted > self.max_size {
            warn!(
                "遗留缓冲区超过上限, 丢弃 {} 字节: wanted={}, max={}",
                self.buffer.len(),
                wanted,
                self.max_size
            );
            self.reset();
            return Err(TaoError::OutOfMemory(format!(
                "遗留缓冲区需要 {} 字节, 上限 {}",
                wanted, self.max_size
            )));
        }
        if let Err(err) = self.buffer.try_reserve(data.len()) {
            self.reset();
            return Err(TaoError::OutOfMemory(format!("遗留缓冲区扩容失败: {err}")));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_copy_without_carry() {
        let mut comb = FrameCombiner::new(64);
        let input = [1u8, 2, 3, 4];
        let unit = comb.combine(Some(3), &input).unwrap().unwrap();
        assert_eq!(unit, &[1, 2, 3]);
        assert!(std::ptr::eq(unit.as_ptr(), input.as_ptr()), "应直接借用输入");
    }

    #[test]
    fn test_carry_then_boundary() {
        let mut comb = FrameCombiner::new(64);
        assert!(comb.combine(None, &[1, 2]).unwrap().is_none());
        assert_eq!(comb.pending(), 2);
        let unit = comb.combine(Some(2), &[3, 4, 5]).unwrap().unwrap();
        assert_eq!(unit, &[1, 2, 3, 4]);
        comb.reclaim();
        assert_eq!(comb.pending(), 0);
    }

    #[test]
    fn test_negative_boundary_keeps_overread() {
        let mut comb = FrameCombiner::new(64);
        assert!(comb.combine(None, &[1, 2, 3, 4, 5]).unwrap().is_none());
        let unit = comb.combine(Some(-2), &[6, 7]).unwrap().unwrap();
        assert_eq!(unit, &[1, 2, 3]);
        comb.reclaim();
        assert_eq!(comb.pending(), 2, "末尾 2 字节属于下一帧");
        let unit = comb.combine(Some(1), &[6, 7]).unwrap().unwrap();
        assert_eq!(unit, &[4, 5, 6]);
    }

    #[test]
    fn test_flush_on_empty_input() {
        let mut comb = FrameCombiner::new(64);
        assert!(comb.combine(None, &[9, 8]).unwrap().is_none());
        let unit = comb.combine(None, &[]).unwrap().unwrap();
        assert_eq!(unit, &[9, 8]);
    }

    #[test]
    fn test_limit_exceeded_drops_carry() {
        let mut comb = FrameCombiner::new(4);
        assert!(comb.combine(None, &[1, 2, 3]).unwrap().is_none());
        let err = comb.combine(None, &[4, 5]).unwrap_err();
        assert!(matches!(err, TaoError::OutOfMemory(_)));
        assert_eq!(comb.pending(), 0);
        // 恢复后仍可继续使用
        assert!(comb.combine(None, &[1]).unwrap().is_none());
    }

    #[test]
    fn test_reject_boundary_beyond_input() {
        let mut comb = FrameCombiner::new(16);
        assert!(comb.combine(Some(5), &[1, 2]).is_err());
    }
}
