//! 同步状态累加器.
//!
//! 单单元格式 (ADTS / AC-3) 在逐字节扫描同步头时, 需要一个跨调用保留的
//! 移位寄存器: 同步头可能跨越两次调用的边界, 前半部分已在上一次调用中折入寄存器.

/// 64 位移位寄存器
///
/// 每次 [`fold`](Self::fold) 将寄存器左移 8 位并在最低字节放入新字节,
/// 超出 64 位的高位被丢弃. 寄存器按大端视图提供最近 8 个字节的窗口.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftRegister(u64);

impl ShiftRegister {
    /// 寄存器宽度 (字节)
    pub const WIDTH: usize = 8;

    /// 折入一个字节: `state = (state << 8) | byte`
    pub fn fold(&mut self, byte: u8) {
        self.0 = (self.0 << 8) | u64::from(byte);
    }

    /// 清空寄存器
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// 寄存器原始值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 最近折入的 8 个字节, 最早的字节在前
    pub fn window(&self) -> [u8; Self::WIDTH] {
        self.0.to_be_bytes()
    }
}

/// 单个逻辑流的同步状态
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    /// 滚动移位寄存器
    pub register: ShiftRegister,
    /// 下一次扫描同步头之前仍欠的字节数
    pub remaining_size: usize,
    /// 当前帧结束后是否必须重新匹配同步头才能输出
    pub need_next_header: bool,
}

impl SyncState {
    /// 创建初始状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 按已送入但未形成单元的字节数递减欠账
    pub fn consume(&mut self, len: usize) {
        self.remaining_size -= self.remaining_size.min(len);
    }

    /// 折入一个字节后, 返回最近 `n` 个字节 (n <= 8)
    pub fn fold_and_window(&mut self, byte: u8, n: usize) -> [u8; ShiftRegister::WIDTH] {
        self.register.fold(byte);
        let mut out = [0u8; ShiftRegister::WIDTH];
        let window = self.register.window();
        let n = n.min(ShiftRegister::WIDTH);
        out[..n].copy_from_slice(&window[ShiftRegister::WIDTH - n..]);
        out
    }
}
