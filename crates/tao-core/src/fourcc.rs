//! 4 字节标签 (fourcc).

/// 4 字节 ASCII 标签, 用于标识 box / chunk 类型及像素格式
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// 从字节数组创建
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// 原始字节
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<&[u8; 4]> for FourCc {
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl std::fmt::Display for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}
