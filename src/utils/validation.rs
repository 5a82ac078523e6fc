use regex::Regex;
use std::num::IntErrorKind;
use std::sync::OnceLock;

/// 单页条数的默认值与上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl PageLimits {
    pub fn new(default_size: usize, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            default_size: default_size.clamp(1, max_size),
            max_size,
        }
    }

    /// 缺省或非正数取默认值，超过上限截到上限；从不拒绝
    pub fn clamp(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(size) if size > 0 => (size as u64).min(self.max_size as u64) as usize,
            _ => self.default_size,
        }
    }
}

/// 查询串里的 `size`：溢出按符号饱和，非数字当作缺省，交给 `PageLimits::clamp` 处理
pub fn parse_page_size(raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<i64>() {
        Ok(size) => Some(size),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(20, 50)
    }
}

/// 检索词：去首尾空白，空白串视为没有检索词
pub fn normalize_keyword(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
}

/// 把检索词切成小写词元（Unicode 单词字符，韩文同样适用）
pub fn tokenize(text: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();

    let pattern = WORD.get_or_init(|| Regex::new(r"\w+").expect("static regex"));

    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
