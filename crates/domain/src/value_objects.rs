use serde::{Deserialize, Serialize};
use std::fmt;

/// 客户端版本号
///
/// 只比较前两段 `major.minor`，其余部分忽略。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientVersion {
    pub raw: String,
    pub major: u32,
    pub minor: u32,
}

impl ClientVersion {
    /// 支持的最低客户端版本
    pub const MIN_SUPPORTED: (u32, u32) = (1, 4);

    /// 少于两段或前两段不是数字时返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next()?.trim().parse().ok()?;
        Some(Self {
            raw: raw.to_string(),
            major,
            minor,
        })
    }

    pub fn is_supported(&self) -> bool {
        let (min_major, min_minor) = Self::MIN_SUPPORTED;
        self.major > min_major || (self.major == min_major && self.minor >= min_minor)
    }

    /// 解析并判断是否支持，无法解析视为不支持
    pub fn check(raw: &str) -> bool {
        Self::parse(raw).is_some_and(|version| version.is_supported())
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 查询参数的布尔解析：1/true/t/yes/y/on（不区分大小写）为真，其余为假
pub fn parse_truthy(value: Option<&str>) -> bool {
    match value {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y" | "on"
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_gate() {
        assert!(!ClientVersion::check("1.3"));
        assert!(ClientVersion::check("1.4"));
        assert!(ClientVersion::check("1.10"));
        assert!(ClientVersion::check("2.0"));
        assert!(ClientVersion::check("1.4.2-beta"));
        assert!(!ClientVersion::check("0.9"));
    }

    #[test]
    fn test_version_rejects_malformed() {
        assert!(!ClientVersion::check("abc"));
        assert!(!ClientVersion::check("2"));
        assert!(!ClientVersion::check(""));
        assert!(!ClientVersion::check("1.x"));
        assert!(ClientVersion::parse("3.1").is_some_and(|v| v.major == 3 && v.minor == 1));
    }

    #[test]
    fn test_parse_truthy() {
        for value in ["1", "true", "True", "T", "yes", "Y", "on", " ON "] {
            assert!(parse_truthy(Some(value)), "{value} should be truthy");
        }
        for value in ["", "0", "false", "no", "off", "2"] {
            assert!(!parse_truthy(Some(value)), "{value} should be falsy");
        }
        assert!(!parse_truthy(None));
    }
}
