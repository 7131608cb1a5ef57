// ==========================================
// MRP 订单系统 - 订单编号规则
// ==========================================
// 格式: PREFIX{ref:0Nd}SUFFIX 或 PREFIX{ref}SUFFIX
// 例: "PO-{ref:04d}" → PO-0001, PO-0002, ...
// ==========================================

use crate::engine::error::{WorkflowError, WorkflowResult};

/// reference_int 上限（与 32 位有符号整数对齐）
pub const REFERENCE_INT_MAX: i64 = 0x7fff_ffff;

const PLACEHOLDER: &str = "{ref";

/// 解析后的编号模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePattern {
    pub prefix: String,
    pub width: usize, // 最小位数（前导零填充）
    pub suffix: String,
}

impl ReferencePattern {
    pub fn parse(pattern: &str) -> WorkflowResult<Self> {
        let pattern = pattern.trim();
        if pattern.matches(PLACEHOLDER).count() != 1 {
            return Err(WorkflowError::field(
                "pattern",
                format!("Reference pattern must contain exactly one {{ref}} placeholder: '{}'", pattern),
            ));
        }

        let start = pattern.find(PLACEHOLDER).unwrap_or(0);
        let rest = &pattern[start + PLACEHOLDER.len()..];
        let close = rest.find('}').ok_or_else(|| {
            WorkflowError::field("pattern", format!("Unclosed {{ref}} placeholder: '{}'", pattern))
        })?;

        let spec = &rest[..close];
        let width = parse_width(spec).ok_or_else(|| {
            WorkflowError::field(
                "pattern",
                format!("Invalid format specifier '{}' in reference pattern", spec),
            )
        })?;

        let prefix = pattern[..start].to_string();
        let suffix = rest[close + 1..].to_string();
        if prefix.contains(['{', '}']) || suffix.contains(['{', '}']) {
            return Err(WorkflowError::field(
                "pattern",
                format!("Unknown placeholder in reference pattern: '{}'", pattern),
            ));
        }

        Ok(Self {
            prefix,
            width,
            suffix,
        })
    }

    pub fn format(&self, n: i64) -> String {
        format!("{}{:0width$}{}", self.prefix, n, self.suffix, width = self.width)
    }

    /// 提取编号整数部分；不匹配模式时返回 None
    pub fn extract_int(&self, reference: &str) -> Option<i64> {
        let middle = reference
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if middle.is_empty() || !middle.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(parse_saturating(middle))
    }

    pub fn matches(&self, reference: &str) -> bool {
        self.extract_int(reference).is_some()
    }
}

/// ":04d" → 4, ":d" / "" → 0
fn parse_width(spec: &str) -> Option<usize> {
    if spec.is_empty() {
        return Some(0);
    }
    let body = spec.strip_prefix(':')?.strip_suffix('d')?;
    if body.is_empty() {
        return Some(0);
    }
    let digits = body.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse::<usize>().ok().filter(|w| *w <= 20)
}

fn parse_saturating(digits: &str) -> i64 {
    // 超长数字直接截断到上限
    if digits.trim_start_matches('0').len() > 12 {
        return REFERENCE_INT_MAX;
    }
    digits
        .parse::<i64>()
        .map(|v| v.min(REFERENCE_INT_MAX))
        .unwrap_or(REFERENCE_INT_MAX)
}

/// 校验编号模式
pub fn validate_reference_pattern(pattern: &str) -> WorkflowResult<()> {
    ReferencePattern::parse(pattern).map(|_| ())
}

pub fn format_reference(pattern: &str, n: i64) -> WorkflowResult<String> {
    Ok(ReferencePattern::parse(pattern)?.format(n))
}

pub fn reference_matches(pattern: &str, reference: &str) -> bool {
    ReferencePattern::parse(pattern)
        .map(|p| p.matches(reference))
        .unwrap_or(false)
}

/// 从任意编号中提取第一组数字（无数字时为 0）
pub fn extract_reference_int(reference: &str) -> i64 {
    let digits: String = reference
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        0
    } else {
        parse_saturating(&digits)
    }
}

/// 下一个编号 = max(reference_int) + 1
pub fn next_reference(pattern: &str, max_reference_int: i64) -> WorkflowResult<String> {
    let p = ReferencePattern::parse(pattern)?;
    Ok(p.format(max_reference_int.max(0).saturating_add(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let p = ReferencePattern::parse("PO-{ref:04d}").unwrap();
        assert_eq!(p.prefix, "PO-");
        assert_eq!(p.width, 4);
        assert_eq!(p.format(7), "PO-0007");
        assert_eq!(p.format(12345), "PO-12345");

        assert_eq!(format_reference("{ref}-X", 3).unwrap(), "3-X");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(validate_reference_pattern("PO-").is_err());
        assert!(validate_reference_pattern("{ref}-{ref}").is_err());
        assert!(validate_reference_pattern("PO-{ref:04x}").is_err());
        assert!(validate_reference_pattern("PO-{ref:04d").is_err());
        assert!(validate_reference_pattern("{year}-{ref}").is_err());
    }

    #[test]
    fn test_reference_matches() {
        assert!(reference_matches("SO-{ref:04d}", "SO-0001"));
        assert!(reference_matches("SO-{ref:04d}", "SO-99999"));
        assert!(!reference_matches("SO-{ref:04d}", "PO-0001"));
        assert!(!reference_matches("SO-{ref:04d}", "SO-"));
        assert!(!reference_matches("SO-{ref:04d}", "SO-12a"));
    }

    #[test]
    fn test_extract_reference_int() {
        assert_eq!(extract_reference_int("PO-0042"), 42);
        assert_eq!(extract_reference_int("ABC"), 0);
        assert_eq!(extract_reference_int("X12Y34"), 12);
        assert_eq!(extract_reference_int("99999999999999999999"), REFERENCE_INT_MAX);

        let p = ReferencePattern::parse("B2026-{ref:03d}").unwrap();
        assert_eq!(p.extract_int("B2026-015"), Some(15));
    }

    #[test]
    fn test_next_reference() {
        assert_eq!(next_reference("BO-{ref:04d}", 0).unwrap(), "BO-0001");
        assert_eq!(next_reference("BO-{ref:04d}", 41).unwrap(), "BO-0042");
    }
}
