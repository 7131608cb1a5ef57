// ==========================================
// MRP 订单系统 - 序列号表达式解析
// ==========================================
// 语法（逗号或空白分隔的若干组）:
// - N      单个序列号
// - A-B    闭区间 A..=B
// - A+     从 A 开始连续，直到满足数量
// - A+N    从 A 开始连续 N 个
// - ~      下一个可用序列号
// 结果必须恰好包含 expected_quantity 个互不相同的序列号
// ==========================================

use std::collections::HashSet;

use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::quantity::is_integer_qty;

const FIELD: &str = "serial_numbers";

fn err(message: impl Into<String>) -> WorkflowError {
    WorkflowError::field(FIELD, message)
}

fn parse_serial(text: &str, group: &str) -> WorkflowResult<i64> {
    text.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| err(format!("Invalid group: {}", group)))
}

/// 按输入顺序收集序列号, 去重用 HashSet
struct SerialSet {
    ordered: Vec<i64>,
    seen: HashSet<i64>,
}

impl SerialSet {
    fn new() -> Self {
        Self {
            ordered: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn contains(&self, serial: i64) -> bool {
        self.seen.contains(&serial)
    }

    fn push(&mut self, serial: i64) -> WorkflowResult<()> {
        if !self.seen.insert(serial) {
            return Err(err(format!("Duplicate serial: {}", serial)));
        }
        self.ordered.push(serial);
        Ok(())
    }
}

/// 剩余可容纳的序列号个数
fn remaining(serials: &SerialSet, expected: usize) -> usize {
    expected.saturating_sub(serials.len())
}

fn bump(value: i64, group: &str) -> WorkflowResult<i64> {
    value
        .checked_add(1)
        .ok_or_else(|| err(format!("Invalid group: {}", group)))
}

/// 解析序列号表达式
///
/// # 参数
/// - `input`: 用户输入
/// - `expected_quantity`: 期望数量（必须为正整数）
/// - `next_available`: `~` 对应的下一个可用序列号
pub fn extract_serial_numbers(
    input: &str,
    expected_quantity: f64,
    next_available: i64,
) -> WorkflowResult<Vec<i64>> {
    if !is_integer_qty(expected_quantity) || expected_quantity <= 0.0 {
        return Err(err("Invalid quantity provided"));
    }
    let expected = expected_quantity.round() as usize;

    let groups: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect();

    if groups.is_empty() {
        return Err(err("Empty serial number string"));
    }

    let mut serials = SerialSet::new();
    let mut next = next_available;
    // "A+" 组需要在其余组确定后才能计算数量
    let mut open_ended: Vec<i64> = Vec::new();

    // 每组展开前先按剩余数量限长, 防止 "1+200000" 之类的输入展开出巨量序列号
    for group in &groups {
        if *group == "~" {
            while serials.contains(next) {
                next = bump(next, group)?;
            }
            serials.push(next)?;
            next = next.saturating_add(1);
        } else if let Some(start) = group.strip_suffix('+') {
            open_ended.push(parse_serial(start, group)?);
        } else if let Some((start, count)) = group.split_once('+') {
            let start = parse_serial(start, group)?;
            let count = parse_serial(count, group)?;
            if count == 0 || count as u64 > remaining(&serials, expected) as u64 {
                return Err(err(format!("Invalid group: {}", group)));
            }
            let end = start
                .checked_add(count)
                .ok_or_else(|| err(format!("Invalid group: {}", group)))?;
            for s in start..end {
                serials.push(s)?;
            }
        } else if let Some((a, b)) = group.split_once('-') {
            let a = parse_serial(a, group)?;
            let b = parse_serial(b, group)?;
            if a > b || (b - a) as u64 >= remaining(&serials, expected) as u64 {
                return Err(err(format!("Invalid group range: {}", group)));
            }
            for s in a..=b {
                serials.push(s)?;
            }
        } else {
            serials.push(parse_serial(group, group)?)?;
        }
    }

    for start in open_ended {
        let group = format!("{}+", start);
        if serials.len() >= expected {
            return Err(err(format!("Invalid group: {}", group)));
        }
        let mut s = start;
        while serials.len() < expected {
            serials.push(s)?;
            if serials.len() < expected {
                s = bump(s, &group)?;
            }
        }
    }

    if serials.len() != expected {
        return Err(err(format!(
            "Number of unique serial numbers ({}) must match quantity ({})",
            serials.len(),
            expected
        )));
    }

    Ok(serials.ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_list() {
        assert_eq!(extract_serial_numbers("1, 2 3", 3.0, 1).unwrap(), vec![1, 2, 3]);
        assert_eq!(extract_serial_numbers("42", 1.0, 1).unwrap(), vec![42]);
    }

    #[test]
    fn test_range_and_plus() {
        assert_eq!(extract_serial_numbers("10-13", 4.0, 1).unwrap(), vec![10, 11, 12, 13]);
        assert_eq!(extract_serial_numbers("5+3", 3.0, 1).unwrap(), vec![5, 6, 7]);
        assert_eq!(extract_serial_numbers("1, 20+", 4.0, 1).unwrap(), vec![1, 20, 21, 22]);
    }

    #[test]
    fn test_next_available() {
        assert_eq!(extract_serial_numbers("~, ~", 2.0, 100).unwrap(), vec![100, 101]);
        assert_eq!(extract_serial_numbers("100 ~", 2.0, 100).unwrap(), vec![100, 101]);
    }

    #[test]
    fn test_errors() {
        // 数量不匹配
        assert!(extract_serial_numbers("1,2", 3.0, 1).is_err());
        // 重复
        match extract_serial_numbers("1,1", 2.0, 1) {
            Err(WorkflowError::Field { field, message }) => {
                assert_eq!(field, "serial_numbers");
                assert_eq!(message, "Duplicate serial: 1");
            }
            other => panic!("unexpected: {:?}", other),
        }
        // 非法组
        assert!(extract_serial_numbers("abc", 1.0, 1).is_err());
        assert!(extract_serial_numbers("5-3", 3.0, 1).is_err());
        // 空输入
        assert!(extract_serial_numbers("  ", 1.0, 1).is_err());
        // 非整数数量
        assert!(extract_serial_numbers("1", 1.5, 1).is_err());
        assert!(extract_serial_numbers("1", 0.0, 1).is_err());
    }

    fn field_message(result: WorkflowResult<Vec<i64>>) -> String {
        match result {
            Err(WorkflowError::Field { field, message }) => {
                assert_eq!(field, "serial_numbers");
                message
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plus_group_near_i64_max_is_rejected() {
        let input = format!("{}+2", i64::MAX);
        assert_eq!(
            field_message(extract_serial_numbers(&input, 2.0, 1)),
            format!("Invalid group: {}", input)
        );
        let input = format!("{}+", i64::MAX);
        assert!(extract_serial_numbers(&format!("{}, 1", input), 3.0, 1).is_err());
    }

    #[test]
    fn test_groups_are_bounded_by_quantity() {
        // 单个输入错误不应展开出大量序列号
        assert_eq!(
            field_message(extract_serial_numbers("1+200000", 1.0, 1)),
            "Invalid group: 1+200000"
        );
        assert_eq!(
            field_message(extract_serial_numbers("1-200000", 1.0, 1)),
            "Invalid group range: 1-200000"
        );
        // 前面的组已占用名额后, 后续组按剩余数量限长
        assert_eq!(
            field_message(extract_serial_numbers("1, 2, 10+2", 3.0, 1)),
            "Invalid group: 10+2"
        );
        assert_eq!(
            field_message(extract_serial_numbers("1, 10-11", 2.0, 1)),
            "Invalid group range: 10-11"
        );
        assert_eq!(extract_serial_numbers("1, 10+2", 3.0, 1).unwrap(), vec![1, 10, 11]);
        assert_eq!(extract_serial_numbers("1, 10-11", 3.0, 1).unwrap(), vec![1, 10, 11]);
    }
}
