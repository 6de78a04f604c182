//! 条件引用过滤
//! 规则语法中声明但未在条件里引用的字符串变量属于语法错误，渲染前必须剔除

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::PatternSet;

/// `$` 开头的变量名
static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\w*\b").expect("valid regex"));

/// 提取条件表达式中出现的全部变量名（按出现顺序，可能重复）
pub fn scan_references(condition: &str) -> Vec<&str> {
    VARIABLE_REGEX
        .find_iter(condition)
        .map(|m| m.as_str())
        .collect()
}

/// 仅保留条件表达式中引用到的候选变量
/// 结果按首次引用顺序排列，每个变量最多出现一次
/// 条件引用了未声明变量的情况不在此处检测，交由编译器报错
pub fn referenced_patterns(condition: &str, candidates: &PatternSet) -> PatternSet {
    let mut confirmed = PatternSet::new();
    if candidates.is_empty() {
        return confirmed;
    }

    for assumed in scan_references(condition) {
        if confirmed.contains_key(assumed) {
            continue;
        }
        if let Some(value) = candidates.get(assumed) {
            confirmed.insert(assumed, value.clone());
        }
    }

    log::trace!(
        "referenced patterns: {}/{} kept",
        confirmed.len(),
        candidates.len()
    );
    confirmed
}
