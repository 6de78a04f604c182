//! 规则标识符清洗
//! 标识符遵循C语言词法：字母、数字、下划线，首字符不能为数字，区分大小写，最长128字符

use once_cell::sync::Lazy;
use regex::Regex;

/// 规则标识符最大长度（仅作提示，清洗时不截断）
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// 非单词、非空白字符
static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// 首字符为十进制数字（Unicode Nd，含全角、阿拉伯-印度数字等）
static LEADING_DIGIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d").expect("valid regex"));

/// 将任意字符串清洗为规则标识符
/// 1. 首字符为十进制数字时前置下划线
/// 2. 除单词字符与空白外的字符全部替换为下划线
pub fn sanitize_identifier(raw: &str) -> String {
    let prefixed = if LEADING_DIGIT_REGEX.is_match(raw) {
        format!("_{}", raw)
    } else {
        raw.to_string()
    };

    NON_WORD_REGEX.replace_all(&prefixed, "_").into_owned()
}

/// 是否超出标识符长度上限（按字符计）
pub fn exceeds_identifier_limit(identifier: &str) -> bool {
    identifier.chars().count() > MAX_IDENTIFIER_LEN
}
