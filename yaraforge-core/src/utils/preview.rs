use std::fmt::{self, Write};

// ======================== 日志预览 ========================
/// 规则源码单行预览（用于日志）
/// 1. 换行与缩进折叠为单个空格，多行规则压成一行
/// 2. 超过最大字符数时截断并追加省略号
/// 3. 仅包装引用，格式化时才遍历
#[inline(always)]
pub fn preview_compact<'a>(s: &'a str, max_chars: usize) -> impl fmt::Display + 'a {
    struct OneLine<'a> {
        text: &'a str,
        limit: usize,
    }

    impl fmt::Display for OneLine<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut written = 0;
            let mut pending_space = false;

            for ch in self.text.trim().chars() {
                if ch.is_whitespace() {
                    pending_space = true;
                    continue;
                }
                if written >= self.limit {
                    return f.write_str("…");
                }
                if pending_space {
                    f.write_char(' ')?;
                    written += 1;
                    pending_space = false;
                    if written >= self.limit {
                        return f.write_str("…");
                    }
                }
                f.write_char(ch)?;
                written += 1;
            }
            Ok(())
        }
    }

    OneLine {
        text: s,
        limit: max_chars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_collapses_to_one_line() {
        let src = "rule r\n{\n    condition:\n        true\n}";
        assert_eq!(preview_compact(src, 100).to_string(), "rule r { condition: true }");
    }

    #[test]
    fn test_truncates_with_ellipsis() {
        assert_eq!(preview_compact("rule abcdef", 6).to_string(), "rule a…");
        assert_eq!(preview_compact("rule", 4).to_string(), "rule");
    }
}
