//! 规则源码渲染
//!
//! 输出格式：
//! ```text
//! rule RuleIdentifier: tag1 tag2
//! {
//!     meta:
//!         description = ""
//!
//!     strings:
//!         $artifact1 = ""
//!
//!     condition:
//!         $artifact1
//! }
//! ```
//! meta/strings 区块为空时整块省略；取值原样包裹双引号，不做转义

use std::fmt::Write;

use crate::core::RuleSource;
use crate::reference::referenced_patterns;

const SECTION_INDENT: &str = "    ";
const ENTRY_INDENT: &str = "        ";

/// 将规则描述渲染为源码文本
pub fn render_source(src: &RuleSource) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(3);

    if let Some(meta) = src.meta.as_ref().filter(|m| !m.is_empty()) {
        let mut block = format!("{}meta:", SECTION_INDENT);
        for (key, value) in meta.iter() {
            let _ = write!(block, "\n{}{} = \"{}\"", ENTRY_INDENT, key, value);
        }
        sections.push(block);
    }

    // 仅输出条件中引用到的变量，全部被剔除时不输出空区块
    if let Some(strings) = src.strings.as_ref().filter(|s| !s.is_empty()) {
        let referenced = referenced_patterns(&src.condition, strings);
        if !referenced.is_empty() {
            let mut block = format!("{}strings:", SECTION_INDENT);
            for (name, value) in referenced.iter() {
                let _ = write!(block, "\n{}{} = \"{}\"", ENTRY_INDENT, name, value);
            }
            sections.push(block);
        }
    }

    sections.push(format!(
        "{}condition:\n{}{}",
        SECTION_INDENT, ENTRY_INDENT, src.condition
    ));

    format!("{}\n{{\n{}\n}}", identifier_line(src), sections.join("\n\n"))
}

/// 将原始字节转换为规则字符串字面量文本（不含两侧引号）
/// 可打印ASCII原样输出，`"` 与 `\\` 加反斜杠，其余字节使用 `\xNN`
pub fn escape_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out
}

/// `rule <id>[: tag1 tag2 ...]`
fn identifier_line(src: &RuleSource) -> String {
    match src.tags.as_ref().filter(|t| !t.is_empty()) {
        Some(tags) => format!("rule {}: {}", src.rule, tags.join(" ")),
        None => format!("rule {}", src.rule),
    }
}
