//! 编译/匹配引擎适配层
//! 核心职责：
//! 1. 将源码交给 yara-x 编译，并按编译选项处理警告
//! 2. 用编译规则扫描文件，对每条候选规则（无论是否命中）回调一次
//! 3. 将引擎自身的错误类型转换为 YaraForgeError

use std::path::Path;

use tracing::{debug, warn};
use yara_x::MetaValue;
use yaraforge_core::{escape_literal, MatchRecord, OrderedMap, PatternSet};

use super::compiled::CompiledRules;
use crate::config::{CompileOptions, ExternalValue};
use crate::error::{YaraForgeError, YfResult};

/// 回调返回值：继续处理下一条规则 / 中止
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMsg {
    Continue,
    Abort,
}

/// 规则编译/匹配引擎
pub trait RuleEngine {
    /// 编译源码
    fn compile(&self, source: &str, options: &CompileOptions) -> YfResult<CompiledRules>;

    /// 扫描文件，每条候选规则调用一次 callback，返回命中的规则记录
    /// 记录中的 condition 为空，由调用方补回
    fn scan_file(
        &self,
        rules: &CompiledRules,
        target: &Path,
        callback: &mut dyn FnMut(&MatchRecord) -> CallbackMsg,
    ) -> YfResult<Vec<MatchRecord>>;
}

/// yara-x 引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct YaraXEngine;

impl YaraXEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RuleEngine for YaraXEngine {
    fn compile(&self, source: &str, options: &CompileOptions) -> YfResult<CompiledRules> {
        let mut compiler = yara_x::Compiler::new();
        compiler.relaxed_re_syntax(options.relaxed_re_syntax);
        compiler.error_on_slow_pattern(options.error_on_slow_pattern);

        if let Some(namespace) = options.namespace.as_deref() {
            compiler.new_namespace(namespace);
        }

        // 外部变量需在添加源码前定义
        for (ident, value) in &options.externals {
            let defined = match value {
                ExternalValue::Bool(v) => compiler.define_global(ident, *v),
                ExternalValue::Integer(v) => compiler.define_global(ident, *v),
                ExternalValue::Float(v) => compiler.define_global(ident, *v),
                ExternalValue::Str(v) => compiler.define_global(ident, v.as_str()),
            };
            if let Err(e) = defined {
                return Err(YaraForgeError::compile(
                    format!("external variable `{}` rejected: {}", ident, e),
                    source,
                ));
            }
        }

        if let Err(e) = compiler.add_source(source) {
            return Err(YaraForgeError::compile(e.to_string(), source));
        }

        let warnings: Vec<String> = compiler.warnings().iter().map(|w| w.to_string()).collect();
        if !warnings.is_empty() {
            if options.error_on_warning {
                return Err(YaraForgeError::compile(warnings.join("\n"), source));
            }
            for warning in &warnings {
                warn!("Compiler warning: {}", warning);
            }
        }

        debug!("Source compiled, {} warning(s)", warnings.len());
        Ok(CompiledRules::new(compiler.build()))
    }

    fn scan_file(
        &self,
        rules: &CompiledRules,
        target: &Path,
        callback: &mut dyn FnMut(&MatchRecord) -> CallbackMsg,
    ) -> YfResult<Vec<MatchRecord>> {
        let mut scanner = yara_x::Scanner::new(rules.as_rules());
        let results = scanner
            .scan_file(target)
            .map_err(|e| YaraForgeError::Scan(format!("{}: {}", target.display(), e)))?;

        let candidates = results
            .matching_rules()
            .map(|rule| (rule, true))
            .chain(results.non_matching_rules().map(|rule| (rule, false)));

        let mut matched = Vec::new();
        for (rule, is_match) in candidates {
            let record = MatchRecord {
                rule: rule.identifier().to_string(),
                namespace: rule.namespace().to_string(),
                tags: rule.tags().map(|tag| tag.identifier().to_string()).collect(),
                meta: rule
                    .metadata()
                    .map(|(key, value)| (key, meta_value_text(value)))
                    .collect::<OrderedMap<String>>(),
                strings: rule
                    .patterns()
                    .filter_map(|pattern| {
                        let data = pattern.matches().next().map(|m| escape_literal(m.data()))?;
                        Some((pattern_name(pattern.identifier()), data))
                    })
                    .collect::<PatternSet>(),
                condition: String::new(),
                matches: is_match,
            };

            let msg = callback(&record);
            if is_match {
                matched.push(record);
            }
            if msg == CallbackMsg::Abort {
                debug!("Scan callback aborted after rule `{}`", rule.identifier());
                break;
            }
        }

        Ok(matched)
    }
}

/// 元数据取值统一转为字面量文本
fn meta_value_text(value: MetaValue) -> String {
    match value {
        MetaValue::Integer(v) => v.to_string(),
        MetaValue::Float(v) => v.to_string(),
        MetaValue::Bool(v) => v.to_string(),
        MetaValue::String(v) => escape_literal(v.as_bytes()),
        MetaValue::Bytes(v) => escape_literal(v),
    }
}

/// 变量名统一带 `$` 前缀
fn pattern_name(identifier: &str) -> String {
    if identifier.starts_with('$') {
        identifier.to_string()
    } else {
        format!("${}", identifier)
    }
}
