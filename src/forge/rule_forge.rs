//! 规则生成编排
//! 核心职责：
//! 1. 清洗规则名、渲染源码、保存源码
//! 2. 调用引擎编译并保存编译产物
//! 3. 用编译产物回扫自身源码，补回条件表达式后重新渲染
//! 4. 任一步骤失败时记录请求、渲染结果与错误详情后原样返回

use tracing::{debug, error, info, warn};
use yaraforge_core::utils::preview_compact;
use yaraforge_core::{
    exceeds_identifier_limit, render_source, sanitize_identifier, scan_references, MatchRecord,
    RuleRequest, MAX_IDENTIFIER_LEN,
};

use crate::config::{CompileOptions, ForgeConfig};
use crate::engine::{CallbackMsg, CompiledRules, RuleEngine, YaraXEngine};
use crate::error::{YaraForgeError, YfResult};
use crate::store::RuleStore;

/// 日志预览长度
const PREVIEW_CHARS: usize = 160;

/// 编译产物引用：内存对象或按规则名从存储加载
#[derive(Debug, Clone, Copy)]
pub enum CompiledRef<'a> {
    /// 内存中的编译产物，name 用于定位对应源码
    InMemory {
        rules: &'a CompiledRules,
        name: &'a str,
    },
    /// 存储中的编译产物（规则名）
    Stored(&'a str),
}

impl CompiledRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            CompiledRef::InMemory { name, .. } => name,
            CompiledRef::Stored(name) => name,
        }
    }
}

/// 清洗并渲染后的规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRule {
    pub rule_name: String,
    pub source: String,
}

/// 规则生成器
/// 不持有可变状态，可跨线程共享并发调用
#[derive(Debug, Clone)]
pub struct RuleForge<E: RuleEngine = YaraXEngine> {
    store: RuleStore,
    engine: E,
    options: CompileOptions,
}

impl RuleForge<YaraXEngine> {
    /// 使用 yara-x 引擎创建
    pub fn new(config: ForgeConfig) -> Self {
        Self::with_engine(config, YaraXEngine::new())
    }
}

impl Default for RuleForge<YaraXEngine> {
    fn default() -> Self {
        Self::new(ForgeConfig::default())
    }
}

impl<E: RuleEngine> RuleForge<E> {
    /// 使用自定义引擎创建
    pub fn with_engine(config: ForgeConfig, engine: E) -> Self {
        Self {
            store: RuleStore::new(config.store),
            engine,
            options: config.compile,
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn compile_options(&self) -> &CompileOptions {
        &self.options
    }

    /// 清洗规则名并渲染源码（不落盘、不编译）
    pub fn render_request(&self, request: &RuleRequest) -> YfResult<RenderedRule> {
        let rule_name = sanitize_identifier(&request.rule);
        if rule_name.trim().is_empty() {
            error!("Rejected rule request with empty name, incoming request: {:?}", request);
            return Err(YaraForgeError::Validation(format!(
                "rule name {:?} is empty after sanitizing",
                request.rule
            )));
        }
        if exceeds_identifier_limit(&rule_name) {
            warn!(
                "Rule name `{}` exceeds {} characters, the compiler may reject it",
                preview_compact(&rule_name, 40),
                MAX_IDENTIFIER_LEN
            );
        }

        let source = render_source(&request.to_source(&rule_name));
        Ok(RenderedRule { rule_name, source })
    }

    /// 按请求生成规则：渲染 → 保存源码 → 编译 → 保存编译产物 → 回扫还原
    /// 警告处理使用配置中的 error_on_warning
    pub fn compile_from_source(&self, request: &RuleRequest) -> YfResult<String> {
        self.compile_from_source_with(request, self.options.error_on_warning)
    }

    /// 同 compile_from_source，单次调用覆盖 error_on_warning
    /// 编译失败时已保存的源码保留在磁盘上，不回滚
    pub fn compile_from_source_with(
        &self,
        request: &RuleRequest,
        error_on_warning: bool,
    ) -> YfResult<String> {
        let RenderedRule { rule_name, source } = self.render_request(request)?;
        debug!("Rendered source for `{}`:\n{}", rule_name, source);

        let report = |e: YaraForgeError| -> YaraForgeError {
            error!("compile_from_source failed for `{}`: {}", rule_name, e);
            error!("compile_from_source rendered source:\n{}", source);
            error!("compile_from_source incoming request: {:?}", request);
            e
        };

        self.store.save_source(&rule_name, &source).map_err(&report)?;

        let options = CompileOptions {
            error_on_warning,
            ..self.options.clone()
        };
        let compiled = self
            .engine
            .compile(&source, &options)
            .map_err(|e| e.with_compile_context(&rule_name, request))
            .map_err(&report)?;

        self.store.save_compiled(&rule_name, &compiled).map_err(&report)?;

        let recovered = self
            .recover_source(CompiledRef::Stored(&rule_name), &request.condition)
            .map_err(&report)?;

        info!(
            "Rule `{}` compiled and stored: {}",
            rule_name,
            preview_compact(&recovered, PREVIEW_CHARS)
        );
        Ok(recovered)
    }

    /// 从编译产物还原源码
    /// 编译产物不保留条件表达式，需调用方提供
    pub fn recover_source(&self, compiled: CompiledRef<'_>, condition: &str) -> YfResult<String> {
        let record = self.recover_record(compiled, condition)?;
        Ok(render_source(&record.to_source()))
    }

    /// 从编译产物还原匹配记录（已补回 condition）
    /// 每个编译产物只允许包含一条规则
    pub fn recover_record(&self, compiled: CompiledRef<'_>, condition: &str) -> YfResult<MatchRecord> {
        let name = compiled.name();
        let loaded;
        let rules = match compiled {
            CompiledRef::InMemory { rules, .. } => rules,
            CompiledRef::Stored(name) => {
                loaded = self.store.load_compiled(name).map_err(|e| {
                    error!("recover_source could not load compiled rules `{}`: {}", name, e);
                    e
                })?;
                &loaded
            }
        };

        // 回调记录仅存在于本次调用的闭包中
        let source_path = self.store.source_path(name);
        let mut records: Vec<MatchRecord> = Vec::new();
        let matched = self
            .engine
            .scan_file(rules, &source_path, &mut |record| {
                debug!(
                    "Scan callback: rule=`{}` namespace=`{}` matches={} tags={:?} meta={} strings={}",
                    record.rule,
                    record.namespace,
                    record.matches,
                    record.tags,
                    record.meta.len(),
                    record.strings.len()
                );
                records.push(record.clone());
                CallbackMsg::Continue
            })
            .map_err(|e| {
                error!("recover_source scan of {} failed: {}", source_path.display(), e);
                e
            })?;

        debug!(
            "recover_source `{}`: {} candidate rule(s), {} matched",
            name,
            records.len(),
            matched.len()
        );

        let mut records = records.into_iter();
        let record = match (records.next(), records.next()) {
            (Some(record), None) => record,
            (None, _) => {
                error!(
                    "recover_source `{}`: no callback record, compiled rules and {} are inconsistent",
                    name,
                    source_path.display()
                );
                return Err(YaraForgeError::NoMatchRecord(format!(
                    "compiled rules `{}` produced no record against {}",
                    name,
                    source_path.display()
                )));
            }
            (Some(_), Some(_)) => {
                let count = 2 + records.count();
                error!("recover_source `{}`: {} rules found, expected exactly one", name, count);
                return Err(YaraForgeError::UnsupportedInput(format!(
                    "compiled rules `{}` contain {} rules, recovery supports exactly one",
                    name, count
                )));
            }
        };

        // 条件引用的变量必须全部回扫到，否则重新渲染的源码无法编译
        let mut missing: Vec<String> = Vec::new();
        for reference in scan_references(condition) {
            if !record.strings.contains_key(reference) && !missing.iter().any(|m| m == reference) {
                missing.push(reference.to_string());
            }
        }
        if !missing.is_empty() {
            error!(
                "recover_source `{}`: pattern(s) {:?} referenced by condition `{}` have no match in {}",
                name,
                missing,
                condition,
                source_path.display()
            );
            return Err(YaraForgeError::IncompleteRecord {
                rule: record.rule,
                missing,
            });
        }

        Ok(record.with_condition(condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use std::path::Path;
    use yaraforge_core::ArtifactEntry;

    fn forge_in(dir: &Path) -> RuleForge {
        RuleForge::new(ConfigManager::custom().rules_dir(dir.join("rules")).build())
    }

    fn request(rule: &str, artifacts: &[(&str, &str)], condition: &str) -> RuleRequest {
        RuleRequest {
            rule: rule.to_string(),
            tags: vec!["mal".to_string()],
            meta: [("author", "me".to_string())].into_iter().collect(),
            artifacts: artifacts
                .iter()
                .enumerate()
                .map(|(i, (name, value))| (*name, ArtifactEntry::new(*value, i.to_string(), "str")))
                .collect(),
            condition: condition.to_string(),
        }
    }

    #[test]
    fn test_compile_from_source_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        let out = forge
            .compile_from_source(&request("test", &[("$a", "evil")], "$a"))
            .unwrap();

        assert!(out.contains("rule test: mal"));
        assert!(out.contains("author = \"me\""));
        assert!(out.contains("strings:"));
        assert!(out.contains("$a = \"evil\""));
        assert!(out.contains("condition:\n        $a"));
        assert!(forge.store().has_source("test"));
        assert!(forge.store().has_compiled("test"));
    }

    #[test]
    fn test_recovered_record_matches_request() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        let req = request("roundtrip", &[("$a", "first-token"), ("$b", "second-token")], "$a and $b");

        forge.compile_from_source(&req).unwrap();
        let record = forge
            .recover_record(CompiledRef::Stored("roundtrip"), &req.condition)
            .unwrap();

        assert_eq!(record.rule, "roundtrip");
        assert_eq!(record.meta, req.meta);
        assert_eq!(record.strings, req.pattern_set());
        assert_eq!(record.condition, "$a and $b");
        assert!(record.matches);
    }

    #[test]
    fn test_sanitized_name_is_used_for_files() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        let out = forge
            .compile_from_source(&request("1evil-doc", &[("$a", "macro-token")], "$a"))
            .unwrap();
        assert!(out.starts_with("rule _1evil_doc: mal"));
        assert!(forge.store().has_compiled("_1evil_doc"));
    }

    #[test]
    fn test_unreferenced_artifact_is_omitted() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        let out = forge
            .compile_from_source(&request("partial", &[("$a", "kept-token"), ("$z", "dropped-token")], "$a"))
            .unwrap();
        assert!(out.contains("$a = \"kept-token\""));
        assert!(!out.contains("$z"));
        assert!(!forge.store().load_source("partial").unwrap().contains("$z"));
    }

    #[test]
    fn test_undeclared_reference_fails_without_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        let req = request("broken", &[("$a", "evil")], "$a and $b");

        let err = forge.compile_from_source(&req).unwrap_err();
        match err {
            YaraForgeError::Compile {
                rule,
                source_text,
                request,
                ..
            } => {
                assert_eq!(rule, "broken");
                assert!(source_text.contains("$a and $b"));
                assert_eq!(request.as_deref(), Some(&req));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // 源码已保存，编译产物不存在
        assert!(forge.store().has_source("broken"));
        assert!(!forge.store().has_compiled("broken"));
    }

    #[test]
    fn test_empty_name_rejected_before_io() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        let err = forge.compile_from_source(&request("", &[("$a", "evil")], "$a")).unwrap_err();
        assert!(matches!(err, YaraForgeError::Validation(_)));
        assert!(!forge.store().rules_dir().exists());
    }

    #[test]
    fn test_render_request_is_dry_run() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        let rendered = forge
            .render_request(&request("dry run", &[("$a", "evil")], "$a"))
            .unwrap();
        assert_eq!(rendered.rule_name, "dry run");
        assert!(rendered.source.starts_with("rule dry run: mal"));
        assert!(!forge.store().rules_dir().exists());
    }

    #[test]
    fn test_in_memory_and_stored_recovery_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        forge
            .compile_from_source(&request("twin", &[("$a", "twin-token")], "$a"))
            .unwrap();

        let rules = forge.store().load_compiled("twin").unwrap();
        let in_memory = forge
            .recover_source(CompiledRef::InMemory { rules: &rules, name: "twin" }, "$a")
            .unwrap();
        let stored = forge.recover_source(CompiledRef::Stored("twin"), "$a").unwrap();
        assert_eq!(in_memory, stored);
    }

    #[test]
    fn test_missing_compiled_rules() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        let err = forge.recover_source(CompiledRef::Stored("ghost"), "$a").unwrap_err();
        assert!(matches!(err, YaraForgeError::Persistence { .. }));
    }

    #[test]
    fn test_multi_rule_recovery_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        let source = "rule first\n{\n    strings:\n        $a = \"first-token\"\n\n    condition:\n        $a\n}\n\nrule second\n{\n    strings:\n        $b = \"second-token\"\n\n    condition:\n        $b\n}";

        forge.store().save_source("pair", source).unwrap();
        let rules = forge.engine().compile(source, forge.compile_options()).unwrap();
        forge.store().save_compiled("pair", &rules).unwrap();

        let err = forge.recover_source(CompiledRef::Stored("pair"), "$a").unwrap_err();
        assert!(matches!(err, YaraForgeError::UnsupportedInput(_)));
    }

    #[test]
    fn test_escaped_literal_without_match_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());

        // `\t` 被编译为制表符，源码文件中只有反斜杠原文，回扫不到
        let err = forge
            .compile_from_source(&request("bs", &[("$a", r"C:\temp")], "$a"))
            .unwrap_err();
        match err {
            YaraForgeError::IncompleteRecord { rule, missing } => {
                assert_eq!(rule, "bs");
                assert_eq!(missing, vec!["$a".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(forge.store().has_compiled("bs"));
    }

    #[test]
    fn test_condition_referencing_unknown_pattern_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        forge
            .compile_from_source(&request("solo", &[("$a", "solo-token")], "$a"))
            .unwrap();

        let err = forge
            .recover_source(CompiledRef::Stored("solo"), "$a and $b and $b")
            .unwrap_err();
        assert!(matches!(
            err,
            YaraForgeError::IncompleteRecord { ref missing, .. } if missing == &vec!["$b".to_string()]
        ));
    }

    /// 编译正常、扫描时从不回调的引擎
    struct SilentEngine;

    impl RuleEngine for SilentEngine {
        fn compile(&self, source: &str, options: &CompileOptions) -> YfResult<CompiledRules> {
            YaraXEngine::new().compile(source, options)
        }

        fn scan_file(
            &self,
            _rules: &CompiledRules,
            _target: &Path,
            _callback: &mut dyn FnMut(&MatchRecord) -> CallbackMsg,
        ) -> YfResult<Vec<MatchRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_no_callback_is_no_match_record() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ConfigManager::custom().rules_dir(tmp.path().join("rules")).build();
        let forge = RuleForge::with_engine(config, SilentEngine);

        let err = forge
            .compile_from_source(&request("silent", &[("$a", "evil")], "$a"))
            .unwrap_err();
        assert!(matches!(err, YaraForgeError::NoMatchRecord(_)));
        // 回扫之前的步骤均已完成
        assert!(forge.store().has_compiled("silent"));
    }

    #[test]
    fn test_concurrent_recovery_does_not_mix_records() {
        let tmp = tempfile::tempdir().unwrap();
        let forge = forge_in(tmp.path());
        let names = ["alpha", "beta", "gamma", "delta"];
        for name in names {
            let token = format!("{}-token", name);
            forge
                .compile_from_source(&request(name, &[("$a", token.as_str())], "$a"))
                .unwrap();
        }

        std::thread::scope(|scope| {
            for name in names {
                let forge = &forge;
                scope.spawn(move || {
                    for _ in 0..8 {
                        let record = forge.recover_record(CompiledRef::Stored(name), "$a").unwrap();
                        assert_eq!(record.rule, name);
                        assert_eq!(
                            record.strings.get("$a").map(String::as_str),
                            Some(format!("{}-token", name).as_str())
                        );
                    }
                });
            }
        });
    }
}
