//! 全局错误类型定义
//! 外部引擎（yara-x）的错误类型在适配层转换为字符串，不向调用方泄露
use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;
use yaraforge_core::{CoreError, RuleRequest};

#[derive(Error, Debug)]
pub enum YaraForgeError {
    // 输入校验错误
    #[error("输入校验失败：{0}")]
    Validation(String),

    // 编译相关错误：保留原始请求与渲染后的源码便于排查
    #[error("规则编译失败（{rule}）：{message}")]
    Compile {
        message: String,
        rule: String,
        source_text: String,
        request: Option<Box<RuleRequest>>,
    },

    // 存储相关错误
    #[error("规则存储读写失败（{}）：{source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("编译产物格式无效：{0}")]
    CompiledFormat(String),

    // 回扫相关错误
    #[error("未收到匹配记录：{0}")]
    NoMatchRecord(String),
    #[error("回扫记录缺少条件引用的字符串变量（{rule}）：{}", .missing.join(", "))]
    IncompleteRecord { rule: String, missing: Vec<String> },
    #[error("不支持的输入：{0}")]
    UnsupportedInput(String),
    #[error("规则扫描失败：{0}")]
    Scan(String),

    // 内核错误（请求解析等）
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl YaraForgeError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// 编译器拒绝源码（规则名与原始请求由编排层补充）
    pub(crate) fn compile(message: impl Into<String>, source_text: &str) -> Self {
        Self::Compile {
            message: message.into(),
            rule: String::new(),
            source_text: source_text.to_string(),
            request: None,
        }
    }

    /// 编译失败时补充规则名与原始请求，其他错误原样返回
    pub(crate) fn with_compile_context(self, rule_name: &str, request: &RuleRequest) -> Self {
        match self {
            Self::Compile {
                message,
                source_text,
                ..
            } => Self::Compile {
                message,
                rule: rule_name.to_string(),
                source_text,
                request: Some(Box::new(request.clone())),
            },
            other => other,
        }
    }
}

// 全局Result类型
pub type YfResult<T> = Result<T, YaraForgeError>;
