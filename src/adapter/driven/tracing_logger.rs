use crate::domain::port::{LogLevel, Logger};
use std::collections::HashMap;
use uuid::Uuid;

/// tracingロガー実装
/// ログをtracingのイベントとして出力する。出力形式はmainで設定したsubscriberに従う
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

/// 追加コンテキストをキー順に`key=value`形式で連結
fn format_context(context: Option<&HashMap<String, String>>) -> String {
    let Some(context) = context else {
        return String::new();
    };
    let mut pairs: Vec<(&String, &String)> = context.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Logger for TracingLogger {
    fn log(
        &self,
        level: LogLevel,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        let correlation_id = correlation_id.map(|id| id.to_string()).unwrap_or_default();
        let context = format_context(context.as_ref());

        match level {
            LogLevel::Debug => tracing::debug!(
                component,
                correlation_id = %correlation_id,
                context = %context,
                "{}",
                message
            ),
            LogLevel::Info => tracing::info!(
                component,
                correlation_id = %correlation_id,
                context = %context,
                "{}",
                message
            ),
            LogLevel::Warning => tracing::warn!(
                component,
                correlation_id = %correlation_id,
                context = %context,
                "{}",
                message
            ),
            LogLevel::Error => tracing::error!(
                component,
                correlation_id = %correlation_id,
                context = %context,
                "{}",
                message
            ),
        }
    }
}
