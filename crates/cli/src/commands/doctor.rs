//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    blog: CheckResult,
    llm: CheckResult,
    storage: CheckResult,
    remote: CheckResult,
    research: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        blog: CheckResult::error("Not checked"),
        llm: CheckResult::error("Not checked"),
        storage: CheckResult::error("Not checked"),
        remote: CheckResult::error("Not checked"),
        research: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    match AppConfig::load(config_path.as_deref()) {
        Ok(config) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            report.blog = check_blog(&config);
            report.llm = check_llm(&config);
            report.storage = check_storage(&config);
            report.remote = check_remote(&config);
            report.research = check_research(&config);
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
        }
    }

    let checks = [
        &report.config,
        &report.blog,
        &report.llm,
        &report.storage,
        &report.remote,
        &report.research,
    ];
    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        anyhow::bail!("Doctor found configuration errors");
    }

    Ok(())
}

fn check_blog(config: &AppConfig) -> CheckResult {
    match config.blog_config() {
        Ok(blog) => {
            let typologies = blog.available_typologies();
            let message = format!(
                "{} at {}, {} typologies",
                blog.site.name,
                blog.site.blog_url(),
                typologies.len()
            );
            let check = if blog.typologies.is_empty() {
                CheckResult::warn(format!("{} (fallback set, none configured)", message))
            } else {
                CheckResult::ok(message)
            };
            check.with_details(serde_json::json!({
                "typologies": typologies.iter().map(|t| t.id()).collect::<Vec<_>>(),
                "friends": blog.competitors.friends.len(),
                "enemies": blog.competitors.enemies.len(),
            }))
        }
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let provider = &config.llm.provider;
    let model = &config.llm.model;

    // Check if API key env var is set (without revealing the value)
    let api_key_env = match provider.as_str() {
        "openai" => &config.llm.openai.api_key_env,
        "anthropic" => &config.llm.anthropic.api_key_env,
        "gemini" => &config.llm.gemini.api_key_env,
        "ollama" => {
            return CheckResult::ok(format!(
                "Provider: ollama, Model: {}, base_url: {}",
                model, config.llm.ollama.base_url
            ));
        }
        "openai_compat" => {
            if config.llm.openai_compat.base_url.trim().is_empty() {
                return CheckResult::error("OpenAI-compatible base_url is empty");
            }
            &config.llm.openai_compat.api_key_env
        }
        "stub" => return CheckResult::ok("Provider: stub (offline)"),
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    match std::env::var(api_key_env) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        )),
        _ => CheckResult::warn(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        )),
    }
}

fn check_storage(config: &AppConfig) -> CheckResult {
    let storage = &config.storage;
    match storage.adapter.as_str() {
        "file" => CheckResult::ok(format!(
            "File store, durable: {}, scratch: {}",
            storage.durable_dir.display(),
            storage.scratch_dir.display()
        )),
        "sqlite" => CheckResult::ok(format!("SQLite store: {}", storage.sqlite_path.display())),
        "memory" => CheckResult::warn("In-memory store, posts are lost on exit"),
        other => CheckResult::error(format!("Unknown storage adapter: {}", other)),
    }
}

fn check_remote(config: &AppConfig) -> CheckResult {
    let remote = &config.remote;
    if remote.owner.trim().is_empty() || remote.repo.trim().is_empty() {
        return CheckResult::ok("Remote disabled");
    }

    let target = format!("{}/{}@{}", remote.owner, remote.repo, remote.branch);
    match std::env::var(&remote.token_env) {
        Ok(val) if !val.is_empty() => {
            CheckResult::ok(format!("Remote: {}, token: {} (set)", target, remote.token_env))
        }
        _ => CheckResult::warn(format!(
            "Remote: {}, token: {} (not set)",
            target, remote.token_env
        )),
    }
}

fn check_research(config: &AppConfig) -> CheckResult {
    let env_var = &config.research.firecrawl_api_key_env;
    match std::env::var(env_var) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Firecrawl key: {} (set), reports: {}",
            env_var,
            config.research.reports_dir.display()
        )),
        _ => CheckResult::warn(format!(
            "Firecrawl key: {} (not set), web-lite falls back to internal knowledge",
            env_var
        )),
    }
}

fn print_report(report: &DoctorReport) {
    println!("autoblog Doctor Report");
    println!("======================");
    println!();

    print_check("Config", &report.config);
    print_check("Blog", &report.blog);
    print_check("LLM Provider", &report.llm);
    print_check("Storage", &report.storage);
    print_check("Remote", &report.remote);
    print_check("Research", &report.research);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall != "error" {
        println!();
        println!("Ready to run! Try: autoblog generate --typology AUTO");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
