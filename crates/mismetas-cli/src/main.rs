// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod demo;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use demo::DemoGateway;
use mismetas_app::AppState;
use mismetas_backend::Client;
use runtime::HttpGateway;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `mismetas --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let mut state = AppState::default();

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        let mut gateway = DemoGateway::new();
        return mismetas_tui::run_app(&mut state, &mut gateway);
    }

    let base_url = resolve_backend_url(
        options.backend_url.as_deref(),
        env::var("MISMETAS_BACKEND_URL").ok().as_deref(),
        &config,
    );
    let client = Client::new(&base_url, config.backend_timeout()?).with_context(|| {
        format!(
            "invalid [backend] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    let mut gateway = HttpGateway::new(client);
    mismetas_tui::run_app(&mut state, &mut gateway)
}

/// Flag beats environment beats config file.
fn resolve_backend_url(flag: Option<&str>, env: Option<&str>, config: &Config) -> String {
    if let Some(url) = flag {
        return url.to_owned();
    }
    if let Some(url) = env
        && !url.trim().is_empty()
    {
        return url.to_owned();
    }
    config.backend_base_url().to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    backend_url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        backend_url: None,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--backend" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--backend requires a base URL"))?;
                options.backend_url = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("mismetas");
    println!("  --config <path>          Use a specific config path");
    println!("  --backend <url>          Connect to this backend base URL");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against a seeded in-process backend");
    println!("  --check                  Validate config + backend client construction");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args, resolve_backend_url};
    use crate::config::Config;
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/mismetas-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                backend_url: None,
                print_config_path: false,
                print_example: false,
                demo: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_and_backend_overrides() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml", "--backend", "http://10.1.1.1:4242"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(
            options.backend_url.as_deref(),
            Some("http://10.1.1.1:4242")
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--backend"], default_options_path())
            .expect_err("missing backend value should fail");
        assert!(error.to_string().contains("--backend requires a base URL"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_demo_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--print-config-path",
                "--print-example-config",
                "--demo",
                "--check",
            ],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.demo);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn backend_url_resolution_prefers_flag_then_env_then_config() {
        let config = Config::default();

        assert_eq!(
            resolve_backend_url(Some("http://flag:1"), Some("http://env:2"), &config),
            "http://flag:1"
        );
        assert_eq!(
            resolve_backend_url(None, Some("http://env:2"), &config),
            "http://env:2"
        );
        assert_eq!(
            resolve_backend_url(None, Some("   "), &config),
            "http://localhost:4242"
        );
        assert_eq!(
            resolve_backend_url(None, None, &config),
            "http://localhost:4242"
        );
    }
}
