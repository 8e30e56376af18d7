use jsp_compiler::batch::{self, BatchConfig, BatchResults};
use jsp_compiler::config::RuntimeConfig;
use jsp_compiler::context::{ClassRegistry, CompilationContext};
use jsp_compiler::resources::FsResources;
use jsp_compiler::taglib::descriptor;
use jsp_compiler::{logging, utils::paths};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    webroot: PathBuf,
    pages: Vec<String>,
    taglibs: Option<PathBuf>,
    config: Option<PathBuf>,
    threads: Option<usize>,
    fail_fast: bool,
    quiet: bool,
}

fn main() {
    if let Err(error) = logging::init_global_logging() {
        eprintln!("Failed to initialise logging: {}", error);
        process::exit(2);
    }

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("jspc");
    if args.len() < 2 {
        print_usage(program);
        process::exit(2);
    }
    if args[1] == "--help" || args[1] == "-h" {
        print_help(program);
        return;
    }

    let cli = match parse_args(&args[1..]) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("error: {}", message);
            print_usage(program);
            process::exit(2);
        }
    };

    match run(&cli) {
        Ok(results) => {
            if !cli.quiet {
                print_batch_results(&results);
            }
            logging::print_cargo_style_summary();
            if results.failure_count() > 0 {
                process::exit(1);
            }
        }
        Err(message) => {
            eprintln!("error: {}", message);
            logging::print_cargo_style_summary();
            process::exit(1);
        }
    }
}

fn run(cli: &CliArgs) -> Result<BatchResults, String> {
    let runtime = match &cli.config {
        Some(path) => RuntimeConfig::load(path).map_err(|e| e.to_string())?,
        None => RuntimeConfig::default(),
    };

    let mut options = runtime.compiler.clone();
    options.jspc_mode = true;

    let descriptors = match &cli.taglibs {
        Some(path) => descriptor::load_descriptor_file(path).map_err(|e| e.to_string())?,
        None => Vec::new(),
    };

    let ctx = CompilationContext::new(options, Arc::new(FsResources::new(&cli.webroot)))
        .with_descriptors(descriptors)
        .with_classes(ClassRegistry::permissive());

    let mut config = BatchConfig::from(&runtime.batch);
    if let Some(threads) = cli.threads {
        config.max_threads = threads;
    }
    config.fail_fast |= cli.fail_fast;
    config.progress_reporting &= !cli.quiet;

    if !cli.quiet {
        println!(
            "   Compiling {} ({} threads{})",
            cli.webroot.display(),
            config.max_threads,
            if config.fail_fast { ", fail-fast" } else { "" }
        );
    }

    if cli.pages.is_empty() {
        batch::compile_webroot(&ctx, &cli.webroot, &config).map_err(|e| e.to_string())
    } else {
        batch::compile_pages(&ctx, &cli.pages, &config).map_err(|e| e.to_string())
    }
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut webroot = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--taglibs" => cli.taglibs = Some(PathBuf::from(value_of(&mut iter, arg)?)),
            "--config" => cli.config = Some(PathBuf::from(value_of(&mut iter, arg)?)),
            "--threads" => {
                let value = value_of(&mut iter, arg)?;
                let threads = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("invalid thread count '{}'", value))?;
                cli.threads = Some(threads.min(64));
            }
            "--fail-fast" => cli.fail_fast = true,
            "--quiet" | "-q" => cli.quiet = true,
            option if option.starts_with("--") => {
                return Err(format!("unknown option '{}'", option));
            }
            value if webroot.is_none() => webroot = Some(PathBuf::from(value)),
            page => cli.pages.push(context_path(page)?),
        }
    }

    cli.webroot = webroot.ok_or_else(|| "missing <webroot>".to_string())?;
    Ok(cli)
}

fn value_of<'a>(iter: &mut std::slice::Iter<'a, String>, option: &str) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", option))
}

/// Pages on the command line are relative to the web root
fn context_path(page: &str) -> Result<String, String> {
    let absolute = format!("/{}", page.trim_start_matches('/'));
    paths::normalize(&absolute).ok_or_else(|| format!("invalid page path '{}'", page))
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} <webroot> [page...] [--taglibs descriptors.json] [--config jspc.toml] [--threads N] [--fail-fast] [--quiet]",
        program
    );
    eprintln!("       {} --help", program);
}

fn print_help(program: &str) {
    println!("jspc {}", env!("CARGO_PKG_VERSION"));
    println!("Translate JSP pages and tag files under a web root");
    println!();
    println!("USAGE:");
    println!("    {} <webroot> [page...] [options]", program);
    println!();
    println!("ARGUMENTS:");
    println!("    <webroot>    Web application root directory");
    println!("    [page...]    Context-relative pages to compile (default: every .jsp/.jspx)");
    println!();
    println!("OPTIONS:");
    println!("    --taglibs FILE    JSON array of tag library descriptors");
    println!("    --config FILE     TOML configuration ([compiler], [logging], [batch])");
    println!("    --threads N       Worker threads (default: available parallelism)");
    println!("    --fail-fast       Stop scheduling pages after the first failure");
    println!("    --quiet           Only print diagnostics");
    println!("    --help            Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    {} webapp/", program);
    println!("    {} webapp/ index.jsp admin/users.jsp --taglibs tlds.json", program);
    println!("    {} webapp/ --threads 4 --fail-fast", program);
}

fn print_batch_results(results: &BatchResults) {
    println!();
    for (page, error) in &results.failed {
        println!("error[{}]: {}", error.error_code(), page);
        for line in error.to_string().lines() {
            println!("  {}", line);
        }
    }

    let status = if results.failure_count() == 0 { "Finished" } else { "Failed" };
    println!(
        "{:>12} {} pages in {:.2}s ({} compiled, {} failed, {} skipped)",
        status,
        results.pages_discovered,
        results.processing_duration.as_secs_f64(),
        results.success_count(),
        results.failure_count(),
        results.pages_skipped
    );

    let tag_files: usize = results.compiled.iter().map(|unit| unit.handlers.len()).sum();
    if tag_files > 0 {
        println!("{:>12} {} tag file references resolved", "", tag_files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = parse_args(&args(&[
            "webapp",
            "index.jsp",
            "/admin/./users.jsp",
            "--taglibs",
            "tlds.json",
            "--config",
            "jspc.toml",
            "--threads",
            "4",
            "--fail-fast",
            "--quiet",
        ]))
        .unwrap();
        assert_eq!(cli.webroot, PathBuf::from("webapp"));
        assert_eq!(cli.pages, vec!["/index.jsp", "/admin/users.jsp"]);
        assert_eq!(cli.taglibs, Some(PathBuf::from("tlds.json")));
        assert_eq!(cli.config, Some(PathBuf::from("jspc.toml")));
        assert_eq!(cli.threads, Some(4));
        assert!(cli.fail_fast);
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["webapp", "--threads"])).is_err());
        assert!(parse_args(&args(&["webapp", "--threads", "zero"])).is_err());
        assert!(parse_args(&args(&["webapp", "--threads", "0"])).is_err());
        assert!(parse_args(&args(&["webapp", "--unknown"])).is_err());
        assert!(parse_args(&args(&["webapp", "../escape.jsp"])).is_err());
    }
}
