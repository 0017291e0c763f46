use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use depdev::commands::{clear, link, postinstall};
use depdev::config::Config;
use depdev::process::TokioRunner;

/// depdev - develop against a local clone of a dependency
///
/// Clones the GitHub repository of an installed dependency into `deps/`,
/// links `node_modules/<package>` to the clone with pnpm and restores
/// `pnpm-lock.yaml` afterwards.
///
/// Examples:
///   depdev some-package          # Same as `depdev link some-package`
///   depdev clear                 # Remove all links and reinstall
#[derive(Parser, Debug)]
#[command(author, version = env!("DEPDEV_VERSION"), about)]
struct Cli {
    /// Dependency to link (shorthand for `link <PACKAGE>`)
    #[arg(value_name = "PACKAGE")]
    package: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Prefix of clone URLs, joined with "<owner>/<repo>" (defaults to git@github.com:)
    #[arg(
        long = "clone-base",
        env = "DEPDEV_CLONE_BASE",
        value_name = "URL",
        global = true
    )]
    clone_base: Option<String>,

    /// Package manager used to link and reinstall (defaults to pnpm)
    #[arg(
        long = "package-manager",
        env = "DEPDEV_PACKAGE_MANAGER",
        value_name = "PROGRAM",
        global = true
    )]
    package_manager: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Clone a dependency's repository into deps/ and link it into node_modules
    Link(LinkArgs),

    /// Remove links into deps/ and reinstall the published packages
    Clear(ClearArgs),

    /// Link every dependency listed in depdev.config.json
    Postinstall,
}

#[derive(clap::Args, Debug)]
struct LinkArgs {
    /// Name of the dependency as declared in package.json
    #[arg(value_name = "PACKAGE")]
    package: String,
}

#[derive(clap::Args, Debug)]
struct ClearArgs {
    /// Only unlink this dependency
    #[arg(value_name = "PACKAGE")]
    package: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(cli.clone_base, cli.package_manager);
    let runtime = depdev::runtime::RealRuntime;
    let runner = TokioRunner;

    match (cli.package, cli.command) {
        (None, None) => Cli::command().print_help()?,
        (Some(package), Some(_)) => {
            bail!("Unexpected subcommand after package name {}", package)
        }
        (Some(package), None) | (None, Some(Commands::Link(LinkArgs { package }))) => {
            link(&runtime, &runner, &config, &package).await?
        }
        (None, Some(Commands::Clear(args))) => {
            clear(&runtime, &runner, &config, args.package.as_deref()).await?
        }
        (None, Some(Commands::Postinstall)) => postinstall(&runtime, &runner, &config).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_package_shorthand_parsing() {
        let cli = Cli::try_parse_from(["depdev", "widget"]).unwrap();
        assert_eq!(cli.package.as_deref(), Some("widget"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_link_parsing() {
        let cli = Cli::try_parse_from(["depdev", "link", "@acme/widget"]).unwrap();
        assert!(cli.package.is_none());
        match cli.command {
            Some(Commands::Link(args)) => assert_eq!(args.package, "@acme/widget"),
            _ => panic!("Expected Link command"),
        }
    }

    #[test]
    fn test_cli_clear_parsing() {
        let cli = Cli::try_parse_from(["depdev", "clear"]).unwrap();
        match cli.command {
            Some(Commands::Clear(args)) => assert_eq!(args.package, None),
            _ => panic!("Expected Clear command"),
        }

        let cli = Cli::try_parse_from(["depdev", "clear", "widget"]).unwrap();
        match cli.command {
            Some(Commands::Clear(args)) => assert_eq!(args.package.as_deref(), Some("widget")),
            _ => panic!("Expected Clear command"),
        }
    }

    #[test]
    fn test_cli_postinstall_parsing() {
        let cli = Cli::try_parse_from(["depdev", "postinstall"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Postinstall)));
    }

    #[test]
    fn test_cli_global_options_parsing() {
        let cli = Cli::try_parse_from([
            "depdev",
            "link",
            "widget",
            "--clone-base",
            "https://github.com/",
            "--package-manager",
            "/usr/local/bin/pnpm",
        ])
        .unwrap();
        assert_eq!(cli.clone_base.as_deref(), Some("https://github.com/"));
        assert_eq!(cli.package_manager.as_deref(), Some("/usr/local/bin/pnpm"));
    }

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::try_parse_from(["depdev"]).unwrap();
        assert!(cli.package.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_link_requires_package() {
        assert!(Cli::try_parse_from(["depdev", "link"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
