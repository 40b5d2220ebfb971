use crate::demo::{run_demo, run_render, DemoArgs, RenderArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use opsforms::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Operator Forms",
    about = "Serve, render and demonstrate the operator incident and pay exception forms",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Render a JSON submission to PDF without saving a row or sending mail
    Render(RenderArgs),
    /// Run a sample incident report through the full pipeline into a local directory
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Render(args) => run_render(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsforms::forms::FormKind;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["opsforms-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn render_parses_form_and_paths() {
        let cli = Cli::try_parse_from([
            "opsforms-api",
            "render",
            "--form",
            "pay-exception",
            "--input",
            "claim.json",
            "--output",
            "claim.pdf",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Render(args)) => {
                assert_eq!(args.form, FormKind::PayException);
                assert_eq!(args.input.to_str(), Some("claim.json"));
                assert_eq!(args.output.as_deref().and_then(|p| p.to_str()), Some("claim.pdf"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_forms_are_rejected() {
        let err = Cli::try_parse_from(["opsforms-api", "render", "--form", "timesheet", "--input", "x.json"])
            .expect_err("invalid form");
        assert!(err.to_string().contains("timesheet"));
    }
}
