use crate::demo::{run_demo, run_schedule_tick, DemoArgs, RunDueArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use homematch::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Homematch Engine",
    about = "Score listings against buyer profiles and dispatch match alerts from the command line",
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
    /// Exercise recurring match schedules against sample data
    Schedules {
        #[command(subcommand)]
        command: SchedulesCommand,
    },
    /// Run an end-to-end CLI demo over sample Portuguese market data
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SchedulesCommand {
    /// Execute every schedule that has come due
    RunDue(RunDueArgs),
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
        Command::Schedules {
            command: SchedulesCommand::RunDue(args),
        } => run_schedule_tick(args),
        Command::Demo(args) => run_demo(args),
    }
}
