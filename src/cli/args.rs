use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "meetscribe")]
#[command(about = "Meeting notetaker: joins calls and captures clean transcripts", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Join a meeting now and print the cleaned transcript
    Join(JoinCliArgs),
    /// List stored meetings
    History(HistoryCliArgs),
    /// Run the HTTP service (default when no subcommand given)
    Serve,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct JoinCliArgs {
    /// Meeting link to join
    pub meet_link: String,
    /// Capture window in minutes
    #[arg(short, long, default_value = "30")]
    pub duration: u32,
    /// Skip summarization even if an API key is configured
    #[arg(long)]
    pub no_summary: bool,
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// Maximum number of meetings to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Print the full transcript of a specific meeting
    #[arg(short, long)]
    pub show: Option<i64>,
}
