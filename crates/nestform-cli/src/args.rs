use crate::types::{LogLevel, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nestform")]
#[command(about = "Bind, validate, save and render nested model forms", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Workspace directory (defaults to $NESTFORM_PATH, then the XDG data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the config file and database
    Init,

    /// Bind a submitted form tree, validate it and save it
    Submit {
        model: String,

        /// Edit an existing record instead of creating one
        #[arg(long)]
        id: Option<i64>,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Render the form tree for a new or existing record
    Show {
        model: String,

        id: Option<i64>,

        /// Print the name/value pairs the rendered page would submit
        #[arg(long)]
        posted: bool,
    },

    /// List saved records of one model
    List {
        model: String,

        #[arg(long, help = "Write records as CSV")]
        csv: bool,
    },

    /// Delete a record together with all of its descendants
    Delete { model: String, id: i64 },

    /// Print the client-side clone descriptor for a model's form tree
    Descriptor { model: String },

    /// Route one request through the page router and print the response
    Request {
        method: String,

        path: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },
}

#[derive(Subcommand)]
pub enum TemplatesCommand {
    /// Write one row template file per child form type
    Generate {
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Collect template files into a single JSON bundle
    Bundle {
        #[arg(long)]
        output: Option<PathBuf>,

        /// Rebuild whenever a template changes, until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct BodyArgs {
    /// File holding the posted body, urlencoded or a JSON object (`-` for stdin)
    #[arg(long, conflicts_with = "form")]
    pub data: Option<PathBuf>,

    /// Inline urlencoded body, e.g. 'name=A&buildings-TOTAL_FORMS=1'
    #[arg(long)]
    pub form: Option<String>,
}
