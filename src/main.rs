use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use gitpr::App;
use gitpr::Config;
use gitpr::config;
use gitpr::ops::fs::RealFs;
use gitpr::ops::git::RealGit;
use gitpr::ops::github::GithubClient;
use gitpr::store::FileStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "gitpr")]
#[command(about = "Automate the lifecycle of pull requests against a GitHub repository", long_about = None)]
pub struct Cli {
    /// Repository to operate on: a remote name or a full name (user/repo)
    #[arg(short, long, global = true)]
    pub repo: Option<String>,

    /// Branch updates are merged from and pull requests are sent to
    #[arg(short = 'b', long = "update-branch", global = true)]
    pub update_branch: Option<String>,

    /// Reviewer to send pull requests to: a username or a full name (user/repo)
    #[arg(short = 'u', long, global = true)]
    pub reviewer: Option<String>,

    /// Tags inserted into the pull request title
    #[arg(short = 't', long = "tags", global = true, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Show pull requests for the entire repo, not just the update branch
    #[arg(short, long, global = true)]
    pub all: bool,

    /// Don't open newly submitted pull requests in the browser
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a pull request into a local branch
    Fetch {
        /// Pull request ID
        id: u64,
        /// Update the branch right after fetching it
        #[arg(long)]
        update: bool,
        /// Never update the branch after fetching it
        #[arg(long)]
        no_update: bool,
    },
    /// Fetch all open pull requests into local branches
    FetchAll,
    /// Update a pull request branch with changes from the update-branch
    Update {
        /// Pull request ID or branch name (defaults to the current branch)
        target: Option<String>,
    },
    /// Continue the current update after conflicts have been fixed
    #[command(alias = "cu")]
    ContinueUpdate,
    /// Merge the current pull request branch into the update-branch
    Merge {
        /// Comment to post when auto-closing the request
        comment: Option<String>,
    },
    /// Close the current pull request and delete its branch
    Close {
        /// Comment to post before closing
        comment: Option<String>,
    },
    /// Push the current branch and send a pull request to the reviewer
    Submit {
        /// Pull request body
        body: Option<String>,
        /// Pull request title
        title: Option<String>,
    },
    /// Open a pull request in the browser
    Open {
        /// Pull request ID (defaults to the current branch's request)
        id: Option<u64>,
    },
    /// Pull remote changes into the local pull request branch
    Pull,
    /// List repositories and the number of pull requests open on each
    Info {
        /// GitHub username (defaults to the configured user)
        user: Option<String>,
        /// Also list the open pull requests per repository
        #[arg(long)]
        detailed: bool,
    },
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(repo) = &cli.repo {
        config.repo = if repo.contains('/') {
            repo.clone()
        } else {
            config::repo_name_for_remote(repo)?
        };
    }
    if let Some(update_branch) = cli.update_branch {
        config.update_branch = update_branch;
    }
    if let Some(reviewer) = cli.reviewer {
        config.reviewer = Some(reviewer);
    }
    if cli.all {
        config.filter_by_update_branch = false;
    }

    let tags: Vec<String> = cli.tags.iter().map(|tag| tag.trim().to_string()).collect();
    let open_browser = config.submit_open_github && !cli.quiet;

    let token = config::github_token()?;
    let gh = GithubClient::new(token, config.repo.clone());
    let store = FileStore::new(FileStore::default_root());
    let fetch_auto_update = config.fetch_auto_update;
    let info_user = config.user.clone();

    let app = App::new(
        config,
        RealGit,
        gh,
        store,
        RealFs,
        std::env::current_dir()?,
    );

    let stdout = &mut std::io::stdout();

    match cli.command {
        Some(Commands::Fetch {
            id,
            update,
            no_update,
        }) => {
            let auto_update = (fetch_auto_update || update) && !no_update;
            app.cmd_fetch(id, auto_update, stdout).await?
        }
        Some(Commands::FetchAll) => app.cmd_fetch_all(stdout).await?,
        Some(Commands::Update { target }) => app.cmd_update(target.as_deref(), stdout).await?,
        Some(Commands::ContinueUpdate) => app.cmd_continue_update(stdout).await?,
        Some(Commands::Merge { comment }) => app.cmd_merge(comment.as_deref(), stdout).await?,
        Some(Commands::Close { comment }) => app.cmd_close(comment.as_deref(), stdout).await?,
        Some(Commands::Submit { body, title }) => {
            app.cmd_submit(
                body.as_deref(),
                title.as_deref(),
                &tags,
                open_browser,
                stdout,
            )
            .await?
        }
        Some(Commands::Open { id }) => app.cmd_open(id).await?,
        Some(Commands::Pull) => app.cmd_pull(stdout).await?,
        Some(Commands::Info { user, detailed }) => {
            let user = user
                .or(info_user)
                .ok_or_else(|| anyhow::anyhow!("No github.user configured"))?;
            app.cmd_info(&user, detailed, stdout).await?
        }
        None => app.cmd_show(stdout).await?,
    }

    Ok(())
}
