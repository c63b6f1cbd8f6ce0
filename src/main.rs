use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use steepshot_core::config::{CliArgs, Config};
use steepshot_core::connectivity::{AlwaysOnline, LogReporter};
use steepshot_core::models::{
    AuthorizedModel, Beneficiary, CommentModel, CurrencyType, DeleteModel, FollowModel,
    FollowType, TransferModel, UpdateProfileModel, UploadMediaModel, VoteModel, VoteType,
};
use steepshot_core::presenter::{Presenter, SessionEvent};
use steepshot_core::rpc::HttpTransport;
use steepshot_core::session::{FileSessionStore, SessionStore, UserInfo};
use steepshot_core::{KnownChains, OperationResult};

#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a posting key against the chain and persist the session
    Login {
        login: String,
        #[arg(long, env = "STEEPSHOT_POSTING_KEY")]
        posting_key: String,
    },
    /// Drop the persisted session
    Logout,
    /// Show the persisted session
    Whoami,
    /// Vote on a post
    Vote {
        author: String,
        permlink: String,
        /// down removes an earlier vote, flag is a downvote
        #[arg(long, conflicts_with = "flag")]
        down: bool,
        #[arg(long)]
        flag: bool,
    },
    /// Follow a user
    Follow { username: String },
    /// Unfollow a user
    Unfollow { username: String },
    /// Publish a new post
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Beneficiary splits as account:weight pairs (weight in basis points)
        #[arg(long = "beneficiary")]
        beneficiaries: Vec<String>,
    },
    /// Reply to an existing post
    Comment {
        author: String,
        permlink: String,
        #[arg(long)]
        body: String,
    },
    /// Delete an own post or comment
    Delete { permlink: String },
    /// Transfer funds (requires the active key)
    Transfer {
        recipient: String,
        amount: String,
        #[arg(long, default_value = "steem")]
        currency: String,
        #[arg(long, default_value = "")]
        memo: String,
        #[arg(long, env = "STEEPSHOT_ACTIVE_KEY")]
        active_key: String,
    },
    /// Update on-chain profile fields (requires the active key)
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        about: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        profile_image: Option<String>,
        #[arg(long, env = "STEEPSHOT_ACTIVE_KEY")]
        active_key: String,
    },
    /// Upload an image and publish it as a post
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Switch the persisted session to another chain
    Switch {
        #[arg(value_parser = clap::value_parser!(KnownChains))]
        chain: KnownChains,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_args(&cli.args).context("Failed to load configuration")?;

    let store = FileSessionStore::new(config.session_file.clone());
    let user = store.load().await;
    let transport = Arc::new(HttpTransport::new(config.rpc_timeout_ms));

    let (presenter, mut events) = Presenter::new(
        config,
        user,
        transport,
        Arc::new(AlwaysOnline),
        Arc::new(LogReporter),
    );

    // surface connectivity banners on the terminal
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Alert(msg) => log::warn!("{msg}"),
                SessionEvent::AlertCleared => log::info!("connection established"),
            }
        }
    });

    presenter.start();
    run_command(cli.command, &presenter, &store).await
}

async fn run_command(
    command: Command,
    presenter: &Arc<Presenter>,
    store: &FileSessionStore,
) -> Result<()> {
    match command {
        Command::Login { login, posting_key } => {
            let model = AuthorizedModel::new(&login, &posting_key)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.login_with_posting_key(&model).await })
                    .await,
            )?;
            let mut user = UserInfo::new(&login, presenter.chain());
            user.posting_key = Some(posting_key);
            user.is_authenticated = true;
            presenter.set_user(Some(user.clone()));
            if !store.save(&user).await {
                return Err(anyhow!("Failed to persist the session"));
            }
            println!("Logged in as {login} on {}", presenter.chain());
            Ok(())
        }
        Command::Logout => {
            presenter.set_user(None);
            if !store.clear().await {
                return Err(anyhow!("Failed to clear the session"));
            }
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            match presenter.user() {
                Some(user) => println!("{} on {}", user.login, user.chain),
                None => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Vote {
            author,
            permlink,
            down,
            flag,
        } => {
            let auth = session_auth(presenter)?;
            let vote_type = if flag {
                VoteType::Flag
            } else if down {
                VoteType::Down
            } else {
                VoteType::Up
            };
            let model = VoteModel::new(&auth, &author, &permlink, vote_type)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.vote(&model).await })
                    .await,
            )
        }
        Command::Follow { username } => {
            follow(presenter, &username, FollowType::Follow).await
        }
        Command::Unfollow { username } => {
            follow(presenter, &username, FollowType::UnFollow).await
        }
        Command::Post {
            title,
            body,
            tags,
            beneficiaries,
        } => {
            let auth = session_auth(presenter)?;
            let beneficiaries = parse_beneficiaries(&beneficiaries)?;
            let model = CommentModel::post(&auth, &title, &body, &tags, beneficiaries)?;
            let permlink = model.permlink.clone();
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.create_or_edit(&model).await })
                    .await,
            )?;
            println!("Published @{}/{permlink}", auth.login);
            Ok(())
        }
        Command::Comment {
            author,
            permlink,
            body,
        } => {
            let auth = session_auth(presenter)?;
            let model = CommentModel::reply(&auth, &author, &permlink, &body)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.create_or_edit(&model).await })
                    .await,
            )
        }
        Command::Delete { permlink } => {
            let auth = session_auth(presenter)?;
            let model = DeleteModel::new(&auth, &auth.login, &permlink)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.delete(&model).await })
                    .await,
            )
        }
        Command::Transfer {
            recipient,
            amount,
            currency,
            memo,
            active_key,
        } => {
            let login = session_login(presenter)?;
            let currency = parse_currency(&currency)?;
            let model =
                TransferModel::new(&login, &active_key, &recipient, &amount, currency, &memo)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.transfer(&model).await })
                    .await,
            )
        }
        Command::UpdateProfile {
            name,
            about,
            location,
            website,
            profile_image,
            active_key,
        } => {
            let login = session_login(presenter)?;
            let mut model = UpdateProfileModel::new(&login, &active_key)?;
            model.name = name;
            model.about = about;
            model.location = location;
            model.website = website;
            model.profile_image = profile_image;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.update_user_profile(&model).await })
                    .await,
            )
        }
        Command::Upload { file, title, tags } => {
            let auth = session_auth(presenter)?;
            let media = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let model = UploadMediaModel::new(&auth, &title, &tags, media)?;
            let client = presenter.client();
            report(
                presenter
                    .try_run_task(async move { client.upload(&model).await.map(|_| ()) })
                    .await,
            )
        }
        Command::Switch { chain } => {
            presenter.switch_chain(chain);
            if let Some(mut user) = presenter.user() {
                user.chain = chain;
                presenter.set_user(Some(user.clone()));
                if !store.save(&user).await {
                    return Err(anyhow!("Failed to persist the session"));
                }
            }
            println!("Switched to {chain}");
            Ok(())
        }
    }
}

async fn follow(
    presenter: &Arc<Presenter>,
    username: &str,
    follow_type: FollowType,
) -> Result<()> {
    let auth = session_auth(presenter)?;
    let model = FollowModel::new(&auth, username, follow_type)?;
    let client = presenter.client();
    report(
        presenter
            .try_run_task(async move { client.follow(&model).await })
            .await,
    )
}

fn session_login(presenter: &Arc<Presenter>) -> Result<String> {
    presenter
        .user()
        .map(|u| u.login)
        .ok_or_else(|| anyhow!("Not logged in; run `steepshot login` first"))
}

fn session_auth(presenter: &Arc<Presenter>) -> Result<AuthorizedModel> {
    let user = presenter
        .user()
        .ok_or_else(|| anyhow!("Not logged in; run `steepshot login` first"))?;
    let key = user
        .posting_key
        .ok_or_else(|| anyhow!("The session has no posting key; log in again"))?;
    Ok(AuthorizedModel::new(&user.login, &key)?)
}

fn parse_currency(s: &str) -> Result<CurrencyType> {
    match s.to_lowercase().as_str() {
        "steem" => Ok(CurrencyType::Steem),
        "sbd" => Ok(CurrencyType::Sbd),
        "golos" => Ok(CurrencyType::Golos),
        "gbg" => Ok(CurrencyType::Gbg),
        _ => Err(anyhow!("Invalid currency '{s}'. Valid: steem, sbd, golos, gbg")),
    }
}

fn parse_beneficiaries(raw: &[String]) -> Result<Vec<Beneficiary>> {
    raw.iter()
        .map(|pair| {
            let (account, weight) = pair
                .split_once(':')
                .ok_or_else(|| anyhow!("Beneficiary must be account:weight, got '{pair}'"))?;
            Ok(Beneficiary {
                account: account.to_string(),
                weight: weight
                    .parse()
                    .map_err(|_| anyhow!("Invalid beneficiary weight '{weight}'"))?,
            })
        })
        .collect()
}

/// Print the operation outcome; `None` means the task was cancelled or died
/// unexpectedly and has already been reported.
fn report(outcome: Option<OperationResult<()>>) -> Result<()> {
    match outcome {
        Some(Ok(())) => {
            println!("Done");
            Ok(())
        }
        Some(Err(e)) => Err(anyhow!(e.to_string())),
        None => Err(anyhow!("The operation did not complete")),
    }
}
