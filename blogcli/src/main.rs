use blogcli::client::image_content_type;
use blogcli::{ApiClient, ClientError, NewPost, Post, PostChanges, Provider, SessionStore};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Terminal client for the blog API
#[derive(Parser, Debug)]
#[command(name = "blogcli")]
#[command(about = "Log in with Google or Facebook and browse blog posts", long_about = None)]
struct Cli {
    /// API base URL
    #[arg(long = "api-url", env = "BLOG_API_URL", default_value = blogcli::client::DEFAULT_API_URL)]
    api_url: String,

    /// Session file (defaults to ~/.blogcli/session.json)
    #[arg(long = "session", env = "BLOGCLI_SESSION")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the URL that starts a provider login
    Login {
        #[arg(value_enum)]
        provider: ProviderArg,
    },
    /// Finish a login with the URL the browser landed on
    Callback { url: String },
    /// Show the logged-in user after checking the credential
    Whoami,
    /// Clear the stored session
    Logout,
    /// List all posts
    Posts,
    /// List your own posts
    Mine,
    /// Show one post
    Show { id: String },
    /// Write a new post
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Repeat for several tags
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Image file to upload as the cover
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Change one of your posts; only the given fields are sent
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Replaces all tags; repeat for several
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        /// Image file to upload as the new cover
        #[arg(long, conflicts_with = "clear_image")]
        image: Option<PathBuf>,
        /// Remove the cover image
        #[arg(long)]
        clear_image: bool,
    },
    /// Upload an image and print its URL
    Upload { path: PathBuf },
    /// Delete one of your posts
    Delete { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    Google,
    Facebook,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Google => Provider::Google,
            ProviderArg::Facebook => Provider::Facebook,
        }
    }
}

fn print_post_line(post: &Post) {
    let author = post.author.name.as_deref().unwrap_or("unknown");
    println!("{}  {}  (by {}, {})", post.id, post.title, author, post.created_at);
}

/// Reads an image file and uploads it, returning the relative URL
async fn upload_file(client: &mut ApiClient, path: &Path) -> Result<String, ClientError> {
    let content_type = image_content_type(path)
        .ok_or_else(|| ClientError::UnsupportedImage(path.display().to_string()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let data = fs::read(path).map_err(|source| ClientError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    client.upload_image(&file_name, content_type, data).await
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let session_path = cli.session.unwrap_or_else(SessionStore::default_path);
    let session = SessionStore::open(session_path)?;
    let mut client = ApiClient::new(&cli.api_url, session);

    match cli.command {
        Command::Login { provider } => {
            println!("Open this URL in your browser to log in:");
            println!("{}", client.login_url(provider.into()));
            println!("Then run: blogcli callback '<url you were redirected to>'");
        }
        Command::Callback { url } => {
            let user = client.session_mut().complete_login(&url)?;
            let next = client.session_mut().take_redirect()?;
            println!("Logged in as {} <{}> via {}", user.name, user.email, user.provider);
            println!("Continue at {}", next);
        }
        Command::Whoami => {
            match client.initialize().await? {
                Some(user) => println!("{} <{}> ({})", user.name, user.email, user.provider),
                None => println!("Not logged in"),
            }
            println!("session: {}", client.session().path().display());
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Posts => {
            for post in client.list_posts().await? {
                print_post_line(&post);
            }
        }
        Command::Mine => {
            for post in client.my_posts().await? {
                print_post_line(&post);
            }
        }
        Command::Show { id } => {
            let post = client.get_post(&id).await?;
            println!("{}", post.title);
            if !post.tags.is_empty() {
                println!("tags: {}", post.tags.join(", "));
            }
            if let Some(image) = &post.image_url {
                println!("image: {}", client.asset_url(image));
            }
            println!();
            println!("{}", post.content);
        }
        Command::Create {
            title,
            content,
            tags,
            image,
        } => {
            client.session_mut().require_auth("/blogs/create")?;
            let image_url = match image {
                Some(path) => Some(upload_file(&mut client, &path).await?),
                None => None,
            };
            let post = client
                .create_post(&NewPost {
                    title,
                    content,
                    tags,
                    image_url,
                })
                .await?;
            println!("Created {}", post.id);
        }
        Command::Edit {
            id,
            title,
            content,
            tags,
            image,
            clear_image,
        } => {
            client.session_mut().require_auth(&format!("/blogs/edit/{}", id))?;
            let image_url = match image {
                Some(path) => Some(Some(upload_file(&mut client, &path).await?)),
                None if clear_image => Some(None),
                None => None,
            };
            let post = client
                .update_post(
                    &id,
                    &PostChanges {
                        title,
                        content,
                        tags,
                        image_url,
                    },
                )
                .await?;
            println!("Updated {} ({})", post.id, post.updated_at);
        }
        Command::Upload { path } => {
            let url = upload_file(&mut client, &path).await?;
            println!("{}", client.asset_url(&url));
            println!("imageUrl: {}", url);
        }
        Command::Delete { id } => {
            client.delete_post(&id).await?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::LoginRequired) => {
            eprintln!("You need to log in first: blogcli login <google|facebook>");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
